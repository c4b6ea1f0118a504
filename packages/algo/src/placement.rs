//! Placement Staircase - cold-start ability estimate
//!
//! A 1-D bisection-like procedure for learners with no history:
//! - theta starts at 0 (mid ability) with step 1.0
//! - easy moves theta up by step, hard moves it down
//! - step halves every second response
//! - stop once converged (enough responses and small step) or at the cap
//!
//! Needs no calibrated item bank. Theta is only clamped when it is used to
//! pick the next item difficulty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::PlacementConfig;
use crate::types::{sigmoid, AbilityEstimate, CefrBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementOutcome {
    Easy,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementEntry {
    pub item_id: Option<String>,
    /// Difficulty the item was picked at
    pub difficulty: f64,
    pub outcome: PlacementOutcome,
    pub theta_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementState {
    pub theta: f64,
    pub step: f64,
    pub response_count: u32,
    #[serde(default)]
    pub seen_item_ids: BTreeSet<String>,
    #[serde(default)]
    pub history: Vec<PlacementEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementCandidate {
    pub item_id: String,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementStaircase {
    config: PlacementConfig,
}

impl PlacementStaircase {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn start(&self) -> PlacementState {
        PlacementState {
            theta: 0.0,
            step: self.config.initial_step,
            response_count: 0,
            seen_item_ids: BTreeSet::new(),
            history: Vec::new(),
        }
    }

    pub fn pick_difficulty(&self, state: &PlacementState) -> f64 {
        let limit = self.config.difficulty_limit;
        if state.theta.is_nan() {
            return 0.0;
        }
        state.theta.clamp(-limit, limit)
    }

    /// Unseen candidate closest to the current pick difficulty; ties go to the
    /// lexicographically smaller id.
    pub fn pick_item<'a>(
        &self,
        state: &PlacementState,
        candidates: &'a [PlacementCandidate],
    ) -> Option<&'a PlacementCandidate> {
        let target = self.pick_difficulty(state);
        candidates
            .iter()
            .filter(|c| !state.seen_item_ids.contains(&c.item_id))
            .min_by(|a, b| {
                let da = (a.difficulty - target).abs();
                let db = (b.difficulty - target).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.item_id.cmp(&b.item_id))
            })
    }

    pub fn update(&self, state: &PlacementState, outcome: PlacementOutcome) -> PlacementState {
        self.apply(state, None, outcome)
    }

    /// Same as [`update`](Self::update) but also marks `item_id` as seen.
    pub fn record(
        &self,
        state: &PlacementState,
        item_id: &str,
        outcome: PlacementOutcome,
    ) -> PlacementState {
        self.apply(state, Some(item_id), outcome)
    }

    fn apply(
        &self,
        state: &PlacementState,
        item_id: Option<&str>,
        outcome: PlacementOutcome,
    ) -> PlacementState {
        let difficulty = self.pick_difficulty(state);
        let mut next = state.clone();

        match outcome {
            PlacementOutcome::Easy => next.theta += next.step,
            PlacementOutcome::Hard => next.theta -= next.step,
        }
        next.response_count += 1;

        let every = self.config.decay_every.max(1);
        if next.response_count % every == 0 {
            next.step *= self.config.step_decay;
        }

        if let Some(id) = item_id {
            next.seen_item_ids.insert(id.to_string());
        }
        next.history.push(PlacementEntry {
            item_id: item_id.map(str::to_string),
            difficulty,
            outcome,
            theta_after: next.theta,
        });

        next
    }

    pub fn should_stop(&self, state: &PlacementState) -> bool {
        let converged = state.response_count >= self.config.min_responses
            && state.step <= self.config.step_stop;
        converged || state.response_count >= self.config.max_responses
    }

    pub fn to_estimate(&self, state: &PlacementState) -> AbilityEstimate {
        let estimate = AbilityEstimate {
            band: CefrBand::from_theta(state.theta),
            vocab_index: vocab_index(state.theta),
            confidence: self.confidence(state.step),
        };
        tracing::debug!(
            theta = state.theta,
            responses = state.response_count,
            band = %estimate.band,
            "placement estimate"
        );
        estimate
    }

    /// Monotone map from step size to [confidence_floor, 1]; smaller steps mean
    /// more convergence.
    pub fn confidence(&self, step: f64) -> f64 {
        let floor = self.config.confidence_floor;
        if !step.is_finite() || self.config.initial_step <= 0.0 {
            return floor;
        }
        let relative = step.max(0.0) / self.config.initial_step;
        (1.0 - relative).clamp(floor, 1.0)
    }
}

/// Continuous 0-10 vocabulary proxy, non-decreasing in theta
pub fn vocab_index(theta: f64) -> f64 {
    if theta.is_nan() {
        return 0.0;
    }
    10.0 * sigmoid(theta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_state() {
        let staircase = PlacementStaircase::default();
        let state = staircase.start();
        assert_eq!(state.theta, 0.0);
        assert_eq!(state.step, 1.0);
        assert_eq!(state.response_count, 0);
        assert!(!staircase.should_stop(&state));
    }

    #[test]
    fn test_step_halves_every_two_responses() {
        let staircase = PlacementStaircase::default();
        let s1 = staircase.update(&staircase.start(), PlacementOutcome::Easy);
        assert_eq!(s1.theta, 1.0);
        assert_eq!(s1.step, 1.0);
        let s2 = staircase.update(&s1, PlacementOutcome::Easy);
        assert_eq!(s2.theta, 2.0);
        assert_eq!(s2.step, 0.5);
        let s3 = staircase.update(&s2, PlacementOutcome::Hard);
        assert_eq!(s3.theta, 1.5);
        assert_eq!(s3.step, 0.5);
        let s4 = staircase.update(&s3, PlacementOutcome::Hard);
        assert_eq!(s4.theta, 1.0);
        assert_eq!(s4.step, 0.25);
    }

    #[test]
    fn test_nine_response_walkthrough() {
        use PlacementOutcome::{Easy, Hard};
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        for outcome in [Easy, Easy, Hard, Easy, Hard, Hard, Easy, Easy, Hard] {
            state = staircase.update(&state, outcome);
        }
        assert_eq!(state.response_count, 9);
        assert_eq!(state.step, 0.0625);
        // +1 +1 -0.5 +0.5 -0.25 -0.25 +0.125 +0.125 -0.0625
        assert!((state.theta - 1.6875).abs() < 1e-12);
        assert_eq!(state.history.len(), 9);

        let estimate = staircase.to_estimate(&state);
        assert!(estimate.vocab_index >= 0.0 && estimate.vocab_index <= 10.0);
        assert!(estimate.confidence >= 0.0 && estimate.confidence <= 1.0);
        assert_eq!(estimate.band, CefrBand::C1);
        assert!(!staircase.should_stop(&state));
        let state = staircase.update(&state, Easy);
        assert!(staircase.should_stop(&state));
    }

    #[test]
    fn test_pick_difficulty_is_clamped() {
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        for _ in 0..6 {
            state = staircase.update(&state, PlacementOutcome::Easy);
        }
        assert!(state.theta > 2.5);
        assert_eq!(staircase.pick_difficulty(&state), 2.5);

        state.theta = -10.0;
        assert_eq!(staircase.pick_difficulty(&state), -2.5);
    }

    #[test]
    fn test_confidence_monotone_in_step() {
        let staircase = PlacementStaircase::default();
        assert_eq!(staircase.confidence(1.0), 0.3);
        assert!(staircase.confidence(0.5) <= staircase.confidence(0.25));
        assert!(staircase.confidence(0.25) < staircase.confidence(0.0625));
        assert!(staircase.confidence(0.0) <= 1.0);
        assert_eq!(staircase.confidence(f64::NAN), 0.3);
    }

    #[test]
    fn test_vocab_index_monotone() {
        let mut prev = vocab_index(-10.0);
        for i in -100..=100 {
            let v = vocab_index(i as f64 / 10.0);
            assert!(v >= prev);
            assert!((0.0..=10.0).contains(&v));
            prev = v;
        }
        assert!((vocab_index(0.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_pick_item_skips_seen_and_prefers_nearest() {
        let staircase = PlacementStaircase::default();
        let candidates = vec![
            PlacementCandidate { item_id: "near".into(), difficulty: 0.1 },
            PlacementCandidate { item_id: "far".into(), difficulty: 2.0 },
            PlacementCandidate { item_id: "mid".into(), difficulty: 0.6 },
        ];
        let state = staircase.start();
        assert_eq!(staircase.pick_item(&state, &candidates).unwrap().item_id, "near");

        let state = staircase.record(&state, "near", PlacementOutcome::Hard);
        assert!(state.seen_item_ids.contains("near"));
        // theta is now -1.0; "mid" (0.6) is closer than "far" (2.0)
        assert_eq!(staircase.pick_item(&state, &candidates).unwrap().item_id, "mid");
        assert_eq!(state.history[0].item_id.as_deref(), Some("near"));
    }

    #[test]
    fn test_long_one_sided_run_stays_finite() {
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        for _ in 0..1_000 {
            state = staircase.update(&state, PlacementOutcome::Hard);
        }
        assert!(state.theta.is_finite());
        assert!(state.step >= 0.0);
        assert!(staircase.should_stop(&state));
        let estimate = staircase.to_estimate(&state);
        assert_eq!(estimate.band, CefrBand::A1);
        assert!(estimate.confidence.is_finite());
    }

    #[test]
    fn test_state_roundtrip_serialization() {
        let staircase = PlacementStaircase::default();
        let state = staircase.record(&staircase.start(), "w1", PlacementOutcome::Easy);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("seenItemIds").is_some());
        let restored: PlacementState = serde_json::from_value(json).unwrap();
        assert_eq!(state, restored);
    }
}

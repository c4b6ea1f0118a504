//! Phase 1 - Yes/No recognition screening
//!
//! Real words are sampled per frequency stratum and pseudowords are spread
//! evenly through the sequence. After every item is answered the hit rate is
//! corrected for false alarms on pseudowords and mapped to an initial theta.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::bank::{AssessmentItem, ItemKind};
use crate::config::ScreeningConfig;
use crate::error::AssessmentError;
use crate::irt::ThetaState;
use crate::sanitize::safe_div;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningAnswer {
    pub item_id: String,
    pub known: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningScore {
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub corrected_hit_rate: f64,
    pub theta0: f64,
}

/// Builds the ordered screening sequence from the resolved bank.
pub fn build_plan(
    bank: &[AssessmentItem],
    config: &ScreeningConfig,
    seed: u64,
) -> Result<Vec<AssessmentItem>, AssessmentError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut real: Vec<AssessmentItem> = Vec::new();
    for stratum in &config.strata {
        let mut candidates: Vec<&AssessmentItem> = bank
            .iter()
            .filter(|item| item.kind == ItemKind::RealRecognition)
            .filter(|item| item.frequency_rank.is_some_and(|r| stratum.contains(r)))
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        real.extend(
            candidates
                .choose_multiple(&mut rng, config.items_per_stratum)
                .map(|item| (*item).clone()),
        );
    }

    if real.is_empty() {
        return Err(AssessmentError::InsufficientItems {
            kind: ItemKind::RealRecognition.as_str(),
            needed: config.items_per_stratum.max(1),
            found: 0,
        });
    }
    real.shuffle(&mut rng);

    let wanted = (real.len() as f64 * config.pseudoword_ratio).round() as usize;
    let mut pseudowords: Vec<&AssessmentItem> =
        bank.iter().filter(|item| item.is_pseudoword()).collect();
    pseudowords.sort_by(|a, b| a.id.cmp(&b.id));
    let pseudowords: Vec<AssessmentItem> = pseudowords
        .choose_multiple(&mut rng, wanted)
        .map(|item| (*item).clone())
        .collect();
    if pseudowords.len() < wanted {
        tracing::warn!(
            wanted,
            available = pseudowords.len(),
            "item bank has fewer pseudowords than the screening ratio asks for"
        );
    }

    Ok(interleave(real, pseudowords))
}

/// Inserts one pseudoword after every `gap` real items.
fn interleave(real: Vec<AssessmentItem>, pseudowords: Vec<AssessmentItem>) -> Vec<AssessmentItem> {
    if pseudowords.is_empty() {
        return real;
    }
    let gap = (real.len() / (pseudowords.len() + 1)).max(1);
    let mut plan = Vec::with_capacity(real.len() + pseudowords.len());
    let mut pending = pseudowords.into_iter();

    for (idx, item) in real.into_iter().enumerate() {
        plan.push(item);
        if (idx + 1) % gap == 0 {
            if let Some(pseudo) = pending.next() {
                plan.push(pseudo);
            }
        }
    }
    plan.extend(pending);
    plan
}

pub fn score(
    items: &[AssessmentItem],
    answers: &[ScreeningAnswer],
    config: &ScreeningConfig,
) -> ScreeningScore {
    let mut real_total = 0usize;
    let mut real_known = 0usize;
    let mut pseudo_total = 0usize;
    let mut pseudo_known = 0usize;

    for answer in answers {
        let Some(item) = items.iter().find(|item| item.id == answer.item_id) else {
            continue;
        };
        if item.is_pseudoword() {
            pseudo_total += 1;
            pseudo_known += usize::from(answer.known);
        } else {
            real_total += 1;
            real_known += usize::from(answer.known);
        }
    }

    let hit_rate = if real_total == 0 {
        0.0
    } else {
        real_known as f64 / real_total as f64
    };
    let false_alarm_rate = if pseudo_total == 0 {
        0.0
    } else {
        (pseudo_known as f64 / pseudo_total as f64).min(config.max_false_alarm_rate)
    };
    let corrected_hit_rate =
        safe_div(hit_rate - false_alarm_rate, 1.0 - false_alarm_rate).clamp(0.0, 1.0);
    let theta0 = ((corrected_hit_rate - 0.5) * config.theta_scale)
        .clamp(-config.theta_limit, config.theta_limit);

    ScreeningScore {
        hit_rate,
        false_alarm_rate,
        corrected_hit_rate,
        theta0,
    }
}

impl ScreeningScore {
    pub fn initial_theta(&self, config: &ScreeningConfig) -> ThetaState {
        ThetaState::new(self.theta0, config.initial_variance)
    }
}

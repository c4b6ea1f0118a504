//! Review Scheduler - lightweight spaced repetition
//!
//! A minimal stability/difficulty model:
//! - stability' = clamp(stability × m(rating), 0.3, 60)
//! - difficulty' = clamp(difficulty + δ(rating), 1.3, 9.0)
//! - interval = max(1, round(stability'^1.07)) days
//!
//! Difficulty does not feed back into the interval formula; it is kept for
//! downstream ranking only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::ValidationError;

// ==================== Constants ====================

/// Forgetting-curve decay and factor (retrievability 0.9 after `stability` days)
const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;

// ==================== Rating ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Maps a correctness signal and latency to a rating.
    pub fn from_correct(is_correct: bool, response_time_ms: i64) -> Self {
        if !is_correct {
            return Self::Again;
        }
        if response_time_ms < 2000 {
            Self::Easy
        } else if response_time_ms < 5000 {
            Self::Good
        } else {
            Self::Hard
        }
    }

    fn index(self) -> usize {
        self as usize - 1
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(ValidationError::InvalidRating(other)),
        }
    }
}

// ==================== Data Structures ====================

/// Scheduler input: the two numeric memory fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryParams {
    pub stability: f64,
    pub difficulty: f64,
}

impl MemoryParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.stability.is_finite() || self.stability < 0.0 {
            return Err(ValidationError::InvalidMemoryState(format!(
                "stability must be finite and non-negative, got {}",
                self.stability
            )));
        }
        if !self.difficulty.is_finite() || self.difficulty < 0.0 {
            return Err(ValidationError::InvalidMemoryState(format!(
                "difficulty must be finite and non-negative, got {}",
                self.difficulty
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub stability: f64,
    pub difficulty: f64,
    pub due: DateTime<Utc>,
    pub interval_days: u32,
}

/// Per learner × item memory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    pub stability: f64,
    pub difficulty: f64,
    pub due: DateTime<Utc>,
    pub repetition_count: u32,
    pub lapse_count: u32,
    pub suspended: bool,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

/// Immutable audit record of the values a review started from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    pub rating: Rating,
    pub stability_before: f64,
    pub difficulty_before: f64,
    pub due_before: DateTime<Utc>,
    pub repetition_count_before: u32,
    pub reviewed_at: DateTime<Utc>,
}

// ==================== Scheduler ====================

#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

impl ReviewScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn initial_params(&self) -> MemoryParams {
        MemoryParams {
            stability: self.config.initial_stability,
            difficulty: self.config.initial_difficulty,
        }
    }

    pub fn update(
        &self,
        params: MemoryParams,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ScheduleResult, ValidationError> {
        params.validate()?;
        let c = &self.config;
        let idx = rating.index();

        let stability = (params.stability * c.stability_multipliers[idx])
            .clamp(c.min_stability, c.max_stability);
        let difficulty =
            (params.difficulty + c.difficulty_deltas[idx]).clamp(c.min_difficulty, c.max_difficulty);
        let interval_days = self.interval_days(stability);

        Ok(ScheduleResult {
            stability,
            difficulty,
            due: now + Duration::days(i64::from(interval_days)),
            interval_days,
        })
    }

    pub fn interval_days(&self, stability: f64) -> u32 {
        let raw = stability.max(0.0).powf(self.config.interval_exponent).round();
        // stability is capped at 60, so the cast cannot truncate meaningfully
        (raw as u32).max(1)
    }

    pub fn is_mature(&self, state: &MemoryState) -> bool {
        state.stability >= self.config.mature_stability
            && state.lapse_count <= self.config.mature_max_lapses
    }
}

// ==================== Memory State ====================

impl MemoryState {
    /// Fresh item, due immediately
    pub fn new(scheduler: &ReviewScheduler, now: DateTime<Utc>) -> Self {
        let params = scheduler.initial_params();
        Self {
            stability: params.stability,
            difficulty: params.difficulty,
            due: now,
            repetition_count: 0,
            lapse_count: 0,
            suspended: false,
            last_reviewed_at: None,
        }
    }

    pub fn params(&self) -> MemoryParams {
        MemoryParams {
            stability: self.stability,
            difficulty: self.difficulty,
        }
    }

    /// Applies one review and returns the next state plus the pre-update snapshot.
    pub fn review(
        &self,
        scheduler: &ReviewScheduler,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<(MemoryState, ReviewSnapshot), ValidationError> {
        if self.suspended {
            return Err(ValidationError::InvalidMemoryState(
                "cannot review a suspended item".to_string(),
            ));
        }
        let result = scheduler.update(self.params(), rating, now)?;

        let snapshot = ReviewSnapshot {
            rating,
            stability_before: self.stability,
            difficulty_before: self.difficulty,
            due_before: self.due,
            repetition_count_before: self.repetition_count,
            reviewed_at: now,
        };

        let next = MemoryState {
            stability: result.stability,
            difficulty: result.difficulty,
            due: result.due,
            repetition_count: self.repetition_count + 1,
            lapse_count: self.lapse_count + u32::from(rating == Rating::Again),
            suspended: false,
            last_reviewed_at: Some(now),
        };

        Ok((next, snapshot))
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.suspended && self.due <= now
    }

    /// Estimated recall probability at `now`
    pub fn retrievability_at(&self, now: DateTime<Utc>) -> f64 {
        match self.last_reviewed_at {
            Some(reviewed) => {
                let elapsed_days = (now - reviewed).num_seconds() as f64 / 86_400.0;
                retrievability(self.stability, elapsed_days)
            }
            None => 0.0,
        }
    }
}

pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    let safe_elapsed = elapsed_days.max(0.0);
    (1.0 + FACTOR * safe_elapsed / stability).powf(DECAY)
}

/// Due, non-suspended items ordered by lowest retrievability, then earliest due.
pub fn due_queue<K: Clone>(
    entries: &[(K, MemoryState)],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<K> {
    let mut due: Vec<(&K, f64, DateTime<Utc>)> = entries
        .iter()
        .filter(|(_, state)| state.is_due(now))
        .map(|(key, state)| (key, state.retrievability_at(now), state.due))
        .collect();

    due.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });

    due.into_iter()
        .take(limit)
        .map(|(key, _, _)| key.clone())
        .collect()
}

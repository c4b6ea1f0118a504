use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub initial_stability: f64,
    pub initial_difficulty: f64,
    pub min_stability: f64,
    pub max_stability: f64,
    pub min_difficulty: f64,
    pub max_difficulty: f64,
    /// Multipliers for again, hard, good, easy
    pub stability_multipliers: [f64; 4],
    /// Difficulty deltas for again, hard, good, easy
    pub difficulty_deltas: [f64; 4],
    pub interval_exponent: f64,
    pub mature_stability: f64,
    pub mature_max_lapses: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_stability: 0.5,
            initial_difficulty: 5.0,
            min_stability: 0.3,
            max_stability: 60.0,
            min_difficulty: 1.3,
            max_difficulty: 9.0,
            stability_multipliers: [0.5, 0.9, 1.6, 2.2],
            difficulty_deltas: [0.3, 0.0, 0.0, -0.2],
            interval_exponent: 1.07,
            mature_stability: 21.0,
            mature_max_lapses: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub initial_step: f64,
    pub step_decay: f64,
    /// Step is decayed every `decay_every` responses
    pub decay_every: u32,
    pub min_responses: u32,
    pub max_responses: u32,
    pub step_stop: f64,
    pub difficulty_limit: f64,
    pub confidence_floor: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            initial_step: 1.0,
            step_decay: 0.5,
            decay_every: 2,
            min_responses: 10,
            max_responses: 15,
            step_stop: 0.2,
            difficulty_limit: 2.5,
            confidence_floor: 0.3,
        }
    }
}

/// Frequency stratum, half-open rank range `[min_rank, max_rank)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyStratum {
    pub min_rank: u32,
    pub max_rank: u32,
}

impl FrequencyStratum {
    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.min_rank && rank < self.max_rank
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningConfig {
    pub strata: Vec<FrequencyStratum>,
    pub items_per_stratum: usize,
    pub pseudoword_ratio: f64,
    pub max_false_alarm_rate: f64,
    pub theta_scale: f64,
    pub theta_limit: f64,
    pub initial_variance: f64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            strata: vec![
                FrequencyStratum { min_rank: 1, max_rank: 1000 },
                FrequencyStratum { min_rank: 1000, max_rank: 2000 },
                FrequencyStratum { min_rank: 2000, max_rank: 4000 },
                FrequencyStratum { min_rank: 4000, max_rank: 8000 },
                FrequencyStratum { min_rank: 8000, max_rank: 16000 },
                FrequencyStratum { min_rank: 16000, max_rank: u32::MAX },
            ],
            items_per_stratum: 5,
            pseudoword_ratio: 0.2,
            max_false_alarm_rate: 0.5,
            theta_scale: 6.0,
            theta_limit: 3.0,
            initial_variance: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatConfig {
    pub pool_size: usize,
    pub target_se: f64,
    pub max_responses: u32,
    pub max_exposure: u32,
    pub exposure_penalty: f64,
    pub min_variance: f64,
    pub max_variance: f64,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            pool_size: 200,
            target_se: 0.30,
            max_responses: 30,
            max_exposure: 3,
            exposure_penalty: 0.01,
            min_variance: 0.02,
            max_variance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    pub screening: ScreeningConfig,
    pub cat: CatConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerModelConfig {
    pub scheduler: SchedulerConfig,
    pub placement: PlacementConfig,
    pub assessment: AssessmentConfig,
}

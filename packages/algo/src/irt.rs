//! Item Response Theory primitives
//!
//! Response model (1PL with guessing floor):
//!   P(θ, b, g) = g + (1 - g) · σ(θ - b)
//!
//! Fisher information:
//!   I(θ) = P'(θ)² / (P (1 - P)),  P'(θ) = (1 - g) · σ · (1 - σ)
//!
//! Ability update: one Newton step on the log-posterior with a Gaussian prior
//! centered at the current estimate. The expected (Fisher) Hessian is used so
//! the curvature is always negative:
//!   θ' = θ + (y - P) · P' / (P (1 - P)) / (I + 1/σ²)
//!   σ'² = clamp(1 / (I + 1/σ²), min, max)

use serde::{Deserialize, Serialize};

use crate::sanitize::{clamp_probability, finite_or, safe_div};
use crate::types::{sigmoid, EPSILON, Z_95};

pub const DEFAULT_MIN_VARIANCE: f64 = 0.02;
pub const DEFAULT_MAX_VARIANCE: f64 = 1.0;

/// Ability estimate with uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThetaState {
    pub theta: f64,
    pub variance: f64,
}

impl ThetaState {
    pub fn new(theta: f64, variance: f64) -> Self {
        Self { theta, variance }
    }

    pub fn standard_error(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

impl Default for ThetaState {
    fn default() -> Self {
        Self {
            theta: 0.0,
            variance: DEFAULT_MAX_VARIANCE,
        }
    }
}

/// Item parameters: difficulty `b` and guessing floor `g`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemParams {
    pub difficulty: f64,
    pub guessing: f64,
}

impl ItemParams {
    pub fn new(difficulty: f64, guessing: f64) -> Self {
        Self {
            difficulty,
            guessing,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.difficulty.is_finite() && (0.0..1.0).contains(&self.guessing)
    }
}

pub fn probability(theta: f64, item: ItemParams) -> f64 {
    let g = item.guessing;
    g + (1.0 - g) * sigmoid(theta - item.difficulty)
}

/// dP/dθ
pub fn probability_slope(theta: f64, item: ItemParams) -> f64 {
    let s = sigmoid(theta - item.difficulty);
    (1.0 - item.guessing) * s * (1.0 - s)
}

pub fn fisher_information(theta: f64, item: ItemParams) -> f64 {
    let p = clamp_probability(probability(theta, item));
    let slope = probability_slope(theta, item);
    let info = slope * slope / (p * (1.0 - p));
    finite_or(info, 0.0).max(0.0)
}

/// Single MAP step for one observed outcome.
pub fn map_update(
    state: ThetaState,
    item: ItemParams,
    correct: bool,
    min_variance: f64,
    max_variance: f64,
) -> ThetaState {
    let y = if correct { 1.0 } else { 0.0 };
    let p = clamp_probability(probability(state.theta, item));
    let slope = probability_slope(state.theta, item);

    let prior_precision = safe_div(1.0, state.variance.max(EPSILON));
    let gradient = (y - p) * slope / (p * (1.0 - p));
    let information = fisher_information(state.theta, item);
    let curvature = information + prior_precision;

    let step = safe_div(gradient, curvature);
    let theta = finite_or(state.theta + step, state.theta);
    let variance = finite_or(safe_div(1.0, curvature), state.variance)
        .clamp(min_variance, max_variance);

    ThetaState { theta, variance }
}

/// Probability interval for one item at θ ± z·SE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityBand {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallEstimate {
    pub probability: f64,
    /// θ ± SE
    pub ci68: ProbabilityBand,
    /// θ ± 1.96·SE
    pub ci95: ProbabilityBand,
}

pub fn recall_estimate(state: ThetaState, item: ItemParams) -> RecallEstimate {
    let se = state.standard_error();
    let band = |z: f64| ProbabilityBand {
        lower: probability(state.theta - z * se, item),
        upper: probability(state.theta + z * se, item),
    };
    RecallEstimate {
        probability: probability(state.theta, item),
        ci68: band(1.0),
        ci95: band(Z_95),
    }
}

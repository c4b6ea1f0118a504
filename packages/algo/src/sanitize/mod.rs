//! Data Sanitization
//!
//! Numerical stability utilities and input guards.
//!
//! Functions:
//! - Probability clamping away from 0 and 1
//! - Guarded division
//! - Binary outcome validation

use crate::error::ValidationError;
use crate::types::EPSILON;

/// Lower/upper probability clamp used in likelihood terms
pub const PROB_EPSILON: f64 = 1e-9;

/// Keeps a probability strictly inside (0, 1) so `p * (1 - p)` never vanishes
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)
}

/// Division with the denominator magnitude floored at `EPSILON`
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    let denom = if denominator.abs() < EPSILON {
        EPSILON.copysign(denominator)
    } else {
        denominator
    };
    numerator / denom
}

/// Replaces non-finite values with `fallback`
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Validates a raw 0/1 outcome
pub fn parse_outcome(raw: u8) -> Result<bool, ValidationError> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ValidationError::InvalidOutcome(other)),
    }
}

//! Common Types and Constants
//!
//! Shared data structures used across the scheduler, placement and
//! assessment modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Logit clamp used before exponentiation
pub const MAX_LOGIT: f64 = 20.0;

/// 95% normal quantile
pub const Z_95: f64 = 1.96;

// ==================== Shared Math ====================

/// Logistic function with the logit clamped so `exp` never overflows.
pub fn sigmoid(x: f64) -> f64 {
    let z = x.clamp(-MAX_LOGIT, MAX_LOGIT);
    1.0 / (1.0 + (-z).exp())
}

// ==================== Proficiency Bands ====================

/// CEFR proficiency band, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrBand {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

/// Lower theta bound of A2, B1, B2, C1 and C2.
pub const BAND_CUT_POINTS: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];

impl CefrBand {
    pub const ALL: [CefrBand; 6] = [
        CefrBand::A1,
        CefrBand::A2,
        CefrBand::B1,
        CefrBand::B2,
        CefrBand::C1,
        CefrBand::C2,
    ];

    /// Maps theta to a band. Cut points are inclusive at the lower edge, so
    /// `theta = -2.0` is the first value of A2.
    pub fn from_theta(theta: f64) -> Self {
        if theta.is_nan() {
            return CefrBand::A1;
        }
        let idx = BAND_CUT_POINTS.iter().filter(|&&cut| theta >= cut).count();
        Self::ALL[idx]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CefrBand::A1 => "A1",
            CefrBand::A2 => "A2",
            CefrBand::B1 => "B1",
            CefrBand::B2 => "B2",
            CefrBand::C1 => "C1",
            CefrBand::C2 => "C2",
        }
    }
}

impl std::fmt::Display for CefrBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable ability summary persisted once a placement or assessment ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    pub band: CefrBand,
    /// Continuous 0-10 vocabulary size proxy
    pub vocab_index: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

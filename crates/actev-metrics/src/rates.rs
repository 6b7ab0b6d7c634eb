//! Scalar detection metrics computed from outcome counts.
//!
//! Every ratio returns `None` when its denominator is zero.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metric name constants for consistency across DET tables and reports.
pub mod names {
    /// Probability of missed detection.
    pub const P_MISS: &str = "p_miss";

    /// Rate of false alarms per normalization unit (minutes).
    pub const RATE_FA: &str = "rfa";

    /// Weighted probability of missed detection.
    pub const W_P_MISS: &str = "w_p_miss";

    /// Normalized multiple-instance detection error.
    pub const N_MIDE: &str = "n-mide";

    /// Normalized area under the DET curve.
    pub const N_AUDC: &str = "nAUDC";

    /// Multi-object detection error at the best nested alignment.
    pub const MIN_MODE: &str = "minMODE";

    /// Multi-object tracking error at the best nested alignment.
    pub const MIN_MOTE: &str = "minMOTE";
}

/// Probability of missed detection: misses over all references.
pub fn p_miss(num_correct: usize, num_miss: usize, _num_fa: usize) -> Option<f64> {
    let denom = num_miss + num_correct;
    if denom == 0 {
        None
    } else {
        Some(num_miss as f64 / denom as f64)
    }
}

/// False alarms per unit of normalization (not bounded to `[0, 1]`).
pub fn rate_fa(num_fa: usize, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        None
    } else {
        Some(num_fa as f64 / denominator)
    }
}

/// Cost weights applied to miss and correct counts for weighted `p_miss`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MissWeights {
    /// Weight on missed detections.
    pub numerator: f64,
    /// Weight on correct detections.
    pub denominator: f64,
}

impl Default for MissWeights {
    fn default() -> Self {
        Self {
            numerator: 1.0,
            denominator: 1.0,
        }
    }
}

/// Weighted miss probability:
/// `w_num * miss / (w_num * miss + w_den * correct)`.
///
/// Equal weights reduce to [`p_miss`].
pub fn w_p_miss(
    num_correct: usize,
    num_miss: usize,
    _num_fa: usize,
    weights: MissWeights,
) -> Option<f64> {
    let weighted_miss = weights.numerator * num_miss as f64;
    let denom = weighted_miss + weights.denominator * num_correct as f64;
    if denom == 0.0 {
        None
    } else {
        Some(weighted_miss / denom)
    }
}

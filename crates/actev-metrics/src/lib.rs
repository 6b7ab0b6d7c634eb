//! Metrics and sweep engine for activity detection scoring.
//!
//! This crate provides:
//! - Confidence threshold sweeps producing DET points
//! - Miss probability, false-alarm rate and weighted miss probability
//! - Interpolated operating points and normalized area under the DET curve
//! - n-MIDE with collars and per-pair rejection accounting
//! - MODE / MOTE object error formulas
//! - Null-aware aggregation

pub mod aggregate;
pub mod curve;
pub mod error;
pub mod nmide;
pub mod object_error;
pub mod rates;
pub mod sweep;

pub use aggregate::{mean_component, mean_excluding_nulls, MeanAggregate};
pub use curve::{normalized_auc, target_label, value_at, WORST_CASE};
pub use error::{MetricsError, MetricsResult};
pub use nmide::{n_mide, pair_mide, CostFn, NMideConfig, NMideResult, PairMide};
pub use object_error::{mode, mote, ObjectErrorCosts, ObjectErrorCounts};
pub use rates::{names, p_miss, rate_fa, w_p_miss, MissWeights};
pub use sweep::{annotate, sweep, SweepMetrics};

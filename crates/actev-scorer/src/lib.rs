//! ActEV activity detection scorer.
//!
//! This crate provides:
//! - Scoring parameters and run configuration
//! - Protocols: kernel builder, cohort generator and metric set per protocol
//! - The parallel scoring pipeline with deterministic merge order
//! - Alignment, pair, activity, aggregate and DET tables
//! - Tracing setup and `metrics` instrumentation

pub mod config;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod protocol;
pub mod report;

pub use config::{ScorerConfig, ScoringParameters};
pub use error::{ScorerError, ScorerResult};
pub use logging::{init_tracing, RunLogger};
pub use pipeline::Scorer;
pub use protocol::{Cohort, CohortKey, KernelContext, MetricSet, ProtocolId};
pub use report::{
    ActivityMetricRow, AggregateMethod, AggregateMetricRow, AlignmentRow, DetPointRow,
    PairMetricRow, ScoringReport,
};

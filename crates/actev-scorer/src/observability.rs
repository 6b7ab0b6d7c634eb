//! Scoring metrics.
//!
//! Provides standardized metrics for monitoring scoring runs:
//! - Alignment outcomes by kind
//! - Cohorts solved by protocol
//! - Stage latency histograms
//!
//! No exporter is installed here; without a recorder these are no-ops.

use std::time::Duration;

use actev_models::AlignmentCounts;
use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Alignment records by kind (CD / MD / FA).
    pub const ALIGNMENT_RECORDS_TOTAL: &str = "actev_alignment_records_total";

    /// Alignment cohorts solved by protocol.
    pub const COHORTS_SOLVED_TOTAL: &str = "actev_cohorts_solved_total";

    /// Pipeline stage latency in seconds.
    pub const STAGE_SECONDS: &str = "actev_stage_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record the outcome counts of one solved cohort.
pub fn record_cohort(protocol: &str, counts: &AlignmentCounts) {
    counter!(
        names::COHORTS_SOLVED_TOTAL,
        "protocol" => protocol.to_string()
    )
    .increment(1);

    for (kind, count) in [
        ("CD", counts.correct),
        ("MD", counts.missed),
        ("FA", counts.false_alarms),
    ] {
        counter!(
            names::ALIGNMENT_RECORDS_TOTAL,
            "protocol" => protocol.to_string(),
            "kind" => kind
        )
        .increment(count as u64);
    }
}

/// Record how long a pipeline stage took.
pub fn record_stage(stage: &'static str, elapsed: Duration) {
    histogram!(
        names::STAGE_SECONDS,
        "stage" => stage
    )
    .record(elapsed.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

//! Detection-error-tradeoff points.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome counts and metric values at one confidence threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetPoint {
    pub threshold: f64,
    pub num_correct: usize,
    pub num_miss: usize,
    pub num_fa: usize,
    /// Metric name → value; `None` when undefined at this threshold.
    pub metrics: BTreeMap<String, Option<f64>>,
}

impl DetPoint {
    pub fn new(threshold: f64, num_correct: usize, num_miss: usize, num_fa: usize) -> Self {
        Self {
            threshold,
            num_correct,
            num_miss,
            num_fa,
            metrics: BTreeMap::new(),
        }
    }

    /// Value of a named metric, `None` if absent or undefined.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

//! Scoring parameters and run-time configuration.

use std::collections::{BTreeMap, BTreeSet};

use actev_align::ObjectCongruenceConfig;
use actev_metrics::{CostFn, MissWeights, NMideConfig, ObjectErrorCosts};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ScorerError, ScorerResult};
use crate::protocol::ProtocolId;

/// Every numeric threshold and weight used by a protocol.
///
/// Defaults are the activity detection values. Object-related fields are
/// ignored by protocols that do not score objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringParameters {
    /// Temporal IoU a pair must exceed to be aligned.
    pub temporal_overlap_delta: f64,
    /// Minimum overlap in seconds; `0` disables the overlap filter.
    pub temporal_overlap_min_secs: f64,
    pub epsilon_temporal_congruence: f64,
    pub epsilon_presenceconf_congruence: f64,
    /// Fixed presence confidence range for congruence normalization. When
    /// unset, the range of the system confidences in each cohort is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenceconf_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenceconf_max: Option<f64>,

    /// Spatial IoU an object pair must exceed within a frame.
    pub spatial_overlap_delta: f64,
    /// Object congruence a pair must exceed to be aligned.
    pub object_congruence_delta: f64,
    pub epsilon_object_congruence: f64,
    pub object_miss_cost: f64,
    pub object_fa_cost: f64,
    pub object_id_switch_cost: f64,

    pub nmide_collar_secs: f64,
    pub nmide_cost_miss: f64,
    pub nmide_cost_fa: f64,

    pub w_p_miss_numerator: f64,
    pub w_p_miss_denominator: f64,

    /// rFA at which `p_miss` and `w_p_miss` are read off the DET curve.
    pub rfa_targets: Vec<f64>,
    /// Upper rFA bound for nAUDC.
    pub nauc_cutoff: f64,
}

impl Default for ScoringParameters {
    fn default() -> Self {
        Self {
            temporal_overlap_delta: 0.2,
            temporal_overlap_min_secs: 0.0,
            epsilon_temporal_congruence: 1.0e-8,
            epsilon_presenceconf_congruence: 1.0e-6,
            presenceconf_min: None,
            presenceconf_max: None,
            spatial_overlap_delta: 0.5,
            object_congruence_delta: 0.0,
            epsilon_object_congruence: 1.0e-10,
            object_miss_cost: 1.0,
            object_fa_cost: 1.0,
            object_id_switch_cost: 1.0,
            nmide_collar_secs: 1.0,
            nmide_cost_miss: 1.0,
            nmide_cost_fa: 1.0,
            w_p_miss_numerator: 1.0,
            w_p_miss_denominator: 1.0,
            rfa_targets: vec![0.15, 1.0],
            nauc_cutoff: 0.2,
        }
    }
}

impl ScoringParameters {
    /// Build parameters from a name → value map, starting from defaults.
    /// Unknown names are rejected.
    pub fn from_map(map: &BTreeMap<String, f64>) -> ScorerResult<Self> {
        let value = serde_json::to_value(map)?;
        let params: Self = serde_json::from_value(value)
            .map_err(|e| ScorerError::invalid_parameter(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ScorerResult<()> {
        for (name, value) in [
            ("temporal_overlap_delta", self.temporal_overlap_delta),
            ("spatial_overlap_delta", self.spatial_overlap_delta),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ScorerError::invalid_parameter(format!(
                    "{} must be in [0, 1), got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("temporal_overlap_min_secs", self.temporal_overlap_min_secs),
            ("object_congruence_delta", self.object_congruence_delta),
            ("epsilon_temporal_congruence", self.epsilon_temporal_congruence),
            ("epsilon_presenceconf_congruence", self.epsilon_presenceconf_congruence),
            ("epsilon_object_congruence", self.epsilon_object_congruence),
            ("object_miss_cost", self.object_miss_cost),
            ("object_fa_cost", self.object_fa_cost),
            ("object_id_switch_cost", self.object_id_switch_cost),
            ("nmide_collar_secs", self.nmide_collar_secs),
            ("nmide_cost_miss", self.nmide_cost_miss),
            ("nmide_cost_fa", self.nmide_cost_fa),
            ("w_p_miss_numerator", self.w_p_miss_numerator),
            ("w_p_miss_denominator", self.w_p_miss_denominator),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScorerError::invalid_parameter(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        match (self.presenceconf_min, self.presenceconf_max) {
            (None, None) => {}
            (Some(min), Some(max)) if min.is_finite() && max.is_finite() && min < max => {}
            (min, max) => {
                return Err(ScorerError::invalid_parameter(format!(
                    "presenceconf_min and presenceconf_max must be set together with min < max, got {:?} and {:?}",
                    min, max
                )));
            }
        }

        if !(self.nauc_cutoff.is_finite() && self.nauc_cutoff > 0.0) {
            return Err(ScorerError::invalid_parameter(format!(
                "nauc_cutoff must be positive, got {}",
                self.nauc_cutoff
            )));
        }
        if let Some(bad) = self.rfa_targets.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(ScorerError::invalid_parameter(format!(
                "rfa target must be non-negative, got {}",
                bad
            )));
        }

        Ok(())
    }

    /// Configured presence confidence range, if both bounds are set.
    pub fn presenceconf_range(&self) -> Option<(f64, f64)> {
        self.presenceconf_min.zip(self.presenceconf_max)
    }

    pub fn nmide_config(&self) -> NMideConfig {
        NMideConfig {
            collar_secs: self.nmide_collar_secs,
            cost_miss: CostFn::linear(self.nmide_cost_miss),
            cost_fa: CostFn::linear(self.nmide_cost_fa),
        }
    }

    pub fn miss_weights(&self) -> MissWeights {
        MissWeights {
            numerator: self.w_p_miss_numerator,
            denominator: self.w_p_miss_denominator,
        }
    }

    pub fn object_costs(&self) -> ObjectErrorCosts {
        ObjectErrorCosts {
            miss: self.object_miss_cost,
            false_alarm: self.object_fa_cost,
            id_switch: self.object_id_switch_cost,
        }
    }

    pub fn object_congruence_config(
        &self,
        tracking: bool,
        type_classes: &BTreeMap<String, String>,
    ) -> ObjectCongruenceConfig {
        ObjectCongruenceConfig {
            spatial_iou_delta: self.spatial_overlap_delta,
            costs: self.object_costs(),
            type_classes: type_classes.clone(),
            tracking,
        }
    }
}

/// Run-time scorer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    /// Worker threads for alignment and metrics.
    pub worker_threads: usize,
    pub protocol: ProtocolId,
    /// Activities to score; `None` scores every activity in the input.
    pub activities: Option<BTreeSet<String>>,
    /// Object type → equivalence class for object protocols.
    pub object_type_classes: BTreeMap<String, String>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_threads(),
            protocol: ProtocolId::ActivityDetection,
            activities: None,
            object_type_classes: BTreeMap::new(),
        }
    }
}

impl ScorerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ScorerResult<Self> {
        let protocol = match std::env::var("ACTEV_PROTOCOL") {
            Ok(s) => s.parse()?,
            Err(_) => ProtocolId::ActivityDetection,
        };

        let worker_threads = match std::env::var("ACTEV_WORKER_THREADS") {
            Ok(s) => s
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ScorerError::config_error(format!(
                        "ACTEV_WORKER_THREADS must be a positive integer, got {:?}",
                        s
                    ))
                })?,
            Err(_) => default_threads(),
        };

        Ok(Self {
            worker_threads,
            protocol,
            activities: std::env::var("ACTEV_ACTIVITIES").ok().map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect()
            }),
            object_type_classes: BTreeMap::new(),
        })
    }

    /// Load `.env` (if present) and then read the environment.
    pub fn from_env_file() -> ScorerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn with_protocol(mut self, protocol: ProtocolId) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activities = Some(activities.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    /// Whether `activity` is in scope for this run.
    pub fn includes(&self, activity: &str) -> bool {
        self.activities
            .as_ref()
            .map_or(true, |set| set.contains(activity))
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

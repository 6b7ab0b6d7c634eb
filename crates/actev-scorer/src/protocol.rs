//! Scoring protocols.
//!
//! A protocol only differs in configuration: which kernel pairs instances,
//! how instances are partitioned into independent alignment cohorts, and
//! which metrics are reported. Each is a named strategy function selected
//! by [`ProtocolId`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use actev_align::{
    build_linear_combination_kernel, names, Component, Filter, LinearCombinationKernel,
    ObjectCongruence, ObjectCongruenceFilter, PresenceConfCongruence, TemporalIou,
    TemporalIouFilter, TemporalOverlapFilter,
};
use actev_models::{ActivityInstance, FileIndex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ScoringParameters;
use crate::error::{ScorerError, ScorerResult};

/// Kernel over activity instances.
pub type ActivityKernel = LinearCombinationKernel<ActivityInstance>;

/// Builds the kernel for one cohort.
pub type KernelBuilder = fn(&KernelContext<'_>) -> ScorerResult<ActivityKernel>;

/// Partitions instances into independent alignment problems.
pub type CohortGenerator =
    fn(&[Arc<ActivityInstance>], &[Arc<ActivityInstance>]) -> BTreeMap<CohortKey, Cohort>;

/// Inputs available to a kernel builder.
pub struct KernelContext<'a> {
    pub params: &'a ScoringParameters,
    /// System instances of the cohort; the presence confidence population.
    pub systems: &'a [Arc<ActivityInstance>],
    pub file_index: &'a Arc<FileIndex>,
    pub object_type_classes: &'a BTreeMap<String, String>,
}

/// Identifies one alignment problem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CohortKey {
    pub activity: String,
    /// Set when the protocol aligns each file separately.
    pub file: Option<String>,
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}/{}", self.activity, file),
            None => f.write_str(&self.activity),
        }
    }
}

/// References and system instances aligned together.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    pub references: Vec<Arc<ActivityInstance>>,
    pub systems: Vec<Arc<ActivityInstance>>,
}

/// Metrics reported beyond the detection metrics every protocol has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricSet {
    /// Mean minMODE over correct detections.
    pub object_detection: bool,
    /// Mean minMOTE over correct detections.
    pub object_tracking: bool,
}

/// Supported scoring protocols.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolId {
    /// Temporal alignment per activity.
    ActivityDetection,
    /// Temporal alignment gated on object congruence (MODE).
    ActivityObjectDetection,
    /// Temporal alignment gated on object tracking congruence (MOTE).
    ActivityObjectTracking,
    /// Temporal alignment per activity and file.
    ActivityDetectionPerFile,
}

impl ProtocolId {
    pub const ALL: [ProtocolId; 4] = [
        ProtocolId::ActivityDetection,
        ProtocolId::ActivityObjectDetection,
        ProtocolId::ActivityObjectTracking,
        ProtocolId::ActivityDetectionPerFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::ActivityDetection => "activity_detection",
            ProtocolId::ActivityObjectDetection => "activity_object_detection",
            ProtocolId::ActivityObjectTracking => "activity_object_tracking",
            ProtocolId::ActivityDetectionPerFile => "activity_detection_per_file",
        }
    }

    pub fn kernel_builder(&self) -> KernelBuilder {
        match self {
            ProtocolId::ActivityDetection | ProtocolId::ActivityDetectionPerFile => {
                temporal_kernel
            }
            ProtocolId::ActivityObjectDetection => object_detection_kernel,
            ProtocolId::ActivityObjectTracking => object_tracking_kernel,
        }
    }

    pub fn cohort_generator(&self) -> CohortGenerator {
        match self {
            ProtocolId::ActivityDetectionPerFile => cohorts_by_activity_and_file,
            _ => cohorts_by_activity,
        }
    }

    pub fn metric_set(&self) -> MetricSet {
        match self {
            ProtocolId::ActivityObjectDetection => MetricSet {
                object_detection: true,
                object_tracking: false,
            },
            ProtocolId::ActivityObjectTracking => MetricSet {
                object_detection: true,
                object_tracking: true,
            },
            _ => MetricSet::default(),
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolId {
    type Err = ScorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ScorerError::unknown_protocol(s))
    }
}

fn component_weights(params: &ScoringParameters) -> BTreeMap<String, f64> {
    BTreeMap::from([
        (names::TEMPORAL_IOU.to_string(), params.epsilon_temporal_congruence),
        (
            names::PRESENCE_CONF_CONGRUENCE.to_string(),
            params.epsilon_presenceconf_congruence,
        ),
        (names::OBJECT_CONGRUENCE.to_string(), params.epsilon_object_congruence),
        (
            names::OBJECT_TRACKING_CONGRUENCE.to_string(),
            params.epsilon_object_congruence,
        ),
    ])
}

type ActivityFilters = Vec<Box<dyn Filter<ActivityInstance>>>;
type ActivityComponents = Vec<Box<dyn Component<ActivityInstance>>>;

fn temporal_parts(ctx: &KernelContext<'_>) -> ScorerResult<(ActivityFilters, ActivityComponents)> {
    let params = ctx.params;
    let mut filters: ActivityFilters =
        vec![Box::new(TemporalIouFilter::new(params.temporal_overlap_delta))];
    if params.temporal_overlap_min_secs > 0.0 {
        filters.push(Box::new(TemporalOverlapFilter::new(
            params.temporal_overlap_min_secs,
            Arc::clone(ctx.file_index),
        )));
    }

    let presence = PresenceConfCongruence::from_population(
        ctx.systems.iter().map(Arc::as_ref),
        params.presenceconf_range(),
    )?;
    let components: ActivityComponents = vec![Box::new(TemporalIou), Box::new(presence)];
    Ok((filters, components))
}

fn temporal_kernel(ctx: &KernelContext<'_>) -> ScorerResult<ActivityKernel> {
    let (filters, components) = temporal_parts(ctx)?;
    Ok(build_linear_combination_kernel(
        filters,
        components,
        &component_weights(ctx.params),
        1.0,
    )?)
}

fn object_kernel(ctx: &KernelContext<'_>, tracking: bool) -> ScorerResult<ActivityKernel> {
    let (mut filters, mut components) = temporal_parts(ctx)?;
    let config = ctx
        .params
        .object_congruence_config(tracking, ctx.object_type_classes);
    let congruence = Arc::new(ObjectCongruence::new(&config)?);

    filters.push(Box::new(ObjectCongruenceFilter::new(
        Arc::clone(&congruence),
        ctx.params.object_congruence_delta,
    )));
    components.push(Box::new(congruence));

    Ok(build_linear_combination_kernel(
        filters,
        components,
        &component_weights(ctx.params),
        1.0,
    )?)
}

fn object_detection_kernel(ctx: &KernelContext<'_>) -> ScorerResult<ActivityKernel> {
    object_kernel(ctx, false)
}

fn object_tracking_kernel(ctx: &KernelContext<'_>) -> ScorerResult<ActivityKernel> {
    object_kernel(ctx, true)
}

fn cohorts_by_activity(
    references: &[Arc<ActivityInstance>],
    systems: &[Arc<ActivityInstance>],
) -> BTreeMap<CohortKey, Cohort> {
    let mut cohorts: BTreeMap<CohortKey, Cohort> = BTreeMap::new();
    let key = |i: &ActivityInstance| CohortKey {
        activity: i.activity.clone(),
        file: None,
    };
    for r in references {
        cohorts.entry(key(r)).or_default().references.push(Arc::clone(r));
    }
    for s in systems {
        cohorts.entry(key(s)).or_default().systems.push(Arc::clone(s));
    }
    cohorts
}

fn cohorts_by_activity_and_file(
    references: &[Arc<ActivityInstance>],
    systems: &[Arc<ActivityInstance>],
) -> BTreeMap<CohortKey, Cohort> {
    let mut cohorts: BTreeMap<CohortKey, Cohort> = BTreeMap::new();
    for r in references {
        for (key, part) in split_by_file(r) {
            cohorts.entry(key).or_default().references.push(part);
        }
    }
    for s in systems {
        for (key, part) in split_by_file(s) {
            cohorts.entry(key).or_default().systems.push(part);
        }
    }
    cohorts
}

/// One copy of `instance` per file, localized in that file only.
fn split_by_file(instance: &Arc<ActivityInstance>) -> Vec<(CohortKey, Arc<ActivityInstance>)> {
    if instance.localization.len() == 1 {
        return instance
            .files()
            .map(|file| {
                let key = CohortKey {
                    activity: instance.activity.clone(),
                    file: Some(file.to_string()),
                };
                (key, Arc::clone(instance))
            })
            .collect();
    }

    instance
        .localization
        .iter()
        .map(|(file, signal)| {
            let mut part = ActivityInstance::clone(instance);
            part.localization = BTreeMap::from([(file.clone(), signal.clone())]);
            let key = CohortKey {
                activity: instance.activity.clone(),
                file: Some(file.clone()),
            };
            (key, Arc::new(part))
        })
        .collect()
}

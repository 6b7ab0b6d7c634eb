//! Temporal filters and components for activity instances.

use std::collections::BTreeSet;
use std::sync::Arc;

use actev_models::{ActivityInstance, FileIndex};
use tracing::debug;

use crate::error::{AlignError, AlignResult};
use crate::kernel::{cached, Component, ComponentMap, Filter};

/// Component and auxiliary names published into the component map.
pub mod names {
    pub const TEMPORAL_IOU: &str = "temporal_iou";
    pub const TEMPORAL_INTERSECTION_SECS: &str = "temporal_intersection_secs";
    pub const SPATIAL_IOU: &str = "spatial_iou";
    pub const PRESENCE_CONF_CONGRUENCE: &str = "presenceconf_congruence";
    pub const OBJECT_CONGRUENCE: &str = "object_congruence";
    pub const OBJECT_TRACKING_CONGRUENCE: &str = "object_tracking_congruence";
    pub const OBJECT_MISSES: &str = "object_misses";
    pub const OBJECT_FALSE_ALARMS: &str = "object_false_alarms";
    pub const OBJECT_ID_SWITCHES: &str = "object_id_switches";
    pub const REF_OBJECT_FRAMES: &str = "ref_object_frames";
}

/// Temporal intersection-over-union across every file either instance is
/// localized in. Returns 0.0 when the union is empty.
pub fn temporal_iou(reference: &ActivityInstance, system: &ActivityInstance) -> f64 {
    let files: BTreeSet<&str> = reference.files().chain(system.files()).collect();

    let (mut intersection, mut union) = (0.0, 0.0);
    for file in files {
        let r = reference.signal_in(file);
        let s = system.signal_in(file);
        intersection += r.intersect(&s).area();
        union += r.union(&s).area();
    }

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Overlap of two instances in seconds, using each file's framerate.
pub fn temporal_intersection_secs(
    reference: &ActivityInstance,
    system: &ActivityInstance,
    file_index: &FileIndex,
) -> AlignResult<f64> {
    let mut total = 0.0;
    for (file, r) in &reference.localization {
        let Some(s) = system.localization.get(file) else {
            continue;
        };
        let frames = r.intersect(s).area();
        if frames > 0.0 {
            total += frames / file_index.get(file)?.framerate;
        }
    }
    Ok(total)
}

/// `temporal_iou` as a kernel component.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalIou;

impl Component<ActivityInstance> for TemporalIou {
    fn name(&self) -> &str {
        names::TEMPORAL_IOU
    }

    fn compute(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<f64> {
        cached(cache, names::TEMPORAL_IOU, || Ok(temporal_iou(reference, system)))
    }
}

/// Admits pairs whose temporal IoU is strictly above `delta`.
#[derive(Debug, Clone, Copy)]
pub struct TemporalIouFilter {
    pub delta: f64,
}

impl TemporalIouFilter {
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }
}

impl Filter<ActivityInstance> for TemporalIouFilter {
    fn name(&self) -> &str {
        "temporal_iou_filter"
    }

    fn admit(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<bool> {
        let iou = cached(cache, names::TEMPORAL_IOU, || Ok(temporal_iou(reference, system)))?;
        Ok(iou > self.delta)
    }
}

/// Admits pairs that overlap for at least `min_secs` seconds.
#[derive(Debug, Clone)]
pub struct TemporalOverlapFilter {
    pub min_secs: f64,
    file_index: Arc<FileIndex>,
}

impl TemporalOverlapFilter {
    pub fn new(min_secs: f64, file_index: Arc<FileIndex>) -> Self {
        Self {
            min_secs,
            file_index,
        }
    }
}

impl Filter<ActivityInstance> for TemporalOverlapFilter {
    fn name(&self) -> &str {
        "temporal_overlap_filter"
    }

    fn admit(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<bool> {
        let secs = cached(cache, names::TEMPORAL_INTERSECTION_SECS, || {
            temporal_intersection_secs(reference, system, &self.file_index)
        })?;
        Ok(secs > 0.0 && secs >= self.min_secs)
    }
}

/// Position of a system instance's confidence within the confidence range
/// of the system population, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceConfCongruence {
    min: f64,
    max: f64,
}

impl PresenceConfCongruence {
    /// Use `range` when given, otherwise the min/max confidence of `systems`.
    pub fn from_population<'a, I>(systems: I, range: Option<(f64, f64)>) -> AlignResult<Self>
    where
        I: IntoIterator<Item = &'a ActivityInstance>,
    {
        let (min, max) = match range {
            Some((min, max)) => {
                if !(min.is_finite() && max.is_finite()) || min > max {
                    return Err(AlignError::invalid_parameter(format!(
                        "presence confidence range [{}, {}]",
                        min, max
                    )));
                }
                (min, max)
            }
            None => systems.into_iter().try_fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), s| -> AlignResult<_> {
                    let c = s.confidence()?;
                    Ok((lo.min(c), hi.max(c)))
                },
            )?,
        };

        debug!(min, max, "presence confidence range");
        Ok(Self { min, max })
    }

    /// Congruence of a single confidence value. An empty or degenerate range
    /// maps every value to 1.0.
    pub fn value(&self, confidence: f64) -> f64 {
        if self.max <= self.min {
            return 1.0;
        }
        ((confidence - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

impl Component<ActivityInstance> for PresenceConfCongruence {
    fn name(&self) -> &str {
        names::PRESENCE_CONF_CONGRUENCE
    }

    fn compute(
        &self,
        _reference: &ActivityInstance,
        system: &ActivityInstance,
        _cache: &mut ComponentMap,
    ) -> AlignResult<f64> {
        Ok(self.value(system.confidence()?))
    }
}

//! Object-level kernels and the nested object congruence component.
//!
//! Object congruence scores an activity pair by aligning the reference and
//! system objects frame by frame with an inner kernel. Misses and false
//! alarms (plus identity switches when tracking) are folded into a MODE or
//! MOTE error, and `1 - min(1, error)` becomes a single outer component.
//! Every evaluation builds its own nested alignments; nothing is shared
//! between pairs apart from the immutable inner kernel.

use std::collections::BTreeMap;
use std::sync::Arc;

use actev_metrics::{mode, mote, names as metric_names, ObjectErrorCosts, ObjectErrorCounts};
use actev_models::ActivityInstance;
use actev_signal::SpatialSignal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::activity::names;
use crate::engine::perform_alignment;
use crate::error::{AlignError, AlignResult};
use crate::kernel::{cached, Component, ComponentMap, Filter, LinearCombinationKernel};

/// One object's region at a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameObject {
    pub object_type: String,
    pub object_id: String,
    pub region: SpatialSignal,
}

/// Spatial IoU of two regions; 0.0 when the union is empty.
pub fn spatial_iou(a: &SpatialSignal, b: &SpatialSignal) -> f64 {
    let union = a.union(b).area();
    if union > 0.0 {
        a.intersect(b).area() / union
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialIou;

impl Component<FrameObject> for SpatialIou {
    fn name(&self) -> &str {
        names::SPATIAL_IOU
    }

    fn compute(&self, r: &FrameObject, s: &FrameObject, cache: &mut ComponentMap) -> AlignResult<f64> {
        cached(cache, names::SPATIAL_IOU, || Ok(spatial_iou(&r.region, &s.region)))
    }
}

/// Admits object pairs whose spatial IoU is strictly above `delta`.
#[derive(Debug, Clone, Copy)]
pub struct SpatialIouFilter {
    pub delta: f64,
}

impl Filter<FrameObject> for SpatialIouFilter {
    fn name(&self) -> &str {
        "spatial_iou_filter"
    }

    fn admit(&self, r: &FrameObject, s: &FrameObject, cache: &mut ComponentMap) -> AlignResult<bool> {
        let iou = cached(cache, names::SPATIAL_IOU, || Ok(spatial_iou(&r.region, &s.region)))?;
        Ok(iou > self.delta)
    }
}

/// Admits object pairs of the same type, or of types mapped to the same
/// equivalence class.
#[derive(Debug, Clone, Default)]
pub struct ObjectTypeFilter {
    classes: BTreeMap<String, String>,
}

impl ObjectTypeFilter {
    /// `classes` maps an object type to its class name; unmapped types
    /// form a class of their own.
    pub fn new(classes: BTreeMap<String, String>) -> Self {
        Self { classes }
    }

    fn class_of<'a>(&'a self, object_type: &'a str) -> &'a str {
        self.classes
            .get(object_type)
            .map(String::as_str)
            .unwrap_or(object_type)
    }
}

impl Filter<FrameObject> for ObjectTypeFilter {
    fn name(&self) -> &str {
        "object_type_filter"
    }

    fn admit(&self, r: &FrameObject, s: &FrameObject, _cache: &mut ComponentMap) -> AlignResult<bool> {
        Ok(self.class_of(&r.object_type) == self.class_of(&s.object_type))
    }
}

/// Parameters for the nested object alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectCongruenceConfig {
    /// Inner spatial IoU threshold.
    pub spatial_iou_delta: f64,
    pub costs: ObjectErrorCosts,
    /// Object type → equivalence class.
    pub type_classes: BTreeMap<String, String>,
    /// Count identity switches (MOTE) instead of MODE only.
    pub tracking: bool,
}

impl Default for ObjectCongruenceConfig {
    fn default() -> Self {
        Self {
            spatial_iou_delta: 0.5,
            costs: ObjectErrorCosts::default(),
            type_classes: BTreeMap::new(),
            tracking: false,
        }
    }
}

/// MODE/MOTE-based congruence of an activity pair.
pub struct ObjectCongruence {
    kernel: LinearCombinationKernel<FrameObject>,
    costs: ObjectErrorCosts,
    tracking: bool,
}

impl ObjectCongruence {
    pub fn new(config: &ObjectCongruenceConfig) -> AlignResult<Self> {
        if !(0.0..1.0).contains(&config.spatial_iou_delta) {
            return Err(AlignError::invalid_parameter(format!(
                "spatial_iou_delta must be in [0, 1), got {}",
                config.spatial_iou_delta
            )));
        }
        let kernel = LinearCombinationKernel::new(1.0)
            .with_filter(ObjectTypeFilter::new(config.type_classes.clone()))
            .with_filter(SpatialIouFilter {
                delta: config.spatial_iou_delta,
            })
            .with_component(SpatialIou, 1.0);

        Ok(Self {
            kernel,
            costs: config.costs,
            tracking: config.tracking,
        })
    }

    /// Object error counts over every frame the reference activity is
    /// present in. System objects are only considered at those frames.
    pub fn counts(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
    ) -> AlignResult<ObjectErrorCounts> {
        let mut counts = ObjectErrorCounts::default();

        for (file, presence) in &reference.localization {
            let Some((start, end)) = presence.extent() else {
                continue;
            };
            // ref object id → system object id at its last match
            let mut last_match: BTreeMap<String, String> = BTreeMap::new();

            let frames = presence
                .iterate_by_frame(start.floor() as i64, end.ceil() as i64, 0.0)
                .filter(|(_, level)| *level > 0.0);
            for (frame, _) in frames {
                let refs = objects_at(reference, file, frame);
                let syss = objects_at(system, file, frame);
                counts.ref_object_frames += refs.len();
                if refs.is_empty() && syss.is_empty() {
                    continue;
                }

                let alignment = perform_alignment::<FrameObject, FrameObject, _>(&refs, &syss, &self.kernel)?;
                counts.misses += alignment.missed.len();
                counts.false_alarms += alignment.false_alarms.len();

                if self.tracking {
                    for record in alignment.correct {
                        let (Some(r), Some(s)) = (record.reference, record.system) else {
                            continue;
                        };
                        if let Some(previous) = last_match.insert(r.object_id, s.object_id.clone()) {
                            if previous != s.object_id {
                                counts.id_switches += 1;
                            }
                        }
                    }
                }
            }
        }

        Ok(counts)
    }

    /// Congruence value for `counts`. Without reference objects the pair
    /// is fully congruent only if the system reported none either.
    pub fn congruence(&self, counts: &ObjectErrorCounts) -> f64 {
        match self.error(counts) {
            Some(error) => 1.0 - error.min(1.0),
            None if counts.false_alarms == 0 => 1.0,
            None => 0.0,
        }
    }

    fn error(&self, counts: &ObjectErrorCounts) -> Option<f64> {
        if self.tracking {
            mote(counts, &self.costs)
        } else {
            mode(counts, &self.costs)
        }
    }

    /// Compute the congruence once per pair, publishing the error metrics
    /// and raw counts alongside it.
    pub fn ensure(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<f64> {
        if let Some(value) = cache.get(self.component_name()) {
            return Ok(*value);
        }

        let counts = self.counts(reference, system)?;
        if let Some(v) = mode(&counts, &self.costs) {
            cache.insert(metric_names::MIN_MODE.to_string(), v);
        }
        if self.tracking {
            if let Some(v) = mote(&counts, &self.costs) {
                cache.insert(metric_names::MIN_MOTE.to_string(), v);
            }
            cache.insert(names::OBJECT_ID_SWITCHES.to_string(), counts.id_switches as f64);
        }
        cache.insert(names::OBJECT_MISSES.to_string(), counts.misses as f64);
        cache.insert(names::OBJECT_FALSE_ALARMS.to_string(), counts.false_alarms as f64);
        cache.insert(names::REF_OBJECT_FRAMES.to_string(), counts.ref_object_frames as f64);

        let value = self.congruence(&counts);
        trace!(
            reference = %reference.label(),
            system = %system.label(),
            value,
            "object congruence"
        );
        cache.insert(self.component_name().to_string(), value);
        Ok(value)
    }

    fn component_name(&self) -> &'static str {
        if self.tracking {
            names::OBJECT_TRACKING_CONGRUENCE
        } else {
            names::OBJECT_CONGRUENCE
        }
    }
}

impl Component<ActivityInstance> for ObjectCongruence {
    fn name(&self) -> &str {
        self.component_name()
    }

    fn compute(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<f64> {
        self.ensure(reference, system, cache)
    }
}

/// Admits activity pairs whose object congruence is strictly above `delta`.
pub struct ObjectCongruenceFilter {
    congruence: Arc<ObjectCongruence>,
    pub delta: f64,
}

impl ObjectCongruenceFilter {
    pub fn new(congruence: Arc<ObjectCongruence>, delta: f64) -> Self {
        Self { congruence, delta }
    }
}

impl Filter<ActivityInstance> for ObjectCongruenceFilter {
    fn name(&self) -> &str {
        "object_congruence_filter"
    }

    fn admit(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &mut ComponentMap,
    ) -> AlignResult<bool> {
        Ok(self.congruence.ensure(reference, system, cache)? > self.delta)
    }
}

fn objects_at(instance: &ActivityInstance, file: &str, frame: i64) -> Vec<FrameObject> {
    instance
        .objects
        .iter()
        .filter_map(|o| {
            let region = o.region_at(file, frame);
            (!region.is_empty()).then(|| FrameObject {
                object_type: o.object_type.clone(),
                object_id: o.object_id.clone(),
                region,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actev_models::{BoundingBox, ObjectInstance, ObjectLocalizationFrame};

    fn object(kind: &str, id: &str, frames: Vec<ObjectLocalizationFrame>) -> ObjectInstance {
        let mut by_file = BTreeMap::new();
        by_file.insert("a.mp4".to_string(), frames);
        ObjectInstance::from_frames(kind, id, None, by_file).unwrap()
    }

    fn static_object(kind: &str, id: &str, bbox: BoundingBox, end: i64) -> ObjectInstance {
        object(
            kind,
            id,
            vec![ObjectLocalizationFrame::present(0, bbox), ObjectLocalizationFrame::absent(end)],
        )
    }

    fn activity(id: &str, end: i64, objects: Vec<ObjectInstance>) -> ActivityInstance {
        let mut frames = BTreeMap::new();
        frames.insert("a.mp4".to_string(), BTreeMap::from([(0, 1.0), (end, 0.0)]));
        ActivityInstance::from_frames("Riding", id, Some(1.0), frames)
            .unwrap()
            .with_objects(objects)
    }

    fn bbox(x: f64) -> BoundingBox {
        BoundingBox::new(x, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_spatial_iou() {
        let a = bbox(0.0).to_signal().unwrap();
        let b = bbox(5.0).to_signal().unwrap();
        assert!((spatial_iou(&a, &b) - 50.0 / 150.0).abs() < 1e-12);
        assert_eq!(spatial_iou(&SpatialSignal::new(), &SpatialSignal::new()), 0.0);
    }

    #[test]
    fn test_type_filter_equivalence_classes() {
        let region = bbox(0.0).to_signal().unwrap();
        let car = FrameObject {
            object_type: "Car".into(),
            object_id: "1".into(),
            region: region.clone(),
        };
        let truck = FrameObject {
            object_type: "Truck".into(),
            object_id: "2".into(),
            region,
        };
        let mut cache = ComponentMap::new();

        assert!(!ObjectTypeFilter::default().admit(&car, &truck, &mut cache).unwrap());

        let classes = BTreeMap::from([
            ("Car".to_string(), "Vehicle".to_string()),
            ("Truck".to_string(), "Vehicle".to_string()),
        ]);
        assert!(ObjectTypeFilter::new(classes).admit(&car, &truck, &mut cache).unwrap());
    }

    #[test]
    fn test_perfect_objects_are_congruent() {
        let r = activity("r", 10, vec![static_object("Person", "p1", bbox(0.0), 10)]);
        let s = activity("s", 10, vec![static_object("Person", "x", bbox(0.0), 10)]);
        let congruence = ObjectCongruence::new(&ObjectCongruenceConfig::default()).unwrap();

        let mut cache = ComponentMap::new();
        assert_eq!(congruence.ensure(&r, &s, &mut cache).unwrap(), 1.0);
        assert_eq!(cache[metric_names::MIN_MODE], 0.0);
        assert_eq!(cache[names::REF_OBJECT_FRAMES], 10.0);
        assert_eq!(cache[names::OBJECT_CONGRUENCE], 1.0);
    }

    #[test]
    fn test_missing_and_false_objects() {
        // ref object over 10 frames, system object displaced for frames 5..10
        let r = activity("r", 10, vec![static_object("Person", "p1", bbox(0.0), 10)]);
        let moving = object(
            "Person",
            "x",
            vec![
                ObjectLocalizationFrame::present(0, bbox(0.0)),
                ObjectLocalizationFrame::present(5, bbox(50.0)),
                ObjectLocalizationFrame::absent(10),
            ],
        );
        let s = activity("s", 10, vec![moving]);
        let congruence = ObjectCongruence::new(&ObjectCongruenceConfig::default()).unwrap();

        let counts = congruence.counts(&r, &s).unwrap();
        assert_eq!(counts.ref_object_frames, 10);
        assert_eq!(counts.misses, 5);
        assert_eq!(counts.false_alarms, 5);
        // MODE = (5 + 5) / 10 = 1.0, congruence floors at 0
        assert_eq!(congruence.congruence(&counts), 0.0);
    }

    #[test]
    fn test_tracking_counts_id_switches() {
        let r = activity("r", 10, vec![static_object("Person", "p1", bbox(0.0), 10)]);
        let first = object(
            "Person",
            "x",
            vec![ObjectLocalizationFrame::present(0, bbox(0.0)), ObjectLocalizationFrame::absent(5)],
        );
        let second = object(
            "Person",
            "y",
            vec![ObjectLocalizationFrame::present(5, bbox(0.0)), ObjectLocalizationFrame::absent(10)],
        );
        let s = activity("s", 10, vec![first, second]);
        let config = ObjectCongruenceConfig {
            tracking: true,
            ..Default::default()
        };
        let congruence = ObjectCongruence::new(&config).unwrap();

        let mut cache = ComponentMap::new();
        let value = congruence.ensure(&r, &s, &mut cache).unwrap();
        assert_eq!(cache[names::OBJECT_ID_SWITCHES], 1.0);
        assert_eq!(cache[metric_names::MIN_MODE], 0.0);
        assert!((cache[metric_names::MIN_MOTE] - 0.1).abs() < 1e-12);
        assert!((value - 0.9).abs() < 1e-12);
        assert_eq!(congruence.name(), names::OBJECT_TRACKING_CONGRUENCE);
    }

    #[test]
    fn test_no_reference_objects() {
        let r = activity("r", 10, Vec::new());
        let empty = activity("s", 10, Vec::new());
        let noisy = activity("s", 10, vec![static_object("Person", "x", bbox(0.0), 10)]);
        let congruence = ObjectCongruence::new(&ObjectCongruenceConfig::default()).unwrap();

        let mut cache = ComponentMap::new();
        assert_eq!(congruence.ensure(&r, &empty, &mut cache).unwrap(), 1.0);
        assert!(!cache.contains_key(metric_names::MIN_MODE));

        let mut cache = ComponentMap::new();
        assert_eq!(congruence.ensure(&r, &noisy, &mut cache).unwrap(), 0.0);
    }

    #[test]
    fn test_congruence_filter_shares_cache() {
        let r = activity("r", 10, vec![static_object("Person", "p1", bbox(0.0), 10)]);
        let s = activity("s", 10, vec![static_object("Person", "x", bbox(0.0), 10)]);
        let congruence = Arc::new(ObjectCongruence::new(&ObjectCongruenceConfig::default()).unwrap());
        let filter = ObjectCongruenceFilter::new(Arc::clone(&congruence), 0.5);

        let mut cache = ComponentMap::new();
        assert!(filter.admit(&r, &s, &mut cache).unwrap());
        assert_eq!(cache[names::OBJECT_CONGRUENCE], 1.0);
        assert_eq!(congruence.compute(&r, &s, &mut cache).unwrap(), 1.0);
    }

    #[test]
    fn test_rejects_bad_delta() {
        let config = ObjectCongruenceConfig {
            spatial_iou_delta: 1.5,
            ..Default::default()
        };
        assert!(ObjectCongruence::new(&config).is_err());
    }
}

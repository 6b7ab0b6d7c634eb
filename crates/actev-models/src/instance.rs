//! Reference and system activity instances.
//!
//! Instances are built once from parsed annotation records and are
//! read-only afterwards. Construction validates localizations so that
//! malformed input fails loudly instead of scoring as zero.

use std::collections::BTreeMap;

use actev_signal::{Level, Signal, SpatialSignal, TrackSignal};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Axis-aligned bounding box in pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "h")]
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covered by this box as a 2D signal.
    pub fn to_signal(&self) -> ModelResult<SpatialSignal> {
        Ok(SpatialSignal::from_bbox(
            self.x,
            self.y,
            self.width,
            self.height,
        )?)
    }
}

/// Object location starting at `frame`. A missing box ends the object's
/// presence until the next frame that carries one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectLocalizationFrame {
    pub frame: i64,
    #[serde(rename = "boundingBox", default)]
    pub bbox: Option<BoundingBox>,
}

impl ObjectLocalizationFrame {
    pub fn present(frame: i64, bbox: BoundingBox) -> Self {
        Self {
            frame,
            bbox: Some(bbox),
        }
    }

    pub fn absent(frame: i64) -> Self {
        Self { frame, bbox: None }
    }
}

/// An object participating in an activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInstance {
    pub object_type: String,
    pub object_id: String,
    pub presence_conf: Option<f64>,
    /// File name → frame → region.
    pub localization: BTreeMap<String, TrackSignal>,
}

impl ObjectInstance {
    /// Build an object from per-file localization frames.
    pub fn from_frames(
        object_type: impl Into<String>,
        object_id: impl Into<String>,
        presence_conf: Option<f64>,
        frames: BTreeMap<String, Vec<ObjectLocalizationFrame>>,
    ) -> ModelResult<Self> {
        let object_type = object_type.into();
        let object_id = object_id.into();
        let label = format!("{}:{}", object_type, object_id);
        validate_confidence(&label, presence_conf)?;

        let mut localization = BTreeMap::new();
        for (file, file_frames) in frames {
            let points = file_frames
                .iter()
                .map(|f| {
                    let region = match f.bbox {
                        Some(bbox) => bbox.to_signal()?,
                        None => SpatialSignal::new(),
                    };
                    Ok((f.frame as f64, region))
                })
                .collect::<ModelResult<Vec<_>>>()?;
            let track = TrackSignal::from_points(points)?;
            let area = track.area();
            if !area.is_finite() {
                return Err(ModelError::non_finite_localization(&label, file));
            }
            if !(area > 0.0) {
                return Err(ModelError::zero_duration(&label, file));
            }
            localization.insert(file, track);
        }
        if localization.is_empty() {
            return Err(ModelError::empty_localization(label));
        }

        Ok(Self {
            object_type,
            object_id,
            presence_conf,
            localization,
        })
    }

    /// Region occupied in `file` at `frame` (empty when absent).
    pub fn region_at(&self, file: &str, frame: i64) -> SpatialSignal {
        self.localization
            .get(file)
            .map(|track| track.value_at(frame as f64))
            .unwrap_or_default()
    }
}

/// A reference or system activity occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityInstance {
    pub activity: String,
    pub activity_id: String,
    pub presence_conf: Option<f64>,
    /// File name → temporal presence.
    pub localization: BTreeMap<String, Signal>,
    pub objects: Vec<ObjectInstance>,
}

impl ActivityInstance {
    /// Build an instance from per-file temporal signals.
    ///
    /// Every file must have finite levels and positive duration, and at
    /// least one file must be present.
    pub fn new(
        activity: impl Into<String>,
        activity_id: impl Into<String>,
        presence_conf: Option<f64>,
        localization: BTreeMap<String, Signal>,
    ) -> ModelResult<Self> {
        let instance = Self {
            activity: activity.into(),
            activity_id: activity_id.into(),
            presence_conf,
            localization: localization
                .into_iter()
                .map(|(file, signal)| (file, signal.normalize()))
                .collect(),
            objects: Vec::new(),
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Check the construction invariants again, e.g. after the public
    /// fields were edited.
    pub fn validate(&self) -> ModelResult<()> {
        let label = self.label();
        validate_confidence(&label, self.presence_conf)?;

        if self.localization.is_empty() {
            return Err(ModelError::empty_localization(label));
        }
        for (file, signal) in &self.localization {
            let area = signal.area();
            if !signal.is_finite() || !area.is_finite() {
                return Err(ModelError::non_finite_localization(&label, file));
            }
            if !(area > 0.0) {
                return Err(ModelError::zero_duration(&label, file));
            }
        }
        Ok(())
    }

    /// Build an instance from parsed `{file: {frame: level}}` localization.
    pub fn from_frames(
        activity: impl Into<String>,
        activity_id: impl Into<String>,
        presence_conf: Option<f64>,
        frames: BTreeMap<String, BTreeMap<i64, f64>>,
    ) -> ModelResult<Self> {
        let localization = frames
            .into_iter()
            .map(|(file, points)| {
                let signal = Signal::from_points(points.into_iter().map(|(f, v)| (f as f64, v)))?;
                Ok((file, signal))
            })
            .collect::<ModelResult<BTreeMap<_, _>>>()?;
        Self::new(activity, activity_id, presence_conf, localization)
    }

    /// Attach participating objects.
    pub fn with_objects(mut self, objects: Vec<ObjectInstance>) -> Self {
        self.objects = objects;
        self
    }

    /// `activity:id` label used in logs and errors.
    pub fn label(&self) -> String {
        format!("{}:{}", self.activity, self.activity_id)
    }

    /// Presence confidence, required for system instances.
    pub fn confidence(&self) -> ModelResult<f64> {
        self.presence_conf
            .ok_or_else(|| ModelError::missing_confidence(self.label()))
    }

    /// Files this instance is localized in.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.localization.keys().map(String::as_str)
    }

    /// Temporal signal in `file` (empty when not localized there).
    pub fn signal_in(&self, file: &str) -> Signal {
        self.localization.get(file).cloned().unwrap_or_default()
    }

    /// Total localized duration in frames across all files.
    pub fn duration_frames(&self) -> f64 {
        self.localization.values().map(Signal::area).sum()
    }
}

fn validate_confidence(label: &str, presence_conf: Option<f64>) -> ModelResult<()> {
    match presence_conf {
        Some(value) if !value.is_finite() => Err(ModelError::InvalidConfidence {
            instance: label.to_string(),
            value,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actev_signal::SignalError;

    fn frames(file: &str, points: &[(i64, f64)]) -> BTreeMap<String, BTreeMap<i64, f64>> {
        let mut map = BTreeMap::new();
        map.insert(file.to_string(), points.iter().copied().collect());
        map
    }

    #[test]
    fn test_activity_from_frames() {
        let inst = ActivityInstance::from_frames(
            "person_opens_door",
            "7",
            Some(0.8),
            frames("a.mp4", &[(100, 1.0), (150, 0.0)]),
        )
        .unwrap();

        assert_eq!(inst.label(), "person_opens_door:7");
        assert_eq!(inst.duration_frames(), 50.0);
        assert_eq!(inst.confidence().unwrap(), 0.8);
        assert_eq!(inst.files().collect::<Vec<_>>(), vec!["a.mp4"]);
    }

    #[test]
    fn test_zero_duration_is_hard_error() {
        let err = ActivityInstance::from_frames(
            "person_opens_door",
            "1",
            None,
            frames("a.mp4", &[(100, 0.0)]),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::ZeroDuration { .. }));

        let err = ActivityInstance::new("x", "2", None, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyLocalization { .. }));
    }

    #[test]
    fn test_non_finite_localization_is_hard_error() {
        for level in [f64::NAN, f64::INFINITY] {
            let err = ActivityInstance::from_frames(
                "person_opens_door",
                "1",
                None,
                frames("a.mp4", &[(0, level), (10, 0.0)]),
            )
            .unwrap_err();
            assert!(matches!(err, ModelError::Signal(SignalError::NonFiniteLevel(_))));

            let scaled = Signal::segment(0.0, 10.0, 1.0).unwrap().scale(level);
            let localization = BTreeMap::from([("a.mp4".to_string(), scaled)]);
            let err = ActivityInstance::new("person_opens_door", "2", None, localization).unwrap_err();
            assert!(matches!(err, ModelError::NonFiniteLocalization { .. }));
        }
    }

    #[test]
    fn test_validate_catches_edited_localization() {
        let mut inst =
            ActivityInstance::from_frames("x", "1", None, frames("a.mp4", &[(0, 1.0), (10, 0.0)]))
                .unwrap();
        assert!(inst.validate().is_ok());

        let nan = Signal::segment(0.0, 10.0, 1.0).unwrap().scale(f64::NAN);
        inst.localization.insert("a.mp4".to_string(), nan);
        assert!(matches!(
            inst.validate(),
            Err(ModelError::NonFiniteLocalization { .. })
        ));
    }

    #[test]
    fn test_object_with_non_finite_box_rejected() {
        for bbox in [
            BoundingBox::new(f64::NAN, 0.0, 4.0, 5.0),
            BoundingBox::new(0.0, 0.0, f64::INFINITY, 5.0),
        ] {
            let map = BTreeMap::from([(
                "a.mp4".to_string(),
                vec![ObjectLocalizationFrame::present(0, bbox), ObjectLocalizationFrame::absent(10)],
            )]);
            assert!(ObjectInstance::from_frames("person", "3", None, map).is_err());
        }
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let err = ActivityInstance::from_frames(
            "x",
            "1",
            Some(f64::NAN),
            frames("a.mp4", &[(0, 1.0), (10, 0.0)]),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfidence { .. }));
    }

    #[test]
    fn test_missing_confidence_reported() {
        let inst =
            ActivityInstance::from_frames("x", "1", None, frames("a.mp4", &[(0, 1.0), (10, 0.0)]))
                .unwrap();
        assert!(matches!(
            inst.confidence(),
            Err(ModelError::MissingConfidence { .. })
        ));
    }

    #[test]
    fn test_object_track_from_frames() {
        let mut map = BTreeMap::new();
        map.insert(
            "a.mp4".to_string(),
            vec![
                ObjectLocalizationFrame::present(10, BoundingBox::new(0.0, 0.0, 4.0, 5.0)),
                ObjectLocalizationFrame::present(12, BoundingBox::new(0.0, 0.0, 4.0, 5.0)),
                ObjectLocalizationFrame::absent(20),
            ],
        );
        let obj = ObjectInstance::from_frames("person", "3", None, map).unwrap();

        // Identical consecutive boxes collapse into one breakpoint
        assert_eq!(obj.localization["a.mp4"].len(), 2);
        assert_eq!(obj.localization["a.mp4"].area(), 200.0);
        assert_eq!(obj.region_at("a.mp4", 15).area(), 20.0);
        assert!(obj.region_at("a.mp4", 25).is_empty());
        assert!(obj.region_at("b.mp4", 15).is_empty());
    }

    #[test]
    fn test_bbox_deserializes_short_names() {
        let frame: ObjectLocalizationFrame =
            serde_json::from_str(r#"{"frame": 3, "boundingBox": {"x": 1, "y": 2, "w": 3, "h": 4}}"#)
                .unwrap();
        assert_eq!(frame.bbox, Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
    }
}

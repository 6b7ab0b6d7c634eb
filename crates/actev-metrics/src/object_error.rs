//! Multi-object detection and tracking error (MODE / MOTE).
//!
//! Both are weighted error counts normalized by the number of reference
//! object-frames. Counts come from nested per-frame object alignments
//! inside a correctly detected activity pair.

use std::ops::{Add, AddAssign};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Error counts accumulated over the frames of one activity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ObjectErrorCounts {
    pub misses: usize,
    pub false_alarms: usize,
    pub id_switches: usize,
    pub ref_object_frames: usize,
}

impl Add for ObjectErrorCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            misses: self.misses + rhs.misses,
            false_alarms: self.false_alarms + rhs.false_alarms,
            id_switches: self.id_switches + rhs.id_switches,
            ref_object_frames: self.ref_object_frames + rhs.ref_object_frames,
        }
    }
}

impl AddAssign for ObjectErrorCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Cost weights for object errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectErrorCosts {
    pub miss: f64,
    pub false_alarm: f64,
    pub id_switch: f64,
}

impl Default for ObjectErrorCosts {
    fn default() -> Self {
        Self {
            miss: 1.0,
            false_alarm: 1.0,
            id_switch: 1.0,
        }
    }
}

/// `(c_miss * misses + c_fa * false_alarms) / ref_object_frames`
pub fn mode(counts: &ObjectErrorCounts, costs: &ObjectErrorCosts) -> Option<f64> {
    if counts.ref_object_frames == 0 {
        return None;
    }
    let weighted =
        costs.miss * counts.misses as f64 + costs.false_alarm * counts.false_alarms as f64;
    Some(weighted / counts.ref_object_frames as f64)
}

/// MODE plus `c_switch * id_switches`, same normalization.
pub fn mote(counts: &ObjectErrorCounts, costs: &ObjectErrorCosts) -> Option<f64> {
    mode(counts, costs)
        .map(|m| m + costs.id_switch * counts.id_switches as f64 / counts.ref_object_frames as f64)
}

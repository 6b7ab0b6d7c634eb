//! Kernel library and alignment engine for activity detection scoring.
//!
//! This crate provides:
//! - Filter / component / kernel traits and the linear-combination kernel
//! - Temporal, spatial, presence-confidence and object congruence kernels
//! - A deterministic Hungarian solver for rectangular cost matrices
//! - `perform_alignment`, producing correct / missed / false-alarm records

pub mod activity;
pub mod assignment;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod objects;

pub use activity::{
    names, temporal_intersection_secs, temporal_iou, PresenceConfCongruence, TemporalIou,
    TemporalIouFilter, TemporalOverlapFilter,
};
pub use engine::perform_alignment;
pub use error::{AlignError, AlignResult};
pub use kernel::{
    build_linear_combination_kernel, cached, Component, ComponentMap, Decision, DisallowAll,
    Filter, Kernel, LinearCombinationKernel,
};
pub use objects::{
    spatial_iou, FrameObject, ObjectCongruence, ObjectCongruenceConfig, ObjectCongruenceFilter,
    ObjectTypeFilter, SpatialIou, SpatialIouFilter,
};

//! Sparse signal algebra for activity and object localization.
//!
//! This crate provides:
//! - Run-length compressed step functions over frames or coordinates
//! - Set operations (add, intersect, union, difference) and integration
//! - Nested signals for spatial-within-temporal localization
//! - Collar generation and lazy per-frame iteration

pub mod error;
pub mod level;
pub mod signal;

pub use error::{SignalError, SignalResult};
pub use level::Level;
pub use signal::{FrameIter, Signal, SparseSignal, SpatialSignal, TrackSignal};

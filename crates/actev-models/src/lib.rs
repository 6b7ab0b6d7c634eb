//! Shared data models for ActEV scoring.
//!
//! This crate provides:
//! - Reference and system activity instances with object tracks
//! - The file index used for duration normalization
//! - Alignment records and their CD/MD/FA classification
//! - DET points produced by the confidence sweep

pub mod alignment;
pub mod det;
pub mod error;
pub mod file_index;
pub mod instance;

// Re-export common types
pub use alignment::{Alignment, AlignmentCounts, AlignmentKind, AlignmentRecord, ComponentMap};
pub use det::DetPoint;
pub use error::{ModelError, ModelResult};
pub use file_index::{FileIndex, FileInfo};
pub use instance::{ActivityInstance, BoundingBox, ObjectInstance, ObjectLocalizationFrame};

//! Scored media files and the frames selected for scoring in each.

use std::collections::BTreeMap;

use actev_signal::Signal;
use serde::Serialize;

use crate::error::{ModelError, ModelResult};

/// Framerate and scored frame ranges for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub framerate: f64,
    pub selected: Signal,
}

impl FileInfo {
    pub fn new(file: &str, framerate: f64, selected: Signal) -> ModelResult<Self> {
        if !framerate.is_finite() || framerate <= 0.0 {
            return Err(ModelError::InvalidFramerate {
                file: file.to_string(),
                framerate,
            });
        }
        Ok(Self {
            framerate,
            selected: selected.normalize(),
        })
    }

    /// Scored duration in frames.
    pub fn duration_frames(&self) -> f64 {
        self.selected.area()
    }

    /// Scored duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_frames() / self.framerate
    }

    /// Scored duration in minutes.
    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs() / 60.0
    }
}

/// Mapping from file name to [`FileInfo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileIndex {
    files: BTreeMap<String, FileInfo>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous entry with the same name.
    pub fn insert(&mut self, file: impl Into<String>, info: FileInfo) {
        self.files.insert(file.into(), info);
    }

    /// Convenience for a file scored over `[start, end)` frames.
    pub fn with_file(
        mut self,
        file: impl Into<String>,
        framerate: f64,
        start: i64,
        end: i64,
    ) -> ModelResult<Self> {
        let file = file.into();
        let selected = Signal::segment(start as f64, end as f64, 1.0)?;
        let info = FileInfo::new(&file, framerate, selected)?;
        self.files.insert(file, info);
        Ok(self)
    }

    pub fn get(&self, file: &str) -> ModelResult<&FileInfo> {
        self.files
            .get(file)
            .ok_or_else(|| ModelError::unknown_file(file))
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileInfo)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total scored duration over all files, in minutes.
    pub fn total_minutes(&self) -> f64 {
        self.files.values().map(FileInfo::duration_minutes).sum()
    }

    /// Total scored duration over the given files, in minutes.
    pub fn minutes_for<'a, I>(&self, files: I) -> ModelResult<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        files
            .into_iter()
            .map(|f| self.get(f).map(FileInfo::duration_minutes))
            .sum()
    }
}

//! Alignment outcomes between reference and system instances.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Named similarity components, sorted by name for stable output.
pub type ComponentMap = BTreeMap<String, f64>;

/// Classification of an alignment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum AlignmentKind {
    /// Correct detection: reference matched to a system instance.
    #[serde(rename = "CD")]
    CorrectDetection,
    /// Missed detection: reference without a match.
    #[serde(rename = "MD")]
    MissedDetection,
    /// False alarm: system instance without a match.
    #[serde(rename = "FA")]
    FalseAlarm,
    /// True negative: neither side present.
    #[serde(rename = "TN")]
    TrueNegative,
}

impl AlignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentKind::CorrectDetection => "CD",
            AlignmentKind::MissedDetection => "MD",
            AlignmentKind::FalseAlarm => "FA",
            AlignmentKind::TrueNegative => "TN",
        }
    }
}

impl fmt::Display for AlignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CD" => Ok(AlignmentKind::CorrectDetection),
            "MD" => Ok(AlignmentKind::MissedDetection),
            "FA" => Ok(AlignmentKind::FalseAlarm),
            "TN" => Ok(AlignmentKind::TrueNegative),
            other => Err(ModelError::InvalidKind(other.to_string())),
        }
    }
}

/// One aligned (or unaligned) pair.
///
/// `similarity` is only set for correct detections; disallowed pairs never
/// produce a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentRecord<T> {
    pub reference: Option<T>,
    pub system: Option<T>,
    pub similarity: Option<f64>,
    pub components: ComponentMap,
}

impl<T> AlignmentRecord<T> {
    pub fn correct(reference: T, system: T, similarity: f64, components: ComponentMap) -> Self {
        Self {
            reference: Some(reference),
            system: Some(system),
            similarity: Some(similarity),
            components,
        }
    }

    pub fn missed(reference: T) -> Self {
        Self {
            reference: Some(reference),
            system: None,
            similarity: None,
            components: ComponentMap::new(),
        }
    }

    pub fn false_alarm(system: T) -> Self {
        Self {
            reference: None,
            system: Some(system),
            similarity: None,
            components: ComponentMap::new(),
        }
    }

    pub fn kind(&self) -> AlignmentKind {
        match (&self.reference, &self.system) {
            (Some(_), Some(_)) => AlignmentKind::CorrectDetection,
            (Some(_), None) => AlignmentKind::MissedDetection,
            (None, Some(_)) => AlignmentKind::FalseAlarm,
            (None, None) => AlignmentKind::TrueNegative,
        }
    }

    /// Look up a named component.
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components.get(name).copied()
    }
}

/// Correct / missed / false-alarm partition produced by one alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment<T> {
    pub correct: Vec<AlignmentRecord<T>>,
    pub missed: Vec<AlignmentRecord<T>>,
    pub false_alarms: Vec<AlignmentRecord<T>>,
}

impl<T> Default for Alignment<T> {
    fn default() -> Self {
        Self {
            correct: Vec::new(),
            missed: Vec::new(),
            false_alarms: Vec::new(),
        }
    }
}

impl<T> Alignment<T> {
    /// Concatenate another partition onto this one.
    pub fn merge(mut self, other: Alignment<T>) -> Self {
        self.correct.extend(other.correct);
        self.missed.extend(other.missed);
        self.false_alarms.extend(other.false_alarms);
        self
    }

    /// All records: correct, then missed, then false alarms.
    pub fn records(&self) -> impl Iterator<Item = &AlignmentRecord<T>> {
        self.correct
            .iter()
            .chain(self.missed.iter())
            .chain(self.false_alarms.iter())
    }

    pub fn counts(&self) -> AlignmentCounts {
        AlignmentCounts {
            correct: self.correct.len(),
            missed: self.missed.len(),
            false_alarms: self.false_alarms.len(),
        }
    }
}

/// Record counts per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentCounts {
    pub correct: usize,
    pub missed: usize,
    pub false_alarms: usize,
}

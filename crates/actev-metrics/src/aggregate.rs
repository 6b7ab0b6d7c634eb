//! Aggregation of metric values across activities or pairs.

use actev_models::{AlignmentKind, AlignmentRecord};
use serde::Serialize;

/// Mean over defined values with an explicit count of excluded nulls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanAggregate {
    /// `None` when no value was defined.
    pub value: Option<f64>,
    pub num_included: usize,
    pub num_excluded: usize,
}

/// Mean of the defined values; undefined values are counted, not dropped
/// silently.
pub fn mean_excluding_nulls<I>(values: I) -> MeanAggregate
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (mut sum, mut num_included, mut num_excluded) = (0.0, 0usize, 0usize);
    for value in values {
        match value {
            Some(v) => {
                sum += v;
                num_included += 1;
            }
            None => num_excluded += 1,
        }
    }

    MeanAggregate {
        value: (num_included > 0).then(|| sum / num_included as f64),
        num_included,
        num_excluded,
    }
}

/// Mean of a named component over correct detections. Correct detections
/// lacking the component count as excluded.
pub fn mean_component<T>(records: &[AlignmentRecord<T>], name: &str) -> MeanAggregate {
    mean_excluding_nulls(
        records
            .iter()
            .filter(|r| r.kind() == AlignmentKind::CorrectDetection)
            .map(|r| r.component(name)),
    )
}

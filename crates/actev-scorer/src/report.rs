//! Tabular scoring output.
//!
//! Each table is a flat list of serializable rows, sorted by activity, so
//! downstream writers (CSV, JSON, plotting) need no knowledge of the
//! alignment model.

use std::collections::BTreeMap;

use actev_models::{ActivityInstance, AlignmentKind, AlignmentRecord, ComponentMap, DetPoint};
use actev_metrics::names;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ScorerResult;
use crate::protocol::ProtocolId;

/// One alignment outcome.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AlignmentRow {
    pub activity: String,
    pub kind: AlignmentKind,
    pub ref_id: Option<String>,
    pub sys_id: Option<String>,
    pub similarity: Option<f64>,
    pub components: ComponentMap,
}

impl AlignmentRow {
    pub fn from_record<T: AsRef<ActivityInstance>>(activity: &str, record: &AlignmentRecord<T>) -> Self {
        Self {
            activity: activity.to_string(),
            kind: record.kind(),
            ref_id: record.reference.as_ref().map(|r| r.as_ref().activity_id.clone()),
            sys_id: record.system.as_ref().map(|s| s.as_ref().activity_id.clone()),
            similarity: record.similarity,
            components: record.components.clone(),
        }
    }
}

/// A metric computed for one correctly detected pair.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PairMetricRow {
    pub activity: String,
    pub ref_id: String,
    pub sys_id: String,
    pub metric: String,
    /// `None` when the pair was rejected for this metric.
    pub value: Option<f64>,
}

/// A metric computed over one activity.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ActivityMetricRow {
    pub activity: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// How activity metrics were combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMethod {
    /// Mean of per-activity values, skipping undefined ones.
    Mean,
    /// Metric computed over the records of all activities pooled.
    Micro,
}

/// A metric combined across activities.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AggregateMetricRow {
    pub method: AggregateMethod,
    pub metric: String,
    pub value: Option<f64>,
    pub num_included: usize,
    /// Activities whose value was undefined (mean only).
    pub num_excluded: usize,
}

/// One point on an activity's DET curve.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DetPointRow {
    pub activity: String,
    pub threshold: f64,
    pub num_correct: usize,
    pub num_miss: usize,
    pub num_fa: usize,
    pub p_miss: Option<f64>,
    pub rfa: Option<f64>,
    pub w_p_miss: Option<f64>,
}

impl DetPointRow {
    pub fn from_point(activity: &str, point: &DetPoint) -> Self {
        Self {
            activity: activity.to_string(),
            threshold: point.threshold,
            num_correct: point.num_correct,
            num_miss: point.num_miss,
            num_fa: point.num_fa,
            p_miss: point.metric(names::P_MISS),
            rfa: point.metric(names::RATE_FA),
            w_p_miss: point.metric(names::W_P_MISS),
        }
    }
}

/// All output tables of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ScoringReport {
    pub run_id: String,
    pub protocol: ProtocolId,
    pub generated_at: DateTime<Utc>,
    pub alignments: Vec<AlignmentRow>,
    pub pair_metrics: Vec<PairMetricRow>,
    pub activity_metrics: Vec<ActivityMetricRow>,
    pub aggregate_metrics: Vec<AggregateMetricRow>,
    pub det_points: Vec<DetPointRow>,
}

impl ScoringReport {
    pub fn new(run_id: impl Into<String>, protocol: ProtocolId) -> Self {
        Self {
            run_id: run_id.into(),
            protocol,
            generated_at: Utc::now(),
            alignments: Vec::new(),
            pair_metrics: Vec::new(),
            activity_metrics: Vec::new(),
            aggregate_metrics: Vec::new(),
            det_points: Vec::new(),
        }
    }

    /// Metric values of one activity, keyed by metric name.
    pub fn activity(&self, activity: &str) -> BTreeMap<&str, Option<f64>> {
        self.activity_metrics
            .iter()
            .filter(|row| row.activity == activity)
            .map(|row| (row.metric.as_str(), row.value))
            .collect()
    }

    /// Aggregate value for `metric` under `method`.
    pub fn aggregate(&self, method: AggregateMethod, metric: &str) -> Option<&AggregateMetricRow> {
        self.aggregate_metrics
            .iter()
            .find(|row| row.method == method && row.metric == metric)
    }

    /// Activities with at least one metric row.
    pub fn activities(&self) -> Vec<&str> {
        let mut activities: Vec<&str> = self
            .activity_metrics
            .iter()
            .map(|row| row.activity.as_str())
            .collect();
        activities.dedup();
        activities
    }

    pub fn to_json(&self) -> ScorerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON schema of the report document.
    pub fn json_schema() -> ScorerResult<String> {
        Ok(serde_json::to_string_pretty(&schemars::schema_for!(ScoringReport))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actev_signal::Signal;

    fn instance(id: &str) -> Arc<ActivityInstance> {
        let localization = BTreeMap::from([("a.mp4".to_string(), Signal::segment(0.0, 10.0, 1.0).unwrap())]);
        Arc::new(ActivityInstance::new("Talking", id, Some(0.5), localization).unwrap())
    }

    #[test]
    fn test_alignment_row_ids() {
        let record = AlignmentRecord::correct(instance("r1"), instance("s1"), 1.5, ComponentMap::new());
        let row = AlignmentRow::from_record("Talking", &record);
        assert_eq!(row.kind, AlignmentKind::CorrectDetection);
        assert_eq!(row.ref_id.as_deref(), Some("r1"));
        assert_eq!(row.sys_id.as_deref(), Some("s1"));

        let row = AlignmentRow::from_record("Talking", &AlignmentRecord::false_alarm(instance("s2")));
        assert_eq!(row.kind, AlignmentKind::FalseAlarm);
        assert_eq!(row.ref_id, None);
        assert_eq!(row.similarity, None);
    }

    #[test]
    fn test_report_lookup_and_json() {
        let mut report = ScoringReport::new("run-1", ProtocolId::ActivityDetection);
        report.activity_metrics.push(ActivityMetricRow {
            activity: "Talking".into(),
            metric: "p_miss@0.15rfa".into(),
            value: Some(0.25),
        });
        report.aggregate_metrics.push(AggregateMetricRow {
            method: AggregateMethod::Mean,
            metric: "p_miss@0.15rfa".into(),
            value: Some(0.25),
            num_included: 1,
            num_excluded: 0,
        });

        assert_eq!(report.activity("Talking")["p_miss@0.15rfa"], Some(0.25));
        assert_eq!(report.activities(), vec!["Talking"]);
        assert!(report.aggregate(AggregateMethod::Micro, "p_miss@0.15rfa").is_none());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["protocol"], "activity_detection");
        assert_eq!(json["aggregate_metrics"][0]["method"], "mean");
        assert!(ScoringReport::json_schema().unwrap().contains("AlignmentRow"));
    }
}

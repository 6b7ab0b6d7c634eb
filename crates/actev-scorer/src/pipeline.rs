//! The scoring pipeline.
//!
//! ```text
//! instances → cohorts → kernel + alignment per cohort (parallel)
//!           → merge per activity → sweep + metrics per activity (parallel)
//!           → mean / micro aggregates → report
//! ```
//!
//! Partitions share nothing mutable. Results are merged through ordered
//! maps, so the report does not depend on worker scheduling, and the first
//! failing partition fails the whole run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use actev_align::perform_alignment;
use actev_metrics::{
    annotate, mean_component, mean_excluding_nulls, n_mide, names, normalized_auc, sweep,
    target_label, value_at, SweepMetrics, WORST_CASE,
};
use actev_models::{ActivityInstance, Alignment, AlignmentRecord, DetPoint, FileIndex};
use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::config::{ScorerConfig, ScoringParameters};
use crate::error::{ScorerError, ScorerResult};
use crate::logging::RunLogger;
use crate::observability;
use crate::protocol::{Cohort, CohortKey, KernelBuilder, KernelContext, MetricSet};
use crate::report::{
    ActivityMetricRow, AggregateMethod, AggregateMetricRow, AlignmentRow, DetPointRow,
    PairMetricRow, ScoringReport,
};

/// Grid resolution for nAUDC.
const NAUC_SAMPLES: usize = 1000;

/// Extra metric names produced by the pipeline.
pub mod metric_names {
    pub const N_MIDE_REJECTED: &str = "n-mide_num_rejected";
    pub const N_MIDE_MISS: &str = "n-mide_miss";
    pub const N_MIDE_FA: &str = "n-mide_fa";
}

type Record = AlignmentRecord<Arc<ActivityInstance>>;

/// Metrics of one activity (or of pooled records).
#[derive(Debug, Clone, Default)]
struct RecordScores {
    det_points: Vec<DetPoint>,
    metrics: BTreeMap<String, Option<f64>>,
    pair_metrics: Vec<PairMetricRow>,
}

/// Scores system output against references under one protocol.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScorerConfig,
    params: ScoringParameters,
}

impl Scorer {
    pub fn new(config: ScorerConfig, params: ScoringParameters) -> ScorerResult<Self> {
        params.validate()?;
        Ok(Self { config, params })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn params(&self) -> &ScoringParameters {
        &self.params
    }

    /// Run the full pipeline.
    ///
    /// Every instance must hold a valid localization in files present in
    /// `file_index`, and every system instance must carry a presence
    /// confidence.
    pub fn score(
        &self,
        references: Vec<ActivityInstance>,
        systems: Vec<ActivityInstance>,
        file_index: FileIndex,
    ) -> ScorerResult<ScoringReport> {
        let protocol = self.config.protocol;
        let logger = RunLogger::new(protocol.as_str());
        let span = logger.create_span();
        let _guard = span.enter();
        logger.log_start(&format!(
            "{} references, {} system instances, {} files",
            references.len(),
            systems.len(),
            file_index.len()
        ));

        let file_index = Arc::new(file_index);
        let references = self.select(references, &file_index, false)?;
        let systems = self.select(systems, &file_index, true)?;
        let activities = self.activities(&references, &systems);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .thread_name(|i| format!("actev-worker-{}", i))
            .build()
            .map_err(|e| ScorerError::ThreadPool(e.to_string()))?;

        // Alignment
        let started = Instant::now();
        let cohorts = (protocol.cohort_generator())(&references, &systems);
        let build_kernel = protocol.kernel_builder();
        let num_cohorts = cohorts.len();
        let mut solved = info_span!("alignment", cohorts = num_cohorts).in_scope(|| {
            pool.install(|| {
                cohorts
                    .into_par_iter()
                    .map(|(key, cohort)| self.align_cohort(key, cohort, build_kernel, &file_index))
                    .collect::<ScorerResult<Vec<_>>>()
            })
        })?;
        solved.sort_by(|a, b| a.0.cmp(&b.0));
        observability::record_stage("alignment", started.elapsed());
        logger.log_progress(&format!("aligned {} cohorts", num_cohorts));

        let mut by_activity: BTreeMap<String, Alignment<Arc<ActivityInstance>>> = activities
            .iter()
            .map(|a| (a.clone(), Alignment::default()))
            .collect();
        for (key, alignment) in solved {
            let entry = by_activity.entry(key.activity).or_default();
            *entry = std::mem::take(entry).merge(alignment);
        }

        // Metrics
        let started = Instant::now();
        let rate_denominator = file_index.total_minutes();
        let metric_set = protocol.metric_set();
        let records: BTreeMap<&str, Vec<Record>> = by_activity
            .iter()
            .map(|(activity, alignment)| (activity.as_str(), alignment.records().cloned().collect()))
            .collect();
        let metrics_span = info_span!("metrics", activities = records.len());
        let metrics_guard = metrics_span.enter();
        let scores: BTreeMap<&str, RecordScores> = pool.install(|| {
            records
                .par_iter()
                .map(|(activity, records)| -> ScorerResult<_> {
                    let _span = info_span!("activity_metrics", activity = %activity).entered();
                    let scores =
                        self.score_records(activity, records, &file_index, rate_denominator, metric_set)?;
                    Ok((*activity, scores))
                })
                .collect::<ScorerResult<Vec<_>>>()
        })?
        .into_iter()
        .collect();

        let pooled: Vec<Record> = records.values().flatten().cloned().collect();
        let micro = self.score_records("*", &pooled, &file_index, rate_denominator, metric_set)?;
        observability::record_stage("metrics", started.elapsed());
        drop(metrics_guard);

        for (activity, records) in &records {
            if !records.iter().any(|r| r.reference.is_some()) {
                logger.log_warning(&format!("activity {} has no reference instances", activity));
            }
        }

        let mut report = ScoringReport::new(logger.run_id(), protocol);
        for (activity, alignment) in &by_activity {
            report
                .alignments
                .extend(alignment.records().map(|r| AlignmentRow::from_record(activity, r)));
        }
        for (activity, scores) in scores.iter() {
            report
                .det_points
                .extend(scores.det_points.iter().map(|p| DetPointRow::from_point(activity, p)));
            report
                .activity_metrics
                .extend(scores.metrics.iter().map(|(metric, value)| ActivityMetricRow {
                    activity: activity.to_string(),
                    metric: metric.clone(),
                    value: *value,
                }));
            report.pair_metrics.extend(scores.pair_metrics.iter().cloned());
        }
        report.aggregate_metrics = aggregate(&scores, &micro);

        logger.log_completion(&format!(
            "{} activities, {} alignment records",
            by_activity.len(),
            report.alignments.len()
        ));
        Ok(report)
    }

    /// Keep in-scope instances and check them against the file index.
    fn select(
        &self,
        instances: Vec<ActivityInstance>,
        file_index: &FileIndex,
        system: bool,
    ) -> ScorerResult<Vec<Arc<ActivityInstance>>> {
        instances
            .into_iter()
            .filter(|i| self.config.includes(&i.activity))
            .map(|i| -> ScorerResult<_> {
                i.validate()?;
                for file in i.files() {
                    file_index.get(file)?;
                }
                if system {
                    i.confidence()?;
                }
                Ok(Arc::new(i))
            })
            .collect()
    }

    /// Activities to report: the configured list, or everything observed.
    fn activities(
        &self,
        references: &[Arc<ActivityInstance>],
        systems: &[Arc<ActivityInstance>],
    ) -> BTreeSet<String> {
        match &self.config.activities {
            Some(list) => list.clone(),
            None => references
                .iter()
                .chain(systems)
                .map(|i| i.activity.clone())
                .collect(),
        }
    }

    fn align_cohort(
        &self,
        key: CohortKey,
        cohort: Cohort,
        build_kernel: KernelBuilder,
        file_index: &Arc<FileIndex>,
    ) -> ScorerResult<(CohortKey, Alignment<Arc<ActivityInstance>>)> {
        let ctx = KernelContext {
            params: &self.params,
            systems: &cohort.systems,
            file_index,
            object_type_classes: &self.config.object_type_classes,
        };
        let kernel = build_kernel(&ctx)?;
        let alignment = perform_alignment::<_, ActivityInstance, _>(
            &cohort.references,
            &cohort.systems,
            &kernel,
        )?;

        let counts = alignment.counts();
        debug!(
            cohort = %key,
            correct = counts.correct,
            missed = counts.missed,
            false_alarms = counts.false_alarms,
            "Cohort aligned"
        );
        observability::record_cohort(self.config.protocol.as_str(), &counts);
        Ok((key, alignment))
    }

    fn score_records(
        &self,
        activity: &str,
        records: &[Record],
        file_index: &FileIndex,
        rate_denominator: f64,
        metric_set: MetricSet,
    ) -> ScorerResult<RecordScores> {
        let params = &self.params;
        let mut det_points = sweep(records, |s: &Arc<ActivityInstance>| s.confidence())?;
        annotate(
            &mut det_points,
            &SweepMetrics {
                rate_denominator,
                miss_weights: Some(params.miss_weights()),
            },
        );

        let has_references = records.iter().any(|r| r.reference.is_some());
        let mut metrics = BTreeMap::new();
        for &target in &params.rfa_targets {
            for y in [names::P_MISS, names::W_P_MISS] {
                let value = has_references
                    .then(|| value_at(&det_points, names::RATE_FA, y, target, WORST_CASE));
                metrics.insert(target_label(y, target, names::RATE_FA), value);
            }
        }
        let nauc = if has_references {
            normalized_auc(
                &det_points,
                names::RATE_FA,
                names::P_MISS,
                params.nauc_cutoff,
                NAUC_SAMPLES,
            )
        } else {
            None
        };
        metrics.insert(target_label(names::N_AUDC, params.nauc_cutoff, names::RATE_FA), nauc);

        let pairs: Vec<(&ActivityInstance, &ActivityInstance)> = records
            .iter()
            .filter_map(|r| Some((r.reference.as_deref()?, r.system.as_deref()?)))
            .collect();
        let nmide = n_mide(pairs.iter().copied(), file_index, &params.nmide_config())?;
        metrics.insert(names::N_MIDE.to_string(), nmide.value);
        metrics.insert(
            metric_names::N_MIDE_REJECTED.to_string(),
            Some(nmide.num_rejected as f64),
        );

        let mut pair_metrics = Vec::new();
        for ((r, s), pair) in pairs.iter().zip(&nmide.pairs) {
            for (metric, value) in [
                (names::N_MIDE, pair.map(|p| p.cost)),
                (metric_names::N_MIDE_MISS, pair.map(|p| p.miss)),
                (metric_names::N_MIDE_FA, pair.map(|p| p.fa)),
            ] {
                pair_metrics.push(PairMetricRow {
                    activity: activity.to_string(),
                    ref_id: r.activity_id.clone(),
                    sys_id: s.activity_id.clone(),
                    metric: metric.to_string(),
                    value,
                });
            }
        }

        if metric_set.object_detection {
            metrics.insert(
                names::MIN_MODE.to_string(),
                mean_component(records, names::MIN_MODE).value,
            );
        }
        if metric_set.object_tracking {
            metrics.insert(
                names::MIN_MOTE.to_string(),
                mean_component(records, names::MIN_MOTE).value,
            );
        }

        debug!(
            activity,
            det_points = det_points.len(),
            nmide_rejected = nmide.num_rejected,
            "Activity metrics computed"
        );
        Ok(RecordScores {
            det_points,
            metrics,
            pair_metrics,
        })
    }
}

/// Mean over activities (nulls excluded and counted) and micro-averaged
/// rows for every metric name.
fn aggregate(
    per_activity: &BTreeMap<&str, RecordScores>,
    micro: &RecordScores,
) -> Vec<AggregateMetricRow> {
    let metrics: BTreeSet<&str> = per_activity
        .values()
        .flat_map(|s| s.metrics.keys().map(String::as_str))
        .chain(micro.metrics.keys().map(String::as_str))
        .collect();

    let mut rows = Vec::new();
    for metric in metrics {
        let mean = mean_excluding_nulls(
            per_activity
                .values()
                .map(|s| s.metrics.get(metric).copied().flatten()),
        );
        rows.push(AggregateMetricRow {
            method: AggregateMethod::Mean,
            metric: metric.to_string(),
            value: mean.value,
            num_included: mean.num_included,
            num_excluded: mean.num_excluded,
        });

        rows.push(AggregateMetricRow {
            method: AggregateMethod::Micro,
            metric: metric.to_string(),
            value: micro.metrics.get(metric).copied().flatten(),
            num_included: per_activity.len(),
            num_excluded: 0,
        });
    }
    rows
}

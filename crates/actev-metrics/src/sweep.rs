//! Confidence threshold sweep over alignment records.

use actev_models::{AlignmentKind, AlignmentRecord, DetPoint, ModelResult};

use crate::rates::{self, names, MissWeights};

/// Sweep every distinct system confidence, highest first.
///
/// At threshold `t` a correct detection or false alarm counts only if its
/// system confidence is at least `t`; correct detections dropped by the
/// threshold become misses. Returns one point per distinct confidence, in
/// descending threshold order, with counts only (see [`annotate`]).
pub fn sweep<T, F>(records: &[AlignmentRecord<T>], confidence_of: F) -> ModelResult<Vec<DetPoint>>
where
    F: Fn(&T) -> ModelResult<f64>,
{
    let mut cd_confs = Vec::new();
    let mut fa_confs = Vec::new();
    let mut num_md = 0usize;

    for record in records {
        match (record.kind(), &record.system) {
            (AlignmentKind::CorrectDetection, Some(sys)) => cd_confs.push(confidence_of(sys)?),
            (AlignmentKind::FalseAlarm, Some(sys)) => fa_confs.push(confidence_of(sys)?),
            (AlignmentKind::MissedDetection, _) => num_md += 1,
            _ => {}
        }
    }

    let descending = |a: &f64, b: &f64| b.total_cmp(a);
    cd_confs.sort_by(descending);
    fa_confs.sort_by(descending);

    let mut thresholds: Vec<f64> = cd_confs.iter().chain(fa_confs.iter()).copied().collect();
    thresholds.sort_by(descending);
    thresholds.dedup();

    let total_cd = cd_confs.len();
    let (mut num_c, mut num_f) = (0usize, 0usize);
    let points = thresholds
        .into_iter()
        .map(|t| {
            while num_c < cd_confs.len() && cd_confs[num_c] >= t {
                num_c += 1;
            }
            while num_f < fa_confs.len() && fa_confs[num_f] >= t {
                num_f += 1;
            }
            DetPoint::new(t, num_c, num_md + (total_cd - num_c), num_f)
        })
        .collect();

    Ok(points)
}

/// Per-threshold metrics attached to swept points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepMetrics {
    /// Denominator for the false-alarm rate (e.g. scored minutes).
    pub rate_denominator: f64,
    /// Weights for weighted `p_miss`; omitted when `None`.
    pub miss_weights: Option<MissWeights>,
}

/// Fill `p_miss`, `rfa` and optionally `w_p_miss` on every point.
pub fn annotate(points: &mut [DetPoint], metrics: &SweepMetrics) {
    for point in points.iter_mut() {
        let (c, m, f) = (point.num_correct, point.num_miss, point.num_fa);
        point
            .metrics
            .insert(names::P_MISS.to_string(), rates::p_miss(c, m, f));
        point.metrics.insert(
            names::RATE_FA.to_string(),
            rates::rate_fa(f, metrics.rate_denominator),
        );
        if let Some(weights) = metrics.miss_weights {
            point
                .metrics
                .insert(names::W_P_MISS.to_string(), rates::w_p_miss(c, m, f, weights));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actev_models::ComponentMap;
    use proptest::prelude::*;

    fn cd(conf: f64) -> AlignmentRecord<f64> {
        AlignmentRecord::correct(1.0, conf, 1.0, ComponentMap::new())
    }

    fn conf(value: &f64) -> ModelResult<f64> {
        Ok(*value)
    }

    #[test]
    fn test_sweep_counts() {
        let records = vec![
            cd(0.9),
            cd(0.5),
            AlignmentRecord::missed(0.0),
            AlignmentRecord::false_alarm(0.7),
            AlignmentRecord::false_alarm(0.5),
        ];

        let points = sweep(&records, conf).unwrap();
        let summary: Vec<(f64, usize, usize, usize)> = points
            .iter()
            .map(|p| (p.threshold, p.num_correct, p.num_miss, p.num_fa))
            .collect();

        assert_eq!(
            summary,
            vec![(0.9, 1, 2, 0), (0.7, 1, 2, 1), (0.5, 2, 1, 2)]
        );
    }

    #[test]
    fn test_sweep_without_system_output() {
        let records = vec![AlignmentRecord::missed(0.0), AlignmentRecord::missed(0.0)];
        assert!(sweep(&records, conf).unwrap().is_empty());
    }

    #[test]
    fn test_annotate() {
        let records = vec![cd(0.9), AlignmentRecord::missed(0.0), AlignmentRecord::false_alarm(0.3)];
        let mut points = sweep(&records, conf).unwrap();
        annotate(
            &mut points,
            &SweepMetrics {
                rate_denominator: 60.0,
                miss_weights: None,
            },
        );

        assert_eq!(points[0].metric(names::P_MISS), Some(0.5));
        assert_eq!(points[0].metric(names::RATE_FA), Some(0.0));
        assert_eq!(points[1].metric(names::RATE_FA), Some(1.0 / 60.0));
        assert_eq!(points[1].metric(names::W_P_MISS), None);
    }

    proptest! {
        #[test]
        fn prop_sweep_is_monotone(
            cds in prop::collection::vec(0u8..10, 0..12),
            fas in prop::collection::vec(0u8..10, 0..12),
            mds in 0usize..5,
        ) {
            let mut records: Vec<AlignmentRecord<f64>> =
                cds.iter().map(|c| cd(*c as f64 / 10.0)).collect();
            records.extend(fas.iter().map(|c| AlignmentRecord::false_alarm(*c as f64 / 10.0)));
            records.extend((0..mds).map(|_| AlignmentRecord::missed(0.0)));

            let points = sweep(&records, conf).unwrap();
            for pair in points.windows(2) {
                prop_assert!(pair[0].threshold > pair[1].threshold);
                prop_assert!(pair[0].num_correct <= pair[1].num_correct);
                prop_assert!(pair[0].num_fa <= pair[1].num_fa);
            }
            for p in &points {
                prop_assert_eq!(p.num_correct + p.num_miss, cds.len() + mds);
            }
            if let Some(last) = points.last() {
                prop_assert_eq!(last.num_correct, cds.len());
                prop_assert_eq!(last.num_fa, fas.len());
            }
        }
    }
}

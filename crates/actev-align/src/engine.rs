//! Optimal one-to-one alignment of reference and system instances.

use std::borrow::Borrow;

use actev_models::{Alignment, AlignmentRecord, ComponentMap};
use tracing::trace;

use crate::assignment;
use crate::error::AlignResult;
use crate::kernel::{Decision, Kernel};

/// Align `references` with `systems` under `kernel`.
///
/// Every pair is evaluated; the similarity matrix is converted to a
/// minimization problem with cost `M + 1 - similarity` for admissible cells
/// and `M - m + 2` for disallowed cells, where `M` and `m` are the largest and
/// smallest admissible similarities. Admissible costs then lie in
/// `[1, M - m + 1]`, so a disallowed cell always costs strictly more than any
/// admissible one, whatever the sign of the similarities. Disallowed cells stay in the matrix so the solver always has
/// a complete assignment, and any disallowed pair it selects is discarded
/// afterwards. Correct detections are ordered by reference index; misses
/// and false alarms keep input order.
pub fn perform_alignment<T, I, K>(references: &[T], systems: &[T], kernel: &K) -> AlignResult<Alignment<T>>
where
    T: Clone + Borrow<I>,
    I: ?Sized,
    K: Kernel<I> + ?Sized,
{
    let mut evaluations: Vec<Vec<(Decision, ComponentMap)>> = Vec::with_capacity(references.len());
    let mut similarity_range: Option<(f64, f64)> = None;
    for r in references {
        let row = systems
            .iter()
            .map(|s| kernel.evaluate(r.borrow(), s.borrow()))
            .collect::<AlignResult<Vec<_>>>()?;
        for (decision, _) in &row {
            if let Some(score) = decision.score() {
                similarity_range = Some(match similarity_range {
                    Some((lo, hi)) => (lo.min(score), hi.max(score)),
                    None => (score, score),
                });
            }
        }
        evaluations.push(row);
    }

    let mut ref_matched = vec![false; references.len()];
    let mut sys_matched = vec![false; systems.len()];
    let mut alignment = Alignment::default();

    if let Some((min_sim, max_sim)) = similarity_range {
        let disallowed_cost = max_sim - min_sim + 2.0;
        let cost: Vec<Vec<f64>> = evaluations
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(decision, _)| match decision {
                        Decision::Score(s) => max_sim + 1.0 - s,
                        Decision::Disallowed => disallowed_cost,
                    })
                    .collect()
            })
            .collect();

        for (i, j) in assignment::solve(&cost) {
            let (decision, components) = &evaluations[i][j];
            if let Decision::Score(similarity) = decision {
                ref_matched[i] = true;
                sys_matched[j] = true;
                alignment.correct.push(AlignmentRecord::correct(
                    references[i].clone(),
                    systems[j].clone(),
                    *similarity,
                    components.clone(),
                ));
            }
        }
    }

    alignment.missed = references
        .iter()
        .zip(&ref_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(r, _)| AlignmentRecord::missed(r.clone()))
        .collect();
    alignment.false_alarms = systems
        .iter()
        .zip(&sys_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(s, _)| AlignmentRecord::false_alarm(s.clone()))
        .collect();

    trace!(
        references = references.len(),
        systems = systems.len(),
        correct = alignment.correct.len(),
        "alignment solved"
    );

    Ok(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Component, DisallowAll, Filter, LinearCombinationKernel};

    struct Closeness;

    impl Component<i64> for Closeness {
        fn name(&self) -> &str {
            "closeness"
        }

        fn compute(&self, r: &i64, s: &i64, _cache: &mut ComponentMap) -> AlignResult<f64> {
            Ok(1.0 / (1.0 + (r - s).abs() as f64))
        }
    }

    struct AllowedPairs(Vec<(i64, i64)>);

    impl Filter<i64> for AllowedPairs {
        fn name(&self) -> &str {
            "allowed_pairs"
        }

        fn admit(&self, r: &i64, s: &i64, _cache: &mut ComponentMap) -> AlignResult<bool> {
            Ok(self.0.contains(&(*r, *s)))
        }
    }

    #[test]
    fn test_always_false_kernel() {
        let refs = vec![1_i64, 2, 3, 4];
        let syss = vec![2_i64, 4, 8, 16];

        let result = perform_alignment::<i64, i64, _>(&refs, &syss, &DisallowAll).unwrap();
        assert!(result.correct.is_empty());
        assert_eq!(result.missed.len(), 4);
        assert_eq!(result.false_alarms.len(), 4);
        let missed: Vec<i64> = result.missed.iter().filter_map(|r| r.reference).collect();
        assert_eq!(missed, refs);
        let fas: Vec<i64> = result.false_alarms.iter().filter_map(|r| r.system).collect();
        assert_eq!(fas, syss);
    }

    #[test]
    fn test_unsolvable_sub_block_resolves() {
        // Both admissible cells share column 0, so only one can be used.
        let refs = vec![1_i64, 2, 3];
        let syss = vec![10_i64, 20, 30];
        let kernel = LinearCombinationKernel::new(1.0)
            .with_filter(AllowedPairs(vec![(1, 10), (2, 10)]))
            .with_component(Closeness, 1.0);

        let result = perform_alignment(&refs, &syss, &kernel).unwrap();
        assert_eq!(result.correct.len(), 1);
        assert_eq!(result.correct.len() + result.missed.len(), 3);
        assert_eq!(result.correct.len() + result.false_alarms.len(), 3);
        // ref 2 is closer to sys 10
        assert_eq!(result.correct[0].reference, Some(2));
        assert_eq!(result.correct[0].system, Some(10));
    }

    #[test]
    fn test_zero_similarity_pair_beats_disallowed() {
        struct Flat;

        impl Component<i64> for Flat {
            fn name(&self) -> &str {
                "flat"
            }

            fn compute(&self, _r: &i64, _s: &i64, _cache: &mut ComponentMap) -> AlignResult<f64> {
                Ok(0.0)
            }
        }

        let refs = vec![1_i64];
        let syss = vec![10_i64, 20];
        let kernel = LinearCombinationKernel::new(0.0)
            .with_filter(AllowedPairs(vec![(1, 20)]))
            .with_component(Flat, 1.0);

        let result = perform_alignment(&refs, &syss, &kernel).unwrap();
        assert_eq!(result.correct.len(), 1);
        assert_eq!(result.correct[0].reference, Some(1));
        assert_eq!(result.correct[0].system, Some(20));
        assert_eq!(result.correct[0].similarity, Some(0.0));
        assert_eq!(result.false_alarms.len(), 1);
        assert_eq!(result.false_alarms[0].system, Some(10));
    }

    #[test]
    fn test_negative_similarities_still_align() {
        struct Distance;

        impl Component<i64> for Distance {
            fn name(&self) -> &str {
                "distance"
            }

            fn compute(&self, r: &i64, s: &i64, _cache: &mut ComponentMap) -> AlignResult<f64> {
                Ok(-((r - s).abs() as f64))
            }
        }

        let refs = vec![1_i64, 2];
        let syss = vec![10_i64, 20, 30];
        let kernel = LinearCombinationKernel::new(0.0)
            .with_filter(AllowedPairs(vec![(1, 30), (2, 10)]))
            .with_component(Distance, 1.0);

        let result = perform_alignment(&refs, &syss, &kernel).unwrap();
        let pairs: Vec<(i64, i64)> = result
            .correct
            .iter()
            .filter_map(|r| Some((r.reference?, r.system?)))
            .collect();
        assert_eq!(pairs, vec![(1, 30), (2, 10)]);
        assert!(result.missed.is_empty());
        assert_eq!(result.false_alarms.len(), 1);
    }

    #[test]
    fn test_two_admissible_cells_in_3x3() {
        let refs = vec![1_i64, 2, 3];
        let syss = vec![10_i64, 20, 30];
        let kernel = LinearCombinationKernel::new(1.0)
            .with_filter(AllowedPairs(vec![(1, 20), (3, 10)]))
            .with_component(Closeness, 1.0);

        let result = perform_alignment(&refs, &syss, &kernel).unwrap();
        let pairs: Vec<(i64, i64)> = result
            .correct
            .iter()
            .filter_map(|r| Some((r.reference?, r.system?)))
            .collect();
        assert_eq!(pairs, vec![(1, 20), (3, 10)]);
        assert_eq!(result.missed.len(), 1);
        assert_eq!(result.false_alarms.len(), 1);
        assert_eq!(result.missed[0].reference, Some(2));
        assert_eq!(result.false_alarms[0].system, Some(30));
    }

    #[test]
    fn test_maximizes_total_similarity() {
        let refs = vec![10_i64, 20];
        let syss = vec![11_i64, 19];
        let kernel = LinearCombinationKernel::new(1.0).with_component(Closeness, 1.0);

        let result = perform_alignment(&refs, &syss, &kernel).unwrap();
        let pairs: Vec<(i64, i64)> = result
            .correct
            .iter()
            .filter_map(|r| Some((r.reference?, r.system?)))
            .collect();
        assert_eq!(pairs, vec![(10, 11), (20, 19)]);
        assert_eq!(result.correct[0].similarity, Some(1.5));
        assert_eq!(result.correct[0].components["closeness"], 0.5);
    }

    #[test]
    fn test_empty_sides() {
        let kernel = LinearCombinationKernel::new(1.0).with_component(Closeness, 1.0);

        let result = perform_alignment(&[], &[1_i64, 2], &kernel).unwrap();
        assert_eq!(result.false_alarms.len(), 2);
        assert!(result.missed.is_empty());

        let result = perform_alignment(&[1_i64], &[], &kernel).unwrap();
        assert_eq!(result.missed.len(), 1);
        assert!(result.false_alarms.is_empty());
    }
}

//! Queries along a DET curve: interpolated values at target operating
//! points and normalized area under the curve.

use actev_models::DetPoint;

/// Worst-case value for miss-probability style metrics.
pub const WORST_CASE: f64 = 1.0;

/// Label for a value read at a target, e.g. `p_miss@0.15rfa`.
pub fn target_label(y_name: &str, target: f64, x_name: &str) -> String {
    format!("{}@{}{}", y_name, target, x_name)
}

/// Value of `y_name` where `x_name` equals `target`.
///
/// Points are ordered by descending `x`. An exact match returns the best
/// (lowest) `y` observed at that `x`. Otherwise the value is linearly
/// interpolated between the bracketing points; when every observed `x` is
/// above the target, `worst` is returned, and when every observed `x` is
/// below it, the value at the largest `x` is returned. Points lacking
/// either metric are ignored.
pub fn value_at(points: &[DetPoint], x_name: &str, y_name: &str, target: f64, worst: f64) -> f64 {
    let mut curve: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| Some((p.metric(x_name)?, p.metric(y_name)?)))
        .collect();
    curve.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut prev: Option<(f64, f64)> = None;
    for &(x, y) in &curve {
        if x == target {
            return curve
                .iter()
                .filter(|(cx, _)| *cx == target)
                .map(|(_, cy)| *cy)
                .fold(f64::INFINITY, f64::min);
        }
        if x < target {
            return match prev {
                None => y,
                Some((px, py)) => py + (target - px) * (y - py) / (x - px),
            };
        }
        prev = Some((x, y));
    }

    worst
}

/// Normalized area under the curve of `y_name` over `x_name` in
/// `[0, cutoff]`, sampled at `samples + 1` evenly spaced targets and
/// integrated with the trapezoid rule. Targets below every observed `x`
/// take the worst-case value. The result is clamped to `[0, 1]`. Returns
/// `None` for a non-positive cutoff or zero samples.
pub fn normalized_auc(
    points: &[DetPoint],
    x_name: &str,
    y_name: &str,
    cutoff: f64,
    samples: usize,
) -> Option<f64> {
    if !(cutoff > 0.0) || samples == 0 {
        return None;
    }

    let ys: Vec<f64> = (0..=samples)
        .map(|i| {
            let target = cutoff * i as f64 / samples as f64;
            value_at(points, x_name, y_name, target, WORST_CASE)
        })
        .collect();
    // Equal-width trapezoids, already divided by the cutoff.
    let area: f64 = ys.windows(2).map(|w| (w[0] + w[1]) / 2.0).sum::<f64>() / samples as f64;

    Some(area.clamp(0.0, 1.0))
}

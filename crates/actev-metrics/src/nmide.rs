//! Normalized multiple-instance detection error (n-MIDE).
//!
//! For each correctly detected pair, both signals are stripped of a
//! no-score collar around the reference boundaries. The remaining miss and
//! false-alarm areas are normalized, passed through cost functions and
//! averaged over all pairs with a usable normalization.

use actev_models::{ActivityInstance, FileIndex};
use actev_signal::Signal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetricsError, MetricsResult};

/// Monotone cost applied to a normalized error rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostFn {
    /// `weight * rate`
    Linear { weight: f64 },
}

impl CostFn {
    pub fn linear(weight: f64) -> Self {
        CostFn::Linear { weight }
    }

    pub fn apply(&self, rate: f64) -> f64 {
        match self {
            CostFn::Linear { weight } => weight * rate,
        }
    }
}

/// Collar and cost configuration for n-MIDE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NMideConfig {
    /// Collar half-width in seconds, converted to frames per file.
    pub collar_secs: f64,
    pub cost_miss: CostFn,
    pub cost_fa: CostFn,
}

impl Default for NMideConfig {
    fn default() -> Self {
        Self {
            collar_secs: 1.0,
            cost_miss: CostFn::linear(1.0),
            cost_fa: CostFn::linear(1.0),
        }
    }
}

/// Normalized error rates for one correctly detected pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairMide {
    pub miss: f64,
    pub fa: f64,
    pub cost: f64,
}

/// Mean n-MIDE over a set of pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NMideResult {
    /// Mean cost over scored pairs; `None` when nothing could be scored.
    pub value: Option<f64>,
    pub num_scored: usize,
    /// Pairs excluded because a normalization denominator was zero.
    pub num_rejected: usize,
    /// Per-pair rates in input order; `None` marks a rejected pair.
    pub pairs: Vec<Option<PairMide>>,
}

/// Error rates for one pair, or `None` when a denominator is zero.
///
/// Signals are clipped to each file's selected frames. Files absent from
/// the file index are an error.
pub fn pair_mide(
    reference: &ActivityInstance,
    system: &ActivityInstance,
    file_index: &FileIndex,
    config: &NMideConfig,
) -> MetricsResult<Option<PairMide>> {
    if config.collar_secs < 0.0 || !config.collar_secs.is_finite() {
        return Err(MetricsError::invalid_parameter(format!(
            "collar must be a non-negative number of seconds, got {}",
            config.collar_secs
        )));
    }

    let mut files: Vec<&str> = reference.files().chain(system.files()).collect();
    files.sort_unstable();
    files.dedup();

    let (mut miss_num, mut miss_den, mut fa_num, mut fa_den) = (0.0, 0.0, 0.0, 0.0);
    for file in files {
        let info = file_index.get(file)?;
        let selected = &info.selected;
        let ref_sig = &reference.signal_in(file) & selected;
        let sys_sig = &system.signal_in(file) & selected;
        let collar: Signal = &ref_sig.generate_collar(config.collar_secs * info.framerate) & selected;

        let scored_ref = &ref_sig - &collar;
        let scored_sys = &sys_sig - &collar;

        miss_num += (&scored_ref - &scored_sys).area();
        miss_den += scored_ref.area();
        fa_num += (&scored_sys - &scored_ref).area();
        fa_den += info.duration_frames() - (&scored_ref | &collar).area();
    }

    if miss_den <= 0.0 || fa_den <= 0.0 {
        debug!(
            reference = %reference.label(),
            system = %system.label(),
            miss_den,
            fa_den,
            "n-MIDE pair rejected"
        );
        return Ok(None);
    }

    let miss = miss_num / miss_den;
    let fa = fa_num / fa_den;
    Ok(Some(PairMide {
        miss,
        fa,
        cost: config.cost_miss.apply(miss) + config.cost_fa.apply(fa),
    }))
}

/// Mean n-MIDE over correctly detected pairs.
pub fn n_mide<'a, I>(pairs: I, file_index: &FileIndex, config: &NMideConfig) -> MetricsResult<NMideResult>
where
    I: IntoIterator<Item = (&'a ActivityInstance, &'a ActivityInstance)>,
{
    let pairs = pairs
        .into_iter()
        .map(|(r, s)| pair_mide(r, s, file_index, config))
        .collect::<MetricsResult<Vec<_>>>()?;

    let scored: Vec<f64> = pairs.iter().flatten().map(|p| p.cost).collect();
    let num_rejected = pairs.len() - scored.len();
    let value = if scored.is_empty() {
        None
    } else {
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    };

    Ok(NMideResult {
        value,
        num_scored: scored.len(),
        num_rejected,
        pairs,
    })
}

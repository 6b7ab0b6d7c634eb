//! Values a signal can hold at each breakpoint.
//!
//! A level is either a scalar (`f64`) or another signal, which is how
//! spatial-within-temporal localizations are represented without ever
//! materializing dense per-frame or per-pixel grids.

use std::fmt::Debug;

use crate::signal::SparseSignal;

/// A value stored at a signal breakpoint.
///
/// `Default` is the implied level outside a signal's domain (0 for
/// scalars, the empty signal for nested levels).
pub trait Level: Clone + PartialEq + Default + Debug + Send + Sync {
    /// Number of nested signal levels below this one (0 for scalars).
    const DEPTH: usize;

    /// Combine two levels leaf-wise, recursing through nested signals
    /// until `op` can be applied to scalars.
    fn combine(&self, other: &Self, op: &dyn Fn(f64, f64) -> f64) -> Self;

    /// Measure of this level: the scalar itself, or the area of a nested signal.
    fn measure(&self) -> f64;

    /// Whether every scalar leaf of this level is finite.
    fn is_finite(&self) -> bool;
}

impl Level for f64 {
    const DEPTH: usize = 0;

    fn combine(&self, other: &Self, op: &dyn Fn(f64, f64) -> f64) -> Self {
        op(*self, *other)
    }

    fn measure(&self) -> f64 {
        *self
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl<L: Level> Level for SparseSignal<L> {
    const DEPTH: usize = L::DEPTH + 1;

    fn combine(&self, other: &Self, op: &dyn Fn(f64, f64) -> f64) -> Self {
        self.join(other, |a, b| a.combine(b, op), L::default())
    }

    fn measure(&self) -> f64 {
        self.area()
    }

    fn is_finite(&self) -> bool {
        self.points()
            .iter()
            .all(|(key, level)| key.is_finite() && level.is_finite())
    }
}

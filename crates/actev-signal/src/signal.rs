//! Run-length compressed step functions.
//!
//! A [`SparseSignal`] stores only the breakpoints where its level changes.
//! Between breakpoints the level is constant (right-continuous), and before
//! the first breakpoint the level is the [`Level`] default. Every binary
//! operation is derived from [`SparseSignal::join`], which preserves the
//! canonical form: keys strictly increasing, no two consecutive stored
//! levels equal, first stored level never equal to the default.

use std::cmp::Ordering;
use std::ops::{Add, BitAnd, BitOr, Sub};

use serde::Serialize;

use crate::error::{SignalError, SignalResult};
use crate::level::Level;

/// Sparse step function from a numeric coordinate to a [`Level`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SparseSignal<L: Level = f64> {
    points: Vec<(f64, L)>,
}

/// One-dimensional signal (frame → level, or coordinate → level).
pub type Signal = SparseSignal<f64>;

/// Two-dimensional signal (x → y → level), e.g. a bounding box region.
pub type SpatialSignal = SparseSignal<Signal>;

/// Spatial signal per frame (frame → x → y → level), e.g. an object track.
pub type TrackSignal = SparseSignal<SpatialSignal>;

impl<L: Level> SparseSignal<L> {
    /// Create an empty signal.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a signal from unordered breakpoints.
    ///
    /// Keys are sorted and redundant breakpoints are dropped. Keys must be
    /// finite and unique, and every scalar level must be finite.
    pub fn from_points<I>(points: I) -> SignalResult<Self>
    where
        I: IntoIterator<Item = (f64, L)>,
    {
        let mut raw: Vec<(f64, L)> = points.into_iter().collect();
        if let Some((key, _)) = raw.iter().find(|(k, _)| !k.is_finite()) {
            return Err(SignalError::NonFiniteKey(*key));
        }
        if let Some((key, _)) = raw.iter().find(|(_, level)| !level.is_finite()) {
            return Err(SignalError::NonFiniteLevel(*key));
        }
        raw.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = raw.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(SignalError::DuplicateKey(pair[0].0));
        }
        Ok(Self::compress(raw))
    }

    /// Signal holding `level` on `[start, end)` and the default elsewhere.
    pub fn segment(start: f64, end: f64, level: L) -> SignalResult<Self> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(SignalError::InvalidSegment { start, end });
        }
        if !level.is_finite() {
            return Err(SignalError::NonFiniteLevel(start));
        }
        Ok(Self::compress(vec![(start, level), (end, L::default())]))
    }

    fn compress(raw: Vec<(f64, L)>) -> Self {
        let mut points: Vec<(f64, L)> = Vec::with_capacity(raw.len());
        let mut last = L::default();
        for (key, level) in raw {
            if level != last {
                last = level.clone();
                points.push((key, level));
            }
        }
        Self { points }
    }

    /// Stored breakpoints in increasing key order.
    pub fn points(&self) -> &[(f64, L)] {
        &self.points
    }

    /// Breakpoint keys in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last breakpoint keys.
    pub fn extent(&self) -> Option<(f64, f64)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.0, last.0)),
            _ => None,
        }
    }

    /// Forward-filled level at `key`.
    pub fn value_at(&self, key: f64) -> L {
        let idx = self.points.partition_point(|(k, _)| *k <= key);
        if idx == 0 {
            L::default()
        } else {
            self.points[idx - 1].1.clone()
        }
    }

    /// Merge the breakpoints of two signals and apply `op` at each one.
    ///
    /// Each operand carries its last seen level forward, starting from
    /// `default`. A breakpoint is emitted only when the result differs from
    /// the previously emitted level.
    pub fn join<F>(&self, other: &Self, op: F, default: L) -> Self
    where
        F: Fn(&L, &L) -> L,
    {
        let (a, b) = (&self.points, &other.points);
        let mut out: Vec<(f64, L)> = Vec::with_capacity(a.len() + b.len());
        let mut a_val = default.clone();
        let mut b_val = default;
        let mut last = L::default();
        let (mut i, mut j) = (0, 0);

        while i < a.len() || j < b.len() {
            let key = match (a.get(i), b.get(j)) {
                (Some(x), Some(y)) => match x.0.total_cmp(&y.0) {
                    Ordering::Greater => y.0,
                    _ => x.0,
                },
                (Some(x), None) => x.0,
                (None, Some(y)) => y.0,
                (None, None) => break,
            };
            if i < a.len() && a[i].0 == key {
                a_val = a[i].1.clone();
                i += 1;
            }
            if j < b.len() && b[j].0 == key {
                b_val = b[j].1.clone();
                j += 1;
            }

            let level = op(&a_val, &b_val);
            if level != last {
                last = level.clone();
                out.push((key, level));
            }
        }

        Self { points: out }
    }

    /// Apply `op` to the scalar leaves of both signals, recursing through
    /// every nested level.
    pub fn join_leaves<F>(&self, other: &Self, op: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        Level::combine(self, other, &op)
    }

    /// Pointwise sum.
    pub fn add(&self, other: &Self) -> Self {
        self.join_leaves(other, |a, b| a + b)
    }

    /// Pointwise minimum.
    pub fn intersect(&self, other: &Self) -> Self {
        self.join_leaves(other, f64::min)
    }

    /// Pointwise maximum.
    pub fn union(&self, other: &Self) -> Self {
        self.join_leaves(other, f64::max)
    }

    /// Set difference: the part of `self` not covered by `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.join_leaves(&self.intersect(other), |a, b| a - b)
    }

    /// Multiply every scalar leaf by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        self.join_leaves(&Self::new(), |a, _| a * factor)
    }

    /// Re-emit the signal in canonical run-length form.
    pub fn normalize(&self) -> Self {
        self.add(&Self::new())
    }

    /// Integral under the step function, recursing into nested levels.
    ///
    /// The level after the last breakpoint does not contribute.
    pub fn area(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * w[0].1.measure())
            .sum()
    }

    /// Lazily iterate over integer frames in `[start, end)` with the
    /// forward-filled level at each frame (`default` before any breakpoint).
    pub fn iterate_by_frame(&self, start: i64, end: i64, default: L) -> FrameIter<'_, L> {
        FrameIter {
            points: &self.points,
            cursor: 0,
            next_frame: start,
            end,
            current: default,
        }
    }

    /// Breakpoints whose level satisfies `predicate`.
    pub fn on_steps<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = (f64, &'a L)> + 'a
    where
        P: Fn(&L) -> bool + 'a,
    {
        self.points
            .iter()
            .filter(move |(_, level)| predicate(level))
            .map(|(k, level)| (*k, level))
    }
}

impl Signal {
    /// Union of `[k - size, k + size)` windows around every breakpoint.
    ///
    /// Used as a no-score buffer around segment edges. A non-positive
    /// size yields the empty signal.
    pub fn generate_collar(&self, size: f64) -> Signal {
        if !(size > 0.0) {
            return Signal::new();
        }
        self.normalize()
            .keys()
            .filter_map(|k| Signal::segment(k - size, k + size, 1.0).ok())
            .fold(Signal::new(), |acc, window| acc.union(&window))
            .normalize()
    }
}

impl SpatialSignal {
    /// Region covered by an axis-aligned box with top-left `(x, y)`.
    pub fn from_bbox(x: f64, y: f64, width: f64, height: f64) -> SignalResult<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(SignalError::invalid_box(format!(
                "width and height must be positive, got {}x{}",
                width, height
            )));
        }
        let column = Signal::segment(y, y + height, 1.0)?;
        Self::segment(x, x + width, column)
    }
}

/// Iterator returned by [`SparseSignal::iterate_by_frame`].
///
/// Cloning captures the current position; calling `iterate_by_frame` again
/// yields a fresh pass over the same frames.
#[derive(Debug, Clone)]
pub struct FrameIter<'a, L: Level> {
    points: &'a [(f64, L)],
    cursor: usize,
    next_frame: i64,
    end: i64,
    current: L,
}

impl<L: Level> Iterator for FrameIter<'_, L> {
    type Item = (i64, L);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_frame >= self.end {
            return None;
        }
        let frame = self.next_frame;
        while self.cursor < self.points.len() && self.points[self.cursor].0 <= frame as f64 {
            self.current = self.points[self.cursor].1.clone();
            self.cursor += 1;
        }
        self.next_frame += 1;
        Some((frame, self.current.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next_frame).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a, L: Level> Add<&'a SparseSignal<L>> for &'a SparseSignal<L> {
    type Output = SparseSignal<L>;

    fn add(self, rhs: &'a SparseSignal<L>) -> SparseSignal<L> {
        SparseSignal::add(self, rhs)
    }
}

impl<'a, L: Level> BitAnd<&'a SparseSignal<L>> for &'a SparseSignal<L> {
    type Output = SparseSignal<L>;

    fn bitand(self, rhs: &'a SparseSignal<L>) -> SparseSignal<L> {
        self.intersect(rhs)
    }
}

impl<'a, L: Level> BitOr<&'a SparseSignal<L>> for &'a SparseSignal<L> {
    type Output = SparseSignal<L>;

    fn bitor(self, rhs: &'a SparseSignal<L>) -> SparseSignal<L> {
        self.union(rhs)
    }
}

impl<'a, L: Level> Sub<&'a SparseSignal<L>> for &'a SparseSignal<L> {
    type Output = SparseSignal<L>;

    fn sub(self, rhs: &'a SparseSignal<L>) -> SparseSignal<L> {
        self.difference(rhs)
    }
}

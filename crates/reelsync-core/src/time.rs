//! Time ranges and buffered-range bookkeeping.
//!
//! All times are seconds as `f64`. Ranges are half-open `[start, end)`.
//! `RangeSet` is the representation of a media handle's buffered regions:
//! ordered, non-overlapping, and coalescing on insert.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Tolerance when coalescing adjacent ranges and comparing times.
pub const EPSILON: f64 = 1e-6;

/// A time range with inclusive start and exclusive end, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: f64,
    /// End time (exclusive)
    pub end: f64,
}

impl TimeRange {
    /// Create a new time range from start and end times.
    #[inline]
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Duration of the range (zero for inverted ranges).
    #[inline]
    pub fn duration(self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Check if the range covers no time.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.end - self.start <= EPSILON
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// Check if two ranges overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Compute the intersection of two ranges, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end - start > EPSILON {
            Some(Self { start, end })
        } else {
            None
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}s, {:.3}s)", self.start, self.end)
    }
}

/// An ordered set of non-overlapping time ranges.
///
/// Mirrors the buffered-ranges surface a media element reports: insertion
/// merges overlapping or touching ranges, so the set stays normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeSet {
    ranges: SmallVec<[TimeRange; 4]>,
}

impl RangeSet {
    /// Create an empty range set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of disjoint ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterate the ranges in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TimeRange> + '_ {
        self.ranges.iter().copied()
    }

    /// Insert a range, merging with any overlapping or adjacent ranges.
    pub fn insert(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        let mut merged = range;
        let mut out: SmallVec<[TimeRange; 4]> = SmallVec::new();
        for &r in &self.ranges {
            if r.end + EPSILON >= merged.start && merged.end + EPSILON >= r.start {
                merged.start = merged.start.min(r.start);
                merged.end = merged.end.max(r.end);
            } else {
                out.push(r);
            }
        }
        let pos = out
            .iter()
            .position(|r| r.start > merged.start)
            .unwrap_or(out.len());
        out.insert(pos, merged);
        self.ranges = out;
    }

    /// Check if a time is covered by any range.
    pub fn contains(&self, time: f64) -> bool {
        self.ranges.iter().any(|r| r.contains(time))
    }

    /// Restrict the set to the given window.
    pub fn intersect(&self, window: TimeRange) -> Self {
        let mut out = Self::new();
        for r in self.iter() {
            if let Some(overlap) = r.intersection(window) {
                out.ranges.push(overlap);
            }
        }
        out
    }

    /// Length of the contiguous covered run starting at `time`.
    ///
    /// Returns 0.0 when `time` is not inside any range. A small tolerance is
    /// applied at the range start so a query exactly at a reported boundary
    /// still counts as covered.
    pub fn contiguous_from(&self, time: f64) -> f64 {
        for r in self.iter() {
            if time >= r.start - EPSILON && time < r.end {
                return r.end - time;
            }
        }
        0.0
    }

    /// Remove all ranges.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

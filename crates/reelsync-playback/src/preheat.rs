//! Preheat classification and the standard wait conditions.
//!
//! Each tick the orchestration layer classifies every known segment as
//! visible (playhead inside its window), upcoming (starting within the
//! lookahead horizon), or idle (evict-eligible). The correctness property:
//! a segment reaches Ready and is seeked to its start before the playhead
//! reaches that start — otherwise the wait condition registered here stalls
//! the clock instead of letting a blank stream play.

use crate::clock::{SegmentRegistration, WaitCondition};
use crate::pool::{ResourcePool, ResourceStatus};
use parking_lot::Mutex;
use reelsync_core::SegmentId;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Scheduling phase of a segment relative to the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    /// Playhead is inside the segment's timeline window: must be playing
    /// and drift-corrected.
    Visible,
    /// Starts within the lookahead horizon: must be Ready and pre-seeked,
    /// but paused.
    Upcoming,
    /// Outside both windows: eviction candidate.
    Idle,
}

/// Classify one segment at clock time `t`.
pub fn classify(reg: &SegmentRegistration, t: f64, lookahead: f64) -> SegmentPhase {
    if t >= reg.timeline_start && t < reg.timeline_end {
        SegmentPhase::Visible
    } else if t < reg.timeline_start && reg.timeline_start - t <= lookahead {
        SegmentPhase::Upcoming
    } else {
        SegmentPhase::Idle
    }
}

/// Phase partition of all registered segments at one clock time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreheatPlan {
    pub visible: Vec<SegmentId>,
    pub upcoming: Vec<SegmentId>,
    pub idle: Vec<SegmentId>,
}

impl PreheatPlan {
    /// Partition `segments` by phase at clock time `t`.
    ///
    /// Overlapping visible segments (compositing/transition cases) all land
    /// in the visible set; wait predicates iterate the full set.
    pub fn build<'a>(
        segments: impl IntoIterator<Item = &'a SegmentRegistration>,
        t: f64,
        lookahead: f64,
    ) -> Self {
        let mut plan = Self::default();
        for reg in segments {
            match classify(reg, t, lookahead) {
                SegmentPhase::Visible => plan.visible.push(reg.segment_id),
                SegmentPhase::Upcoming => plan.upcoming.push(reg.segment_id),
                SegmentPhase::Idle => plan.idle.push(reg.segment_id),
            }
        }
        plan
    }

    /// Segments that should stay resident (visible + upcoming).
    pub fn keep_set(&self) -> std::collections::HashSet<SegmentId> {
        self.visible
            .iter()
            .chain(self.upcoming.iter())
            .copied()
            .collect()
    }
}

/// Wraps a predicate with the bounded-wait rule: after `timeout_secs` of
/// continuous blocking the condition gives up and stops stalling the clock,
/// leaving the stream degraded rather than blocking forever.
fn bounded(
    label: String,
    timeout_secs: f64,
    check: impl Fn() -> bool + Send + 'static,
) -> impl Fn() -> bool + Send + 'static {
    let blocked_since: Mutex<Option<Instant>> = Mutex::new(None);
    move || {
        if check() {
            *blocked_since.lock() = None;
            return true;
        }
        let mut since = blocked_since.lock();
        let start = *since.get_or_insert_with(Instant::now);
        if start.elapsed().as_secs_f64() >= timeout_secs {
            warn!(condition = %label, timeout_secs, "readiness wait exceeded bound, degrading");
            return true;
        }
        false
    }
}

/// Wait condition: every visible segment must be Ready.
///
/// Registered under a stable id so re-registering on each visible-set change
/// replaces the previous condition.
pub fn visible_ready_condition(
    pool: &Arc<Mutex<ResourcePool>>,
    visible: Vec<SegmentId>,
    timeout_secs: f64,
) -> WaitCondition {
    let pool = pool.clone();
    WaitCondition::new(
        "visible-ready",
        "visible stream is still loading",
        bounded("visible-ready".to_string(), timeout_secs, move || {
            let pool = pool.lock();
            visible
                .iter()
                .all(|&id| pool.status(id) == Some(ResourceStatus::Ready))
        }),
    )
}

/// Wait condition: every upcoming segment must be Ready and pre-seeked to
/// its target start within `tolerance`.
pub fn upcoming_seeked_condition(
    pool: &Arc<Mutex<ResourcePool>>,
    upcoming: Vec<(SegmentId, f64)>,
    tolerance: f64,
    timeout_secs: f64,
) -> WaitCondition {
    let pool = pool.clone();
    WaitCondition::new(
        "upcoming-seeked",
        "next stream is not prepared",
        bounded("upcoming-seeked".to_string(), timeout_secs, move || {
            let pool = pool.lock();
            upcoming.iter().all(|&(id, target)| {
                pool.status(id) == Some(ResourceStatus::Ready)
                    && pool.is_seeked(id, target, tolerance)
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(start: f64, end: f64) -> SegmentRegistration {
        SegmentRegistration {
            segment_id: SegmentId::new(),
            timeline_start: start,
            timeline_end: end,
            source_in: 0.0,
        }
    }

    #[test]
    fn classify_by_playhead_position() {
        let r = reg(10.0, 12.0);
        assert_eq!(classify(&r, 10.0, 1.5), SegmentPhase::Visible);
        assert_eq!(classify(&r, 11.999, 1.5), SegmentPhase::Visible);
        assert_eq!(classify(&r, 12.0, 1.5), SegmentPhase::Idle);
        assert_eq!(classify(&r, 9.0, 1.5), SegmentPhase::Upcoming);
        assert_eq!(classify(&r, 8.0, 1.5), SegmentPhase::Idle);
    }

    #[test]
    fn plan_partitions_all_segments() {
        let segments = [reg(0.0, 2.0), reg(2.0, 4.0), reg(30.0, 32.0)];
        let plan = PreheatPlan::build(segments.iter(), 0.5, 1.5);
        assert_eq!(plan.visible, vec![segments[0].segment_id]);
        assert_eq!(plan.upcoming, vec![segments[1].segment_id]);
        assert_eq!(plan.idle, vec![segments[2].segment_id]);
        assert_eq!(plan.keep_set().len(), 2);
    }

    #[test]
    fn overlapping_segments_are_both_visible() {
        let a = reg(0.0, 5.0);
        let b = reg(4.0, 8.0);
        let plan = PreheatPlan::build([a, b].iter(), 4.5, 1.5);
        assert_eq!(plan.visible.len(), 2);
    }

    #[test]
    fn bounded_predicate_degrades_after_timeout() {
        let check = bounded("test".to_string(), 0.0, || false);
        // Zero bound: degrades on the first blocked evaluation.
        assert!(check());
        assert!(check());
    }

    #[test]
    fn bounded_predicate_resets_when_satisfied() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let gate = Arc::new(AtomicBool::new(true));
        let g = gate.clone();
        let check = bounded("test".to_string(), 60.0, move || g.load(Ordering::SeqCst));
        assert!(check());
        gate.store(false, Ordering::SeqCst);
        // Within the bound: blocks again rather than staying degraded.
        assert!(!check());
    }
}

//! Playback clock: the single source of truth for "now".
//!
//! Driven by a periodic scheduler callback with variable elapsed time (a
//! timer or a render-loop hook, never assumed fixed-rate). Registered wait
//! conditions block time advancement cooperatively: while any predicate is
//! false the clock keeps rescheduling without advancing, which is how "a
//! stream is not ready yet" turns into a stall instead of a blank frame.
//!
//! State machine: Paused → Playing → (Waiting ⇄ Playing) → Paused | Ended.

use crate::pool::SyncTarget;
use reelsync_core::{PlayerConfig, SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Placement of a segment on the timeline, independent of whether a resource
/// currently exists for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentRegistration {
    pub segment_id: SegmentId,
    /// Timeline start, in seconds (inclusive).
    pub timeline_start: f64,
    /// Timeline end, in seconds (exclusive).
    pub timeline_end: f64,
    /// Source time corresponding to `timeline_start`.
    pub source_in: f64,
}

impl SegmentRegistration {
    /// Target source time for this segment at clock time `t`, if `t` falls
    /// inside the segment's timeline window.
    pub fn target_at(&self, t: f64) -> Option<f64> {
        if t >= self.timeline_start && t < self.timeline_end {
            Some(self.source_in + (t - self.timeline_start))
        } else {
            None
        }
    }
}

/// A named predicate that must hold for the clock to advance.
pub struct WaitCondition {
    pub id: String,
    /// Human-readable explanation surfaced to waiting listeners.
    pub reason: String,
    pub predicate: Box<dyn Fn() -> bool + Send>,
}

impl WaitCondition {
    /// Build a condition from a closure.
    pub fn new(
        id: impl Into<String>,
        reason: impl Into<String>,
        predicate: impl Fn() -> bool + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
            predicate: Box::new(predicate),
        }
    }
}

type TimeListener = Box<dyn FnMut(f64, bool) + Send>;
type WaitingListener = Box<dyn FnMut(bool, Option<&str>) + Send>;
type SyncSink = Box<dyn FnMut(&[SyncTarget]) + Send>;

/// Single authoritative playback clock for one session.
pub struct PlaybackClock {
    config: PlayerConfig,
    current_time: f64,
    duration: f64,
    playback_rate: f64,
    playing: bool,
    waiting: bool,
    ended: bool,
    /// Wall time of the last advancing or baseline-resetting tick.
    last_tick: Option<f64>,
    /// Wall time accumulated toward the next drift-correction pass.
    /// Independent of `playback_rate`.
    sync_accum: f64,
    registered: HashMap<SegmentId, SegmentRegistration>,
    wait_conditions: HashMap<String, WaitCondition>,
    time_listeners: HashMap<String, TimeListener>,
    waiting_listeners: HashMap<String, WaitingListener>,
    sync_sink: Option<SyncSink>,
}

impl PlaybackClock {
    /// Create a paused clock at time zero.
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            current_time: 0.0,
            duration: 0.0,
            playback_rate: 1.0,
            playing: false,
            waiting: false,
            ended: false,
            last_tick: None,
            sync_accum: 0.0,
            registered: HashMap::new(),
            wait_conditions: HashMap::new(),
            time_listeners: HashMap::new(),
            waiting_listeners: HashMap::new(),
            sync_sink: None,
        }
    }

    // ── State queries ──────────────────────────────────────────────

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True while any registered wait condition is unsatisfied.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// True after the clock ran off the end of the timeline.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    // ── Transport controls ─────────────────────────────────────────

    /// Start playback. At the end of the timeline this loops back to zero
    /// before starting.
    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        if self.current_time >= self.duration {
            self.current_time = 0.0;
        }
        self.ended = false;
        self.playing = true;
        self.last_tick = None;
        debug!(time = self.current_time, "clock play");
        self.notify_time();
    }

    /// Stop playback. Takes effect immediately, including mid-wait.
    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.last_tick = None;
        if self.waiting {
            self.waiting = false;
            self.notify_waiting(false, None);
        }
        debug!(time = self.current_time, "clock pause");
        self.notify_time();
    }

    /// Jump to a time, clamped to `[0, duration]`. Notifies listeners but
    /// does not touch the pool; callers needing an immediate re-seek of
    /// streams invoke the pool's sync routine explicitly.
    pub fn seek(&mut self, time: f64) {
        self.current_time = time.clamp(0.0, self.duration);
        if self.current_time < self.duration {
            self.ended = false;
        }
        self.last_tick = None;
        self.notify_time();
    }

    /// Set the timeline duration, clamping the current time into range.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.current_time = self.current_time.min(self.duration);
    }

    /// Set the playback rate, clamped to the configured range.
    pub fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = self.config.clamp_rate(rate);
    }

    /// Return to the initial state, keeping listeners but dropping segment
    /// registrations and wait conditions (project change).
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.duration = 0.0;
        self.playback_rate = 1.0;
        self.playing = false;
        self.waiting = false;
        self.ended = false;
        self.last_tick = None;
        self.sync_accum = 0.0;
        self.registered.clear();
        self.wait_conditions.clear();
    }

    // ── Scheduler tick ─────────────────────────────────────────────

    /// Advance the clock. `now` is monotonic wall time in seconds; the
    /// elapsed interval is derived from the previous tick, so scheduling
    /// cadence may vary freely.
    ///
    /// Returns false when tick scheduling should stop (paused or ended).
    pub fn tick(&mut self, now: f64) -> bool {
        if !self.playing {
            self.last_tick = None;
            return false;
        }

        // Wait conditions gate advancement. While blocked, keep resetting
        // the elapsed baseline so the stall never turns into a time jump.
        if let Some(reason) = self.first_unsatisfied() {
            self.last_tick = Some(now);
            if !self.waiting {
                self.waiting = true;
                debug!(%reason, "clock waiting");
                self.notify_waiting(true, Some(&reason));
            }
            return true;
        }

        if self.waiting {
            self.waiting = false;
            self.notify_waiting(false, None);
            self.last_tick = Some(now);
            // The consumer may have paused during the stall; that must win.
            if !self.playing {
                self.last_tick = None;
                return false;
            }
            return true;
        }

        let elapsed = match self.last_tick {
            Some(prev) => (now - prev).max(0.0),
            None => 0.0,
        };
        self.last_tick = Some(now);

        self.current_time += elapsed * self.playback_rate;
        trace!(time = self.current_time, elapsed, "clock tick");

        if self.current_time >= self.duration {
            self.current_time = self.duration;
            self.playing = false;
            self.ended = true;
            debug!("clock ended");
            self.notify_time();
            return false;
        }

        // Drift correction runs on wall time, independent of playback rate.
        self.sync_accum += elapsed;
        if self.sync_accum >= self.config.sync_check_interval {
            self.sync_accum = 0.0;
            let corrections = self.corrections_at(self.current_time);
            if !corrections.is_empty() {
                if let Some(sink) = self.sync_sink.as_mut() {
                    sink(&corrections);
                }
            }
        }

        self.notify_time();
        true
    }

    fn first_unsatisfied(&self) -> Option<String> {
        self.wait_conditions
            .values()
            .find(|c| !(c.predicate)())
            .map(|c| c.reason.clone())
    }

    fn notify_time(&mut self) {
        let (time, playing) = (self.current_time, self.playing);
        for listener in self.time_listeners.values_mut() {
            listener(time, playing);
        }
    }

    fn notify_waiting(&mut self, waiting: bool, reason: Option<&str>) {
        for listener in self.waiting_listeners.values_mut() {
            listener(waiting, reason);
        }
    }

    // ── Segment registration & corrections ─────────────────────────

    /// Replace the set of registered segments.
    pub fn register_segments(&mut self, segments: &[SegmentRegistration]) {
        self.registered = segments.iter().map(|s| (s.segment_id, *s)).collect();
    }

    /// Registration for one segment, if present.
    pub fn registration(&self, segment_id: SegmentId) -> Option<&SegmentRegistration> {
        self.registered.get(&segment_id)
    }

    /// All registered segments.
    pub fn registrations(&self) -> impl Iterator<Item = &SegmentRegistration> {
        self.registered.values()
    }

    /// Target source times for every segment whose timeline window contains
    /// `t`. Segments outside their window are not corrected.
    pub fn corrections_at(&self, t: f64) -> Vec<SyncTarget> {
        self.registered
            .values()
            .filter_map(|reg| {
                reg.target_at(t).map(|target| SyncTarget {
                    segment_id: reg.segment_id,
                    target,
                })
            })
            .collect()
    }

    /// Install the correction sink the tick pushes into (the pool's
    /// `sync_correct`, in a wired session).
    pub fn set_sync_sink(&mut self, sink: impl FnMut(&[SyncTarget]) + Send + 'static) {
        self.sync_sink = Some(Box::new(sink));
    }

    // ── Listeners & wait conditions ────────────────────────────────

    /// Register a wait condition, replacing any with the same id.
    pub fn add_wait_condition(&mut self, condition: WaitCondition) {
        self.wait_conditions
            .insert(condition.id.clone(), condition);
    }

    /// Remove a wait condition by id.
    pub fn remove_wait_condition(&mut self, id: &str) {
        self.wait_conditions.remove(id);
    }

    /// Number of registered wait conditions.
    pub fn wait_condition_count(&self) -> usize {
        self.wait_conditions.len()
    }

    /// Register a time listener called as `(current_time, is_playing)`.
    pub fn add_listener(
        &mut self,
        id: impl Into<String>,
        listener: impl FnMut(f64, bool) + Send + 'static,
    ) {
        self.time_listeners.insert(id.into(), Box::new(listener));
    }

    /// Remove a time listener by id.
    pub fn remove_listener(&mut self, id: &str) {
        self.time_listeners.remove(id);
    }

    /// Register a waiting listener called as `(is_waiting, reason)`.
    pub fn add_waiting_listener(
        &mut self,
        id: impl Into<String>,
        listener: impl FnMut(bool, Option<&str>) + Send + 'static,
    ) {
        self.waiting_listeners.insert(id.into(), Box::new(listener));
    }

    /// Remove a waiting listener by id.
    pub fn remove_waiting_listener(&mut self, id: &str) {
        self.waiting_listeners.remove(id);
    }
}

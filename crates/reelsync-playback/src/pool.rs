//! Resource pool: bounded-residency cache of media handles.
//!
//! One handle per materialized timeline segment. The pool is a cache, not an
//! index of truth: segments the orchestration layer still needs but that were
//! evicted must be recreated on demand. All mutation goes through the pool;
//! the clock only reads readiness through wait-condition predicates and
//! writes corrections through [`ResourcePool::sync_correct`].

use crate::events::{EventHub, PoolEvent, PoolEventKind};
use crossbeam_channel::Receiver;
use reelsync_core::{PlaybackError, PlayerConfig, Result, SegmentId, SourceId, TimeRange};
use reelsync_media::{
    HandleEvent, ManifestResolver, MediaHandle, MediaOpener, MediaSource, TransportKind,
    TransportProbe,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load state of a pooled resource.
///
/// Transitions are monotone: `Loading → Ready`, `Loading → Error`, or
/// destruction. A handle never goes back to `Loading`; an `Error` handle is
/// never retried by the pool — the orchestration layer destroys and
/// recreates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Loading,
    Ready,
    Error,
}

/// Everything needed to materialize a segment's resource.
#[derive(Debug, Clone)]
pub struct SegmentSpec {
    /// Timeline segment this resource belongs to.
    pub segment_id: SegmentId,
    /// Underlying media asset.
    pub source: MediaSource,
    /// Start of the played portion, in source time (inclusive).
    pub in_point: f64,
    /// End of the played portion, in source time (exclusive).
    pub out_point: f64,
    /// Secondary/background footage: muted in the mix, delivered
    /// progressively. Does not affect eviction order.
    pub is_low_priority: bool,
}

/// One materialized segment resource.
pub struct ResourceHandle {
    segment_id: SegmentId,
    source_id: SourceId,
    transport: TransportKind,
    handle: Box<dyn MediaHandle>,
    status: ResourceStatus,
    in_point: f64,
    out_point: f64,
    last_access: u64,
    is_low_priority: bool,
    created_wall: Instant,
    timeout_reported: bool,
}

impl ResourceHandle {
    /// Segment this resource plays.
    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    /// Asset the handle was opened on.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Delivery mode decided at creation.
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Current load state.
    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    /// Portion of the source this segment plays.
    pub fn source_window(&self) -> TimeRange {
        TimeRange::new(self.in_point, self.out_point)
    }

    /// Whether this is background footage.
    pub fn is_low_priority(&self) -> bool {
        self.is_low_priority
    }

    /// Monotonic touch stamp driving LRU order.
    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    /// Current position of the underlying handle, in source time.
    pub fn current_time(&self) -> f64 {
        self.handle.current_time()
    }

    /// Whether the underlying handle is playing.
    pub fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }

    fn segment_len(&self) -> f64 {
        (self.out_point - self.in_point).max(0.0)
    }

    /// Contiguous buffered seconds usable from the segment's in point.
    fn buffered_from_in_point(&self) -> f64 {
        self.handle
            .buffered()
            .intersect(self.source_window())
            .contiguous_from(self.in_point)
    }
}

/// Bounded-residency cache of media handles keyed by segment id.
pub struct ResourcePool {
    config: PlayerConfig,
    opener: Box<dyn MediaOpener>,
    probe: TransportProbe,
    handles: HashMap<SegmentId, ResourceHandle>,
    access_counter: u64,
    events: EventHub,
}

impl ResourcePool {
    /// Create a pool around an opener and a manifest resolver.
    pub fn new(
        config: PlayerConfig,
        opener: Box<dyn MediaOpener>,
        resolver: Arc<dyn ManifestResolver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            opener,
            probe: TransportProbe::new(resolver),
            handles: HashMap::new(),
            access_counter: 0,
            events: EventHub::new(),
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Availability probe, for batching checks ahead of bulk creation.
    pub fn probe(&self) -> &TransportProbe {
        &self.probe
    }

    /// Subscribe to pool events by name.
    pub fn subscribe(&mut self, name: impl Into<String>) -> Receiver<PoolEvent> {
        self.events.subscribe(name)
    }

    /// Drop a named event subscription.
    pub fn unsubscribe(&mut self, name: &str) {
        self.events.unsubscribe(name);
    }

    fn next_access(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn emit(&mut self, segment_id: SegmentId, kind: PoolEventKind) {
        self.events.broadcast(PoolEvent { segment_id, kind });
    }

    /// Materialize a resource for a segment.
    ///
    /// Idempotent: an already-resident segment is touched and its status
    /// returned unchanged (including `Error` — recreation requires an
    /// explicit [`ResourcePool::destroy`] first). Progressive handles get an
    /// immediate seek request to the in point so the byte-range fetch starts
    /// at the segment's actual start.
    pub fn create(&mut self, spec: &SegmentSpec) -> Result<ResourceStatus> {
        if spec.out_point <= spec.in_point {
            return Err(PlaybackError::ResourceCreate(format!(
                "empty source window [{}, {}) for {}",
                spec.in_point, spec.out_point, spec.segment_id
            )));
        }
        if self.handles.contains_key(&spec.segment_id) {
            self.touch(spec.segment_id);
            return Ok(self.handles[&spec.segment_id].status);
        }

        self.probe.drain();
        let transport = self
            .probe
            .decide_transport(spec.source.id, spec.is_low_priority);
        let mut handle = self
            .opener
            .open(&spec.source, transport)
            .map_err(|e| PlaybackError::ResourceCreate(e.to_string()))?;

        if transport == TransportKind::Progressive {
            handle.request_seek(spec.in_point);
        }
        if spec.is_low_priority {
            handle.set_muted(true);
        }

        let last_access = self.next_access();
        info!(segment = %spec.segment_id, source = %spec.source.id, ?transport, "resource created");
        self.handles.insert(
            spec.segment_id,
            ResourceHandle {
                segment_id: spec.segment_id,
                source_id: spec.source.id,
                transport,
                handle,
                status: ResourceStatus::Loading,
                in_point: spec.in_point,
                out_point: spec.out_point,
                last_access,
                is_low_priority: spec.is_low_priority,
                created_wall: Instant::now(),
                timeout_reported: false,
            },
        );
        self.emit(spec.segment_id, PoolEventKind::LoadStart);
        Ok(ResourceStatus::Loading)
    }

    /// Drain handle events and apply status transitions.
    ///
    /// Called once per tick. Decode/network failures land here as `Error`
    /// status plus an event — never as a return value, so one failing stream
    /// cannot interrupt the others.
    pub fn poll(&mut self) {
        self.probe.drain();
        let mut transitions: Vec<(SegmentId, PoolEventKind)> = Vec::new();

        for entry in self.handles.values_mut() {
            let mut failure: Option<PlaybackError> = None;
            for event in entry.handle.poll_events() {
                if let HandleEvent::Failed { error } = event {
                    failure = Some(error);
                }
            }

            if let Some(error) = failure {
                if entry.status != ResourceStatus::Error {
                    entry.status = ResourceStatus::Error;
                    entry.handle.set_playing(false);
                    warn!(segment = %entry.segment_id, %error, "resource failed");
                    transitions.push((
                        entry.segment_id,
                        PoolEventKind::LoadError {
                            reason: error.to_string(),
                        },
                    ));
                }
                continue;
            }

            if entry.status == ResourceStatus::Loading {
                let needed = self.config.buffer_threshold.min(entry.segment_len());
                if entry.buffered_from_in_point() + f64::EPSILON >= needed {
                    entry.status = ResourceStatus::Ready;
                    debug!(segment = %entry.segment_id, "resource ready");
                    transitions.push((entry.segment_id, PoolEventKind::LoadReady));
                } else if !entry.timeout_reported {
                    let waited = entry.created_wall.elapsed().as_secs_f64();
                    if waited >= self.config.readiness_timeout {
                        entry.timeout_reported = true;
                        warn!(segment = %entry.segment_id, waited_secs = waited, "readiness timeout");
                        transitions.push((
                            entry.segment_id,
                            PoolEventKind::LoadTimeout { waited_secs: waited },
                        ));
                    }
                }
            }
        }

        for (segment_id, kind) in transitions {
            self.emit(segment_id, kind);
        }
    }

    /// Evict least-recently-used resources until the pool fits the budget.
    ///
    /// Handles in `keep` are never destroyed, even if that leaves the pool
    /// over budget. Returns the evicted segment ids.
    pub fn evict_lru(&mut self, keep: &HashSet<SegmentId>) -> Vec<SegmentId> {
        let mut evicted = Vec::new();
        while self.handles.len() > self.config.max_resident {
            let victim = self
                .handles
                .values()
                .filter(|h| !keep.contains(&h.segment_id))
                .min_by_key(|h| h.last_access)
                .map(|h| h.segment_id);
            match victim {
                Some(id) => {
                    if let Some(mut entry) = self.handles.remove(&id) {
                        entry.handle.close();
                        info!(segment = %id, "resource evicted");
                        self.emit(id, PoolEventKind::Evicted);
                        evicted.push(id);
                    }
                }
                None => break,
            }
        }
        evicted
    }

    /// Destroy a resource explicitly (e.g. to recreate after an error).
    /// Returns false if the segment was not resident.
    pub fn destroy(&mut self, segment_id: SegmentId) -> bool {
        match self.handles.remove(&segment_id) {
            Some(mut entry) => {
                entry.handle.close();
                debug!(segment = %segment_id, "resource destroyed");
                true
            }
            None => false,
        }
    }

    /// Look up a resident resource.
    pub fn get(&self, segment_id: SegmentId) -> Option<&ResourceHandle> {
        self.handles.get(&segment_id)
    }

    /// Load state of a resident resource.
    pub fn status(&self, segment_id: SegmentId) -> Option<ResourceStatus> {
        self.handles.get(&segment_id).map(|h| h.status)
    }

    /// Whether a segment is resident.
    pub fn contains(&self, segment_id: SegmentId) -> bool {
        self.handles.contains_key(&segment_id)
    }

    /// Number of resident resources.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Ids of all resident resources.
    pub fn resident_ids(&self) -> Vec<SegmentId> {
        self.handles.keys().copied().collect()
    }

    /// Refresh a resource's access stamp. Returns false if not resident.
    pub fn touch(&mut self, segment_id: SegmentId) -> bool {
        let stamp = self.next_access();
        match self.handles.get_mut(&segment_id) {
            Some(entry) => {
                entry.last_access = stamp;
                true
            }
            None => false,
        }
    }

    /// Contiguous buffered seconds starting at the segment's in point,
    /// clipped to its source window. Zero for non-resident segments.
    ///
    /// This is the basis for both readiness and "still safely ahead" checks:
    /// media buffered before the in point is unusable and not counted.
    pub fn buffered_amount(&self, segment_id: SegmentId) -> f64 {
        self.handles
            .get(&segment_id)
            .map(|h| h.buffered_from_in_point())
            .unwrap_or(0.0)
    }

    /// Whether the handle's position is within `tolerance` of `target`.
    pub fn is_seeked(&self, segment_id: SegmentId, target: f64, tolerance: f64) -> bool {
        self.handles
            .get(&segment_id)
            .map(|h| (h.handle.current_time() - target).abs() <= tolerance)
            .unwrap_or(false)
    }

    /// Apply drift corrections to Ready handles.
    ///
    /// Threshold-gated: a handle within `sync_threshold` of its target is
    /// left untouched, so sub-threshold jitter never causes seek thrashing.
    /// Idempotent under repeated calls with the same targets.
    pub fn sync_correct(&mut self, corrections: &[SyncTarget]) {
        for correction in corrections {
            let Some(entry) = self.handles.get_mut(&correction.segment_id) else {
                continue;
            };
            if entry.status != ResourceStatus::Ready {
                continue;
            }
            let drift = entry.handle.current_time() - correction.target;
            if drift.abs() > self.config.sync_threshold {
                debug!(
                    segment = %correction.segment_id,
                    drift_ms = drift * 1000.0,
                    "correcting drift"
                );
                entry.handle.request_seek(correction.target);
            }
        }
    }

    /// Batch play/pause of underlying handles.
    ///
    /// Only `Ready` resources ever start playing; a resource that is still
    /// loading stays paused regardless of the requested state. This is the
    /// backpressure that keeps a stalled stream from playing garbage.
    pub fn set_playing(&mut self, segment_ids: &[SegmentId], playing: bool) {
        for &id in segment_ids {
            let stamp = self.access_counter + 1;
            if let Some(entry) = self.handles.get_mut(&id) {
                if playing && entry.status == ResourceStatus::Ready {
                    entry.handle.set_playing(true);
                    entry.last_access = stamp;
                    self.access_counter = stamp;
                } else {
                    entry.handle.set_playing(false);
                }
            }
        }
    }

    /// Pause every resident handle.
    pub fn pause_all(&mut self) {
        let ids = self.resident_ids();
        self.set_playing(&ids, false);
    }

    /// Destroy all resources and forget probe results (project change).
    pub fn clear(&mut self) {
        for (_, mut entry) in self.handles.drain() {
            entry.handle.close();
        }
        self.probe.clear();
        self.access_counter = 0;
        info!("resource pool cleared");
    }
}

/// A clock-derived target source time for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTarget {
    pub segment_id: SegmentId,
    pub target: f64,
}

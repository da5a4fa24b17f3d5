//! Pool event delivery.
//!
//! Readiness and failure signals are fire-and-forget: the pool broadcasts
//! into per-subscriber channels and never blocks on a slow consumer. A
//! failure on one stream reaches listeners as an event, never as an error
//! return from a playback path.

use crossbeam_channel::{unbounded, Receiver, Sender};
use reelsync_core::SegmentId;
use std::collections::HashMap;
use tracing::trace;

/// What happened to a pooled resource.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEventKind {
    /// A handle was allocated and began loading.
    LoadStart,
    /// The handle buffered enough to play from its in point.
    LoadReady,
    /// The handle failed and will not recover without recreation.
    LoadError { reason: String },
    /// The handle has been loading longer than the readiness bound.
    /// Non-fatal; the stream may still become ready.
    LoadTimeout { waited_secs: f64 },
    /// The handle was destroyed to stay under the residency budget.
    Evicted,
}

/// An event about one pooled resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEvent {
    pub segment_id: SegmentId,
    pub kind: PoolEventKind,
}

/// Named fan-out of pool events to any number of subscribers.
#[derive(Default)]
pub struct EventHub {
    subscribers: HashMap<String, Sender<PoolEvent>>,
}

impl EventHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe under a name, replacing any previous subscription with the
    /// same name. Returns the receiving end.
    pub fn subscribe(&mut self, name: impl Into<String>) -> Receiver<PoolEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.insert(name.into(), tx);
        rx
    }

    /// Drop a subscription by name.
    pub fn unsubscribe(&mut self, name: &str) {
        self.subscribers.remove(name);
    }

    /// Send an event to all live subscribers, pruning disconnected ones.
    pub fn broadcast(&mut self, event: PoolEvent) {
        trace!(segment = %event.segment_id, kind = ?event.kind, "pool event");
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

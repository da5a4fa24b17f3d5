//! Transport selection: adaptive-streaming manifest probing.
//!
//! Whether a source is delivered via an adaptive manifest or a progressive
//! byte-range fetch is decided once per source. The probe is asynchronous
//! (a worker thread performs the resolver call), memoized per source id, and
//! batched: the orchestration layer can request a whole set of sources before
//! bulk-creating resources.

use crate::handle::MediaSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use reelsync_core::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// How a source's media is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Manifest-based streaming.
    Adaptive,
    /// Single-file byte-range fetch.
    Progressive,
}

/// Result of the manifest availability check for a source.
///
/// Tri-state so "not yet checked" is distinguishable from "checked and
/// absent": an unknown source may still become adaptive after probing, an
/// unavailable one never will.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Unknown,
    Available,
    Unavailable,
}

/// External collaborator that performs the actual manifest check.
pub trait ManifestResolver: Send + Sync {
    /// Returns whether a ready adaptive manifest exists for the source.
    /// An `Err` is treated as unavailable (progressive fallback).
    fn resolve(&self, source: &MediaSource) -> std::result::Result<bool, String>;
}

impl<F> ManifestResolver for F
where
    F: Fn(&MediaSource) -> std::result::Result<bool, String> + Send + Sync,
{
    fn resolve(&self, source: &MediaSource) -> std::result::Result<bool, String> {
        self(source)
    }
}

struct ProbeState {
    cache: HashMap<SourceId, Availability>,
    /// Sources handed to the worker whose result has not landed yet.
    pending: HashSet<SourceId>,
}

/// Memoizing, batched availability probe.
///
/// Requests are fire-and-forget: a worker thread runs the resolver and the
/// caller folds completions into the cache with [`TransportProbe::drain`]
/// from its own tick. A source is probed at most once per cache lifetime.
pub struct TransportProbe {
    state: Arc<Mutex<ProbeState>>,
    request_tx: Option<Sender<MediaSource>>,
    done_rx: Receiver<(SourceId, Availability)>,
    worker: Option<JoinHandle<()>>,
}

impl TransportProbe {
    /// Spawn the probe worker around the given resolver.
    pub fn new(resolver: Arc<dyn ManifestResolver>) -> Self {
        let (request_tx, request_rx) = unbounded::<MediaSource>();
        let (done_tx, done_rx) = unbounded();

        let worker = std::thread::Builder::new()
            .name("reelsync-probe".to_string())
            .spawn(move || {
                for source in request_rx.iter() {
                    let availability = match resolver.resolve(&source) {
                        Ok(true) => Availability::Available,
                        Ok(false) => Availability::Unavailable,
                        Err(reason) => {
                            warn!(source = %source.id, %reason, "manifest probe failed");
                            Availability::Unavailable
                        }
                    };
                    if done_tx.send((source.id, availability)).is_err() {
                        break;
                    }
                }
            })
            .expect("failed to spawn probe worker");

        Self {
            state: Arc::new(Mutex::new(ProbeState {
                cache: HashMap::new(),
                pending: HashSet::new(),
            })),
            request_tx: Some(request_tx),
            done_rx,
            worker: Some(worker),
        }
    }

    /// Queue an availability check for a source. No-op if the source was
    /// already checked or is in flight, or if it has no manifest URL (such
    /// sources are recorded as unavailable immediately).
    pub fn request(&self, source: &MediaSource) {
        let mut state = self.state.lock();
        if state.cache.contains_key(&source.id) || state.pending.contains(&source.id) {
            return;
        }
        if source.manifest_url.is_none() {
            state.cache.insert(source.id, Availability::Unavailable);
            return;
        }
        state.pending.insert(source.id);
        drop(state);
        if let Some(tx) = &self.request_tx {
            // Worker gone means the probe is shutting down; leave Unknown.
            let _ = tx.send(source.clone());
        }
    }

    /// Queue checks for a batch of sources ahead of bulk resource creation.
    pub fn request_batch<'a>(&self, sources: impl IntoIterator<Item = &'a MediaSource>) {
        for source in sources {
            self.request(source);
        }
    }

    /// Fold completed probe results into the cache. Returns the number of
    /// newly resolved sources.
    pub fn drain(&self) -> usize {
        let mut resolved = 0;
        let mut state = self.state.lock();
        while let Ok((id, availability)) = self.done_rx.try_recv() {
            debug!(source = %id, ?availability, "manifest probe resolved");
            state.pending.remove(&id);
            state.cache.insert(id, availability);
            resolved += 1;
        }
        resolved
    }

    /// Cached availability for a source.
    pub fn availability(&self, source_id: SourceId) -> Availability {
        self.state
            .lock()
            .cache
            .get(&source_id)
            .copied()
            .unwrap_or(Availability::Unknown)
    }

    /// Decide the transport for a segment on this source.
    ///
    /// Adaptive only when the manifest check succeeded and the segment is not
    /// low-priority; short-lived background footage always goes progressive.
    pub fn decide_transport(&self, source_id: SourceId, is_low_priority: bool) -> TransportKind {
        if is_low_priority {
            return TransportKind::Progressive;
        }
        match self.availability(source_id) {
            Availability::Available => TransportKind::Adaptive,
            Availability::Unknown | Availability::Unavailable => TransportKind::Progressive,
        }
    }

    /// Forget all cached results (e.g. on project change).
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.pending.clear();
    }
}

impl Drop for TransportProbe {
    fn drop(&mut self) {
        // Closing the request channel lets the worker run off the end.
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

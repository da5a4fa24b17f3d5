//! Deterministic in-process media element.
//!
//! Stands in for a real decoder/media element during development and in
//! tests, the way the placeholder decoder does elsewhere in the stack:
//! metadata loading, buffering progress, and failures are driven explicitly
//! through a [`SimulatedControl`] instead of arriving from the network.

use crate::handle::{HandleEvent, MediaHandle, MediaOpener, MediaSource};
use crate::transport::TransportKind;
use parking_lot::Mutex;
use reelsync_core::{PlaybackError, RangeSet, Result, SourceId, TimeRange};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Inner {
    url: String,
    transport: TransportKind,
    duration: Option<f64>,
    metadata_loaded: bool,
    buffered: RangeSet,
    position: f64,
    pending_seek: Option<f64>,
    playing: bool,
    muted: bool,
    closed: bool,
    seek_count: usize,
    events: Vec<HandleEvent>,
}

impl Inner {
    fn apply_seek(&mut self, time: f64) {
        let clamped = match self.duration {
            Some(d) => time.clamp(0.0, d),
            None => time.max(0.0),
        };
        self.position = clamped;
        self.seek_count += 1;
        self.events.push(HandleEvent::SeekComplete { time: clamped });
    }
}

/// In-process media element implementing [`MediaHandle`].
pub struct SimulatedElement {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedElement {
    /// Open an element on a source. Metadata loads immediately when the
    /// source's duration is known up front; otherwise it stays pending until
    /// [`SimulatedControl::complete_metadata`] is called.
    pub fn open(source: &MediaSource, transport: TransportKind) -> Self {
        let mut inner = Inner {
            url: source.url.clone(),
            transport,
            duration: None,
            metadata_loaded: false,
            buffered: RangeSet::new(),
            position: 0.0,
            pending_seek: None,
            playing: false,
            muted: false,
            closed: false,
            seek_count: 0,
            events: Vec::new(),
        };
        if let Some(duration) = source.duration {
            inner.metadata_loaded = true;
            inner.duration = Some(duration);
            inner.events.push(HandleEvent::MetadataLoaded { duration });
        }
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Handle to drive this element externally.
    pub fn control(&self) -> SimulatedControl {
        SimulatedControl {
            inner: self.inner.clone(),
        }
    }

    /// The transport this element was opened with.
    pub fn transport(&self) -> TransportKind {
        self.inner.lock().transport
    }
}

impl MediaHandle for SimulatedElement {
    fn buffered(&self) -> RangeSet {
        self.inner.lock().buffered.clone()
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.inner.lock().duration
    }

    fn request_seek(&mut self, time: f64) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        if inner.metadata_loaded {
            inner.apply_seek(time);
        } else {
            inner.pending_seek = Some(time);
        }
    }

    fn set_playing(&mut self, playing: bool) {
        let mut inner = self.inner.lock();
        if !inner.closed {
            inner.playing = playing;
        }
    }

    fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    fn set_muted(&mut self, muted: bool) {
        self.inner.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    fn poll_events(&mut self) -> Vec<HandleEvent> {
        std::mem::take(&mut self.inner.lock().events)
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.playing = false;
        inner.pending_seek = None;
        inner.events.clear();
        debug!(url = %inner.url, "media element closed");
    }
}

/// External driver for a [`SimulatedElement`].
///
/// Plays the role of the network and the decoder: completes metadata, grows
/// buffered ranges, injects failures, and lets tests observe the element
/// after ownership moved into the pool.
#[derive(Clone)]
pub struct SimulatedControl {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedControl {
    /// Complete metadata loading; applies any seek held while pending.
    pub fn complete_metadata(&self, duration: f64) {
        let mut inner = self.inner.lock();
        if inner.metadata_loaded || inner.closed {
            return;
        }
        inner.metadata_loaded = true;
        inner.duration = Some(duration);
        inner.events.push(HandleEvent::MetadataLoaded { duration });
        if let Some(target) = inner.pending_seek.take() {
            inner.apply_seek(target);
        }
    }

    /// Mark `[start, end)` as buffered.
    pub fn buffer(&self, start: f64, end: f64) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.buffered.insert(TimeRange::new(start, end));
        inner.events.push(HandleEvent::Progress);
    }

    /// Inject a decode/network failure.
    pub fn fail(&self, error: PlaybackError) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.playing = false;
        inner.events.push(HandleEvent::Failed { error });
    }

    /// Move the playhead forward, as decoding would while playing.
    pub fn advance(&self, dt: f64) {
        let mut inner = self.inner.lock();
        if inner.playing && !inner.closed {
            let next = inner.position + dt;
            inner.position = match inner.duration {
                Some(d) => next.min(d),
                None => next,
            };
        }
    }

    /// Current position in source time.
    pub fn position(&self) -> f64 {
        self.inner.lock().position
    }

    /// Whether the element is playing.
    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    /// Whether the element's audio is muted.
    pub fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    /// Whether the element has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of seeks applied so far.
    pub fn seek_count(&self) -> usize {
        self.inner.lock().seek_count
    }

    /// Seek held until metadata loads, if any.
    pub fn pending_seek(&self) -> Option<f64> {
        self.inner.lock().pending_seek
    }
}

/// Opener handing out simulated elements, keeping controls for each.
#[derive(Default)]
pub struct SimulatedOpener {
    spawned: Mutex<Vec<(SourceId, SimulatedControl)>>,
    /// When set, opened sources report no duration until the test completes
    /// metadata explicitly.
    defer_metadata: bool,
}

impl SimulatedOpener {
    /// Opener whose elements load metadata as soon as the source duration is
    /// known.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opener whose elements hold metadata until completed via control.
    pub fn deferred() -> Self {
        Self {
            spawned: Mutex::new(Vec::new()),
            defer_metadata: true,
        }
    }

    /// Controls for every element opened on `source_id`, in open order.
    pub fn controls(&self, source_id: SourceId) -> Vec<SimulatedControl> {
        self.spawned
            .lock()
            .iter()
            .filter(|(id, _)| *id == source_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Control for the most recently opened element.
    pub fn last_control(&self) -> Option<SimulatedControl> {
        self.spawned.lock().last().map(|(_, c)| c.clone())
    }

    /// Number of elements opened so far.
    pub fn open_count(&self) -> usize {
        self.spawned.lock().len()
    }
}

impl MediaOpener for SimulatedOpener {
    fn open(&self, source: &MediaSource, transport: TransportKind) -> Result<Box<dyn MediaHandle>> {
        let effective = if self.defer_metadata {
            MediaSource {
                duration: None,
                ..source.clone()
            }
        } else {
            source.clone()
        };
        let element = SimulatedElement::open(&effective, transport);
        self.spawned
            .lock()
            .push((source.id, element.control()));
        Ok(Box::new(element))
    }
}

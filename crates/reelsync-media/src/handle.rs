//! The media handle primitive the pool orchestrates.
//!
//! A `MediaHandle` wraps whatever actually fetches and decodes media (a
//! browser media element, an FFmpeg pipeline, a test double). The pool only
//! needs buffered ranges, a deferrable seek, play/pause, and completion
//! events drained cooperatively — never blocking waits.

use crate::transport::TransportKind;
use reelsync_core::{PlaybackError, RangeSet, Result, SourceId};
use serde::{Deserialize, Serialize};

/// A media asset a handle can be opened on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSource {
    /// Asset id.
    pub id: SourceId,
    /// URL of the progressive (single-file) rendition.
    pub url: String,
    /// URL of the adaptive-streaming manifest, if one may exist.
    pub manifest_url: Option<String>,
    /// Total duration in seconds, when known up front.
    pub duration: Option<f64>,
}

impl MediaSource {
    /// Create a source with a known duration.
    pub fn new(id: SourceId, url: impl Into<String>, duration: f64) -> Self {
        Self {
            id,
            url: url.into(),
            manifest_url: None,
            duration: Some(duration),
        }
    }

    /// Attach an adaptive-streaming manifest URL.
    pub fn with_manifest(mut self, manifest_url: impl Into<String>) -> Self {
        self.manifest_url = Some(manifest_url.into());
        self
    }
}

/// Asynchronous completion signals from a media handle.
///
/// Handles never call back into the pool; the pool drains these on its own
/// tick via [`MediaHandle::poll_events`].
#[derive(Debug, Clone)]
pub enum HandleEvent {
    /// Metadata became available; seeks requested earlier are now applied.
    MetadataLoaded { duration: f64 },
    /// Buffered ranges changed.
    Progress,
    /// A requested seek completed.
    SeekComplete { time: f64 },
    /// The handle failed; it will not recover on its own.
    Failed { error: PlaybackError },
}

/// An opaque decoder/media-element resource.
///
/// Owned exclusively by one pool entry. Dropping or closing the handle
/// cancels any pending work by construction.
pub trait MediaHandle: Send {
    /// Buffered time ranges, in source time.
    fn buffered(&self) -> RangeSet;

    /// Current playback position, in source time.
    fn current_time(&self) -> f64;

    /// Source duration, once metadata has loaded.
    fn duration(&self) -> Option<f64>;

    /// Request a seek. Before metadata is available the seek is held and
    /// applied once metadata loads.
    fn request_seek(&mut self, time: f64);

    /// Start or stop playback of this handle.
    fn set_playing(&mut self, playing: bool);

    /// Whether the handle is currently playing.
    fn is_playing(&self) -> bool;

    /// Mute or unmute the handle's audio.
    fn set_muted(&mut self, muted: bool);

    /// Whether the handle's audio is muted.
    fn is_muted(&self) -> bool;

    /// Drain completion events accumulated since the last poll.
    fn poll_events(&mut self) -> Vec<HandleEvent>;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self);
}

/// Factory seam through which the pool allocates handles.
pub trait MediaOpener: Send + Sync {
    /// Open a handle on `source` using the given transport.
    fn open(&self, source: &MediaSource, transport: TransportKind) -> Result<Box<dyn MediaHandle>>;
}

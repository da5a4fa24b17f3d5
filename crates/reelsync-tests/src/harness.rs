//! Shared fixtures for the integration tests.

use reelsync_core::{PlayerConfig, Result, SegmentId, SourceId};
use reelsync_media::{
    MediaHandle, MediaOpener, MediaSource, SimulatedOpener, TransportKind,
};
use reelsync_playback::{PlayerSession, SegmentRegistration, SegmentSpec};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a fmt subscriber once, honoring `RUST_LOG`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Opener wrapper so tests can keep driving elements after the pool takes
/// ownership of the opener.
pub struct SharedOpener(pub Arc<SimulatedOpener>);

impl MediaOpener for SharedOpener {
    fn open(&self, source: &MediaSource, transport: TransportKind) -> Result<Box<dyn MediaHandle>> {
        self.0.open(source, transport)
    }
}

/// A timeline segment plus everything needed to materialize it.
#[derive(Clone)]
pub struct TestSegment {
    pub registration: SegmentRegistration,
    pub spec: SegmentSpec,
}

impl TestSegment {
    /// Segment playing `[source_in, source_in + (end - start))` of a fresh
    /// source, placed at `[start, end)` on the timeline.
    pub fn new(start: f64, end: f64, source_in: f64) -> Self {
        let segment_id = SegmentId::new();
        let duration = source_in + (end - start) + 30.0;
        Self {
            registration: SegmentRegistration {
                segment_id,
                timeline_start: start,
                timeline_end: end,
                source_in,
            },
            spec: SegmentSpec {
                segment_id,
                source: MediaSource::new(SourceId::new(), "https://cdn.example/clip.mp4", duration),
                in_point: source_in,
                out_point: source_in + (end - start),
                is_low_priority: false,
            },
        }
    }
}

/// Session over a simulated opener with no adaptive manifests.
pub fn session_with(config: PlayerConfig) -> (PlayerSession, Arc<SimulatedOpener>) {
    init_tracing();
    let opener = Arc::new(SimulatedOpener::new());
    let session = PlayerSession::new(
        config,
        Box::new(SharedOpener(opener.clone())),
        Arc::new(|_: &MediaSource| Ok(false)),
    )
    .expect("valid config");
    (session, opener)
}

/// Create a segment's resource and buffer its whole source window so the
/// next pool poll promotes it to Ready.
pub fn create_buffered(
    session: &PlayerSession,
    opener: &SimulatedOpener,
    segment: &TestSegment,
) {
    session.pool().lock().create(&segment.spec).expect("create");
    let control = opener.last_control().expect("spawned element");
    control.buffer(segment.spec.in_point, segment.spec.out_point);
}

//! Error types for ReelSync.

use crate::id::SegmentId;
use thiserror::Error;

/// Main error type for playback-core operations.
///
/// Decode and network failures on individual streams are captured at the
/// handle level and surfaced through pool events rather than returned from
/// playback paths, so one failing stream never interrupts the others.
#[derive(Error, Debug, Clone)]
pub enum PlaybackError {
    #[error("Resource creation failed: {0}")]
    ResourceCreate(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Readiness timeout for {segment} after {waited_secs:.1}s")]
    Timeout {
        segment: SegmentId,
        waited_secs: f64,
    },

    #[error("Stale pool state: {0} is not resident")]
    StalePool(SegmentId),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for playback-core operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

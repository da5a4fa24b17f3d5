//! Player configuration.
//!
//! Tunables for the resource pool and the playback clock. Defaults target a
//! preview player on a mid-range machine: a handful of resident streams,
//! ~1.5 s of preheat horizon, and sub-frame drift correction.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a playback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Maximum number of resident media handles.
    pub max_resident: usize,
    /// Preheat horizon in seconds: segments starting within this window
    /// ahead of the playhead are prepared early.
    pub lookahead_window: f64,
    /// Minimum drift in seconds before a correcting seek is issued.
    pub sync_threshold: f64,
    /// Buffered seconds from a segment's in point required for Ready.
    pub buffer_threshold: f64,
    /// Wall-time cadence of drift correction, in seconds.
    pub sync_check_interval: f64,
    /// Hard upper bound on any readiness wait, in seconds.
    pub readiness_timeout: f64,
    /// Minimum allowed playback rate.
    pub min_rate: f64,
    /// Maximum allowed playback rate.
    pub max_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_resident: 6,
            lookahead_window: 1.5,
            sync_threshold: 0.05,
            buffer_threshold: 1.0,
            sync_check_interval: 0.1,
            readiness_timeout: 15.0,
            min_rate: 0.25,
            max_rate: 4.0,
        }
    }
}

impl PlayerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_resident == 0 {
            return Err(PlaybackError::InvalidParameter(
                "max_resident must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("lookahead_window", self.lookahead_window),
            ("sync_threshold", self.sync_threshold),
            ("buffer_threshold", self.buffer_threshold),
            ("sync_check_interval", self.sync_check_interval),
            ("readiness_timeout", self.readiness_timeout),
            ("min_rate", self.min_rate),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(PlaybackError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.max_rate < self.min_rate {
            return Err(PlaybackError::InvalidParameter(format!(
                "max_rate {} below min_rate {}",
                self.max_rate, self.min_rate
            )));
        }
        Ok(())
    }

    /// Clamp a requested playback rate into the allowed range.
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        rate.clamp(self.min_rate, self.max_rate)
    }
}

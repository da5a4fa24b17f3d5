//! ReelSync Core - Foundation types for the playback engine
//!
//! This crate provides the fundamental types used throughout ReelSync:
//! - Time ranges and buffered-range sets
//! - Segment and source identifiers
//! - Player configuration
//! - The error taxonomy

pub mod config;
pub mod error;
pub mod id;
pub mod time;

pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use id::{SegmentId, SourceId};
pub use time::{RangeSet, TimeRange};

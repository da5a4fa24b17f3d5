//! ReelSync Media - the decoder/media-element boundary
//!
//! The playback core orchestrates media handles, it does not decode. This
//! crate defines that boundary:
//! - The `MediaHandle` trait: an opaque handle that can report buffered
//!   ranges, be seeked, play/pause, and emit ready/error signals.
//! - The transport-availability probe that decides adaptive vs progressive
//!   delivery per source.
//! - A deterministic in-process element implementation used for development
//!   and tests.

pub mod element;
pub mod handle;
pub mod transport;

pub use element::{SimulatedControl, SimulatedElement, SimulatedOpener};
pub use handle::{HandleEvent, MediaHandle, MediaOpener, MediaSource};
pub use transport::{Availability, ManifestResolver, TransportKind, TransportProbe};

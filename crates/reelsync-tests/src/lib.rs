//! Integration test crate for ReelSync.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the core, media, and playback crates to verify the
//! pool/clock synchronization protocol end to end.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod preheat;

//! Session object owning one pool/clock pair.
//!
//! Replaces the source pattern of module-level singletons surviving UI
//! remounts: the session is created once by the top-level player context,
//! handed around by reference, and reset (not destroyed) on project change.

use crate::clock::PlaybackClock;
use crate::pool::ResourcePool;
use parking_lot::Mutex;
use reelsync_core::{PlayerConfig, Result};
use reelsync_media::{ManifestResolver, MediaOpener};
use std::sync::Arc;
use tracing::info;

/// One playback session: a resource pool and the clock driving it.
///
/// The clock's correction sink is wired to the pool's `sync_correct` at
/// construction, so visible streams are re-aligned to clock-derived targets
/// on the configured cadence without the two components knowing each other.
pub struct PlayerSession {
    pool: Arc<Mutex<ResourcePool>>,
    clock: PlaybackClock,
}

impl PlayerSession {
    /// Build a session from a config, a media opener, and a manifest
    /// resolver.
    pub fn new(
        config: PlayerConfig,
        opener: Box<dyn MediaOpener>,
        resolver: Arc<dyn ManifestResolver>,
    ) -> Result<Self> {
        config.validate()?;
        let pool = Arc::new(Mutex::new(ResourcePool::new(
            config.clone(),
            opener,
            resolver,
        )?));

        let mut clock = PlaybackClock::new(config);
        let sink_pool = pool.clone();
        clock.set_sync_sink(move |corrections| {
            sink_pool.lock().sync_correct(corrections);
        });

        Ok(Self { pool, clock })
    }

    /// Shared handle to the pool, for wait-condition predicates and the
    /// orchestration layer.
    pub fn pool(&self) -> Arc<Mutex<ResourcePool>> {
        self.pool.clone()
    }

    /// The session clock.
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Mutable access to the session clock.
    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    /// One scheduler callback: tick the clock, then let the pool drain
    /// handle events. Returns false when tick scheduling should stop.
    pub fn advance(&mut self, now: f64) -> bool {
        let keep_ticking = self.clock.tick(now);
        self.pool.lock().poll();
        keep_ticking
    }

    /// Reset for a project change: drop all resources and return the clock
    /// to its initial state. The session object itself stays alive.
    pub fn reset(&mut self) {
        self.pool.lock().clear();
        self.clock.reset();
        info!("player session reset");
    }
}

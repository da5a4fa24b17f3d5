//! Periodic tick drivers.
//!
//! The clock is driven by whatever scheduler the host has: a render-loop
//! hook, a timer, a test loop. The only contract is a callback receiving
//! monotonic wall time in seconds at a frame-rate-ish, explicitly
//! non-guaranteed cadence. `IntervalDriver` is the timer-backed default.

use crossbeam_channel::{bounded, select, tick, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Something that periodically fires the session's tick callback.
pub trait TickDriver {
    /// Stop firing. Idempotent; blocks until the driver has shut down.
    fn stop(&mut self);
}

/// Thread-backed driver firing at a fixed nominal period.
///
/// The callback gets monotonic seconds since the driver started and returns
/// whether to keep scheduling; returning false ends the loop, matching the
/// clock's tick contract.
pub struct IntervalDriver {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl IntervalDriver {
    /// Spawn a driver calling `on_tick` every `period`.
    pub fn spawn(period: Duration, mut on_tick: impl FnMut(f64) -> bool + Send + 'static) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread = std::thread::Builder::new()
            .name("reelsync-ticker".to_string())
            .spawn(move || {
                let start = Instant::now();
                let ticker = tick(period);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let now = start.elapsed().as_secs_f64();
                            if !on_tick(now) {
                                debug!("tick driver finished");
                                break;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn tick driver");

        Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

impl TickDriver for IntervalDriver {
    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for IntervalDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

//! ReelSync Playback - the video playback and resource-management core
//!
//! Two collaborating components, consumed by a stateless rendering layer:
//! - [`ResourcePool`]: owns all media handles keyed by timeline-segment id;
//!   creates, seeks, and evicts them under a bounded residency budget.
//! - [`PlaybackClock`]: the single source of truth for "now"; advances time
//!   via a periodic scheduler tick, stalls on registered wait conditions, and
//!   periodically pushes drift corrections into the pool.
//!
//! Time flows one way (clock → pool → handles) and readiness flows the other
//! (handles → pool → wait conditions). [`PlayerSession`] wires the two
//! together for one editing/playback session.

pub mod clock;
pub mod driver;
pub mod events;
pub mod pool;
pub mod preheat;
pub mod session;

pub use clock::{PlaybackClock, SegmentRegistration, WaitCondition};
pub use driver::{IntervalDriver, TickDriver};
pub use events::{EventHub, PoolEvent, PoolEventKind};
pub use pool::{ResourcePool, ResourceStatus, SegmentSpec, SyncTarget};
pub use preheat::{
    classify, upcoming_seeked_condition, visible_ready_condition, PreheatPlan, SegmentPhase,
};
pub use session::PlayerSession;

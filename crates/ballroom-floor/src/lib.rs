//! Ballroom Floor: the paired-rendezvous protocol
//!
//! Leaders and followers arrive independently and must be matched one to
//! one onto a single dance floor. A pair dances, waits for each other to
//! finish, and only then is the floor handed to the next pair.
//!
//! # Moving parts
//!
//! - [`FloorLock`]: the single-occupancy gate. Its [`FloorGrant`] is the
//!   only way to touch the [`RoleCounter`] or release the floor.
//! - [`RoleCounter`]: how many of each role are waiting. Counts, not a
//!   queue, so a newcomer may be matched with any waiting partner.
//! - [`HandshakeChannel`]: wakes one queued dancer of a given role.
//! - [`PostDanceRendezvous`]: two-party barrier after the dance.
//! - [`DanceFloor`]: owns all of the above and makes the match-or-enqueue
//!   decision.
//! - [`DancerProtocol`]: the per-actor state machine, identical for both
//!   roles.
//! - [`Ballroom`]: spawns the populations and collects a report.
//!
//! # Example
//!
//! ```rust,no_run
//! use ballroom_core::BallroomConfig;
//! use ballroom_floor::Ballroom;
//!
//! # async fn example() -> ballroom_core::Result<()> {
//! let config = BallroomConfig {
//!     leaders: 3,
//!     followers: 3,
//!     cycles_per_dancer: Some(2),
//!     ..Default::default()
//! };
//! let report = Ballroom::new(config)?.run().await?;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod activity;
pub mod ballroom;
pub mod counter;
pub mod floor;
pub mod handshake;
pub mod lock;
pub mod monitor;
pub mod observer;
pub mod protocol;
pub mod rendezvous;
pub mod signal;

pub use activity::{DanceActivity, RandomDelays, ScriptedDelays};
pub use ballroom::{Ballroom, BallroomReport};
pub use counter::{Arrival, RoleCounter};
pub use floor::{DanceFloor, Decision, FloorSnapshot};
pub use handshake::HandshakeChannel;
pub use lock::{FloorGrant, FloorLock};
pub use monitor::{FloorMonitor, FloorStats};
pub use observer::{FloorObserver, Observers, TracingObserver};
pub use protocol::{CycleOutcome, DancerOutcome, DancerProtocol, DancerReport, DancerState};
pub use rendezvous::PostDanceRendezvous;
pub use signal::{Signal, WaitError};

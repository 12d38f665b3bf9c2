//! Statefy Time - Clock and scheduler collaborators
//!
//! The state container never reads ambient time or spawns ambient tasks.
//! Everything time-driven goes through two injected collaborators:
//! - `Clock`: monotonic readings for creation/activation stamps
//! - `Scheduler`: "run soon" and "run after a delay" for deferred work
//!
//! Real implementations are backed by `Instant` and tokio; the manual ones
//! drive virtual time for deterministic tests.

pub mod clock;
pub mod manual;
pub mod scheduler;

pub use clock::*;
pub use manual::*;
pub use scheduler::*;

//! Clock implementations

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use statefy_core::Timestamp;

/// Source of monotonic time
/// INVARIANT: successive readings never decrease
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall-independent monotonic clock backed by `Instant`
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is the moment of construction
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let micros = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        Timestamp::from_micros(micros)
    }
}

/// Virtual clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading zero
    pub fn new() -> Self {
        Self::starting_at(Timestamp::ZERO)
    }

    pub fn starting_at(start: Timestamp) -> Self {
        ManualClock {
            micros: AtomicU64::new(start.as_micros()),
        }
    }

    /// Move the clock forward, returning the new reading
    pub fn advance(&self, dt: Duration) -> Timestamp {
        let delta = u64::try_from(dt.as_micros()).unwrap_or(u64::MAX);
        let previous = self
            .micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_add(delta))
            })
            .unwrap_or_else(|v| v);
        Timestamp::from_micros(previous.saturating_add(delta))
    }

    /// Jump to a specific reading
    /// Only allowed to move forward
    pub fn sync_to(&self, target: Timestamp) {
        self.micros.fetch_max(target.as_micros(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

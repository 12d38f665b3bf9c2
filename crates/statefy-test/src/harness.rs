//! Container wired to virtual time

use std::sync::Arc;
use std::time::Duration;

use statefy_core::{StatefyConfig, Timestamp};
use statefy_state::{StateValue, Statefy};
use statefy_time::{Clock, ManualClock, ManualScheduler};

/// A `Statefy` whose clock and scheduler are driven by the test
pub struct Harness<T> {
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    statefy: Statefy<T>,
}

impl<T: StateValue> Harness<T> {
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, StatefyConfig::default())
    }

    pub fn with_config(initial: T, config: StatefyConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let statefy = Statefy::with_config(initial, config, clock.clone(), scheduler.clone());
        Harness {
            clock,
            scheduler,
            statefy,
        }
    }

    pub fn statefy(&self) -> &Statefy<T> {
        &self.statefy
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn scheduler(&self) -> &Arc<ManualScheduler> {
        &self.scheduler
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Deliver every queued notification without moving time
    pub fn settle(&self) -> usize {
        self.scheduler.run_pending()
    }

    /// Move virtual time forward, firing timers and notifications on the way
    pub fn advance(&self, dt: Duration) -> usize {
        self.scheduler.advance(dt)
    }

    pub fn advance_ms(&self, millis: u64) -> usize {
        self.advance(Duration::from_millis(millis))
    }
}

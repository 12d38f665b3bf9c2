//! Temporal override - a self-expiring value that masks the current state

use std::sync::Arc;
use std::time::Duration;

use statefy_core::Timestamp;
use tracing::debug;

use crate::container::Shared;
use crate::{StateValue, Statefy};

/// An armed override
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalOverride<T> {
    pub value: T,
    pub activated_at: Timestamp,
    /// Duration the override was armed with
    pub duration: Duration,
}

impl<T> TemporalOverride<T> {
    /// True once the armed duration has fully elapsed
    pub fn has_elapsed(&self, now: Timestamp) -> bool {
        now - self.activated_at >= self.duration
    }

    /// Time left before the override may be cleared
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.duration.saturating_sub(now - self.activated_at)
    }
}

impl<T: StateValue> Shared<T> {
    /// Expiry check queued by `set_temporal`
    ///
    /// Clears the override only if it still holds `value` and its own armed
    /// duration has elapsed. A later `set_temporal` restamps the override,
    /// so checks queued by earlier calls fall through as no-ops.
    pub(crate) fn expire_temporal(&self, value: &T) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired = matches!(
            &inner.temporal,
            Some(temporal) if temporal.value == *value && temporal.has_elapsed(now)
        );
        if expired {
            inner.temporal = None;
            debug!(state = ?value, "temporal override expired");
        }
    }
}

impl<T: StateValue> Statefy<T> {
    /// Mask the current state with `value` for `duration`
    ///
    /// Replaces any armed override. There is no cancel; an override is
    /// either replaced or left to expire.
    pub fn set_temporal(&self, value: T, duration: Duration) {
        let activated_at = self.shared.clock.now();
        self.shared.inner.lock().temporal = Some(TemporalOverride {
            value: value.clone(),
            activated_at,
            duration,
        });
        debug!(state = ?value, ?duration, "temporal override armed");

        let shared = Arc::downgrade(&self.shared);
        self.shared.scheduler.delay(
            duration,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.expire_temporal(&value);
                }
            }),
        );
    }

    /// The armed override value, if any
    pub fn temporal(&self) -> Option<T> {
        self.shared
            .inner
            .lock()
            .temporal
            .as_ref()
            .map(|t| t.value.clone())
    }

    /// Time left on the armed override, if any
    pub fn temporal_remaining(&self) -> Option<Duration> {
        let now = self.shared.clock.now();
        self.shared
            .inner
            .lock()
            .temporal
            .as_ref()
            .map(|t| t.remaining(now))
    }
}

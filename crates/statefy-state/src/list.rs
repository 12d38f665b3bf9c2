//! Active-state list - transient values with independent lifetimes
//!
//! Entries are never pruned on a timer. Expired entries are evicted when the
//! list is read through `get_list_states` or `list_has_state`, so a caller
//! that needs bounded memory must read periodically.

use std::sync::Arc;
use std::time::Duration;

use statefy_core::Timestamp;
use tracing::{debug, trace};

use crate::{Channel, ListCallback, StateSet, StateValue, Statefy, Subscription};

/// One active state and its timing
#[derive(Clone, Debug, PartialEq)]
pub struct StateEntry<T> {
    pub state: T,
    pub created_at: Timestamp,
    pub lifetime: Duration,
}

impl<T> StateEntry<T> {
    /// Alive while no more than `lifetime` has passed since creation
    pub fn is_alive(&self, now: Timestamp) -> bool {
        now - self.created_at <= self.lifetime
    }

    pub fn expires_at(&self) -> Timestamp {
        self.created_at + self.lifetime
    }
}

/// Outcome of inserting into the list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// A new entry was appended
    Appended,
    /// An existing entry had its timing reset
    Refreshed,
}

/// Live and expired values found by a sweep
#[derive(Debug)]
pub struct Sweep<T> {
    pub alive: StateSet<T>,
    pub expired: StateSet<T>,
}

/// Insertion-ordered multiset of timed entries
#[derive(Debug)]
pub struct ActiveList<T> {
    entries: Vec<StateEntry<T>>,
}

impl<T: PartialEq + Clone> ActiveList<T> {
    pub fn new() -> Self {
        ActiveList {
            entries: Vec::new(),
        }
    }

    /// Add an entry for `state`
    ///
    /// With `rewrite`, an existing entry for an equal value is restamped in
    /// place. Without it, a second entry with its own timing is appended.
    pub fn insert(
        &mut self,
        state: T,
        now: Timestamp,
        lifetime: Duration,
        rewrite: bool,
    ) -> Insertion {
        if rewrite {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.state == state) {
                entry.created_at = now;
                entry.lifetime = lifetime;
                return Insertion::Refreshed;
            }
        }
        self.entries.push(StateEntry {
            state,
            created_at: now,
            lifetime,
        });
        Insertion::Appended
    }

    /// Remove every entry equal to `state`, returning how many were removed
    pub fn remove_all(&mut self, state: &T) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.state != *state);
        before - self.entries.len()
    }

    /// Classify entries as alive or expired at `now`
    pub fn sweep(&self, now: Timestamp) -> Sweep<T> {
        let mut alive = StateSet::new();
        let mut expired = StateSet::new();
        for entry in &self.entries {
            if entry.is_alive(now) {
                alive.insert(entry.state.clone());
            } else {
                expired.insert(entry.state.clone());
            }
        }
        Sweep { alive, expired }
    }

    /// Number of entries equal to `state`
    pub fn count(&self, state: &T) -> usize {
        self.entries.iter().filter(|e| e.state == *state).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StateEntry<T>] {
        &self.entries
    }
}

impl<T: PartialEq + Clone> Default for ActiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StateValue> Statefy<T> {
    /// Add `state` to the active list for `lifetime`
    ///
    /// Add listeners fire only when a new entry is appended; refreshing an
    /// existing entry under `list_rewrite` is silent.
    pub fn add(&self, state: T, lifetime: Duration) {
        let now = self.shared.clock.now();
        let callbacks = {
            let mut inner = self.shared.inner.lock();
            let rewrite = inner.config.list_rewrite;
            let insertion = inner.list.insert(state.clone(), now, lifetime, rewrite);
            match insertion {
                Insertion::Refreshed => None,
                Insertion::Appended => Some(inner.added.snapshot()),
            }
        };

        match callbacks {
            Some(callbacks) => {
                debug!(state = ?state, ?lifetime, "active state added");
                self.shared.dispatch_list(&callbacks, &state);
            }
            None => trace!(state = ?state, ?lifetime, "active state refreshed"),
        }
    }

    /// Remove every entry equal to `state`
    ///
    /// Remove listeners fire once per call, however many entries matched.
    /// Returns false if nothing matched.
    pub fn remove(&self, state: &T) -> bool {
        let callbacks = {
            let mut inner = self.shared.inner.lock();
            if inner.list.remove_all(state) == 0 {
                return false;
            }
            inner.removed.snapshot()
        };

        debug!(state = ?state, "active state removed");
        self.shared.dispatch_list(&callbacks, state);
        true
    }

    /// Distinct values currently alive in the list
    ///
    /// Every expired entry is evicted as if by `remove`, including alive
    /// siblings of the same value, and each evicted value fires remove
    /// listeners once. The result is taken from the entries as they were
    /// before eviction, so a value with any live entry is reported even if
    /// an expired sibling evicted it.
    pub fn get_list_states(&self) -> StateSet<T> {
        let now = self.shared.clock.now();
        let (sweep, callbacks) = {
            let mut inner = self.shared.inner.lock();
            let sweep = inner.list.sweep(now);
            if sweep.expired.is_empty() {
                return sweep.alive;
            }
            for state in &sweep.expired {
                inner.list.remove_all(state);
            }
            (sweep, inner.removed.snapshot())
        };

        for state in &sweep.expired {
            debug!(state = ?state, "active state expired");
            self.shared.dispatch_list(&callbacks, state);
        }
        sweep.alive
    }

    /// True if `state` is alive in the list; sweeps like `get_list_states`
    pub fn list_has_state(&self, state: &T) -> bool {
        self.get_list_states().contains(state)
    }

    /// Register a listener for values appended to the list
    pub fn on_add<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: ListCallback<T> = Arc::new(callback);
        let id = self.shared.next_subscription_id();
        self.shared.inner.lock().added.insert(id, callback);
        self.subscription(id, Channel::Add)
    }

    /// Register a listener for values removed from the list
    pub fn on_remove<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: ListCallback<T> = Arc::new(callback);
        let id = self.shared.next_subscription_id();
        self.shared.inner.lock().removed.insert(id, callback);
        self.subscription(id, Channel::Remove)
    }

    /// Copy of every entry, expired or not, without sweeping
    pub fn list_entries(&self) -> Vec<StateEntry<T>> {
        self.shared.inner.lock().list.entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use statefy_core::StatefyConfig;
    use statefy_time::{ManualClock, ManualScheduler};

    struct Fixture {
        statefy: Statefy<&'static str>,
        scheduler: Arc<ManualScheduler>,
        added: Arc<Mutex<Vec<&'static str>>>,
        removed: Arc<Mutex<Vec<&'static str>>>,
    }

    fn setup(config: StatefyConfig) -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let statefy = Statefy::with_config("idle", config, clock, scheduler.clone());

        let added = Arc::new(Mutex::new(Vec::new()));
        let removed = Arc::new(Mutex::new(Vec::new()));
        let a = added.clone();
        statefy.on_add(move |s| a.lock().push(*s));
        let r = removed.clone();
        statefy.on_remove(move |s| r.lock().push(*s));

        Fixture {
            statefy,
            scheduler,
            added,
            removed,
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_rewrite_refreshes_entry() {
        let f = setup(StatefyConfig::default());

        f.statefy.add("stunned", ms(10));
        f.statefy.add("stunned", ms(50));
        f.scheduler.run_pending();

        let entries = f.statefy.list_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lifetime, ms(50));
        assert_eq!(*f.added.lock(), vec!["stunned"]);
    }

    #[test]
    fn test_stacking_appends_duplicates() {
        let f = setup(StatefyConfig::stacking());

        f.statefy.add("stunned", ms(10));
        f.statefy.add("stunned", ms(50));
        f.scheduler.run_pending();

        let entries = f.statefy.list_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].lifetime, ms(10));
        assert_eq!(entries[1].lifetime, ms(50));
        assert_eq!(*f.added.lock(), vec!["stunned", "stunned"]);
        assert_eq!(f.statefy.get_list_states().len(), 1);
    }

    #[test]
    fn test_remove_all_matches_fires_once() {
        let f = setup(StatefyConfig::stacking());

        f.statefy.add("burning", ms(100));
        f.statefy.add("burning", ms(100));
        f.statefy.add("wet", ms(100));

        assert!(f.statefy.remove(&"burning"));
        assert!(!f.statefy.remove(&"burning"));
        f.scheduler.run_pending();

        assert_eq!(*f.removed.lock(), vec!["burning"]);
        assert_eq!(f.statefy.list_entries().len(), 1);
    }

    #[test]
    fn test_expiry_sweep_is_lazy() {
        let f = setup(StatefyConfig::default());

        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(11));

        assert_eq!(f.statefy.list_entries().len(), 1);
        assert!(f.removed.lock().is_empty());

        assert!(f.statefy.get_list_states().is_empty());
        f.scheduler.run_pending();
        assert_eq!(*f.removed.lock(), vec!["stunned"]);
        assert!(f.statefy.list_entries().is_empty());
    }

    #[test]
    fn test_entry_alive_at_exact_lifetime() {
        let f = setup(StatefyConfig::default());

        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(10));
        assert!(f.statefy.list_has_state(&"stunned"));

        f.scheduler.advance(ms(1));
        assert!(!f.statefy.list_has_state(&"stunned"));
    }

    #[test]
    fn test_expired_duplicates_remove_once() {
        let f = setup(StatefyConfig::stacking());

        f.statefy.add("stunned", ms(10));
        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(11));

        assert!(f.statefy.get_list_states().is_empty());
        f.scheduler.run_pending();
        assert_eq!(*f.removed.lock(), vec!["stunned"]);
    }

    #[test]
    fn test_expired_sibling_evicts_live_duplicate() {
        let f = setup(StatefyConfig::stacking());

        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(5));
        f.statefy.add("stunned", ms(100));
        f.scheduler.advance(ms(10));

        assert_eq!(f.statefy.get_list_states(), StateSet::from_iter(["stunned"]));
        assert!(f.statefy.list_entries().is_empty());
        f.scheduler.run_pending();
        assert_eq!(*f.removed.lock(), vec!["stunned"]);

        assert!(!f.statefy.list_has_state(&"stunned"));
    }

    #[test]
    fn test_live_sibling_reported_by_collider_read() {
        let f = setup(StatefyConfig::stacking());
        let collider = f.statefy.create_collider(["stunned"]);

        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(5));
        f.statefy.add("stunned", ms(100));
        f.scheduler.advance(ms(10));

        assert!(!collider.check_list());
        assert!(collider.check_list());
    }

    #[test]
    fn test_sweep_keeps_live_values() {
        let f = setup(StatefyConfig::default());

        f.statefy.add("stunned", ms(10));
        f.statefy.add("shielded", ms(100));
        f.scheduler.advance(ms(20));

        let states = f.statefy.get_list_states();
        assert_eq!(states, StateSet::from_iter(["shielded"]));
        assert!(f.statefy.get_list_states().contains(&"shielded"));

        f.scheduler.run_pending();
        assert_eq!(*f.removed.lock(), vec!["stunned"]);
    }

    #[test]
    fn test_refresh_extends_life() {
        let f = setup(StatefyConfig::default());

        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(8));
        f.statefy.add("stunned", ms(10));
        f.scheduler.advance(ms(8));

        assert!(f.statefy.list_has_state(&"stunned"));
    }

    #[test]
    fn test_list_subscription_clear() {
        let f = setup(StatefyConfig::default());
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let sub = f.statefy.on_add(move |_| *c.lock() += 1);

        f.statefy.add("wet", ms(10));
        f.scheduler.run_pending();
        assert!(sub.clear());

        f.statefy.add("cold", ms(10));
        f.scheduler.run_pending();
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_entry_expiry_time() {
        let entry = StateEntry {
            state: 1u8,
            created_at: Timestamp::from_millis(5),
            lifetime: ms(20),
        };
        assert_eq!(entry.expires_at(), Timestamp::from_millis(25));
        assert!(entry.is_alive(Timestamp::from_millis(25)));
        assert!(!entry.is_alive(Timestamp::from_millis(26)));
    }

    proptest! {
        #[test]
        fn prop_rewrite_keeps_one_entry_per_value(
            ops in prop::collection::vec((0u8..4, 0u64..50, 0u64..30), 1..40)
        ) {
            let mut list = ActiveList::new();
            let mut now = Timestamp::ZERO;
            for (state, lifetime, step) in ops {
                now = now + Duration::from_millis(step);
                list.insert(state, now, Duration::from_millis(lifetime), true);
            }
            for state in 0u8..4 {
                prop_assert!(list.count(&state) <= 1);
            }
        }

        #[test]
        fn prop_sweep_partitions_values(
            ops in prop::collection::vec((0u8..4, 0u64..50, 0u64..30), 1..40),
            at_ms in 0u64..2000,
        ) {
            let mut list = ActiveList::new();
            let mut now = Timestamp::ZERO;
            for (state, lifetime, step) in ops {
                now = now + Duration::from_millis(step);
                list.insert(state, now, Duration::from_millis(lifetime), false);
            }
            let sweep = list.sweep(Timestamp::from_millis(at_ms));
            for entry in list.entries() {
                prop_assert!(sweep.alive.contains(&entry.state) || sweep.expired.contains(&entry.state));
            }
            let t = Timestamp::from_millis(at_ms);
            for state in &sweep.alive {
                prop_assert!(list.entries().iter().any(|e| e.state == *state && e.is_alive(t)));
            }
            for state in &sweep.expired {
                prop_assert!(list.entries().iter().any(|e| e.state == *state && !e.is_alive(t)));
            }
        }
    }
}

//! The state container: current state, configuration and listener plumbing

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use statefy_core::{StatefyConfig, StatefyResult, SubscriptionId};
use statefy_time::{Clock, MonotonicClock, Scheduler, TokioScheduler};
use tracing::{debug, trace};

use crate::subscription::SubscriberSet;
use crate::{
    ActiveList, ChangeCallback, ChangeSubscription, Channel, ListCallback, StateValue,
    Subscription, TemporalOverride,
};

/// Mutable container state, only touched under the lock
pub(crate) struct Inner<T> {
    pub(crate) current: T,
    pub(crate) temporal: Option<TemporalOverride<T>>,
    pub(crate) list: ActiveList<T>,
    pub(crate) change: SubscriberSet<ChangeCallback<T>>,
    pub(crate) added: SubscriberSet<ListCallback<T>>,
    pub(crate) removed: SubscriberSet<ListCallback<T>>,
    pub(crate) config: StatefyConfig,
}

impl<T> Inner<T> {
    /// The override if armed, else the current state
    pub(crate) fn effective(&self) -> &T {
        match &self.temporal {
            Some(temporal) => &temporal.value,
            None => &self.current,
        }
    }
}

/// State shared by a container and every handle derived from it
///
/// The lock is never held while a callback runs or while work is handed to
/// the scheduler, so listeners may re-enter the container freely.
pub(crate) struct Shared<T> {
    pub(crate) inner: Mutex<Inner<T>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    next_subscription: AtomicU64,
}

impl<T> Shared<T> {
    pub(crate) fn next_subscription_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn unsubscribe(&self, channel: Channel, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let removed = match channel {
            Channel::Change => inner.change.remove(id),
            Channel::Add => inner.added.remove(id),
            Channel::Remove => inner.removed.remove(id),
        };
        if removed {
            trace!(?channel, %id, "listener cleared");
        }
        removed
    }
}

impl<T: StateValue> Shared<T> {
    pub(crate) fn get(&self) -> T {
        self.inner.lock().effective().clone()
    }

    /// Queue one task per change listener
    pub(crate) fn dispatch_change(&self, callbacks: &[ChangeCallback<T>], new: &T, old: &T) {
        for callback in callbacks {
            let callback = Arc::clone(callback);
            let new = new.clone();
            let old = old.clone();
            self.scheduler.spawn(Box::new(move || callback(&new, &old)));
        }
    }

    /// Queue one task per list listener
    pub(crate) fn dispatch_list(&self, callbacks: &[ListCallback<T>], state: &T) {
        for callback in callbacks {
            let callback = Arc::clone(callback);
            let state = state.clone();
            self.scheduler.spawn(Box::new(move || callback(&state)));
        }
    }
}

/// State container
///
/// Cloning yields another handle to the same container.
pub struct Statefy<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Statefy<T> {
    fn clone(&self) -> Self {
        Statefy {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: StateValue> Statefy<T> {
    /// Create a container with default configuration
    pub fn new(
        initial: T,
        clock: impl Clock + 'static,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self::with_config(initial, StatefyConfig::default(), clock, scheduler)
    }

    /// Create a container with custom configuration
    ///
    /// `config` is taken as given; use [`Statefy::builder`] to have it
    /// validated. Unusable binding field names surface later as rejected,
    /// warn-logged writes from `bind_instance`.
    pub fn with_config(
        initial: T,
        config: StatefyConfig,
        clock: impl Clock + 'static,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self::from_parts(initial, config, Arc::new(clock), Arc::new(scheduler))
    }

    pub fn builder(initial: T) -> StatefyBuilder<T> {
        StatefyBuilder::new(initial)
    }

    fn from_parts(
        initial: T,
        config: StatefyConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let inner = Inner {
            current: initial,
            temporal: None,
            list: ActiveList::new(),
            change: SubscriberSet::new(),
            added: SubscriberSet::new(),
            removed: SubscriberSet::new(),
            config,
        };
        Statefy {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                clock,
                scheduler,
                next_subscription: AtomicU64::new(0),
            }),
        }
    }

    /// Current state, or the temporal override while one is armed
    pub fn get(&self) -> T {
        self.shared.get()
    }

    /// Replace the current state
    ///
    /// Without `override_equality`, setting the value already held is a
    /// no-op. Otherwise every change listener is queued with `(value, old)`,
    /// where `old` is read through any armed temporal override. The override
    /// itself is left in place.
    pub fn set(&self, value: T) {
        let (old, callbacks) = {
            let mut inner = self.shared.inner.lock();
            if !inner.config.override_equality && inner.current == value {
                trace!(state = ?value, "set to current state ignored");
                return;
            }
            let old = inner.effective().clone();
            inner.current = value.clone();
            (old, inner.change.snapshot())
        };

        debug!(new = ?value, old = ?old, listeners = callbacks.len(), "state changed");
        self.shared.dispatch_change(&callbacks, &value, &old);
    }

    /// Register a change listener, called with `(new, old)`
    pub fn on_change<F>(&self, callback: F) -> ChangeSubscription<T>
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let callback: ChangeCallback<T> = Arc::new(callback);
        let id = self.shared.next_subscription_id();
        self.shared.inner.lock().change.insert(id, Arc::clone(&callback));
        ChangeSubscription::new(self.subscription(id, Channel::Change), callback)
    }

    /// Drop every change, add and remove listener
    ///
    /// Notifications already queued and an armed temporal timer still run.
    pub fn clear_all_listeners(&self) {
        let mut inner = self.shared.inner.lock();
        let total = inner.change.len() + inner.added.len() + inner.removed.len();
        inner.change.clear();
        inner.added.clear();
        inner.removed.clear();
        debug!(cleared = total, "all listeners cleared");
    }

    /// Number of registered listeners on a channel
    pub fn listener_count(&self, channel: Channel) -> usize {
        let inner = self.shared.inner.lock();
        match channel {
            Channel::Change => inner.change.len(),
            Channel::Add => inner.added.len(),
            Channel::Remove => inner.removed.len(),
        }
    }

    pub fn override_equality(&self) -> bool {
        self.shared.inner.lock().config.override_equality
    }

    pub fn set_override_equality(&self, enabled: bool) {
        self.shared.inner.lock().config.override_equality = enabled;
    }

    pub fn list_rewrite(&self) -> bool {
        self.shared.inner.lock().config.list_rewrite
    }

    pub fn set_list_rewrite(&self, enabled: bool) {
        self.shared.inner.lock().config.list_rewrite = enabled;
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> StatefyConfig {
        self.shared.inner.lock().config.clone()
    }

    pub(crate) fn subscription(&self, id: SubscriptionId, channel: Channel) -> Subscription<T> {
        Subscription::new(id, channel, Arc::downgrade(&self.shared))
    }
}

impl<T: fmt::Debug> fmt::Debug for Statefy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Statefy")
            .field("current", &inner.current)
            .field("temporal", &inner.temporal)
            .field("list", &inner.list)
            .field("config", &inner.config)
            .finish()
    }
}

/// Builder for a [`Statefy`] container
///
/// Unset collaborators default to [`MonotonicClock`] and the tokio runtime
/// the builder is called from.
pub struct StatefyBuilder<T> {
    initial: T,
    config: StatefyConfig,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl<T: StateValue> StatefyBuilder<T> {
    pub fn new(initial: T) -> Self {
        StatefyBuilder {
            initial,
            config: StatefyConfig::default(),
            clock: None,
            scheduler: None,
        }
    }

    pub fn config(mut self, config: StatefyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    pub fn build(self) -> StatefyResult<Statefy<T>> {
        self.config.validate()?;
        let clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::current()?),
        };
        Ok(Statefy::from_parts(self.initial, self.config, clock, scheduler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statefy_core::StatefyError;
    use statefy_time::{ManualClock, ManualScheduler};

    type Log = Arc<Mutex<Vec<(&'static str, &'static str)>>>;

    fn setup(config: StatefyConfig) -> (Statefy<&'static str>, Arc<ManualScheduler>) {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let statefy = Statefy::with_config("idle", config, clock, scheduler.clone());
        (statefy, scheduler)
    }

    fn record(statefy: &Statefy<&'static str>) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        statefy.on_change(move |new, old| l.lock().push((*new, *old)));
        log
    }

    #[test]
    fn test_set_same_value_is_noop() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let log = record(&statefy);

        statefy.set("idle");
        assert_eq!(scheduler.run_pending(), 0);
        assert!(log.lock().is_empty());

        statefy.set("run");
        statefy.set("run");
        scheduler.run_pending();
        assert_eq!(*log.lock(), vec![("run", "idle")]);
    }

    #[test]
    fn test_override_equality_always_notifies() {
        let (statefy, scheduler) = setup(StatefyConfig::forced());
        let log = record(&statefy);

        statefy.set("idle");
        statefy.set("idle");
        scheduler.run_pending();

        assert_eq!(*log.lock(), vec![("idle", "idle"), ("idle", "idle")]);
    }

    #[test]
    fn test_notifications_are_deferred() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let log = record(&statefy);

        statefy.set("run");
        assert_eq!(statefy.get(), "run");
        assert!(log.lock().is_empty());

        scheduler.run_pending();
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_clear_unregisters_listener() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let sub = statefy.on_change(move |new, old| l.lock().push((*new, *old)));

        assert!(sub.clear());
        assert!(!sub.clear());
        assert_eq!(statefy.listener_count(Channel::Change), 0);

        statefy.set("run");
        scheduler.run_pending();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_call_resyncs_synchronously() {
        let (statefy, _scheduler) = setup(StatefyConfig::default());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let sub = statefy.on_change(move |new, old| l.lock().push((*new, *old)));

        sub.call();
        assert_eq!(*log.lock(), vec![("idle", "idle")]);
    }

    #[test]
    fn test_every_change_listener_notified() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let first = record(&statefy);
        let second = record(&statefy);

        statefy.set("run");
        statefy.set("walk");
        assert_eq!(scheduler.run_pending(), 4);

        assert_eq!(*first.lock(), vec![("run", "idle"), ("walk", "run")]);
        assert_eq!(*first.lock(), *second.lock());
        assert_eq!(statefy.listener_count(Channel::Change), 2);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        statefy.on_change(|_, _| panic!("listener failed"));
        let log = record(&statefy);

        statefy.set("run");
        scheduler.run_pending();

        assert_eq!(*log.lock(), vec![("run", "idle")]);
        assert_eq!(statefy.get(), "run");
    }

    #[test]
    fn test_listener_may_reenter() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let handle = statefy.clone();
        statefy.on_change(move |new, _| {
            if *new == "run" {
                handle.set("walk");
            }
        });

        statefy.set("run");
        scheduler.run_pending();
        assert_eq!(statefy.get(), "walk");
    }

    #[test]
    fn test_clear_all_listeners() {
        let (statefy, scheduler) = setup(StatefyConfig::default());
        let log = record(&statefy);
        statefy.on_add(|_| {});
        statefy.on_remove(|_| {});

        statefy.clear_all_listeners();
        assert_eq!(statefy.listener_count(Channel::Change), 0);
        assert_eq!(statefy.listener_count(Channel::Add), 0);
        assert_eq!(statefy.listener_count(Channel::Remove), 0);

        statefy.set("run");
        scheduler.run_pending();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_runtime_flags() {
        let (statefy, _scheduler) = setup(StatefyConfig::default());
        assert!(!statefy.override_equality());
        assert!(statefy.list_rewrite());

        statefy.set_override_equality(true);
        statefy.set_list_rewrite(false);
        assert_eq!(
            statefy.config(),
            StatefyConfig::default()
                .with_override_equality(true)
                .with_list_rewrite(false)
        );
    }

    #[test]
    fn test_builder_without_runtime_fails() {
        let result = Statefy::builder("idle").clock(ManualClock::new()).build();
        assert!(matches!(result, Err(StatefyError::RuntimeUnavailable(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let clock = Arc::new(ManualClock::new());
        let result = Statefy::builder("idle")
            .config(StatefyConfig::default().with_binding_fields("", ""))
            .scheduler(ManualScheduler::new(clock))
            .build();
        assert!(matches!(result, Err(StatefyError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_builder_inside_runtime() {
        let statefy = Statefy::builder(0u32).build().unwrap();
        statefy.set(3);
        assert_eq!(statefy.get(), 3);
    }
}

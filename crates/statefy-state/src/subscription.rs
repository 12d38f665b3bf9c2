//! Subscription bookkeeping and handles

use std::fmt;
use std::sync::{Arc, Weak};

use statefy_core::SubscriptionId;

use crate::container::Shared;
use crate::StateValue;

/// Change listener, called with `(new, old)`
pub type ChangeCallback<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

/// Active-list listener, called with the added or removed value
pub type ListCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Which notification stream a subscription belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Change,
    Add,
    Remove,
}

/// Registered callbacks of one channel, in registration order
pub(crate) struct SubscriberSet<F> {
    entries: Vec<(SubscriptionId, F)>,
}

impl<F: Clone> SubscriberSet<F> {
    pub(crate) fn new() -> Self {
        SubscriberSet {
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, id: SubscriptionId, callback: F) {
        self.entries.push((id, callback));
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the callbacks, so they can be dispatched without the lock
    pub(crate) fn snapshot(&self) -> Vec<F> {
        self.entries.iter().map(|(_, f)| f.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle to a registered listener
///
/// Dropping the handle leaves the listener registered; call [`clear`](Self::clear)
/// to remove it. The handle does not keep the container alive.
pub struct Subscription<T> {
    id: SubscriptionId,
    channel: Channel,
    shared: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(id: SubscriptionId, channel: Channel, shared: Weak<Shared<T>>) -> Self {
        Subscription {
            id,
            channel,
            shared,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Unregister the listener
    /// Returns false if it was already gone (cleared, or the container dropped)
    pub fn clear(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.unsubscribe(self.channel, self.id),
            None => false,
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Handle to a change listener, which can also be forced to resync
pub struct ChangeSubscription<T> {
    subscription: Subscription<T>,
    callback: ChangeCallback<T>,
}

impl<T: StateValue> ChangeSubscription<T> {
    pub(crate) fn new(subscription: Subscription<T>, callback: ChangeCallback<T>) -> Self {
        ChangeSubscription {
            subscription,
            callback,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    pub fn clear(&self) -> bool {
        self.subscription.clear()
    }

    /// Invoke the listener now, synchronously, with `(get(), get())`
    /// Does nothing once the container is gone.
    pub fn call(&self) {
        if let Some(shared) = self.subscription.shared.upgrade() {
            let value = shared.get();
            (self.callback)(&value, &value);
        }
    }

    /// Downgrade to a plain handle, dropping the ability to `call`
    pub fn into_subscription(self) -> Subscription<T> {
        self.subscription
    }
}

impl<T> fmt::Debug for ChangeSubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("id", &self.subscription.id)
            .finish()
    }
}

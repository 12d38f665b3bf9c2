//! Notification recording

use std::sync::Arc;

use parking_lot::Mutex;
use statefy_state::{StateValue, Statefy, Subscription};

/// A delivered notification
#[derive(Clone, Debug, PartialEq)]
pub enum Notification<T> {
    Changed { new: T, old: T },
    Added(T),
    Removed(T),
}

/// Records every notification a container delivers, in delivery order
pub struct Recorder<T> {
    log: Arc<Mutex<Vec<Notification<T>>>>,
    subscriptions: Vec<Subscription<T>>,
}

impl<T: StateValue> Recorder<T> {
    /// Subscribe to change, add and remove notifications
    pub fn attach(statefy: &Statefy<T>) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        let change = statefy
            .on_change(move |new: &T, old: &T| {
                l.lock().push(Notification::Changed {
                    new: new.clone(),
                    old: old.clone(),
                })
            })
            .into_subscription();
        let l = log.clone();
        let add = statefy.on_add(move |s: &T| l.lock().push(Notification::Added(s.clone())));
        let l = log.clone();
        let remove = statefy.on_remove(move |s: &T| l.lock().push(Notification::Removed(s.clone())));

        Recorder {
            log,
            subscriptions: vec![change, add, remove],
        }
    }

    pub fn notifications(&self) -> Vec<Notification<T>> {
        self.log.lock().clone()
    }

    /// Delivered `(new, old)` change pairs
    pub fn changes(&self) -> Vec<(T, T)> {
        self.log
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Changed { new, old } => Some((new.clone(), old.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn added(&self) -> Vec<T> {
        self.log
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Added(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<T> {
        self.log
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Removed(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Forget everything recorded so far
    pub fn reset(&self) {
        self.log.lock().clear();
    }

    /// Unsubscribe from the container
    pub fn detach(self) {
        for subscription in &self.subscriptions {
            subscription.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Harness;

    #[test]
    fn test_recorder_captures_all_channels() {
        let harness = Harness::new("idle");
        let recorder = Recorder::attach(harness.statefy());

        harness.statefy().set("run");
        harness.statefy().add("wet", std::time::Duration::from_millis(5));
        harness.statefy().remove(&"wet");
        harness.settle();

        assert_eq!(
            recorder.notifications(),
            vec![
                Notification::Changed {
                    new: "run",
                    old: "idle"
                },
                Notification::Added("wet"),
                Notification::Removed("wet"),
            ]
        );
    }

    #[test]
    fn test_recorder_detach() {
        let harness = Harness::new(0u8);
        let recorder = Recorder::attach(harness.statefy());
        let log = recorder.log.clone();

        recorder.detach();
        harness.statefy().set(1);
        harness.settle();

        assert!(log.lock().is_empty());
    }
}

//! One-way mirroring of state changes onto an external property bag

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use statefy_core::{StatefyError, StatefyResult};
use tracing::warn;

use crate::{StateValue, Statefy, Subscription};

/// Anything that accepts named property writes
pub trait PropertyBag<T>: Send + Sync {
    fn set_property(&self, name: &str, value: T) -> StatefyResult<()>;
}

impl<T, B: PropertyBag<T> + ?Sized> PropertyBag<T> for Arc<B> {
    fn set_property(&self, name: &str, value: T) -> StatefyResult<()> {
        (**self).set_property(name, value)
    }
}

/// In-memory property bag
#[derive(Debug)]
pub struct PropertyMap<T> {
    properties: Mutex<HashMap<String, T>>,
}

impl<T: Clone> Default for PropertyMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> PropertyMap<T> {
    pub fn new() -> Self {
        PropertyMap {
            properties: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.properties.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.properties.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.lock().is_empty()
    }
}

impl<T: Send> PropertyBag<T> for PropertyMap<T> {
    fn set_property(&self, name: &str, value: T) -> StatefyResult<()> {
        if name.is_empty() {
            return Err(StatefyError::BindingRejected {
                field: String::new(),
                reason: "empty property name".to_string(),
            });
        }
        self.properties.lock().insert(name.to_string(), value);
        Ok(())
    }
}

impl<T: StateValue> Statefy<T> {
    /// Mirror every change onto `bag`
    ///
    /// Each change writes the new value to the configured state field and
    /// the previous value to the old-state field. Nothing is read back. A
    /// rejected write is logged and does not stop the other write.
    pub fn bind_instance<B>(&self, bag: B) -> Subscription<T>
    where
        B: PropertyBag<T> + 'static,
    {
        let config = self.config();
        let state_field = config.state_field;
        let old_state_field = config.old_state_field;

        self.on_change(move |new, old| {
            if let Err(e) = bag.set_property(&state_field, new.clone()) {
                warn!("Binding write failed: {}", e);
            }
            if let Err(e) = bag.set_property(&old_state_field, old.clone()) {
                warn!("Binding write failed: {}", e);
            }
        })
        .into_subscription()
    }
}

//! Collider - gate an action against the current state and the active list

use std::fmt;

use crate::{StateSet, StateValue, Statefy};

/// Predicate over a container and a forbidden set of values
///
/// Nothing is cached; every check reads the container afresh.
pub struct Collider<T> {
    statefy: Statefy<T>,
    forbidden: StateSet<T>,
}

impl<T: StateValue> Collider<T> {
    /// True if the current (or overriding) state is not forbidden
    pub fn check_state(&self) -> bool {
        !self.forbidden.contains(&self.statefy.get())
    }

    /// True if no forbidden value is alive in the active list
    /// Sweeps the list, like `get_list_states`.
    pub fn check_list(&self) -> bool {
        !self.statefy.get_list_states().intersects(&self.forbidden)
    }

    /// Both `check_state` and `check_list`
    pub fn check(&self) -> bool {
        self.check_state() && self.check_list()
    }

    pub fn forbidden(&self) -> &StateSet<T> {
        &self.forbidden
    }
}

impl<T: fmt::Debug> fmt::Debug for Collider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collider")
            .field("forbidden", &self.forbidden)
            .finish()
    }
}

impl<T: StateValue> Statefy<T> {
    /// Build a collider that fails when any of `forbidden` is current or active
    pub fn create_collider(&self, forbidden: impl IntoIterator<Item = T>) -> Collider<T> {
        Collider {
            statefy: self.clone(),
            forbidden: forbidden.into_iter().collect(),
        }
    }
}

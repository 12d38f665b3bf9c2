//! State values and equality-based sets

use std::fmt;

/// Anything a container can hold
///
/// Equality is the only comparison the container relies on; values need
/// not be hashable or ordered.
pub trait StateValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> StateValue for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Small insertion-ordered set deduplicated by `PartialEq`
///
/// Lookups are linear. Active lists and forbidden sets hold a handful of
/// values, so this beats hashing and keeps the `Hash` bound off `T`.
#[derive(Clone)]
pub struct StateSet<T> {
    items: Vec<T>,
}

impl<T: PartialEq> StateSet<T> {
    pub fn new() -> Self {
        StateSet { items: Vec::new() }
    }

    /// Insert a value, returns false if an equal value was already present
    pub fn insert(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.items.push(value);
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.iter().any(|v| v == value)
    }

    pub fn remove(&mut self, value: &T) -> bool {
        let before = self.items.len();
        self.items.retain(|v| v != value);
        self.items.len() != before
    }

    /// True if any value is present in both sets
    pub fn intersects(&self, other: &StateSet<T>) -> bool {
        self.items.iter().any(|v| other.contains(v))
    }

    /// Values of `self` that are not in `other`
    pub fn difference(mut self, other: &StateSet<T>) -> Self {
        self.items.retain(|v| !other.contains(v));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: PartialEq> Default for StateSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Set equality, independent of insertion order
impl<T: PartialEq> PartialEq for StateSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|v| other.contains(v))
    }
}

impl<T: Eq> Eq for StateSet<T> {}

impl<T: fmt::Debug> fmt::Debug for StateSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl<T: PartialEq> FromIterator<T> for StateSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = StateSet::new();
        set.extend(iter);
        set
    }
}

impl<T: PartialEq> Extend<T> for StateSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> IntoIterator for StateSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a StateSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

//! Statefy State - the state container
//!
//! A `Statefy<T>` tracks:
//! - one current value, replaced by `set` and observed by `on_change`
//! - an optional temporal override that masks the current value until it expires
//! - a list of transient active states, each with its own lifetime
//!
//! Colliders combine the current value and the active list into a single
//! "is this allowed" predicate against a forbidden set.
//!
//! Mutations update memory synchronously and hand notifications to the
//! injected scheduler; they never wait for listeners.

pub mod binding;
pub mod collider;
pub mod container;
pub mod list;
pub mod subscription;
pub mod temporal;
pub mod value;

pub use binding::*;
pub use collider::*;
pub use container::*;
pub use list::*;
pub use subscription::*;
pub use temporal::*;
pub use value::*;

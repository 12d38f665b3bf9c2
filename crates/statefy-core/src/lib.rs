//! Statefy Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Statefy crate:
//! - Time primitives (Timestamp)
//! - Identifiers (SubscriptionId)
//! - Container configuration
//! - Error taxonomy

pub mod config;
pub mod error;
pub mod id;
pub mod time;

pub use config::*;
pub use error::*;
pub use id::*;
pub use time::*;

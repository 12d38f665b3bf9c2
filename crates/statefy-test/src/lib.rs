//! Statefy Test Harness - deterministic drivers and scenario fuzzing
//!
//! This crate provides:
//! - A container wired to a manual clock and scheduler
//! - Notification recording
//! - Seeded random operation sequences checked against container invariants
//! - Test logging setup

pub mod fuzzer;
pub mod harness;
pub mod recorder;

pub use fuzzer::*;
pub use harness::*;
pub use recorder::*;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber
///
/// Honors `RUST_LOG`, defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

//! Error types for Statefy

use thiserror::Error;

/// Statefy errors
///
/// Container operations themselves are infallible; these cover construction,
/// configuration and the property-bag boundary.
#[derive(Error, Debug)]
pub enum StatefyError {
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Property bag rejected field {field}: {reason}")]
    BindingRejected { field: String, reason: String },
}

/// Result type for Statefy operations
pub type StatefyResult<T> = Result<T, StatefyError>;

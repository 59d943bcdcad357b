use thiserror::Error;

use crate::{HalVersion, Serial};

/// Errors that can occur while talking to the radio configuration service.
///
/// Errors are `Clone` so a single failure (for example a session teardown)
/// can be delivered to every pending completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// No session could be established. Transient; the caller may retry later.
    #[error("radio config service unavailable")]
    Unavailable,

    /// The connected service version lacks the requested operation.
    #[error("{operation} not supported by service version {version}")]
    NotSupported {
        operation: &'static str,
        version: HalVersion,
    },

    /// A record could not be decoded (truncated, over-length or invalid field).
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A response arrived for a serial that is not outstanding.
    #[error("stale response for serial {0}")]
    StaleResponse(Serial),

    /// The requested service version is not registered with the provider.
    #[error("service version {0} not found")]
    NotFound(HalVersion),

    /// Transport failure that may succeed on retry.
    #[error("retryable transport error: {0}")]
    TransportRetryable(String),

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-zero status code.
    #[error("service returned status {0}")]
    Remote(i32),

    /// Required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        // ---
        RpcError::Config(err.to_string())
    }
}

/// Result type alias for radio config operations
pub type Result<T> = std::result::Result<T, RpcError>;

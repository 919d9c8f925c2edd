//! Unified error handling for the bridge.
//!
//! Every failure inside a single poll tick or a single inbound/outbound event
//! is expressed as a `BridgeError` so the caller can decide whether it is an
//! expected outcome (`NotFound`, `ThreadNotFound`) or something to log and
//! drop (`Transport`, `NoReadableBody`, `Store`).

use shared_types::ThreadHandle;
use thiserror::Error;

/// Unified error type for the polling and reconciliation engine
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Expected miss; drives create-on-miss logic
    #[error("{0} not found")]
    NotFound(String),

    /// A chat thread that this bridge never created
    #[error("thread {0} is not managed by this bridge")]
    ThreadNotFound(ThreadHandle),

    /// Mailbox, chat platform or mail sender failure
    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// Body extraction found nothing human-readable
    #[error("no readable body: {0}")]
    NoReadableBody(String),

    /// `start` called on a poller that is already running
    #[error("mailbox poller is already running")]
    AlreadyRunning,

    /// Database connection pool error
    #[error("Database connection error")]
    ConnectionPool(#[source] diesel_async::pooled_connection::deadpool::PoolError),

    /// Database query error
    #[error("Database error: {0}")]
    Store(#[from] diesel::result::Error),

    /// Environment variable missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Create a not found error for the given resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        BridgeError::NotFound(resource.into())
    }

    /// Wrap any displayable failure from an external service
    pub fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        BridgeError::Transport {
            service,
            message: err.to_string(),
        }
    }

    /// Create a config error for missing env vars
    pub fn missing_env(var_name: &str) -> Self {
        BridgeError::Config(format!("{} environment variable must be set", var_name))
    }

    /// True for outcomes the caller is expected to handle quietly
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BridgeError::NotFound(_) | BridgeError::ThreadNotFound(_)
        )
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for BridgeError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        BridgeError::ConnectionPool(err)
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

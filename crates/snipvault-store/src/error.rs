//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the remote content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Path, commit or blob does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The expected content hash did not match the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote rejected the request (auth, rate limit, server error).
    #[error("Remote error: {message}")]
    Remote {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Response body or failure description.
        message: String,
    },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with something we could not interpret.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Lock was poisoned (another thread panicked while holding the lock)
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Create a not found error for a path, sha or object id.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a remote error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

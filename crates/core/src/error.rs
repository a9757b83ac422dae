//! Error types for sift
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Fetch failures (`Transport`, `OffsetLimitExceeded`, `ScrollExpired`)
//! terminate the sequence that observed them. `Decode` failures are skipped
//! by the document façade. `CleanupFailed` is only ever logged.

use thiserror::Error;

/// Result type alias for sift operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single match could not be turned into an element
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode match '{id}': {reason}")]
pub struct DecodeError {
    /// Identifier of the offending match
    pub id: String,
    /// What went wrong
    pub reason: String,
}

impl DecodeError {
    /// Create a decode error for match `id`
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Error types for sift
#[derive(Debug, Error)]
pub enum Error {
    /// Network or remote failure during a fetch
    #[error("Transport error: {0}")]
    Transport(String),

    /// Offset paging reached the remote's maximum result window
    #[error(
        "Offset limit exceeded: from {from} + size {size} is beyond max result window {max_result_window}"
    )]
    OffsetLimitExceeded {
        /// Offset of the rejected page
        from: usize,
        /// Size of the rejected page
        size: usize,
        /// Remote ceiling on from + size
        max_result_window: usize,
    },

    /// The scroll context expired or was released remotely
    #[error("Scroll context expired: {0}")]
    ScrollExpired(String),

    /// A match could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Releasing a scroll context failed
    #[error("Cleanup failed for scroll {scroll_id}: {reason}")]
    CleanupFailed {
        /// Scroll id that could not be released
        scroll_id: String,
        /// What went wrong
        reason: String,
    },

    /// The request cannot be served as built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Whether this error came from a fetch and therefore terminated a sequence
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::OffsetLimitExceeded { .. } | Error::ScrollExpired(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(format!("malformed response: {}", e))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

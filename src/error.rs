//! Error types for livetab
//!
//! One error enum covers the whole crate: engine failures bubbling out of
//! rusqlite, wire-protocol problems on the server/client path, and the
//! policy errors (bad identifiers, refused binds) livetab raises itself.

use thiserror::Error;

/// Result type alias for livetab operations
pub type Result<T> = std::result::Result<T, LivetabError>;

/// Main error type for livetab operations
#[derive(Debug, Error)]
pub enum LivetabError {
    /// Engine-level failure reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Table or module name failed the `[A-Za-z0-9_]+` check
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Socket-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON on the wire
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wire-protocol violation (framing, unexpected shape)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Frame exceeded the configured size cap
    #[error("message of {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Request rejected by token authentication
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid server or client configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Error reported by a remote livetab server
    #[error("remote error: {0}")]
    Remote(String),
}

impl LivetabError {
    /// Shorthand for protocol violations.
    pub fn protocol(msg: impl Into<String>) -> Self {
        LivetabError::Protocol(msg.into())
    }
}

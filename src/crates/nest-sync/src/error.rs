//! Error types for the sync core

use crate::decoder::DecodeFailure;
use thiserror::Error;

/// Errors that can occur while synchronizing feeds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// No bearer credential was available for an operation that needs one
    #[error("Authentication required")]
    AuthRequired,

    /// Transient transport failure (connect refused, socket reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote rejected a specific request
    #[error("HTTP error {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Response detail or reason phrase
        message: String,
    },

    /// A push frame could not be decoded
    #[error("Decode failure: {0}")]
    Decode(#[from] DecodeFailure),

    /// The push channel gave up after exhausting its reconnect budget
    #[error("Reconnect failed after {attempts} attempts")]
    MaxReconnectExceeded {
        /// Number of reconnect attempts made before giving up
        attempts: u32,
    },

    /// A search was requested with a blank query
    #[error("Search query is empty")]
    EmptyQuery,

    /// The connection manager task is no longer running
    #[error("Connection manager has shut down")]
    ChannelClosed,
}

impl SyncError {
    /// Build an HTTP error from a status code and message
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        SyncError::Http {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure is a transport hiccup rather than a rejection
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

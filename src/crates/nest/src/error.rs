//! Error types for the nest application

use nest_sync::SyncError;
use thiserror::Error;

/// Errors that can occur in the nest application
#[derive(Debug, Error)]
pub enum NestError {
    /// Failure reported by the sync core
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Stored credential could not be read or written
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML rendering error
    #[error("TOML rendering error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl NestError {
    /// Message suitable for showing to the user
    ///
    /// Sign-in and empty-query errors get the wording the web client uses.
    pub fn user_message(&self) -> String {
        match self {
            NestError::Sync(SyncError::AuthRequired) => {
                "Please log in first (nest login --token <jwt>)".to_string()
            }
            NestError::Sync(SyncError::EmptyQuery) => "Please enter a search term".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for nest operations
pub type Result<T> = std::result::Result<T, NestError>;

//! Bearer credential storage
//!
//! The credential is kept as JSON at `~/.nest/credentials.json` so that
//! separate `nest` invocations share one sign-in.

use crate::error::{NestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A stored sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// JWT bearer token
    pub access_token: String,

    /// User name the token was issued to, if known
    pub username: Option<String>,

    /// When the token was stored
    pub saved_at: DateTime<Utc>,

    /// Expiration time, if known
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredential {
    /// Create a credential stored now, without a known expiry
    pub fn new(access_token: impl Into<String>, username: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            username,
            saved_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Set the expiration time
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }
}

/// Loads, saves and clears the stored credential
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Standard location (~/.nest/credentials.json)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nest")
            .join("credentials.json")
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential; expired or missing credentials load as `None`
    pub async fn load(&self) -> Result<Option<StoredCredential>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored credential");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let credential: StoredCredential = serde_json::from_str(&content)
            .map_err(|e| NestError::Credentials(format!("Failed to parse credential: {}", e)))?;

        if credential.is_expired() {
            warn!("stored credential is expired");
            return Ok(None);
        }
        Ok(Some(credential))
    }

    /// Save `credential`, replacing any stored one
    pub async fn save(&self, credential: &StoredCredential) -> Result<()> {
        if credential.access_token.trim().is_empty() {
            return Err(nest_sync::SyncError::AuthRequired.into());
        }

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, content).await?;

        info!(path = %self.path.display(), user = ?credential.username, "credential saved");
        Ok(())
    }

    /// Remove the stored credential; returns whether one existed
    pub async fn clear(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("credential cleared");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

//! Configuration schema for the nest client

use crate::error::{NestError, Result};
use nest_sync::{BackoffPolicy, SyncOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main nest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NestConfig {
    /// Server endpoints
    #[serde(default)]
    pub server: ServerConfig,

    /// Push channel and pagination tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// REST API base URL
    pub api_url: String,

    /// Push channel URL; the bearer token is appended as `?token=`
    pub ws_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001/v1".to_string(),
            ws_url: "ws://localhost:8001/v1/ws".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ServerConfig {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay before the first reconnect, in milliseconds
    pub base_delay_ms: u64,

    /// Reconnect attempts before giving up
    pub max_attempts: u32,

    /// Cap for a single reconnect delay, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    /// Randomize reconnect delays
    pub jitter: bool,

    /// Articles per page
    pub page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 10,
            max_delay_ms: None,
            jitter: false,
            page_size: 20,
        }
    }
}

impl SyncConfig {
    /// Reconnect policy described by this section
    pub fn backoff_policy(&self) -> BackoffPolicy {
        let policy = BackoffPolicy::new(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_jitter(self.jitter);
        match self.max_delay_ms {
            Some(max) => policy.with_max_delay(Duration::from_millis(max)),
            None => policy,
        }
    }

    /// Options for starting a sync session
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            backoff: self.backoff_policy(),
            page_size: self.page_size,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl NestConfig {
    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sync.page_size == 0 {
            return Err(NestError::Config("sync.page_size must be at least 1".to_string()));
        }
        if self.sync.base_delay_ms == 0 {
            return Err(NestError::Config("sync.base_delay_ms must be positive".to_string()));
        }
        for (key, url) in [("server.api_url", &self.server.api_url), ("server.ws_url", &self.server.ws_url)] {
            reqwest::Url::parse(url)
                .map_err(|e| NestError::Config(format!("{} '{}' is not a valid URL: {}", key, url, e)))?;
        }
        Ok(())
    }
}

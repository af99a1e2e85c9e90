//! Configuration initialization and directory setup

use crate::Result;
use std::path::{Path, PathBuf};
use tokio::fs;

const DEFAULT_CONFIG: &str = r#"# News Nest client configuration
#
# Project-level config (./.nest/nest.toml) overrides user-level config (~/.nest/nest.toml)

[server]
api_url = "http://localhost:8001/v1"
ws_url = "ws://localhost:8001/v1/ws"
timeout_seconds = 30

[sync]
base_delay_ms = 1000          # first reconnect delay, doubled per attempt
max_attempts = 10             # reconnects before giving up
# max_delay_ms = 30000        # cap for a single delay
jitter = false
page_size = 20

[ui]
log_level = "info"            # trace, debug, info, warn, error
"#;

/// Text of the default config file
pub fn default_config_text() -> &'static str {
    DEFAULT_CONFIG
}

/// Create both user and project .nest directories
pub async fn init_config_directories() -> Result<()> {
    let locations = [
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".nest"),
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".nest"),
    ];

    for dir in locations {
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::info!("Created config directory: {}", dir.display());
        }
    }

    Ok(())
}

/// Write the default config file to `path`, creating parent directories
pub async fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, DEFAULT_CONFIG).await?;
    Ok(())
}

/// Initialize config for the current project (./.nest/nest.toml)
pub async fn init_project_config() -> Result<PathBuf> {
    let config_path = std::env::current_dir()?.join(".nest").join("nest.toml");
    write_default_config(&config_path).await?;
    Ok(config_path)
}

//! Configuration management for the nest client
//!
//! Supports dual-location configuration:
//! - User-level: ~/.nest/nest.toml
//! - Project-level: ./.nest/nest.toml
//!
//! Project-level keys override user-level keys.

mod init;
mod loader;
mod schema;

pub use init::{default_config_text, init_config_directories, init_project_config, write_default_config};
pub use loader::ConfigLoader;
pub use schema::{NestConfig, ServerConfig, SyncConfig, UiConfig};

use crate::Result;

/// Load configuration from both locations with project config taking precedence
pub async fn load_config() -> Result<NestConfig> {
    ConfigLoader::new().load().await
}

//! Configuration loader with dual-location support

use crate::config::schema::NestConfig;
use crate::{NestError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration loader that handles both user and project configs
pub struct ConfigLoader {
    user_config_path: PathBuf,
    project_config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the standard locations
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
        }
    }

    /// Create a loader reading from explicit paths
    pub fn with_paths(user_config_path: PathBuf, project_config_path: PathBuf) -> Self {
        Self {
            user_config_path,
            project_config_path,
        }
    }

    /// User-level config path (~/.nest/nest.toml)
    fn user_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nest")
            .join("nest.toml")
    }

    /// Project-level config path (./.nest/nest.toml)
    fn project_config_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".nest")
            .join("nest.toml")
    }

    /// Load configuration from both locations with project taking precedence
    ///
    /// Files are merged key by key, so a project file only needs the keys it
    /// changes. Missing files are skipped; unreadable or invalid ones fail.
    pub async fn load(&self) -> Result<NestConfig> {
        let mut merged = toml::Table::new();

        for path in [&self.user_config_path, &self.project_config_path] {
            if let Some(table) = self.read_table(path).await? {
                debug!(path = %path.display(), "merging config file");
                merge_tables(&mut merged, table);
            }
        }

        let config: NestConfig = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    async fn read_table(&self, path: &Path) -> Result<Option<toml::Table>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        content
            .parse::<toml::Table>()
            .map(Some)
            .map_err(|e| NestError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Get user config path
    pub fn get_user_config_path(&self) -> &PathBuf {
        &self.user_config_path
    }

    /// Get project config path
    pub fn get_project_config_path(&self) -> &PathBuf {
        &self.project_config_path
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay `overlay` onto `base`, recursing into nested tables
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

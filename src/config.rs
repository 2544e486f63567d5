//! Application configuration, loaded from TOML.
//!
//! Provides two loading methods:
//! - `AppConfig::default()` - Built-in defaults (file backend in the
//!   platform data directory)
//! - `AppConfig::load(path)` - A TOML file; omitted keys take the defaults

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

/// Directory name used under the platform data directory.
pub const APP_DIR_NAME: &str = "m3dp-calibration";

/// Which storage medium backs the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Nothing survives the process.
    Memory,
    /// A single JSON document, `storage.json`.
    #[default]
    File,
    /// A SQLite database, `storage.db`.
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub data_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Example
    /// ```ignore
    /// let config = AppConfig::load(Path::new("m3dp.toml"))?;
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Path of the JSON document used by [`Backend::File`].
    pub fn storage_file(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    /// Path of the database used by [`Backend::Sqlite`].
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("storage.db")
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(target_arch = "wasm32")]
fn default_data_dir() -> PathBuf {
    PathBuf::from(APP_DIR_NAME)
}

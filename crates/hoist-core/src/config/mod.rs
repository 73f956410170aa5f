//! Configuration management for Hoist.
//!
//! This module handles loading, saving, and managing Hoist configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/hoist/config.toml` |
//! | macOS | `~/Library/Application Support/Hoist/config.toml` |
//! | Windows | `%APPDATA%\Hoist\config.toml` |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct for Hoist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings
    pub server: ServerConfig,
    /// Transfer settings
    pub transfer: TransferConfig,
    /// Cleanup settings
    pub cleanup: CleanupConfig,
}

/// Server configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the web binding listens on
    pub port: u16,
    /// Bind to localhost only
    pub localhost_only: bool,
    /// Directory for session records and chunk payloads
    pub data_dir: Option<PathBuf>,
    /// Directory finalized files are written to
    pub output_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_SERVER_PORT,
            localhost_only: false,
            data_dir: None,
            output_dir: None,
        }
    }
}

impl ServerConfig {
    /// Data directory, falling back to the platform data dir.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_server_dir("data"))
    }

    /// Output directory, falling back to `uploads` under the platform
    /// data dir.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_server_dir("uploads"))
    }
}

fn default_server_dir(subdir: &str) -> PathBuf {
    directories::ProjectDirs::from("sh", "hoist", "Hoist").map_or_else(
        || PathBuf::from(".hoist").join(subdir),
        |dirs| dirs.data_dir().join(subdir),
    )
}

/// Transfer configuration options for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes per chunk
    pub chunk_size: u64,
    /// Maximum concurrent chunk uploads
    pub concurrency: usize,
    /// Default server to upload to
    pub server_url: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            concurrency: crate::DEFAULT_CONCURRENT_UPLOADS,
            server_url: format!("http://127.0.0.1:{}", crate::DEFAULT_SERVER_PORT),
        }
    }
}

/// Cleanup configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Seconds of inactivity before a non-finalized session is swept
    pub max_session_age_secs: u64,
    /// Sweep stale sessions when the server starts
    pub sweep_on_start: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_session_age_secs: crate::DEFAULT_MAX_SESSION_AGE_SECS,
            sweep_on_start: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("sh", "hoist", "Hoist")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.server.port, crate::DEFAULT_SERVER_PORT);
        assert_eq!(config.transfer.chunk_size, crate::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.transfer.concurrency, crate::DEFAULT_CONCURRENT_UPLOADS);
        assert!(config.cleanup.sweep_on_start);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let mut config = Config::default();
        config.server.port = 9000;
        config.transfer.concurrency = 2;

        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let restored: Config = toml::from_str(&toml_str).expect("deserialize");

        assert_eq!(restored.server.port, 9000);
        assert_eq!(restored.transfer.concurrency, 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9999\n").expect("parse");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.transfer.chunk_size, crate::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_explicit_dirs_win_over_defaults() {
        let config = ServerConfig {
            data_dir: Some(PathBuf::from("/srv/hoist/data")),
            ..Default::default()
        };

        assert_eq!(config.data_dir(), PathBuf::from("/srv/hoist/data"));
        assert_ne!(config.output_dir(), PathBuf::from("/srv/hoist/data"));
    }
}

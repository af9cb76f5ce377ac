//! On-disk configuration for the relay
//!
//! A securetalk directory (`~/.securetalk` unless overridden with
//! `--config-path`) holds a single `config.toml`. `securetalk init` creates it
//! and `securetalk serve` reads it back.

use std::time::Duration;
use std::{fs, path::PathBuf};

use common::handshake::{HandshakeConfig, DEFAULT_START_DELAY, DEFAULT_STEP_DELAY};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "securetalk";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_LISTEN_PORT: u16 = 3000;

/// Configuration stored in config.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the relay (WebSocket + HTTP)
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Pause between a population change and the first handshake step
    #[serde(default = "default_start_delay_ms")]
    pub handshake_start_delay_ms: u64,
    /// Pause between consecutive handshake steps
    #[serde(default = "default_step_delay_ms")]
    pub handshake_step_delay_ms: u64,
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_start_delay_ms() -> u64 {
    DEFAULT_START_DELAY.as_millis() as u64
}

fn default_step_delay_ms() -> u64 {
    DEFAULT_STEP_DELAY.as_millis() as u64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            handshake_start_delay_ms: default_start_delay_ms(),
            handshake_step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl AppConfig {
    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            start_delay: Duration::from_millis(self.handshake_start_delay_ms),
            step_delay: Duration::from_millis(self.handshake_step_delay_ms),
        }
    }
}

/// A securetalk config directory
#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the securetalk directory
    pub app_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the securetalk directory path (custom or default ~/.securetalk)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Create a new securetalk directory and write its config
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&app_dir)?;

        let config = config.unwrap_or_default();
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the securetalk directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = app_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }

    /// Load the directory if present, otherwise fall back to defaults
    /// without touching the filesystem
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<AppConfig, StateError> {
        match Self::load(custom_path) {
            Ok(state) => Ok(state.config),
            Err(StateError::NotInitialized) | Err(StateError::NoHomeDirectory) => {
                Ok(AppConfig::default())
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("securetalk directory not initialized. Run 'securetalk init' first or use --config-path")]
    NotInitialized,

    #[error("securetalk directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("st");

        let config = AppConfig {
            listen_port: 4000,
            ..AppConfig::default()
        };
        let created = AppState::init(Some(path.clone()), Some(config.clone())).unwrap();
        assert_eq!(created.config_path, path.join(CONFIG_FILE_NAME));

        let loaded = AppState::load(Some(path)).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        AppState::init(Some(path.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(path), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");

        assert!(matches!(
            AppState::load(Some(path.clone())),
            Err(StateError::NotInitialized)
        ));
        assert_eq!(
            AppState::load_or_default(Some(path)).unwrap(),
            AppConfig::default()
        );
    }

    #[test]
    fn test_load_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().to_path_buf())),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "listen_port = 8081\n").unwrap();

        let state = AppState::load(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(state.config.listen_port, 8081);
        assert_eq!(state.config.handshake_start_delay_ms, 1000);
        assert_eq!(state.config.handshake_step_delay_ms, 2000);
        assert_eq!(state.config.handshake(), HandshakeConfig::default());
    }
}

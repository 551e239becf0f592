//! User profile and application configuration, persisted as TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rider profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Functional Threshold Power in watts (50-600)
    pub ftp: u16,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Cyclist".to_string(),
            ftp: 200,
        }
    }
}

impl UserProfile {
    /// Update FTP after validation.
    pub fn set_ftp(&mut self, ftp: u16) -> Result<(), ConfigError> {
        if !Self::validate_ftp(ftp) {
            return Err(ConfigError::InvalidValue(
                "FTP must be between 50 and 600 watts".to_string(),
            ));
        }
        self.ftp = ftp;
        Ok(())
    }

    /// Validate FTP value (50-600 watts).
    pub fn validate_ftp(ftp: u16) -> bool {
        (50..=600).contains(&ftp)
    }
}

/// Coach service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachSettings {
    /// API key; coaching is disabled when unset
    pub api_key: Option<String>,
    /// Override for the API base URL
    pub base_url: Option<String>,
}

/// Device-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Start in simulation mode
    pub simulate: bool,
    /// Discovery timeout in seconds
    pub discovery_timeout_secs: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            simulate: false,
            discovery_timeout_secs: 15,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Rider profile
    pub profile: UserProfile,
    /// Device settings
    pub devices: DeviceSettings,
    /// Coach service settings
    pub coach: CoachSettings,
    /// Directory for TCX exports; defaults next to the data directory
    pub export_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            profile: UserProfile::default(),
            devices: DeviceSettings::default(),
            coach: CoachSettings::default(),
            export_dir: None,
        }
    }
}

impl AppConfig {
    /// The directory ride exports are written to.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| get_data_dir().join("rides"))
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("training", "veloce", "Veloce")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration, falling back to defaults when no file
/// exists yet.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Save application configuration to file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to an explicit path.
pub fn save_config_to(config: &AppConfig, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for ota
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/ota/config.toml)
//! - Environment variables
//! - CLI flags (applied by the host binary)

pub mod constants;

use serde::{Deserialize, Serialize};
use ota_errors::{ConfigError, Error};
use ota_types::{ColorChoice, OutputFormat};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Device identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    /// Product identifier compared against the package `pre-device`.
    /// When unset the platform layer asks the device.
    pub product: Option<String>,
    /// Build time in epoch seconds used with a configured `product`.
    /// Builds published after it are offered as updates.
    pub build_time: Option<i64>,
    /// Use sysfs wake locks and a real reboot
    #[serde(default)]
    pub power_control: bool,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub state_db: Option<PathBuf>,
    pub packages_dir: Option<PathBuf>,
}

/// Update engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory under which the engine sees update packages
    pub payload_root: Option<PathBuf>,
    #[serde(default = "default_simulated_chunk_bytes")]
    pub simulated_chunk_bytes: u64,
    #[serde(default = "default_simulated_step_ms")]
    pub simulated_step_ms: u64,
    #[serde(default)]
    pub simulated_completion_code: i32,
}

/// Update server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base URL; the device's manifest is fetched from `<updates_url>/<device>`
    #[serde(default = "default_updates_url")]
    pub updates_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payload_root: None,
            simulated_chunk_bytes: default_simulated_chunk_bytes(),
            simulated_step_ms: default_simulated_step_ms(),
            simulated_completion_code: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            updates_url: default_updates_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry_count: default_retry_count(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_simulated_chunk_bytes() -> u64 {
    1024 * 1024
}

fn default_simulated_step_ms() -> u64 {
    20
}

fn default_updates_url() -> String {
    constants::UPDATES_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("ota").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, if the file contents
    /// contain invalid TOML syntax that cannot be parsed, or if a value is
    /// rejected by [`Config::validate`].
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        debug!(path = %path.display(), "loaded config file");
        let config: Self = toml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a blank `device.product` or
    /// `network.updates_url`.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(product) = &self.device.product {
            if product.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "device.product".to_string(),
                    value: product.clone(),
                }
                .into());
            }
        }
        if self.network.updates_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "network.updates_url".to_string(),
                value: self.network.updates_url.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // OTA_OUTPUT
        if let Ok(output) = std::env::var("OTA_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "OTA_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // OTA_COLOR
        if let Ok(color) = std::env::var("OTA_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "OTA_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // OTA_DEVICE
        if let Ok(device) = std::env::var("OTA_DEVICE") {
            if device.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "OTA_DEVICE".to_string(),
                    value: device,
                }
                .into());
            }
            self.device.product = Some(device);
        }

        // OTA_STATE_DB
        if let Ok(path) = std::env::var("OTA_STATE_DB") {
            self.paths.state_db = Some(PathBuf::from(path));
        }

        // OTA_PAYLOAD_ROOT
        if let Ok(path) = std::env::var("OTA_PAYLOAD_ROOT") {
            self.engine.payload_root = Some(PathBuf::from(path));
        }

        // OTA_PACKAGES_DIR
        if let Ok(path) = std::env::var("OTA_PACKAGES_DIR") {
            self.paths.packages_dir = Some(PathBuf::from(path));
        }

        // OTA_UPDATES_URL
        if let Ok(url) = std::env::var("OTA_UPDATES_URL") {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "OTA_UPDATES_URL".to_string(),
                    value: url,
                }
                .into());
            }
            self.network.updates_url = url;
        }

        Ok(())
    }

    /// Get the state database path (with default)
    #[must_use]
    pub fn state_db_path(&self) -> PathBuf {
        self.paths
            .state_db
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::STATE_DB_PATH))
    }

    /// Get the packages directory (with default)
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.paths
            .packages_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::PACKAGES_DIR))
    }
}

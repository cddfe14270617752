//! Application configuration management.
//!
//! Handles loading, saving, and validating nearlink configuration:
//! - Default discovery and advertising options
//! - Credential store location and manager app id
//! - Credential sync endpoint
//!
//! Values come from a TOML file and may be overridden by environment
//! variables of the form `NEARLINK__<SECTION>__<KEY>`, for example
//! `NEARLINK__DISCOVERY__STRATEGY=P2P_STAR`. Medium lists accept a
//! comma-separated value.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::medium::{BooleanMediumSelector, Medium};
use crate::options::{AdvertisingOptions, DiscoveryOptions};
use crate::strategy::Strategy;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "NEARLINK";

/// Errors raised by configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Sources could not be merged or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration could not be serialized as TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// More than one field is invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

fn validation(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for discovery and advertising options.
    pub discovery: DiscoveryConfig,
    /// Credential store settings.
    pub credentials: CredentialsConfig,
    /// Credential sync settings.
    pub sync: SyncConfig,
}

/// Default option values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Strategy token, e.g. `P2P_CLUSTER`.
    pub strategy: String,
    /// Allowed medium tokens; empty means no preference.
    pub mediums: Vec<String>,
    /// Prefer low-power operation.
    pub low_power: bool,
    /// Keep running in the background.
    pub always_on: bool,
    /// Allow bandwidth upgrades.
    pub auto_upgrade_bandwidth: bool,
    /// Restrict upgrades to strategy-compatible mediums.
    pub enforce_topology_constraints: bool,
    /// Keep-alive interval; 0 selects the built-in default.
    pub keep_alive_interval_millis: u32,
    /// Keep-alive timeout; 0 selects the built-in default.
    pub keep_alive_timeout_millis: u32,
    /// Service UUID for low-power BLE advertisement.
    pub fast_advertisement_service_uuid: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Cluster.name().to_string(),
            mediums: Vec::new(),
            low_power: false,
            always_on: false,
            auto_upgrade_bandwidth: true,
            enforce_topology_constraints: true,
            keep_alive_interval_millis: 0,
            keep_alive_timeout_millis: 0,
            fast_advertisement_service_uuid: None,
        }
    }
}

/// Credential store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Store root; the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
    /// App id placed in credential selectors built by the daemon.
    pub manager_app_id: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            manager_app_id: "nearlink".to_string(),
        }
    }
}

/// Credential sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the sync service; sync is disabled when unset.
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 15,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist, or
    /// [`ConfigError::ParseError`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::build(path, true)
    }

    /// Like [`load`](Self::load), but falls back to defaults (plus
    /// environment overrides) when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if an existing file cannot be
    /// parsed.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::build(path.as_ref(), false)
    }

    fn build(path: &Path, required: bool) -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("discovery.mediums"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parses configuration from a TOML string, without environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] on invalid TOML.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Writes the configuration to `path` as TOML, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Checks every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for one problem, or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Strategy::from_str(&self.discovery.strategy) {
            errors.push(validation("discovery.strategy", e.to_string()));
        }
        for token in &self.discovery.mediums {
            if let Err(e) = Medium::from_str(token) {
                errors.push(validation("discovery.mediums", e.to_string()));
            }
        }
        if let Some(uuid) = &self.discovery.fast_advertisement_service_uuid {
            if uuid::Uuid::parse_str(uuid).is_err() {
                errors.push(validation(
                    "discovery.fast_advertisement_service_uuid",
                    format!("'{uuid}' is not a UUID"),
                ));
            }
        }
        if self.discovery.keep_alive_timeout_millis != 0
            && self.discovery.keep_alive_timeout_millis <= self.discovery.keep_alive_interval_millis
        {
            errors.push(validation(
                "discovery.keep_alive_timeout_millis",
                "must be greater than keep_alive_interval_millis",
            ));
        }
        if self.credentials.manager_app_id.trim().is_empty() {
            errors.push(validation("credentials.manager_app_id", "must not be empty"));
        }
        if let Some(base_url) = &self.sync.base_url {
            match Url::parse(base_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(validation(
                    "sync.base_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                )),
                Err(e) => errors.push(validation("sync.base_url", e.to_string())),
            }
        }
        if self.sync.timeout_secs == 0 {
            errors.push(validation("sync.timeout_secs", "must be at least 1"));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on an unknown token.
    pub fn strategy(&self) -> ConfigResult<Strategy> {
        Strategy::from_str(&self.discovery.strategy)
            .map_err(|e| validation("discovery.strategy", e.to_string()))
    }

    /// Configured medium set; empty when no mediums are listed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on an unknown token.
    pub fn allowed_mediums(&self) -> ConfigResult<BooleanMediumSelector> {
        self.discovery
            .mediums
            .iter()
            .map(|token| {
                Medium::from_str(token).map_err(|e| validation("discovery.mediums", e.to_string()))
            })
            .collect()
    }

    /// Discovery options built from the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on an unknown token.
    pub fn discovery_options(&self) -> ConfigResult<DiscoveryOptions> {
        let d = &self.discovery;
        let mut options = DiscoveryOptions::new(self.strategy()?).with_mediums(self.allowed_mediums()?);
        options.base.low_power = d.low_power;
        options.base.always_on = d.always_on;
        options.auto_upgrade_bandwidth = d.auto_upgrade_bandwidth;
        options.enforce_topology_constraints = d.enforce_topology_constraints;
        options.keep_alive_interval_millis = d.keep_alive_interval_millis;
        options.keep_alive_timeout_millis = d.keep_alive_timeout_millis;
        options.fast_advertisement_service_uuid =
            d.fast_advertisement_service_uuid.clone().unwrap_or_default();
        Ok(options)
    }

    /// Advertising options built from the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on an unknown token.
    pub fn advertising_options(&self) -> ConfigResult<AdvertisingOptions> {
        let d = &self.discovery;
        let mut options =
            AdvertisingOptions::new(self.strategy()?).with_mediums(self.allowed_mediums()?);
        options.base.low_power = d.low_power;
        options.base.always_on = d.always_on;
        options.auto_upgrade_bandwidth = d.auto_upgrade_bandwidth;
        options.enforce_topology_constraints = d.enforce_topology_constraints;
        options.fast_advertisement_service_uuid =
            d.fast_advertisement_service_uuid.clone().unwrap_or_default();
        Ok(options)
    }

    /// Credential store root: the configured directory, else the platform
    /// default.
    #[must_use]
    pub fn credentials_dir(&self) -> Option<PathBuf> {
        self.credentials
            .data_dir
            .clone()
            .or_else(crate::storage::default_data_dir)
    }

    /// Default configuration file path.
    ///
    /// On Linux: `/etc/nearlink/config.toml`
    /// Elsewhere: the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Some(PathBuf::from("/etc/nearlink/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "nearlink")
                .map(|dirs| dirs.config_dir().join("config.toml"))
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.strategy().unwrap(), Strategy::Cluster);
        assert_eq!(config.allowed_mediums().unwrap().count(), 0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [discovery]
            strategy = "P2P_POINT_TO_POINT"
            mediums = ["BLE", "BLUETOOTH_CLASSIC"]
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy().unwrap(), Strategy::PointToPoint);
        assert!(config.discovery.auto_upgrade_bandwidth);
        assert_eq!(config.credentials.manager_app_id, "nearlink");
        assert_eq!(config.sync.timeout_secs, 15);

        let mediums = config.allowed_mediums().unwrap();
        assert!(*mediums.get(Medium::Ble));
        assert!(*mediums.get(Medium::BluetoothClassic));
        assert_eq!(mediums.count(), 2);
    }

    #[test]
    fn test_discovery_options_from_config() {
        let mut config = Config::default();
        config.discovery.strategy = "P2P_STAR".into();
        config.discovery.low_power = true;
        config.discovery.keep_alive_interval_millis = 1_000;
        config.discovery.fast_advertisement_service_uuid =
            Some("0000fef3-0000-1000-8000-00805f9b34fb".into());

        let options = config.discovery_options().unwrap();
        assert_eq!(options.base.strategy, Strategy::Star);
        assert!(options.base.low_power);
        assert_eq!(options.keep_alive_interval_millis, 1_000);
        assert_eq!(
            options.fast_advertisement_service_uuid,
            "0000fef3-0000-1000-8000-00805f9b34fb"
        );

        let advertising = config.advertising_options().unwrap();
        assert_eq!(advertising.base, options.base);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let mut config = Config::default();
        config.discovery.strategy = "P2P_RING".into();
        config.discovery.mediums = vec!["CARRIER_PIGEON".into()];
        config.discovery.fast_advertisement_service_uuid = Some("not-a-uuid".into());
        config.sync.base_url = Some("ftp://sync.example.com".into());

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_single_validation_error() {
        let mut config = Config::default();
        config.credentials.manager_app_id = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "credentials.manager_app_id")
        );
    }

    #[test]
    fn test_keep_alive_timeout_must_exceed_interval() {
        let mut config = Config::default();
        config.discovery.keep_alive_interval_millis = 10_000;
        config.discovery.keep_alive_timeout_millis = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.discovery.mediums = vec!["WIFI_LAN".into()];
        config.sync.base_url = Some("https://sync.example.com".into());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.discovery.mediums, vec!["WIFI_LAN".to_string()]);
        assert_eq!(loaded.sync.base_url.as_deref(), Some("https://sync.example.com"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.credentials.manager_app_id, "nearlink");
    }

    #[test]
    fn test_unknown_strategy_is_a_validation_error() {
        let mut config = Config::default();
        config.discovery.strategy = "MESH".into();
        assert!(matches!(
            config.discovery_options(),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}

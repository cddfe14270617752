//! Application state shared across handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use nearlink_core::{
    Config, CredentialStorage, CredentialSync, FileCredentialStore, IdentityGenerator,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "NEARLINK_CONFIG";

/// State shared by every handler.
pub type SharedState = Arc<RwLock<AppState>>;

/// Daemon state.
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Credential store facade.
    pub credentials: CredentialStorage,
    /// Presence identity generator.
    pub identities: IdentityGenerator,
    /// Remote credential sync, present when `sync.base_url` is set.
    pub sync: Option<Arc<CredentialSync>>,
}

impl AppState {
    /// Builds state from an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no credential
    /// directory can be determined.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate().context("Invalid configuration")?;

        let data_dir = config
            .credentials_dir()
            .context("Cannot determine credential data directory")?;
        info!(data_dir = %data_dir.display(), "using file credential store");
        let credentials = CredentialStorage::new(Arc::new(FileCredentialStore::new(data_dir)));

        let sync = build_sync(&config, &credentials)?;

        Ok(Self {
            config,
            credentials,
            identities: IdentityGenerator::default(),
            sync,
        })
    }

    /// Builds state with explicit parts.
    #[must_use]
    pub fn new(config: Config, credentials: CredentialStorage) -> Self {
        Self {
            config,
            credentials,
            identities: IdentityGenerator::default(),
            sync: None,
        }
    }

    /// Attaches a credential syncer.
    #[must_use]
    pub fn with_sync(mut self, sync: CredentialSync) -> Self {
        self.sync = Some(Arc::new(sync));
        self
    }

    /// Loads configuration from `NEARLINK_CONFIG` or the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or
    /// validated.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let config = match &path {
            Some(path) => load_config(path)?,
            None => {
                warn!("no configuration path available, using defaults");
                Config::default()
            }
        };
        Self::from_config(config)
    }

    /// Wraps the state for sharing between handlers.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .or_else(Config::default_path)
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    info!(path = %path.display(), "loading configuration");
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

#[cfg(feature = "http-client")]
fn build_sync(
    config: &Config,
    credentials: &CredentialStorage,
) -> anyhow::Result<Option<Arc<CredentialSync>>> {
    use std::time::Duration;

    use nearlink_core::ReqwestHttpClient;

    let Some(base_url) = &config.sync.base_url else {
        return Ok(None);
    };
    let base_url = url::Url::parse(base_url).context("Invalid sync.base_url")?;
    let client = ReqwestHttpClient::new(Duration::from_secs(config.sync.timeout_secs))?;
    info!(base_url = %base_url, "credential sync enabled");
    Ok(Some(Arc::new(CredentialSync::new(
        base_url,
        Arc::new(client),
        credentials.clone(),
    ))))
}

#[cfg(not(feature = "http-client"))]
fn build_sync(
    config: &Config,
    _credentials: &CredentialStorage,
) -> anyhow::Result<Option<Arc<CredentialSync>>> {
    if config.sync.base_url.is_some() {
        warn!("sync.base_url is set but the http-client feature is disabled");
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_from_config_uses_configured_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.credentials.data_dir = Some(dir.path().to_path_buf());

        let state = AppState::from_config(config).unwrap();
        assert!(state.sync.is_none());
        assert_eq!(state.config.credentials.manager_app_id, "nearlink");
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.credentials.data_dir = Some(dir.path().to_path_buf());
        config.discovery.strategy = "P2P_RING".into();

        assert!(AppState::from_config(config).is_err());
    }

    #[cfg(feature = "http-client")]
    #[test]
    fn test_sync_enabled_with_base_url() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.credentials.data_dir = Some(dir.path().to_path_buf());
        config.sync.base_url = Some("https://sync.example.com".into());

        let state = AppState::from_config(config).unwrap();
        assert!(state.sync.is_some());
    }
}

//! File-backed credential store.
//!
//! Credentials are kept as JSON files organized by account:
//!
//! ```text
//! <data_dir>/credentials/<account>/private.json
//! <data_dir>/credentials/<account>/public-local.json
//! <data_dir>/credentials/<account>/public-remote.json
//! ```
//!
//! Each account has its own async lock, so a write followed by a read on
//! the same account observes the write, and different accounts never wait
//! on each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::credentials::{
    select_private, select_public, CredentialSelector, CredentialStore, CredentialStoreError,
    PrivateCredential, PublicCredential, PublicCredentialType,
};

/// Returns the default data directory.
///
/// On Linux: `/var/lib/nearlink/`
/// Elsewhere: the platform data directory for `nearlink`.
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Some(PathBuf::from("/var/lib/nearlink"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "nearlink").map(|dirs| dirs.data_dir().to_path_buf())
    }
}

/// Credential store persisting JSON files under a data directory.
#[derive(Debug)]
pub struct FileCredentialStore {
    data_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl FileCredentialStore {
    /// Creates a store rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a store at [`default_data_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Unavailable`] if no data directory
    /// can be determined for this platform.
    pub fn default_location() -> Result<Self, CredentialStoreError> {
        default_data_dir().map(Self::new).ok_or_else(|| {
            CredentialStoreError::Unavailable("Cannot determine data directory".into())
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Lock for `account_name`. Locks nobody holds are dropped from the map.
    fn account_lock(&self, account_name: &str) -> Arc<RwLock<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(account_name.to_string()).or_default())
    }

    fn account_dir(&self, account_name: &str) -> Result<PathBuf, CredentialStoreError> {
        validate_account_name(account_name)?;
        Ok(self.data_dir.join("credentials").join(account_name))
    }

    fn private_path(&self, account_name: &str) -> Result<PathBuf, CredentialStoreError> {
        Ok(self.account_dir(account_name)?.join("private.json"))
    }

    fn public_path(
        &self,
        account_name: &str,
        public_credential_type: PublicCredentialType,
    ) -> Result<PathBuf, CredentialStoreError> {
        Ok(self
            .account_dir(account_name)?
            .join(format!("public-{}.json", public_credential_type.as_str())))
    }
}

/// Account names become directory names, so only a safe subset is allowed.
fn validate_account_name(account_name: &str) -> Result<(), CredentialStoreError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-' | '+');
    if account_name.is_empty()
        || account_name.starts_with('.')
        || !account_name.chars().all(allowed)
    {
        return Err(CredentialStoreError::InvalidAccountName(account_name.to_string()));
    }
    Ok(())
}

async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, CredentialStoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CredentialStoreError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| CredentialStoreError::ParseError {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), CredentialStoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| CredentialStoreError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let content = serde_json::to_string_pretty(items)?;

    // Write then rename so readers never see a half-written file.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|source| CredentialStoreError::WriteError {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| CredentialStoreError::WriteError {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save_private_credentials(
        &self,
        account_name: &str,
        private_credentials: &[PrivateCredential],
    ) -> Result<(), CredentialStoreError> {
        let path = self.private_path(account_name)?;
        let lock = self.account_lock(account_name);
        let _guard = lock.write().await;
        write_list(&path, private_credentials).await
    }

    async fn save_public_credentials(
        &self,
        account_name: &str,
        public_credentials: &[PublicCredential],
        public_credential_type: PublicCredentialType,
    ) -> Result<(), CredentialStoreError> {
        let path = self.public_path(account_name, public_credential_type)?;
        let lock = self.account_lock(account_name);
        let _guard = lock.write().await;
        write_list(&path, public_credentials).await
    }

    async fn get_private_credentials(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Vec<PrivateCredential>, CredentialStoreError> {
        let account_name = &credential_selector.account_name;
        let path = self.private_path(account_name)?;
        let lock = self.account_lock(account_name);
        let _guard = lock.read().await;
        read_list::<PrivateCredential>(&path)
            .await?
            .map(|stored| select_private(&stored, credential_selector))
            .ok_or_else(|| CredentialStoreError::NotFound {
                account_name: account_name.clone(),
            })
    }

    async fn get_public_credentials(
        &self,
        credential_selector: &CredentialSelector,
        public_credential_type: PublicCredentialType,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError> {
        let account_name = &credential_selector.account_name;
        let path = self.public_path(account_name, public_credential_type)?;
        let lock = self.account_lock(account_name);
        let _guard = lock.read().await;
        read_list::<PublicCredential>(&path)
            .await?
            .map(|stored| select_public(&stored, credential_selector))
            .ok_or_else(|| CredentialStoreError::NotFound {
                account_name: account_name.clone(),
            })
    }
}

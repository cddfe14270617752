//! Presence credential storage facade.
//!
//! [`CredentialStorage`] is a thin handle over an injected
//! [`CredentialStore`]. It forwards every call unchanged: retries, caching
//! and validation belong to the store. Each operation resolves exactly once
//! to either success or failure.
//!
//! Store implementations must keep write-then-read consistency for a single
//! account and must not let operations on different accounts block each
//! other.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Who a credential identifies the device to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    /// Only the owner's own devices.
    Private,
    /// Trusted contacts.
    Trusted,
    /// Anyone.
    Public,
    /// Devices provisioned by a manager app.
    Provisioned,
}

impl IdentityType {
    /// Every identity type.
    pub const ALL: [Self; 4] = [Self::Private, Self::Trusted, Self::Public, Self::Provisioned];

    /// Configuration and query token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Trusted => "trusted",
            Self::Public => "public",
            Self::Provisioned => "provisioned",
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityType {
    type Err = CredentialStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "trusted" => Ok(Self::Trusted),
            "public" => Ok(Self::Public),
            "provisioned" => Ok(Self::Provisioned),
            _ => Err(CredentialStoreError::InvalidSelector(format!(
                "unknown identity type '{s}'"
            ))),
        }
    }
}

/// Which public credentials are meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PublicCredentialType {
    /// Public halves of this device's own credentials, for sharing.
    LocalPublicCredential,
    /// Credentials received from other devices, for verifying them.
    RemotePublicCredential,
}

impl PublicCredentialType {
    /// Short token used in paths and file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalPublicCredential => "local",
            Self::RemotePublicCredential => "remote",
        }
    }
}

impl fmt::Display for PublicCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicCredentialType {
    type Err = CredentialStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "local_public_credential" => Ok(Self::LocalPublicCredential),
            "remote" | "remote_public_credential" => Ok(Self::RemotePublicCredential),
            _ => Err(CredentialStoreError::InvalidSelector(format!(
                "unknown public credential type '{s}'"
            ))),
        }
    }
}

/// Addresses a set of stored credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct CredentialSelector {
    /// App that manages the credentials.
    pub manager_app_id: String,
    /// Account the credentials belong to.
    pub account_name: String,
    /// Identity type to select.
    pub identity_type: IdentityType,
}

impl CredentialSelector {
    /// Creates a selector.
    pub fn new(
        manager_app_id: impl Into<String>,
        account_name: impl Into<String>,
        identity_type: IdentityType,
    ) -> Self {
        Self {
            manager_app_id: manager_app_id.into(),
            account_name: account_name.into(),
            identity_type,
        }
    }
}

/// Credential material kept only on the owning device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrivateCredential {
    /// Identity type the credential is issued for.
    pub identity_type: IdentityType,
    /// Identifier shared with the public half.
    pub secret_id: Vec<u8>,
    /// Format version of `material`.
    pub version: u32,
    /// Start of the validity window.
    pub start_time: DateTime<Utc>,
    /// End of the validity window (exclusive).
    pub end_time: DateTime<Utc>,
    /// Opaque key material.
    pub material: Vec<u8>,
}

/// Credential material that may be shared with other devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicCredential {
    /// Identity type the credential is issued for.
    pub identity_type: IdentityType,
    /// Identifier shared with the private half.
    pub secret_id: Vec<u8>,
    /// Format version of `material`.
    pub version: u32,
    /// Start of the validity window.
    pub start_time: DateTime<Utc>,
    /// End of the validity window (exclusive).
    pub end_time: DateTime<Utc>,
    /// Opaque verification material.
    pub material: Vec<u8>,
}

impl PrivateCredential {
    /// Whether `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

impl PublicCredential {
    /// Whether `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// Failures reported by a [`CredentialStore`].
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Nothing of the requested kind has been stored for the account.
    #[error("No credentials stored for account '{account_name}'")]
    NotFound {
        /// Account that was queried.
        account_name: String,
    },

    /// The account name cannot be used as a storage key.
    #[error("Invalid account name: '{0}'")]
    InvalidAccountName(String),

    /// A selector component was not recognized.
    #[error("Invalid credential selector: {0}")]
    InvalidSelector(String),

    /// Failed to read a credential file.
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a credential file.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A credential file exists but does not parse.
    #[error("Failed to parse {}: {source}", .path.display())]
    ParseError {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Credentials could not be serialized.
    #[error("Failed to serialize credentials: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The backing store is not reachable.
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous persistence for presence credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Replaces the private credentials stored for `account_name`.
    async fn save_private_credentials(
        &self,
        account_name: &str,
        private_credentials: &[PrivateCredential],
    ) -> Result<(), CredentialStoreError>;

    /// Replaces the public credentials of `public_credential_type` stored
    /// for `account_name`.
    async fn save_public_credentials(
        &self,
        account_name: &str,
        public_credentials: &[PublicCredential],
        public_credential_type: PublicCredentialType,
    ) -> Result<(), CredentialStoreError>;

    /// Private credentials matching `credential_selector`.
    async fn get_private_credentials(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Vec<PrivateCredential>, CredentialStoreError>;

    /// Public credentials of `public_credential_type` matching
    /// `credential_selector`.
    async fn get_public_credentials(
        &self,
        credential_selector: &CredentialSelector,
        public_credential_type: PublicCredentialType,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError>;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn save_private_credentials(
        &self,
        account_name: &str,
        private_credentials: &[PrivateCredential],
    ) -> Result<(), CredentialStoreError> {
        (**self)
            .save_private_credentials(account_name, private_credentials)
            .await
    }

    async fn save_public_credentials(
        &self,
        account_name: &str,
        public_credentials: &[PublicCredential],
        public_credential_type: PublicCredentialType,
    ) -> Result<(), CredentialStoreError> {
        (**self)
            .save_public_credentials(account_name, public_credentials, public_credential_type)
            .await
    }

    async fn get_private_credentials(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Vec<PrivateCredential>, CredentialStoreError> {
        (**self).get_private_credentials(credential_selector).await
    }

    async fn get_public_credentials(
        &self,
        credential_selector: &CredentialSelector,
        public_credential_type: PublicCredentialType,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError> {
        (**self)
            .get_public_credentials(credential_selector, public_credential_type)
            .await
    }
}

/// Handle that forwards credential operations to an injected store.
#[derive(Clone)]
pub struct CredentialStorage {
    inner: Arc<dyn CredentialStore>,
}

impl fmt::Debug for CredentialStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStorage").finish_non_exhaustive()
    }
}

impl CredentialStorage {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { inner: store }
    }

    /// A facade over a fresh [`InMemoryCredentialStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCredentialStore::default()))
    }

    /// See [`CredentialStore::save_private_credentials`].
    ///
    /// # Errors
    ///
    /// Relays the store's failure unchanged.
    pub async fn save_private_credentials(
        &self,
        account_name: &str,
        private_credentials: &[PrivateCredential],
    ) -> Result<(), CredentialStoreError> {
        self.inner
            .save_private_credentials(account_name, private_credentials)
            .await
    }

    /// See [`CredentialStore::save_public_credentials`].
    ///
    /// # Errors
    ///
    /// Relays the store's failure unchanged.
    pub async fn save_public_credentials(
        &self,
        account_name: &str,
        public_credentials: &[PublicCredential],
        public_credential_type: PublicCredentialType,
    ) -> Result<(), CredentialStoreError> {
        self.inner
            .save_public_credentials(account_name, public_credentials, public_credential_type)
            .await
    }

    /// See [`CredentialStore::get_private_credentials`].
    ///
    /// # Errors
    ///
    /// Relays the store's failure unchanged.
    pub async fn get_private_credentials(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Vec<PrivateCredential>, CredentialStoreError> {
        self.inner.get_private_credentials(credential_selector).await
    }

    /// See [`CredentialStore::get_public_credentials`].
    ///
    /// # Errors
    ///
    /// Relays the store's failure unchanged.
    pub async fn get_public_credentials(
        &self,
        credential_selector: &CredentialSelector,
        public_credential_type: PublicCredentialType,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError> {
        self.inner
            .get_public_credentials(credential_selector, public_credential_type)
            .await
    }
}

#[derive(Debug, Clone, Default)]
struct AccountCredentials {
    private: Option<Vec<PrivateCredential>>,
    local_public: Option<Vec<PublicCredential>>,
    remote_public: Option<Vec<PublicCredential>>,
}

impl AccountCredentials {
    fn public_mut(
        &mut self,
        public_credential_type: PublicCredentialType,
    ) -> &mut Option<Vec<PublicCredential>> {
        match public_credential_type {
            PublicCredentialType::LocalPublicCredential => &mut self.local_public,
            PublicCredentialType::RemotePublicCredential => &mut self.remote_public,
        }
    }

    fn public(
        &self,
        public_credential_type: PublicCredentialType,
    ) -> Option<&[PublicCredential]> {
        match public_credential_type {
            PublicCredentialType::LocalPublicCredential => self.local_public.as_deref(),
            PublicCredentialType::RemotePublicCredential => self.remote_public.as_deref(),
        }
    }
}

/// Keeps only credentials of the selected identity type.
pub(crate) fn select_private(
    credentials: &[PrivateCredential],
    selector: &CredentialSelector,
) -> Vec<PrivateCredential> {
    credentials
        .iter()
        .filter(|c| c.identity_type == selector.identity_type)
        .cloned()
        .collect()
}

/// Keeps only credentials of the selected identity type.
pub(crate) fn select_public(
    credentials: &[PublicCredential],
    selector: &CredentialSelector,
) -> Vec<PublicCredential> {
    credentials
        .iter()
        .filter(|c| c.identity_type == selector.identity_type)
        .cloned()
        .collect()
}

/// Process-local credential store.
///
/// Each account has its own lock, so operations on different accounts
/// never wait on each other.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: Mutex<HashMap<String, Arc<RwLock<AccountCredentials>>>>,
}

impl InMemoryCredentialStore {
    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Arc<RwLock<AccountCredentials>>>> {
        self.accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn account(&self, account_name: &str) -> Arc<RwLock<AccountCredentials>> {
        Arc::clone(self.accounts().entry(account_name.to_string()).or_default())
    }

    fn existing_account(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Arc<RwLock<AccountCredentials>>, CredentialStoreError> {
        self.accounts()
            .get(&credential_selector.account_name)
            .cloned()
            .ok_or_else(|| not_found(credential_selector))
    }
}

fn not_found(credential_selector: &CredentialSelector) -> CredentialStoreError {
    CredentialStoreError::NotFound {
        account_name: credential_selector.account_name.clone(),
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save_private_credentials(
        &self,
        account_name: &str,
        private_credentials: &[PrivateCredential],
    ) -> Result<(), CredentialStoreError> {
        let account = self.account(account_name);
        account.write().await.private = Some(private_credentials.to_vec());
        Ok(())
    }

    async fn save_public_credentials(
        &self,
        account_name: &str,
        public_credentials: &[PublicCredential],
        public_credential_type: PublicCredentialType,
    ) -> Result<(), CredentialStoreError> {
        let account = self.account(account_name);
        *account.write().await.public_mut(public_credential_type) =
            Some(public_credentials.to_vec());
        Ok(())
    }

    async fn get_private_credentials(
        &self,
        credential_selector: &CredentialSelector,
    ) -> Result<Vec<PrivateCredential>, CredentialStoreError> {
        let account = self.existing_account(credential_selector)?;
        let stored = account.read().await;
        stored
            .private
            .as_deref()
            .map(|stored| select_private(stored, credential_selector))
            .ok_or_else(|| not_found(credential_selector))
    }

    async fn get_public_credentials(
        &self,
        credential_selector: &CredentialSelector,
        public_credential_type: PublicCredentialType,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError> {
        let account = self.existing_account(credential_selector)?;
        let stored = account.read().await;
        stored
            .public(public_credential_type)
            .map(|stored| select_public(stored, credential_selector))
            .ok_or_else(|| not_found(credential_selector))
    }
}

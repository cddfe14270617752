//! Pulls remote public credentials from a sync endpoint.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::credentials::{
    CredentialSelector, CredentialStorage, CredentialStoreError, IdentityType, PublicCredential,
    PublicCredentialType,
};
use crate::http::{HttpClient, HttpError, WebRequest};

/// Failures while syncing credentials.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The sync URL could not be built.
    #[error("Invalid sync URL: {0}")]
    InvalidUrl(String),

    /// The exchange itself failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The server answered with a non-2xx status.
    #[error("Sync endpoint returned {code} {text}")]
    Status {
        /// Status code.
        code: u16,
        /// Reason phrase.
        text: String,
    },

    /// The response body was not a credential list.
    #[error("Failed to decode sync response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Saving the fetched credentials failed.
    #[error(transparent)]
    Store(#[from] CredentialStoreError),
}

/// Downloads remote public credentials and stores them locally.
pub struct CredentialSync {
    base_url: Url,
    client: Arc<dyn HttpClient>,
    storage: CredentialStorage,
}

impl fmt::Debug for CredentialSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSync")
            .field("base_url", &self.base_url.as_str())
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl CredentialSync {
    /// Creates a syncer against `base_url`.
    pub fn new(base_url: Url, client: Arc<dyn HttpClient>, storage: CredentialStorage) -> Self {
        Self {
            base_url,
            client,
            storage,
        }
    }

    /// URL queried for `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] if the base URL cannot carry a path.
    pub fn endpoint_for(&self, selector: &CredentialSelector) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "accounts",
                selector.account_name.as_str(),
                "public-credentials",
            ]);
        url.query_pairs_mut()
            .append_pair("identity_type", selector.identity_type.as_str());
        Ok(url)
    }

    /// Fetches remote public credentials for `selector` and saves them as
    /// [`PublicCredentialType::RemotePublicCredential`].
    ///
    /// Only stored credentials of the selector's identity type are replaced;
    /// remote credentials of other identity types are kept. The merge is a
    /// read followed by a save, so concurrent syncs of one account should be
    /// serialized by the caller.
    ///
    /// Returns the number of credentials downloaded.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the exchange fails, the status is not 2xx,
    /// the body does not decode, or the store rejects the save. Nothing is
    /// saved on failure.
    pub async fn sync_remote_public_credentials(
        &self,
        selector: &CredentialSelector,
    ) -> Result<usize, SyncError> {
        let url = self.endpoint_for(selector)?;
        let request = WebRequest::get(url.as_str()).with_header("Accept", "application/json");

        let response = self.client.execute(&request).await?;
        if !response.is_success() {
            warn!(
                account = %selector.account_name,
                status = response.status_code,
                "credential sync rejected"
            );
            return Err(SyncError::Status {
                code: response.status_code,
                text: response.status_text,
            });
        }

        let credentials: Vec<PublicCredential> =
            serde_json::from_str(&response.body).map_err(SyncError::Decode)?;

        let mut merged = self.stored_remote_except(selector).await?;
        merged.extend(credentials.iter().cloned());
        self.storage
            .save_public_credentials(
                &selector.account_name,
                &merged,
                PublicCredentialType::RemotePublicCredential,
            )
            .await?;

        info!(
            account = %selector.account_name,
            count = credentials.len(),
            "synced remote public credentials"
        );
        Ok(credentials.len())
    }

    /// Stored remote credentials of every identity type other than the
    /// selector's.
    async fn stored_remote_except(
        &self,
        selector: &CredentialSelector,
    ) -> Result<Vec<PublicCredential>, CredentialStoreError> {
        let mut kept = Vec::new();
        for identity_type in IdentityType::ALL {
            if identity_type == selector.identity_type {
                continue;
            }
            let other = CredentialSelector {
                identity_type,
                ..selector.clone()
            };
            match self
                .storage
                .get_public_credentials(&other, PublicCredentialType::RemotePublicCredential)
                .await
            {
                Ok(stored) => kept.extend(stored),
                Err(CredentialStoreError::NotFound { .. }) => return Ok(kept),
                Err(err) => return Err(err),
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::http::WebResponse;

    /// Replies with a canned response and records requests.
    struct CannedClient {
        response: WebResponse,
        requests: Mutex<Vec<WebRequest>>,
    }

    impl CannedClient {
        fn new(status_code: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: WebResponse {
                    status_code,
                    status_text: if status_code == 200 { "OK" } else { "Forbidden" }.into(),
                    body: body.to_string(),
                    ..WebResponse::default()
                },
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, request: &WebRequest) -> Result<WebResponse, HttpError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct DownClient;

    #[async_trait]
    impl HttpClient for DownClient {
        async fn execute(&self, _request: &WebRequest) -> Result<WebResponse, HttpError> {
            Err(HttpError::Transport("connection refused".into()))
        }
    }

    fn selector() -> CredentialSelector {
        CredentialSelector::new("nearlink", "alice@example.com", IdentityType::Trusted)
    }

    fn remote_body() -> String {
        remote_body_for(IdentityType::Trusted)
    }

    fn remote_body_for(identity_type: IdentityType) -> String {
        let start = Utc::now();
        serde_json::to_string(&vec![PublicCredential {
            identity_type,
            secret_id: vec![1, 2, 3],
            version: 2,
            start_time: start,
            end_time: start + Duration::days(1),
            material: vec![9; 16],
        }])
        .unwrap()
    }

    fn base() -> Url {
        Url::parse("https://sync.example.com/api/").unwrap()
    }

    #[tokio::test]
    async fn test_sync_saves_remote_credentials() {
        let client = CannedClient::new(200, &remote_body());
        let storage = CredentialStorage::in_memory();
        let sync = CredentialSync::new(base(), client.clone(), storage.clone());

        let count = sync.sync_remote_public_credentials(&selector()).await.unwrap();
        assert_eq!(count, 1);

        let stored = storage
            .get_public_credentials(&selector(), PublicCredentialType::RemotePublicCredential)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].version, 2);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://sync.example.com/api/v1/accounts/alice@example.com/public-credentials?identity_type=trusted"
        );
        assert_eq!(requests[0].headers.get("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_sync_keeps_other_identity_types() {
        let storage = CredentialStorage::in_memory();
        let trusted = CredentialSync::new(
            base(),
            CannedClient::new(200, &remote_body_for(IdentityType::Trusted)),
            storage.clone(),
        );
        let public = CredentialSync::new(
            base(),
            CannedClient::new(200, &remote_body_for(IdentityType::Public)),
            storage.clone(),
        );
        let public_selector =
            CredentialSelector::new("nearlink", "alice@example.com", IdentityType::Public);

        trusted.sync_remote_public_credentials(&selector()).await.unwrap();
        public
            .sync_remote_public_credentials(&public_selector)
            .await
            .unwrap();
        // A second sync of one type replaces only that type.
        public
            .sync_remote_public_credentials(&public_selector)
            .await
            .unwrap();

        let remote = PublicCredentialType::RemotePublicCredential;
        let stored_trusted = storage
            .get_public_credentials(&selector(), remote)
            .await
            .unwrap();
        let stored_public = storage
            .get_public_credentials(&public_selector, remote)
            .await
            .unwrap();
        assert_eq!(stored_trusted.len(), 1);
        assert_eq!(stored_public.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let storage = CredentialStorage::in_memory();
        let sync = CredentialSync::new(base(), CannedClient::new(403, ""), storage.clone());

        let err = sync.sync_remote_public_credentials(&selector()).await.unwrap_err();
        assert!(matches!(err, SyncError::Status { code: 403, .. }));

        let stored = storage
            .get_public_credentials(&selector(), PublicCredentialType::RemotePublicCredential)
            .await;
        assert!(matches!(stored, Err(CredentialStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let sync = CredentialSync::new(
            base(),
            CannedClient::new(200, "<html>"),
            CredentialStorage::in_memory(),
        );
        let err = sync.sync_remote_public_credentials(&selector()).await.unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_relayed() {
        let sync = CredentialSync::new(base(), Arc::new(DownClient), CredentialStorage::in_memory());
        let err = sync.sync_remote_public_credentials(&selector()).await.unwrap_err();
        assert!(matches!(err, SyncError::Http(HttpError::Transport(_))));
    }

    #[test]
    fn test_endpoint_escapes_account_name() {
        let sync = CredentialSync::new(base(), Arc::new(DownClient), CredentialStorage::in_memory());
        let selector = CredentialSelector::new("nearlink", "a b/c", IdentityType::Private);
        let url = sync.endpoint_for(&selector).unwrap();
        assert_eq!(url.path(), "/api/v1/accounts/a%20b%2Fc/public-credentials");
    }
}

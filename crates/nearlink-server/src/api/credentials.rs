//! Credential storage API endpoints.
//!
//! Credentials are stored per account. Private credentials never leave the
//! device except through this local API; public credentials are kept in two
//! sets, `local` (ours, for sharing) and `remote` (others', for verifying).

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use nearlink_core::{
    CredentialSelector, IdentityType, PrivateCredential, PublicCredential, PublicCredentialType,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the credentials router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/{account}/private",
            get(get_private_credentials).put(save_private_credentials),
        )
        .route(
            "/{account}/public/{credential_type}",
            get(get_public_credentials).put(save_public_credentials),
        )
        .route("/{account}/sync", post(sync_credentials))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters selecting credentials.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CredentialQuery {
    /// Identity type to select. Defaults to `private`.
    #[param(example = "trusted")]
    pub identity_type: Option<IdentityType>,
}

impl CredentialQuery {
    fn identity_type(&self) -> IdentityType {
        self.identity_type.unwrap_or(IdentityType::Private)
    }
}

/// Response after replacing a credential set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "account_name": "user@example.com",
    "saved": 3
}))]
pub struct SaveCredentialsResponse {
    /// Account the credentials were stored for.
    pub account_name: String,
    /// Number of credentials now stored.
    pub saved: usize,
}

/// Response after a remote sync.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "account_name": "user@example.com",
    "identity_type": "trusted",
    "synced": 12
}))]
pub struct SyncCredentialsResponse {
    /// Account that was synced.
    pub account_name: String,
    /// Identity type that was synced.
    pub identity_type: IdentityType,
    /// Number of remote public credentials stored.
    pub synced: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get private credentials for an account.
#[utoipa::path(
    get,
    path = "/api/credentials/{account}/private",
    tag = "credentials",
    operation_id = "getPrivateCredentials",
    summary = "Get private credentials",
    description = "Returns the account's private credentials of the selected \
        identity type. Fails with 404 if nothing was ever saved for the account.",
    params(
        ("account" = String, Path, description = "Account name"),
        CredentialQuery
    ),
    responses(
        (status = 200, description = "Credentials retrieved", body = Vec<PrivateCredential>),
        (status = 400, description = "Invalid account name", body = super::error::ErrorResponse),
        (status = 404, description = "No credentials stored", body = super::error::ErrorResponse)
    )
)]
pub async fn get_private_credentials(
    State(state): State<SharedState>,
    Path(account): Path<String>,
    Query(query): Query<CredentialQuery>,
) -> ApiResult<Json<Vec<PrivateCredential>>> {
    let (storage, selector) = {
        let state_guard = state.read().await;
        (
            state_guard.credentials.clone(),
            selector(&state_guard.config.credentials.manager_app_id, account, &query),
        )
    };
    Ok(Json(storage.get_private_credentials(&selector).await?))
}

/// Replace private credentials for an account.
#[utoipa::path(
    put,
    path = "/api/credentials/{account}/private",
    tag = "credentials",
    operation_id = "savePrivateCredentials",
    summary = "Replace private credentials",
    description = "Replaces every private credential stored for the account.",
    params(("account" = String, Path, description = "Account name")),
    request_body = Vec<PrivateCredential>,
    responses(
        (status = 200, description = "Credentials stored", body = SaveCredentialsResponse),
        (status = 400, description = "Invalid account name", body = super::error::ErrorResponse)
    )
)]
pub async fn save_private_credentials(
    State(state): State<SharedState>,
    Path(account): Path<String>,
    Json(credentials): Json<Vec<PrivateCredential>>,
) -> ApiResult<Json<SaveCredentialsResponse>> {
    let storage = state.read().await.credentials.clone();
    storage
        .save_private_credentials(&account, &credentials)
        .await?;

    info!(account = %account, count = credentials.len(), "private credentials saved");
    Ok(Json(SaveCredentialsResponse {
        account_name: account,
        saved: credentials.len(),
    }))
}

/// Get public credentials for an account.
#[utoipa::path(
    get,
    path = "/api/credentials/{account}/public/{credential_type}",
    tag = "credentials",
    operation_id = "getPublicCredentials",
    summary = "Get public credentials",
    description = "Returns the account's `local` or `remote` public credentials \
        of the selected identity type.",
    params(
        ("account" = String, Path, description = "Account name"),
        ("credential_type" = String, Path, description = "`local` or `remote`"),
        CredentialQuery
    ),
    responses(
        (status = 200, description = "Credentials retrieved", body = Vec<PublicCredential>),
        (status = 400, description = "Invalid account name or credential type", body = super::error::ErrorResponse),
        (status = 404, description = "No credentials stored", body = super::error::ErrorResponse)
    )
)]
pub async fn get_public_credentials(
    State(state): State<SharedState>,
    Path((account, credential_type)): Path<(String, String)>,
    Query(query): Query<CredentialQuery>,
) -> ApiResult<Json<Vec<PublicCredential>>> {
    let credential_type = PublicCredentialType::from_str(&credential_type)?;
    let (storage, selector) = {
        let state_guard = state.read().await;
        (
            state_guard.credentials.clone(),
            selector(&state_guard.config.credentials.manager_app_id, account, &query),
        )
    };
    Ok(Json(
        storage
            .get_public_credentials(&selector, credential_type)
            .await?,
    ))
}

/// Replace public credentials for an account.
#[utoipa::path(
    put,
    path = "/api/credentials/{account}/public/{credential_type}",
    tag = "credentials",
    operation_id = "savePublicCredentials",
    summary = "Replace public credentials",
    description = "Replaces every `local` or `remote` public credential stored \
        for the account.",
    params(
        ("account" = String, Path, description = "Account name"),
        ("credential_type" = String, Path, description = "`local` or `remote`")
    ),
    request_body = Vec<PublicCredential>,
    responses(
        (status = 200, description = "Credentials stored", body = SaveCredentialsResponse),
        (status = 400, description = "Invalid account name or credential type", body = super::error::ErrorResponse)
    )
)]
pub async fn save_public_credentials(
    State(state): State<SharedState>,
    Path((account, credential_type)): Path<(String, String)>,
    Json(credentials): Json<Vec<PublicCredential>>,
) -> ApiResult<Json<SaveCredentialsResponse>> {
    let credential_type = PublicCredentialType::from_str(&credential_type)?;
    let storage = state.read().await.credentials.clone();
    storage
        .save_public_credentials(&account, &credentials, credential_type)
        .await?;

    info!(
        account = %account,
        credential_type = %credential_type,
        count = credentials.len(),
        "public credentials saved"
    );
    Ok(Json(SaveCredentialsResponse {
        account_name: account,
        saved: credentials.len(),
    }))
}

/// Pull remote public credentials from the sync service.
#[utoipa::path(
    post,
    path = "/api/credentials/{account}/sync",
    tag = "credentials",
    operation_id = "syncCredentials",
    summary = "Sync remote public credentials",
    description = "Downloads the account's remote public credentials of the \
        selected identity type from the configured sync service and replaces the \
        stored `remote` set.",
    params(
        ("account" = String, Path, description = "Account name"),
        CredentialQuery
    ),
    responses(
        (status = 200, description = "Credentials synced", body = SyncCredentialsResponse),
        (status = 424, description = "Sync is not configured", body = super::error::ErrorResponse),
        (status = 502, description = "Sync service rejected the request", body = super::error::ErrorResponse),
        (status = 503, description = "Sync service unreachable", body = super::error::ErrorResponse)
    )
)]
pub async fn sync_credentials(
    State(state): State<SharedState>,
    Path(account): Path<String>,
    Query(query): Query<CredentialQuery>,
) -> ApiResult<Json<SyncCredentialsResponse>> {
    let (sync, selector) = {
        let state_guard = state.read().await;
        let sync = state_guard
            .sync
            .clone()
            .ok_or_else(|| ApiError::FailedDependency {
                error_code: "sync_not_configured".to_string(),
                message: "Credential sync is not configured. Set sync.base_url.".to_string(),
            })?;
        (
            sync,
            selector(&state_guard.config.credentials.manager_app_id, account, &query),
        )
    };

    let synced = sync.sync_remote_public_credentials(&selector).await?;
    Ok(Json(SyncCredentialsResponse {
        account_name: selector.account_name,
        identity_type: selector.identity_type,
        synced,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn selector(manager_app_id: &str, account: String, query: &CredentialQuery) -> CredentialSelector {
    CredentialSelector::new(manager_app_id, account, query.identity_type())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_private() {
        let query = CredentialQuery::default();
        assert_eq!(query.identity_type(), IdentityType::Private);

        let query = CredentialQuery {
            identity_type: Some(IdentityType::Trusted),
        };
        let selector = selector("nearlink", "alice".into(), &query);
        assert_eq!(selector.identity_type, IdentityType::Trusted);
        assert_eq!(selector.manager_app_id, "nearlink");
    }

    #[test]
    fn test_save_response_serialization() {
        let response = SaveCredentialsResponse {
            account_name: "alice".into(),
            saved: 2,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"saved\":2"));
    }
}

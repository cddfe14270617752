//! OpenAPI specification generation for the nearlink API.
//!
//! The document is served at `/api/openapi.json`, rendered by Swagger UI at
//! `/swagger-ui`, and written to disk by the `gen-openapi` binary for client
//! generation.

use axum::Json;
use nearlink_core::{
    ConnectionInfo, DeviceMetadata, DeviceMotion, IdentityType, MacAddress, Medium,
    MediumResolution, MotionType, PrivateCredential, PublicCredential, Strategy,
};
use utoipa::OpenApi;

use super::credentials::{SaveCredentialsResponse, SyncCredentialsResponse};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::options::{KeepAliveResponse, NormalizeOptionsRequest, NormalizedOptionsResponse};
use super::presence::{CreatePresenceDeviceRequest, PresenceDeviceResponse};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for nearlink.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "nearlink API",
        version = "0.1.0",
        description = r#"
# nearlink API

nearlink negotiates how nearby devices connect and gives each advertised
device a fresh, unlinkable identity.

## Overview

This local daemon provides:

1. **Medium negotiation**: Normalize advertising and discovery options so the
   allowed medium set is legal for the requested topology and connection kind
2. **Presence identities**: Mint ephemeral endpoint ids for device metadata
3. **Credentials**: Store and retrieve presence credentials per account, and
   pull remote public credentials from a sync service

## Medium rules

- An out-of-band connection uses exactly one medium. Zero or several requested
  mediums fall back to Bluetooth Classic.
- Otherwise an empty medium list means "no preference" and allows every medium.
- Any other list is kept as requested.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local nearlink daemon")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "options", description = "Medium negotiation for advertising and discovery"),
        (name = "presence", description = "Ephemeral presence identities"),
        (name = "credentials", description = "Presence credential storage and sync")
    ),
    paths(
        super::health::health_check,
        super::options::normalize_discovery,
        super::options::normalize_advertising,
        super::presence::create_presence_device,
        super::credentials::get_private_credentials,
        super::credentials::save_private_credentials,
        super::credentials::get_public_credentials,
        super::credentials::save_public_credentials,
        super::credentials::sync_credentials,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Options types
            Strategy,
            Medium,
            MediumResolution,
            NormalizeOptionsRequest,
            NormalizedOptionsResponse,
            KeepAliveResponse,
            // Presence types
            MacAddress,
            MotionType,
            DeviceMotion,
            DeviceMetadata,
            ConnectionInfo,
            CreatePresenceDeviceRequest,
            PresenceDeviceResponse,
            // Credential types
            IdentityType,
            PrivateCredential,
            PublicCredential,
            SaveCredentialsResponse,
            SyncCredentialsResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "nearlink API");
        assert!(spec.paths.paths.contains_key("/api/options/discovery/normalize"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/credentials/{account}/public/{credential_type}"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"nearlink API\""));
    }
}

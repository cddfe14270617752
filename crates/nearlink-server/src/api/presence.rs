//! Presence identity API endpoint.
//!
//! Each call mints a fresh, unlinkable identity for the supplied device
//! metadata. Identities are not stored by the daemon.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use nearlink_core::{ConnectionInfo, DeviceMetadata, DeviceMotion, PresenceDevice};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the presence router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/devices", post(create_presence_device))
}

/// Request body for minting an identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "metadata": {
        "device_name": "Pixel 9",
        "account_name": "user@example.com",
        "bluetooth_mac_address": "AA:BB:CC:DD:EE:FF"
    },
    "motion": {"motion_type": "point_and_hold", "confidence": 0.9}
}))]
pub struct CreatePresenceDeviceRequest {
    /// Device description.
    pub metadata: DeviceMetadata,
    /// Observed motion; unknown when omitted.
    #[serde(default)]
    pub motion: Option<DeviceMotion>,
}

/// A minted presence identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "endpoint_id": "K3Q9",
    "discovery_timestamp_millis": 15230,
    "device_motion": {"motion_type": "point_and_hold", "confidence": 0.9},
    "device_metadata": {
        "stable_device_id": "",
        "account_name": "user@example.com",
        "device_name": "Pixel 9",
        "user_name": "",
        "device_profile_url": null,
        "bluetooth_mac_address": "AA:BB:CC:DD:EE:FF"
    },
    "connection_infos": [{"medium": "BLE", "mac_address": "AA:BB:CC:DD:EE:FF"}]
}))]
pub struct PresenceDeviceResponse {
    /// Ephemeral endpoint id.
    #[schema(example = "K3Q9", min_length = 4, max_length = 4)]
    pub endpoint_id: String,
    /// Daemon monotonic clock reading at mint time, in milliseconds.
    pub discovery_timestamp_millis: u64,
    /// Motion snapshot.
    pub device_motion: DeviceMotion,
    /// Metadata as supplied.
    pub device_metadata: DeviceMetadata,
    /// How to reach the device.
    pub connection_infos: Vec<ConnectionInfo>,
}

impl From<PresenceDevice> for PresenceDeviceResponse {
    fn from(device: PresenceDevice) -> Self {
        Self {
            endpoint_id: device.endpoint_id().to_string(),
            discovery_timestamp_millis: u64::try_from(device.discovery_timestamp().as_millis())
                .unwrap_or(u64::MAX),
            device_motion: *device.device_motion(),
            connection_infos: device.connection_infos(),
            device_metadata: device.device_metadata().clone(),
        }
    }
}

/// Mint a presence identity.
#[utoipa::path(
    post,
    path = "/api/presence/devices",
    tag = "presence",
    operation_id = "createPresenceDevice",
    summary = "Mint a presence identity",
    description = "Creates a fresh identity with a random 4-character endpoint \
        id for the given device metadata. Two calls with the same metadata \
        produce unrelated endpoint ids.",
    request_body = CreatePresenceDeviceRequest,
    responses(
        (status = 201, description = "Identity minted", body = PresenceDeviceResponse),
        (status = 422, description = "Malformed metadata, e.g. a bad MAC address"),
        (status = 500, description = "Random source failed", body = super::error::ErrorResponse)
    )
)]
pub async fn create_presence_device(
    State(state): State<SharedState>,
    Json(request): Json<CreatePresenceDeviceRequest>,
) -> ApiResult<(StatusCode, Json<PresenceDeviceResponse>)> {
    let device = state
        .read()
        .await
        .identities
        .generate(request.metadata, request.motion)?;

    info!(endpoint_id = %device.endpoint_id(), "presence identity minted");
    Ok((StatusCode::CREATED, Json(device.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_motion_is_optional() {
        let request: CreatePresenceDeviceRequest = serde_json::from_str(
            r#"{"metadata": {"bluetooth_mac_address": "aa:bb:cc:dd:ee:ff"}}"#,
        )
        .unwrap();
        assert!(request.motion.is_none());
        assert_eq!(
            request.metadata.bluetooth_mac_address.as_str(),
            "AA:BB:CC:DD:EE:FF"
        );
    }

    #[test]
    fn test_request_rejects_bad_mac() {
        let parsed: Result<CreatePresenceDeviceRequest, _> =
            serde_json::from_str(r#"{"metadata": {"bluetooth_mac_address": "nope"}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_response_from_device() {
        let request: CreatePresenceDeviceRequest = serde_json::from_str(
            r#"{"metadata": {"bluetooth_mac_address": "AA:BB:CC:DD:EE:FF"}}"#,
        )
        .unwrap();
        let device = PresenceDevice::new(request.metadata).unwrap();
        let response = PresenceDeviceResponse::from(device);
        assert_eq!(response.endpoint_id.len(), 4);
        assert_eq!(response.connection_infos.len(), 1);
    }
}

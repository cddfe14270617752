//! Medium negotiation API endpoints.
//!
//! Clients post the options they intend to advertise or discover with and
//! receive the normalized options the transport layer will actually use.
//! Fields left out of a request fall back to the daemon's configured
//! defaults.

use std::str::FromStr;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use nearlink_core::{
    AdvertisingOptions, BooleanMediumSelector, DiscoveryOptions, Medium, MediumOptions,
    MediumResolution, OptionsBase, Strategy,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the options router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/discovery/normalize", post(normalize_discovery))
        .route("/advertising/normalize", post(normalize_advertising))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Options to normalize. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
#[schema(example = json!({
    "strategy": "P2P_POINT_TO_POINT",
    "mediums": ["BLE", "BLUETOOTH_CLASSIC"],
    "is_out_of_band_connection": true
}))]
pub struct NormalizeOptionsRequest {
    /// Strategy token; the configured default when omitted.
    #[schema(example = "P2P_STAR")]
    pub strategy: Option<String>,

    /// Allowed medium tokens; the configured list when omitted. An empty
    /// list means no preference.
    pub mediums: Option<Vec<String>>,

    /// Whether the endpoint is injected out of band.
    pub is_out_of_band_connection: bool,

    /// Prefer low-power operation.
    pub low_power: Option<bool>,

    /// Keep running in the background.
    pub always_on: Option<bool>,

    /// Allow bandwidth upgrades.
    pub auto_upgrade_bandwidth: Option<bool>,

    /// Restrict upgrades to strategy-compatible mediums.
    pub enforce_topology_constraints: Option<bool>,

    /// Keep-alive interval in milliseconds (discovery only; 0 selects the
    /// default).
    pub keep_alive_interval_millis: Option<u32>,

    /// Keep-alive timeout in milliseconds (discovery only; 0 selects the
    /// default).
    pub keep_alive_timeout_millis: Option<u32>,

    /// Service UUID for low-power BLE advertisement.
    pub fast_advertisement_service_uuid: Option<String>,
}

/// Resolved keep-alive timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeepAliveResponse {
    /// Time between keep-alive frames.
    #[schema(example = 5000)]
    pub interval_millis: u64,
    /// Time without traffic before the connection is dropped.
    #[schema(example = 30000)]
    pub timeout_millis: u64,
}

/// Normalized options.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "strategy": "P2P_POINT_TO_POINT",
    "requested_mediums": ["BLE", "BLUETOOTH_CLASSIC"],
    "mediums": ["BLUETOOTH_CLASSIC"],
    "resolution": "out_of_band_fallback",
    "is_out_of_band_connection": true,
    "low_power": false,
    "always_on": false,
    "auto_upgrade_bandwidth": true,
    "enforce_topology_constraints": true,
    "upgrade_mediums": [],
    "keep_alive": {"interval_millis": 5000, "timeout_millis": 30000},
    "fast_advertisement_service_uuid": ""
}))]
pub struct NormalizedOptionsResponse {
    /// Requested topology.
    pub strategy: Strategy,
    /// Mediums as requested.
    pub requested_mediums: Vec<Medium>,
    /// Mediums after normalization.
    pub mediums: Vec<Medium>,
    /// Which rule produced `mediums`.
    pub resolution: MediumResolution,
    /// Whether the endpoint is injected out of band.
    pub is_out_of_band_connection: bool,
    /// Prefer low-power operation.
    pub low_power: bool,
    /// Keep running in the background.
    pub always_on: bool,
    /// Bandwidth upgrades allowed.
    pub auto_upgrade_bandwidth: bool,
    /// Upgrades restricted to strategy-compatible mediums.
    pub enforce_topology_constraints: bool,
    /// Mediums a bandwidth upgrade may move to.
    pub upgrade_mediums: Vec<Medium>,
    /// Keep-alive timing; discovery only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<KeepAliveResponse>,
    /// Service UUID for low-power BLE advertisement.
    pub fast_advertisement_service_uuid: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Normalize discovery options.
#[utoipa::path(
    post,
    path = "/api/options/discovery/normalize",
    tag = "options",
    operation_id = "normalizeDiscoveryOptions",
    summary = "Normalize discovery options",
    description = "Returns the discovery options with a legal medium set. An \
        out-of-band connection must use exactly one medium and otherwise falls \
        back to Bluetooth Classic; an empty set widens to every medium.",
    request_body = NormalizeOptionsRequest,
    responses(
        (status = 200, description = "Options normalized", body = NormalizedOptionsResponse),
        (status = 400, description = "Unknown strategy or medium token", body = super::error::ErrorResponse)
    )
)]
pub async fn normalize_discovery(
    State(state): State<SharedState>,
    Json(request): Json<NormalizeOptionsRequest>,
) -> ApiResult<Json<NormalizedOptionsResponse>> {
    let defaults = state.read().await.config.discovery_options()?;

    let mut options = DiscoveryOptions {
        base: apply_base(defaults.base, &request)?,
        is_out_of_band_connection: request.is_out_of_band_connection,
        ..defaults
    };
    if let Some(value) = request.auto_upgrade_bandwidth {
        options.auto_upgrade_bandwidth = value;
    }
    if let Some(value) = request.enforce_topology_constraints {
        options.enforce_topology_constraints = value;
    }
    if let Some(value) = request.keep_alive_interval_millis {
        options.keep_alive_interval_millis = value;
    }
    if let Some(value) = request.keep_alive_timeout_millis {
        options.keep_alive_timeout_millis = value;
    }
    if let Some(value) = request.fast_advertisement_service_uuid {
        options.fast_advertisement_service_uuid = value;
    }

    let (normalized, resolution) = options.resolve_options();
    let keep_alive = normalized.keep_alive();
    let mut response = describe(&options, &normalized, resolution);
    response.keep_alive = Some(KeepAliveResponse {
        interval_millis: millis(keep_alive.interval),
        timeout_millis: millis(keep_alive.timeout),
    });
    response.fast_advertisement_service_uuid = normalized.fast_advertisement_service_uuid;
    Ok(Json(response))
}

/// Normalize advertising options.
#[utoipa::path(
    post,
    path = "/api/options/advertising/normalize",
    tag = "options",
    operation_id = "normalizeAdvertisingOptions",
    summary = "Normalize advertising options",
    description = "Returns the advertising options with a legal medium set, \
        using the same rules as discovery. Keep-alive fields are ignored.",
    request_body = NormalizeOptionsRequest,
    responses(
        (status = 200, description = "Options normalized", body = NormalizedOptionsResponse),
        (status = 400, description = "Unknown strategy or medium token", body = super::error::ErrorResponse)
    )
)]
pub async fn normalize_advertising(
    State(state): State<SharedState>,
    Json(request): Json<NormalizeOptionsRequest>,
) -> ApiResult<Json<NormalizedOptionsResponse>> {
    let defaults = state.read().await.config.advertising_options()?;

    let mut options = AdvertisingOptions {
        base: apply_base(defaults.base, &request)?,
        is_out_of_band_connection: request.is_out_of_band_connection,
        ..defaults
    };
    if let Some(value) = request.auto_upgrade_bandwidth {
        options.auto_upgrade_bandwidth = value;
    }
    if let Some(value) = request.enforce_topology_constraints {
        options.enforce_topology_constraints = value;
    }
    if let Some(value) = request.fast_advertisement_service_uuid {
        options.fast_advertisement_service_uuid = value;
    }

    let (normalized, resolution) = options.resolve_options();
    let mut response = describe(&options, &normalized, resolution);
    response.fast_advertisement_service_uuid = normalized.fast_advertisement_service_uuid;
    Ok(Json(response))
}

// ============================================================================
// Helpers
// ============================================================================

/// Overlays request fields on the configured base.
fn apply_base(mut base: OptionsBase, request: &NormalizeOptionsRequest) -> ApiResult<OptionsBase> {
    if let Some(token) = &request.strategy {
        base.strategy = Strategy::from_str(token)?;
    }
    if let Some(tokens) = &request.mediums {
        base.allowed = tokens
            .iter()
            .map(|token| Medium::from_str(token))
            .collect::<Result<BooleanMediumSelector, _>>()?;
    }
    if let Some(value) = request.low_power {
        base.low_power = value;
    }
    if let Some(value) = request.always_on {
        base.always_on = value;
    }
    Ok(base)
}

fn describe<O: MediumOptions>(
    requested: &O,
    normalized: &O,
    resolution: MediumResolution,
) -> NormalizedOptionsResponse {
    debug!(
        strategy = %normalized.base().strategy,
        ?resolution,
        "normalized options"
    );
    NormalizedOptionsResponse {
        strategy: normalized.base().strategy,
        requested_mediums: requested.base().allowed.enabled_mediums(),
        mediums: normalized.base().allowed.enabled_mediums(),
        resolution,
        is_out_of_band_connection: normalized.is_out_of_band_connection(),
        low_power: normalized.base().low_power,
        always_on: normalized.base().always_on,
        auto_upgrade_bandwidth: normalized.auto_upgrade_bandwidth(),
        enforce_topology_constraints: normalized.enforce_topology_constraints(),
        upgrade_mediums: normalized.upgrade_mediums().enabled_mediums(),
        keep_alive: None,
        fast_advertisement_service_uuid: String::new(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields_default_to_none() {
        let request: NormalizeOptionsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.strategy.is_none());
        assert!(request.mediums.is_none());
        assert!(!request.is_out_of_band_connection);
    }

    #[test]
    fn test_apply_base_parses_tokens() {
        let request = NormalizeOptionsRequest {
            strategy: Some("P2P_STAR".into()),
            mediums: Some(vec!["BLE".into(), "wifi-lan".into()]),
            low_power: Some(true),
            ..NormalizeOptionsRequest::default()
        };
        let base = apply_base(OptionsBase::new(Strategy::Cluster), &request).unwrap();
        assert_eq!(base.strategy, Strategy::Star);
        assert_eq!(
            base.allowed,
            BooleanMediumSelector::from_mediums([Medium::Ble, Medium::WifiLan])
        );
        assert!(base.low_power);
    }

    #[test]
    fn test_apply_base_rejects_unknown_medium() {
        let request = NormalizeOptionsRequest {
            mediums: Some(vec!["LORA".into()]),
            ..NormalizeOptionsRequest::default()
        };
        assert!(apply_base(OptionsBase::new(Strategy::Cluster), &request).is_err());
    }
}

//! Health check API endpoint.
//!
//! Provides a simple health check endpoint for monitoring and service managers.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "default_strategy": "P2P_CLUSTER",
    "sync_enabled": false
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Strategy token used when requests omit one.
    #[schema(example = "P2P_CLUSTER")]
    pub default_strategy: String,

    /// Whether remote credential sync is configured.
    #[schema(example = false)]
    pub sync_enabled: bool,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information. Use this endpoint \
        for health checks and monitoring.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state_guard = state.read().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_strategy: state_guard.config.discovery.strategy.clone(),
        sync_enabled: state_guard.sync.is_some(),
    })
}

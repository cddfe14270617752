//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `health` - Service health checks
//! - `options` - Medium negotiation for advertising and discovery
//! - `presence` - Presence identity minting
//! - `credentials` - Credential storage and sync
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod credentials;
pub mod error;
pub mod health;
pub mod openapi;
pub mod options;
pub mod presence;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::{get_openapi_json, ApiDoc};

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                                   - Health check
/// /api
/// ├── /options/discovery/normalize          - Normalize discovery options
/// ├── /options/advertising/normalize        - Normalize advertising options
/// ├── /presence/devices                     - Mint a presence identity
/// ├── /credentials/{account}/private        - Private credentials
/// ├── /credentials/{account}/public/{type}  - Local/remote public credentials
/// ├── /credentials/{account}/sync           - Remote credential sync
/// └── /openapi.json                         - OpenAPI specification
/// /swagger-ui                               - Interactive API docs
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/options", options::router())
                .nest("/presence", presence::router())
                .nest("/credentials", credentials::router()),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

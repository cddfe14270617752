//! # nearlinkd
//!
//! Local daemon for nearlink.
//!
//! This binary provides:
//! - REST API for medium negotiation, presence identities and credentials
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package nearlink-server --bin nearlinkd
//!
//! # Production
//! NEARLINK_ENV=production NEARLINK_BIND=0.0.0.0:7410 ./nearlinkd
//! ```
//!
//! ## Environment
//!
//! - `NEARLINK_CONFIG` - configuration file path
//! - `NEARLINK_BIND` - listen address (default `127.0.0.1:7410`)
//! - `NEARLINK_ENV` - `production` enables file logging
//! - `NEARLINK_LOG_LEVEL` / `RUST_LOG` - log filter

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use anyhow::Context;
use nearlink_server::api;
use nearlink_server::logging;
use nearlink_server::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_BIND: &str = "127.0.0.1:7410";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("NEARLINK_ENV").is_ok_and(|v| v == "production");
    logging::init(is_production)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting nearlinkd");

    let state = AppState::load()?.shared();
    let app = api::create_router(state);

    let bind = std::env::var("NEARLINK_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid NEARLINK_BIND address '{bind}'"))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("nearlinkd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

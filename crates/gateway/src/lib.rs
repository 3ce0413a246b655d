//! API Gateway Library
//!
//! HTTP REST API in front of the roster service: admin-only import and
//! template endpoints, a health check and Swagger docs.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use tower_http::trace::TraceLayer;
use tracing::info;

use roster_service_lib::config::RosterServiceConfig;

use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Connect the roster service and serve HTTP on the configured address.
pub async fn run_server(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Connects to the database and applies pending migrations
    let roster = roster_service_lib::connect_service(&RosterServiceConfig::from_env()).await?;

    let app = create_router(AppState::new(roster, config)).layer(TraceLayer::new_for_http());

    info!(%addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

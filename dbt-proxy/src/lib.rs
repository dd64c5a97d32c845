pub mod auth;
pub mod config;
pub mod dbt;
pub mod error;
pub mod logging;
pub mod routes;

pub use config::{Config, ConfigError, DbtConfig};
pub use dbt::{DbtClient, DbtError};
pub use error::ProxyError;

use std::sync::Arc;

use axum::{body::Body, http::Request, middleware, Router};
use tower_http::trace::TraceLayer;

/// Shared application state. Read-only after startup.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub dbt_client: DbtClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, DbtError> {
        let dbt_client = DbtClient::new(&config.dbt)?;
        Ok(Self { config, dbt_client })
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Spans carry the path only; the query string may hold the proxy secret.
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .merge(routes::health::router())
        .merge(routes::runs::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(trace)
}

//! Tracing setup and the per-request access log.

use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// How a proxied call ended, as recorded in the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Relayed,
    Denied,
    Rejected,
    UpstreamFailed,
}

impl Outcome {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Outcome::Denied,
            s if s.is_server_error() => Outcome::UpstreamFailed,
            s if s.is_client_error() => Outcome::Rejected,
            _ => Outcome::Relayed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Relayed => "relayed",
            Outcome::Denied => "denied",
            Outcome::Rejected => "rejected",
            Outcome::UpstreamFailed => "upstream_failed",
        }
    }
}

/// Access log middleware: one line per request, WARN when the upstream failed.
///
/// Only the path is recorded; the query string may carry `proxy_secret`.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    let outcome = Outcome::from_status(response.status());

    if outcome == Outcome::UpstreamFailed {
        tracing::warn!(%method, %path, status, duration_ms, outcome = outcome.as_str(), "proxy request");
    } else {
        tracing::info!(%method, %path, status, duration_ms, outcome = outcome.as_str(), "proxy request");
    }

    response
}

//! Shared-secret authentication for protected routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::error::ProxyError;
use crate::AppState;

/// Header callers put the proxy secret in.
pub const SECRET_HEADER: &str = "x-proxy-secret";
/// Query parameter accepted when the header is absent.
pub const SECRET_QUERY_PARAM: &str = "proxy_secret";

/// Check a caller-provided secret against the configured one.
///
/// Both must be present and non-empty, and equal byte for byte.
pub fn secret_matches(configured: Option<&str>, provided: Option<&str>) -> bool {
    match (configured, provided) {
        (Some(expected), Some(given)) => !given.is_empty() && digests_equal(given, expected),
        _ => false,
    }
}

/// Equality over fixed-length SHA-256 digests, with no early exit.
fn digests_equal(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Pull the secret from the `X-Proxy-Secret` header, falling back to the
/// `proxy_secret` query parameter.
pub fn provided_secret<'a>(
    headers: &'a HeaderMap,
    query: &'a HashMap<String, String>,
) -> Option<&'a str> {
    headers
        .get(SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .or_else(|| query.get(SECRET_QUERY_PARAM).map(String::as_str))
}

/// Middleware rejecting requests without the correct proxy secret.
///
/// Runs before any handler extractor, so a bad secret is reported as 401
/// even when other parameters are also missing.
pub async fn require_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    let query: HashMap<String, String> = Query::try_from_uri(request.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();

    let provided = provided_secret(request.headers(), &query);
    if !secret_matches(state.config.proxy_secret.as_deref(), provided) {
        tracing::debug!(path = %request.uri().path(), "Rejected request with missing or invalid proxy secret");
        return Err(ProxyError::Unauthorized);
    }

    Ok(next.run(request).await)
}

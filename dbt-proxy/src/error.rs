//! Error types for the proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::dbt::DbtError;

/// Per-request failures. All are terminal; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Upstream(DbtError),
}

impl From<DbtError> for ProxyError {
    fn from(e: DbtError) -> Self {
        match e {
            // Caller-supplied path that cannot be forwarded as-is.
            DbtError::InvalidPathSegment(_) => ProxyError::BadRequest(e.to_string()),
            e => ProxyError::Upstream(e),
        }
    }
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if let ProxyError::Upstream(ref e) = self {
            tracing::warn!("dbt Cloud request failed: {}", e);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (self.status(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

/// GET /health - liveness check, no authentication.
async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

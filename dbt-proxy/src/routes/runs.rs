use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::auth::require_secret;
use crate::error::{ProxyError, Result};
use crate::AppState;

/// First value of `key`, treated as absent when empty. Later repeats are ignored.
fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// GET /latest_run?project_id=&job_id= - most recent run of a job.
async fn latest_run(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(params) = query.map_err(|e| ProxyError::BadRequest(e.body_text()))?;

    let (Some(project_id), Some(job_id)) = (
        first_param(&params, "project_id"),
        first_param(&params, "job_id"),
    ) else {
        return Err(ProxyError::BadRequest(
            "project_id and job_id are required".to_string(),
        ));
    };

    let run = state.dbt_client.latest_run(project_id, job_id).await?;
    Ok(Json(run))
}

/// GET /runs/:run_id/artifacts/:artifact_name - raw artifact JSON for a run.
async fn artifact(
    State(state): State<Arc<AppState>>,
    Path((run_id, artifact_name)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let body = state.dbt_client.artifact(&run_id, &artifact_name).await?;
    Ok(Json(body))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/latest_run", get(latest_run))
        .route("/runs/:run_id/artifacts/:artifact_name", get(artifact))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_param_wins_on_repeat() {
        let p = params(&[("project_id", "1"), ("project_id", "2"), ("job_id", "3")]);
        assert_eq!(first_param(&p, "project_id"), Some("1"));
        assert_eq!(first_param(&p, "job_id"), Some("3"));
    }

    #[test]
    fn test_first_param_empty_or_absent() {
        let p = params(&[("project_id", ""), ("project_id", "2")]);
        assert_eq!(first_param(&p, "project_id"), None);
        assert_eq!(first_param(&p, "job_id"), None);
    }
}

//! HTTP routes: `POST /search`, `GET /platforms`, `GET /health`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::Instrument;

use podcast_finder_core::aggregate::AggregateResult;
use podcast_finder_core::error::ValidationError;

use crate::AppState;

/// Body of `POST /search`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "podcastName", default)]
    pub podcast_name: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/platforms", get(platforms))
        .route("/search", post(search))
        .with_state(state)
}

async fn platforms(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.aggregator.platforms())
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<AggregateResult>, ApiError> {
    let Json(req) = body.map_err(|e| {
        tracing::debug!(error = %e, "rejected search body");
        ApiError::BadRequest(ValidationError::EmptyQuery.to_string())
    })?;
    let name = req
        .podcast_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(ValidationError::EmptyQuery.to_string()))?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("search", %request_id);
    let aggregator = state.aggregator.clone();
    // Run on its own task so a panic inside the aggregator becomes a 500.
    let result = tokio::spawn(async move { aggregator.lookup(&name).await }.instrument(span))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(res) => Ok(Json(res)),
        Err(e) => Err(ApiError::BadRequest(e.to_string())),
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            ApiError::Internal(s) => {
                tracing::error!(error = %s, "lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Lookup failed".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(s) => write!(f, "bad request: {}", s),
            ApiError::Internal(s) => write!(f, "internal error: {}", s),
        }
    }
}

//! One-shot snapshot endpoint: exactly one orchestrator sample per request.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use crate::probes::sample_snapshot;
use crate::state::AppState;
use crate::types::ErrorFrame;

/// `GET /api/stats`: 200 with a snapshot body, or 500 with an
/// error-shaped body; never an empty response.
pub async fn stats_handler(State(state): State<AppState>) -> Response {
    let snapshot = sample_snapshot(state.probes.as_ref()).await;
    match serde_json::to_value(&snapshot) {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorFrame {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

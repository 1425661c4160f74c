use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 if the generation service accepts our key, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    match state.studio.check_service().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "generation_service": "ok" }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "generation_service": "fail" },
                "reason": e.to_string()
            })),
        ),
    }
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::db;
use crate::AppState;

/// Liveness plus a database ping.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match db::health_check(&state.pool).await {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({"ok": true, "dbLatencyMs": latency.as_millis() as u64})),
        ),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"ok": false})))
        }
    }
}

/// Feature flag the frontend reads to decide whether to render the
/// maintenance banner.
pub async fn app_mode(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"appMode": state.config.app_mode}))
}

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::repo::admin_logs;
use crate::routes::require_admin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogListQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// Record a session marker (login/logout) from the admin frontend.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let action = body
        .get("action")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();
    if action != "login" && action != "logout" {
        return Err(ApiError::validation("Invalid action"));
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    admin_logs::record(
        &state.pool,
        &action,
        "auth",
        "",
        "info",
        &user,
        Some(json!({"userAgent": user_agent})),
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({"success": true}))))
}

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;
    let page = admin_logs::list(&state.pool, query.limit, query.cursor.as_deref()).await?;
    Ok(Json(
        json!({"logs": page.logs, "nextCursor": page.next_cursor}),
    ))
}

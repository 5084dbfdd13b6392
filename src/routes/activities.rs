use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::repo::{activities, admin_logs};
use crate::routes::{cache_headers, require_admin};
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let activities = activities::list_all(&state.pool).await?;
    Ok((cache_headers(), Json(json!({"activities": activities}))))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = activities::get(&state.pool, &id).await?;
    Ok(Json(json!({"activity": activity})))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<activities::ActivityInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let activity = activities::create(&state.pool, input).await?;

    admin_logs::record(
        &state.pool,
        "create",
        "activity",
        &activity.id,
        "info",
        &user,
        Some(json!({
            "title": activity.title,
            "category": activity.category,
            "status": activity.status,
        })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Activity created successfully", "activity": activity})),
    ))
}

async fn apply_patch(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    patch: Value,
    require_title: bool,
) -> Result<Json<Value>, ApiError> {
    let user = require_admin(state, headers).await?;
    let parsed: activities::ActivityPatch = serde_json::from_value(patch.clone())
        .map_err(|_| ApiError::validation("Invalid request body"))?;

    if !parsed.is_empty() || require_title {
        activities::patch(&state.pool, id, &parsed, require_title).await?;
        let details = if require_title {
            json!({})
        } else {
            json!({"updates": patch})
        };
        admin_logs::record(
            &state.pool,
            "update",
            "activity",
            id,
            "info",
            &user,
            Some(details),
        )
        .await;
    }

    Ok(Json(json!({"message": "Activity updated successfully"})))
}

/// Full update: title must be supplied.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    apply_patch(&state, &headers, &id, patch, true).await
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    apply_patch(&state, &headers, &id, patch, false).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    activities::delete(&state.pool, &id).await?;

    admin_logs::record(&state.pool, "delete", "activity", &id, "warn", &user, None).await;

    Ok(Json(json!({"message": "Activity deleted successfully"})))
}

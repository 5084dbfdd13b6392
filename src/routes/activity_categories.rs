use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::repo::{activity_categories, admin_logs};
use crate::routes::{cache_headers, require_admin};
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = activity_categories::list_all(&state.pool).await?;
    Ok((cache_headers(), Json(json!({"categories": categories}))))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<activity_categories::CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let category = activity_categories::create(&state.pool, input).await?;

    admin_logs::record(
        &state.pool,
        "create",
        "activityCategory",
        &category.id,
        "info",
        &user,
        Some(json!({"name": category.name, "order": category.order})),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Category created successfully", "category": category})),
    ))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let parsed: activity_categories::CategoryPatch = serde_json::from_value(patch.clone())
        .map_err(|_| ApiError::validation("Invalid request body"))?;
    let renaming = parsed.name.is_some();
    activity_categories::patch(&state.pool, &id, &parsed).await?;

    admin_logs::record(
        &state.pool,
        "update",
        "activityCategory",
        &id,
        "info",
        &user,
        Some(json!({"updates": patch})),
    )
    .await;

    let message = if renaming {
        "Category and related activities updated successfully"
    } else {
        "Category updated successfully"
    };
    Ok(Json(json!({"message": message})))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    activity_categories::delete(&state.pool, &id).await?;

    admin_logs::record(
        &state.pool,
        "delete",
        "activityCategory",
        &id,
        "warn",
        &user,
        None,
    )
    .await;

    Ok(Json(json!({
        "message": "Category and related activities deleted successfully"
    })))
}

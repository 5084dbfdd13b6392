use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::repo::{admin_logs, technologies};
use crate::routes::require_admin;
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let technologies = technologies::list_all(&state.pool).await?;
    Ok(Json(json!({"technologies": technologies})))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<technologies::TechnologyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let technology = technologies::create(&state.pool, input).await?;

    admin_logs::record(
        &state.pool,
        "create",
        "technology",
        &technology.id,
        "info",
        &user,
        Some(json!({"name": technology.name, "category": technology.category})),
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({"technology": technology}))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<technologies::TechnologyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let details = json!({"name": input.name.trim(), "category": input.category});
    technologies::update(&state.pool, &id, input).await?;

    admin_logs::record(
        &state.pool,
        "update",
        "technology",
        &id,
        "info",
        &user,
        Some(details),
    )
    .await;

    Ok(Json(json!({"success": true})))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    technologies::delete(&state.pool, &id).await?;

    admin_logs::record(&state.pool, "delete", "technology", &id, "warn", &user, None).await;

    Ok(Json(json!({"success": true})))
}

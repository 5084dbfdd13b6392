use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::repo::{admin_logs, sections};
use crate::routes::{cache_headers, require_admin};
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sections = sections::list_all(&state.pool).await?;
    Ok((cache_headers(), Json(json!({"sections": sections}))))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<sections::SectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let section = sections::create(&state.pool, input).await?;

    admin_logs::record(
        &state.pool,
        "create",
        "section",
        &section.id,
        "info",
        &user,
        Some(json!({
            "displayName": section.meta.display_name,
            "type": section.meta.section_type,
            "order": section.meta.order,
        })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Section created successfully", "section": section})),
    ))
}

/// Merge-patch the section payload.
pub async fn update_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    if !patch.is_object() {
        return Err(ApiError::validation("Invalid request body"));
    }
    sections::update_data(&state.pool, &id, &patch).await?;

    admin_logs::record(&state.pool, "update", "section", &id, "info", &user, None).await;

    Ok(Json(json!({"success": true})))
}

pub async fn patch_meta(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let parsed: sections::SectionMetaPatch =
        serde_json::from_value(patch.clone()).map_err(|_| ApiError::validation("Invalid request body"))?;

    if sections::patch_meta(&state.pool, &id, &parsed).await? {
        admin_logs::record(
            &state.pool,
            "update",
            "sectionMeta",
            &id,
            "info",
            &user,
            Some(json!({"updates": patch})),
        )
        .await;
    }

    Ok(Json(json!({"message": "Meta updated successfully"})))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    sections::delete(&state.pool, &id).await?;

    admin_logs::record(&state.pool, "delete", "section", &id, "warn", &user, None).await;

    Ok(Json(json!({"message": "Section deleted successfully"})))
}

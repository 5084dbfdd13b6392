use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::db::query::{process_products, ProductListQuery};
use crate::error::ApiError;
use crate::repo::{admin_logs, products};
use crate::routes::{cache_headers, require_admin};
use crate::AppState;

/// Public list: normalized collection filtered, sorted, and paginated
/// in process.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let all = products::list_all(&state.pool).await?;
    let (window, pagination) = process_products(&all, &query);
    Ok((
        cache_headers(),
        Json(json!({"products": window, "pagination": pagination})),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<products::ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let product = products::create(&state.pool, input).await?;

    admin_logs::record(
        &state.pool,
        "create",
        "product",
        &product.id,
        "info",
        &user,
        Some(json!({
            "title": product.title,
            "status": product.status,
            "deployStatus": product.deploy_status,
        })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({"product": product}))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<products::ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let title = input.title.clone();
    products::update(&state.pool, &id, input).await?;

    admin_logs::record(
        &state.pool,
        "update",
        "product",
        &id,
        "info",
        &user,
        Some(json!({"title": title})),
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
    products::delete(&state.pool, &id).await?;

    admin_logs::record(&state.pool, "delete", "product", &id, "warn", &user, None).await;

    Ok(Json(json!({"success": true})))
}

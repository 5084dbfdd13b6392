//! HTTP route handlers, one module per resource.

pub mod activities;
pub mod activity_categories;
pub mod admin_logs;
pub mod auth;
pub mod health;
pub mod inquiries;
pub mod products;
pub mod sections;
pub mod technologies;
pub mod upload;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::auth::{bearer_token, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Verify the bearer token and enforce the admin allow-list. Handlers
/// for the admin tier call this first.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    state.verifier.verify(token).await
}

/// CDN cache header for the public read endpoints.
pub fn cache_headers() -> [(header::HeaderName, HeaderValue); 1] {
    [(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, s-maxage=60, stale-while-revalidate=30"),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use axum::Json;
    use serde_json::json;

    // Every public list handler (products, sections, activities,
    // categories) returns `(cache_headers(), Json(..))`; this pins the
    // directive that tuple produces.
    #[test]
    fn test_cache_headers_set_shared_cache_directive() {
        let response = (cache_headers(), Json(json!({"products": []}))).into_response();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, s-maxage=60, stale-while-revalidate=30"
        );
    }
}

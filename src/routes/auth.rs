//! Login, token refresh, and session introspection. All three delegate
//! credential handling to the identity provider.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::routes::require_admin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

fn token_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.trim();
    let password = body.password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let tokens = state.verifier.sign_in(email, password).await?;
    let id_token = token_field(&tokens, "idToken");
    if id_token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    // The signed-in subject must still clear the admin allow-list.
    let claims = state.verifier.verify(id_token).await?;

    Ok(Json(json!({
        "idToken": id_token,
        "refreshToken": token_field(&tokens, "refreshToken"),
        "expiresIn": token_field(&tokens, "expiresIn"),
        "user": {"uid": claims.uid, "email": claims.email},
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = body.refresh_token.trim();
    if token.is_empty() {
        return Err(ApiError::validation("refreshToken is required"));
    }

    let tokens = state.verifier.refresh(token).await?;
    let id_token = token_field(&tokens, "id_token");
    if id_token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let claims = state.verifier.verify(id_token).await?;

    Ok(Json(json!({
        "idToken": id_token,
        "refreshToken": token_field(&tokens, "refresh_token"),
        "expiresIn": token_field(&tokens, "expires_in"),
        "user": {"uid": claims.uid, "email": claims.email},
    })))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = require_admin(&state, &headers).await?;
    Ok((
        StatusCode::OK,
        Json(json!({"user": {"uid": claims.uid, "email": claims.email}})),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_field_tolerates_missing_keys() {
        let body = json!({"idToken": "abc"});
        assert_eq!(token_field(&body, "idToken"), "abc");
        assert_eq!(token_field(&body, "refreshToken"), "");
        assert_eq!(token_field(&Value::Null, "idToken"), "");
    }
}

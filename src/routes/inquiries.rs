//! Inquiry endpoints. Submission is the one public write in the API;
//! everything after it is admin-tier. Mail is best-effort throughout -
//! a relay outage never fails the request that triggered it.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::mail::{self, templates};
use crate::repo::{admin_logs, inquiries};
use crate::routes::require_admin;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<inquiries::InquiryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = input.trimmed();
    let id = inquiries::create(&state.pool, &input).await?;

    if let Some(mailer) = state.mailer.as_deref() {
        let (subject, body) = templates::inquiry_notification(&templates::InquiryNotification {
            id: &id,
            category: &input.category,
            subject: &input.subject,
            message: &input.message,
            contact_name: &input.contact_name,
            contact_email: &input.contact_email,
        });
        let to: Vec<&str> = state.config.mail_to.iter().map(String::as_str).collect();
        mail::send_best_effort(Some(mailer), &to, &subject, &body).await;

        let (subject, body) = templates::inquiry_auto_reply(&input.subject);
        mail::send_best_effort(Some(mailer), &[&input.contact_email], &subject, &body).await;
    }

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let inquiries = inquiries::list_all(&state.pool).await?;

    admin_logs::record(&state.pool, "read", "inquiries", "", "info", &user, None).await;

    Ok(Json(json!({"inquiries": inquiries})))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let inquiry = inquiries::get(&state.pool, &id).await?;

    admin_logs::record(&state.pool, "read", "inquiry", &id, "info", &user, None).await;

    Ok(Json(json!({"inquiry": inquiry})))
}

pub async fn patch_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();
    inquiries::set_status(&state.pool, &id, &status).await?;

    admin_logs::record(
        &state.pool,
        "update",
        "inquiry",
        &id,
        "info",
        &user,
        Some(json!({"status": status})),
    )
    .await;

    Ok(Json(json!({"ok": true})))
}

pub async fn reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();
    if message.is_empty() {
        return Err(ApiError::validation("message is required"));
    }

    let contact_email = inquiries::append_reply(&state.pool, &id, &message, &user.email).await?;

    if let Some(mailer) = state.mailer.as_deref() {
        let (subject, mail_body) = templates::inquiry_reply(&message);
        mail::send_best_effort(Some(mailer), &[&contact_email], &subject, &mail_body).await;
    }

    admin_logs::record(
        &state.pool,
        "reply",
        "inquiry",
        &id,
        "info",
        &user,
        Some(json!({"messageLength": message.len()})),
    )
    .await;

    Ok(Json(json!({"ok": true})))
}

//! Inquiry storage. Status walks pending -> in_progress -> resolved;
//! replies are an append-only jsonb array on the row.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::db::models::Inquiry;
use crate::db::now_iso;
use crate::db::raw::RawRow;
use crate::error::ApiError;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_RESOLVED: &str = "resolved";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryInput {
    pub category: String,
    pub subject: String,
    pub message: String,
    pub contact_name: String,
    pub contact_email: String,
}

impl InquiryInput {
    pub fn trimmed(mut self) -> Self {
        self.category = self.category.trim().to_string();
        self.subject = self.subject.trim().to_string();
        self.message = self.message.trim().to_string();
        self.contact_name = self.contact_name.trim().to_string();
        self.contact_email = self.contact_email.trim().to_string();
        self
    }
}

pub fn valid_status(status: &str) -> bool {
    matches!(status, STATUS_PENDING | STATUS_IN_PROGRESS | STATUS_RESOLVED)
}

fn from_row(row: &Value) -> Inquiry {
    let raw = RawRow::new(row.clone());
    Inquiry {
        id: raw.text(&["id"]),
        category: raw.text(&["category"]),
        subject: raw.text(&["subject"]),
        message: raw.text(&["message"]),
        contact_name: raw.text(&["contact_name", "contactName"]),
        contact_email: raw.text(&["contact_email", "contactEmail"]),
        status: raw.text(&["status"]),
        replies: raw.array(&["replies"]),
        created_at: raw.text(&["created_at", "createdAt"]),
        updated_at: raw.text(&["updated_at", "updatedAt"]),
    }
}

/// Insert a new pending inquiry and return its id.
pub async fn create(pool: &PgPool, input: &InquiryInput) -> Result<String, ApiError> {
    if input.subject.is_empty() || input.message.is_empty() || input.contact_email.is_empty() {
        return Err(ApiError::validation(
            "subject, message, contactEmail are required",
        ));
    }

    let id: String = sqlx::query_scalar(
        r#"
        INSERT INTO inquiries (category, subject, message, contact_name, contact_email,
                               status, replies, created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,'pending','[]'::jsonb,NOW(),NOW())
        RETURNING id
    "#,
    )
    .bind(&input.category)
    .bind(&input.subject)
    .bind(&input.message)
    .bind(&input.contact_name)
    .bind(&input.contact_email)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Newest first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Inquiry>, ApiError> {
    let rows: Vec<Value> =
        sqlx::query_scalar("SELECT to_jsonb(i) FROM inquiries i ORDER BY i.created_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(rows.iter().map(from_row).collect())
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Inquiry, ApiError> {
    let row: Option<Value> =
        sqlx::query_scalar("SELECT to_jsonb(i) FROM inquiries i WHERE i.id=$1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.as_ref()
        .map(from_row)
        .ok_or_else(|| ApiError::not_found("Not found"))
}

pub async fn set_status(pool: &PgPool, id: &str, status: &str) -> Result<(), ApiError> {
    if !valid_status(status) {
        return Err(ApiError::validation("Invalid status"));
    }
    let result = sqlx::query("UPDATE inquiries SET status=$1, updated_at=NOW() WHERE id=$2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(())
}

/// Append an admin reply under a row lock; a pending inquiry moves to
/// in_progress. Returns the contact address for the follow-up mail.
pub async fn append_reply(
    pool: &PgPool,
    id: &str,
    message: &str,
    sender_name: &str,
) -> Result<String, ApiError> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, String)> =
        sqlx::query_as("SELECT status, contact_email FROM inquiries WHERE id=$1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (current_status, contact_email) =
        row.ok_or_else(|| ApiError::not_found("Not found"))?;

    let next_status = if current_status == STATUS_PENDING {
        STATUS_IN_PROGRESS
    } else {
        current_status.as_str()
    };

    let reply = json!([{
        "id": Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string(),
        "message": message,
        "senderType": "admin",
        "senderName": if sender_name.trim().is_empty() { "admin" } else { sender_name },
        "createdAt": now_iso(),
    }]);

    sqlx::query(
        r#"
        UPDATE inquiries
        SET replies = COALESCE(replies, '[]'::jsonb) || $1::jsonb,
            status = $2,
            updated_at = NOW()
        WHERE id=$3
    "#,
    )
    .bind(&reply)
    .bind(next_status)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(contact_email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_vocabulary() {
        assert!(valid_status("pending"));
        assert!(valid_status("in_progress"));
        assert!(valid_status("resolved"));
        assert!(!valid_status("closed"));
        assert!(!valid_status(""));
        assert!(!valid_status("Pending"));
    }

    #[test]
    fn test_input_trimming() {
        let input = InquiryInput {
            subject: " Hello ".to_string(),
            contact_email: " a@b.c ".to_string(),
            ..Default::default()
        }
        .trimmed();
        assert_eq!(input.subject, "Hello");
        assert_eq!(input.contact_email, "a@b.c");
    }

    #[test]
    fn test_from_row_defaults_replies_to_empty_array() {
        let i = from_row(&json!({
            "id": "inq_1",
            "subject": "S",
            "message": "M",
            "contact_email": "a@b.c",
            "status": "pending",
        }));
        assert_eq!(i.replies, json!([]));
        assert_eq!(i.contact_email, "a@b.c");
    }
}

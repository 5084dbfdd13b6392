//! Audit trail for admin mutations.
//!
//! Recording is best-effort and always outside the mutation's own
//! transaction: a failed audit insert is logged and swallowed so it can
//! never roll back the change it describes. Listing uses keyset
//! pagination over (createdAt, id) descending, so new entries arriving
//! between pages cannot shift the window.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::Claims;
use crate::db::generate_id;
use crate::db::models::AdminLogEntry;
use crate::db::raw::RawRow;
use crate::error::ApiError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// Record an admin action. Blank entity/actor fields are stored as NULL;
/// absent details become `{}`. Entries older than two months are swept
/// opportunistically on each write.
pub async fn record(
    pool: &PgPool,
    action: &str,
    entity: &str,
    entity_id: &str,
    level: &str,
    user: &Claims,
    details: Option<Value>,
) {
    let level = if level.is_empty() { "info" } else { level };
    let details = match details {
        Some(Value::Null) | None => json!({}),
        Some(v) => v,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO "adminLogs" (id, action, entity, "entityId", "userId", "userEmail",
                                 level, details, "createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8::jsonb,NOW())
    "#,
    )
    .bind(generate_id("log"))
    .bind(action)
    .bind(nullable(entity))
    .bind(nullable(entity_id))
    .bind(nullable(&user.uid))
    .bind(nullable(&user.email))
    .bind(level)
    .bind(&details)
    .execute(pool)
    .await;
    if let Err(err) = result {
        tracing::warn!(error = %err, action, "Failed to record admin log entry");
    }

    let swept = sqlx::query(r#"DELETE FROM "adminLogs" WHERE "createdAt" < NOW() - INTERVAL '2 months'"#)
        .execute(pool)
        .await;
    if let Err(err) = swept {
        tracing::warn!(error = %err, "Failed to sweep expired admin log entries");
    }
}

fn nullable(v: &str) -> Option<&str> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Opaque list cursor: the (createdAt, id) pair of the last entry of the
/// previous page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub created_at: String,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let raw = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::STANDARD.encode(raw)
    }

    /// A cursor that fails to decode is treated as absent, not an error.
    pub fn decode(v: &str) -> Option<Self> {
        let raw = base64::engine::general_purpose::STANDARD.decode(v).ok()?;
        let cursor: Cursor = serde_json::from_slice(&raw).ok()?;
        if cursor.created_at.is_empty() || cursor.id.is_empty() {
            return None;
        }
        Some(cursor)
    }
}

pub struct LogPage {
    pub logs: Vec<AdminLogEntry>,
    pub next_cursor: Option<String>,
}

fn from_row(row: &Value) -> AdminLogEntry {
    let raw = RawRow::new(row.clone());
    let non_blank = |aliases: &[&str]| {
        let v = raw.text(aliases);
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    };
    let details = raw.object(&["details"]);

    AdminLogEntry {
        id: raw.text(&["id"]),
        action: raw.text(&["action"]),
        entity: non_blank(&["entity"]),
        entity_id: non_blank(&["entityId", "entity_id"]),
        user_id: non_blank(&["userId", "user_id"]),
        user_email: non_blank(&["userEmail", "user_email"]),
        level: raw.text(&["level"]),
        details: Some(details.clone())
            .filter(|d| d.as_object().map(|m| !m.is_empty()).unwrap_or(false)),
        created_at: raw.text(&["createdAt", "created_at"]),
    }
}

/// One page, newest first. `next_cursor` is present only when the page
/// came back full; a short page is the end of the trail.
pub async fn list(
    pool: &PgPool,
    limit: Option<i64>,
    cursor: Option<&str>,
) -> Result<LogPage, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let cursor = cursor.and_then(Cursor::decode);

    let rows: Vec<Value> = match &cursor {
        Some(c) => {
            sqlx::query_scalar(
                r#"
                SELECT to_jsonb(l) FROM "adminLogs" l
                WHERE ("createdAt", id) < ($1::timestamptz, $2::text)
                ORDER BY "createdAt" DESC, id DESC
                LIMIT $3
            "#,
            )
            .bind(&c.created_at)
            .bind(&c.id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                SELECT to_jsonb(l) FROM "adminLogs" l
                ORDER BY "createdAt" DESC, id DESC
                LIMIT $1
            "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    let logs: Vec<AdminLogEntry> = rows.iter().map(from_row).collect();
    let next_cursor = if logs.len() as i64 == limit {
        logs.last().map(|last| {
            Cursor {
                created_at: last.created_at.clone(),
                id: last.id.clone(),
            }
            .encode()
        })
    } else {
        None
    };

    Ok(LogPage { logs, next_cursor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = Cursor {
            created_at: "2026-08-01T10:00:00Z".to_string(),
            id: "log_123".to_string(),
        };
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_garbage_and_blanks() {
        assert!(Cursor::decode("not-base64!").is_none());
        assert!(Cursor::decode(
            &base64::engine::general_purpose::STANDARD.encode(b"{\"nope\":1}")
        )
        .is_none());
        let blank = Cursor {
            created_at: String::new(),
            id: "log_1".to_string(),
        };
        assert!(Cursor::decode(&blank.encode()).is_none());
    }

    #[test]
    fn test_from_row_omits_blank_fields_and_empty_details() {
        let entry = from_row(&json!({
            "id": "log_1",
            "action": "delete",
            "entity": "product",
            "entityId": "",
            "userEmail": "admin@example.com",
            "level": "warn",
            "details": {},
            "createdAt": "2026-08-01T10:00:00Z",
        }));
        assert_eq!(entry.entity.as_deref(), Some("product"));
        assert!(entry.entity_id.is_none());
        assert!(entry.user_id.is_none());
        assert_eq!(entry.user_email.as_deref(), Some("admin@example.com"));
        assert!(entry.details.is_none());
    }

    #[test]
    fn test_from_row_keeps_nonempty_details() {
        let entry = from_row(&json!({
            "id": "log_2",
            "action": "update",
            "level": "info",
            "details": {"title": "New"},
            "createdAt": "2026-08-01T10:00:00Z",
        }));
        assert_eq!(entry.details, Some(json!({"title": "New"})));
    }
}

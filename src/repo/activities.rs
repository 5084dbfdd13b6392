//! Activity storage. Year and month are not stored; they are derived
//! from the creation timestamp at read time.

use chrono::Datelike;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::Activity;
use crate::db::normalize::{self, UNPUBLISHED};
use crate::db::raw::RawRow;
use crate::db::{generate_id, now_iso};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub link: String,
    pub image: String,
    pub status: String,
    pub order: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub order: Option<i64>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.link.is_none()
            && self.image.is_none()
            && self.status.is_none()
            && self.order.is_none()
    }
}

fn from_row(row: &Value) -> Activity {
    let raw = RawRow::new(row.clone());
    let created_at = raw.text(&["created_at", "createdAt", "createdat"]);
    let (year, month) = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map(|t| (i64::from(t.year()), i64::from(t.month())))
        .unwrap_or((0, 0));

    Activity {
        id: raw.text(&["id"]),
        title: raw.text(&["title"]),
        description: raw.text(&["description"]),
        category: raw.text(&["category"]),
        technologies: Vec::new(),
        link: raw.text(&["link"]),
        image: raw.text(&["image"]),
        status: normalize::visibility_status(&raw.text(&["status"])),
        created_year: year,
        created_month: month,
        order: raw.int(&["order"]),
        created_at,
        updated_at: raw.text(&["updated_at", "updatedAt", "updatedat"]),
    }
}

/// Newest display order first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Activity>, ApiError> {
    let rows: Vec<Value> = sqlx::query_scalar(r#"SELECT to_jsonb(a) FROM "activities" a"#)
        .fetch_all(pool)
        .await?;
    let mut activities: Vec<Activity> = rows.iter().map(from_row).collect();
    activities.sort_by_key(|a| std::cmp::Reverse(a.order));
    Ok(activities)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Activity, ApiError> {
    let row: Option<Value> =
        sqlx::query_scalar(r#"SELECT to_jsonb(a) FROM "activities" a WHERE a.id=$1"#)
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.as_ref()
        .map(from_row)
        .ok_or_else(|| ApiError::not_found("Activity not found"))
}

pub async fn create(pool: &PgPool, input: ActivityInput) -> Result<Activity, ApiError> {
    if input.title.trim().is_empty() || input.category.trim().is_empty() {
        return Err(ApiError::validation("Title and category are required"));
    }

    let status = if input.status.trim().is_empty() {
        UNPUBLISHED.to_string()
    } else {
        input.status.clone()
    };
    let order = if input.order == 0 {
        sqlx::query_scalar(r#"SELECT COALESCE(MAX("order"),0)+1 FROM "activities""#)
            .fetch_one(pool)
            .await?
    } else {
        input.order
    };

    let id = generate_id("activity");
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO "activities" (id, title, description, category, link, image, status, "order",
                                  created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,NOW(),NOW())
    "#,
    )
    .bind(&id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(input.category.trim())
    .bind(&input.link)
    .bind(&input.image)
    .bind(&status)
    .bind(order)
    .execute(pool)
    .await?;

    Ok(Activity {
        id,
        title: input.title.trim().to_string(),
        description: input.description,
        category: input.category.trim().to_string(),
        technologies: Vec::new(),
        link: input.link,
        image: input.image,
        status,
        created_year: i64::from(now.year()),
        created_month: i64::from(now.month()),
        order,
        created_at: now_iso(),
        updated_at: now_iso(),
    })
}

/// Apply a patch; absent fields are untouched. A full update goes
/// through the same path with `require_title` set.
pub async fn patch(
    pool: &PgPool,
    id: &str,
    patch: &ActivityPatch,
    require_title: bool,
) -> Result<(), ApiError> {
    if require_title && patch.title.is_none() {
        return Err(ApiError::validation("title is required"));
    }
    if patch.is_empty() {
        return Ok(());
    }

    let result = sqlx::query(
        r#"
        UPDATE "activities" SET
            title       = COALESCE($1, title),
            description = COALESCE($2, description),
            category    = COALESCE($3, category),
            link        = COALESCE($4, link),
            image       = COALESCE($5, image),
            status      = COALESCE($6, status),
            "order"     = COALESCE($7, "order"),
            updated_at  = NOW()
        WHERE id=$8
    "#,
    )
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(&patch.category)
    .bind(&patch.link)
    .bind(&patch.image)
    .bind(&patch.status)
    .bind(patch.order)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Activity not found"));
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<(), ApiError> {
    let result = sqlx::query(r#"DELETE FROM "activities" WHERE id=$1"#)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Activity not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_row_derives_year_and_month_from_timestamp() {
        let a = from_row(&json!({
            "id": "activity_1",
            "title": "Talk",
            "status": "public",
            "order": 3,
            "created_at": "2024-11-05T12:00:00Z",
        }));
        assert_eq!(a.created_year, 2024);
        assert_eq!(a.created_month, 11);
        assert_eq!(a.status, "PUBLISHED");
        assert!(a.technologies.is_empty());
    }

    #[test]
    fn test_from_row_unparseable_timestamp_yields_zero() {
        let a = from_row(&json!({"id": "a", "title": "T", "created_at": "yesterday"}));
        assert_eq!(a.created_year, 0);
        assert_eq!(a.created_month, 0);
    }

    #[test]
    fn test_empty_patch_detection() {
        assert!(ActivityPatch::default().is_empty());
        let p = ActivityPatch {
            status: Some("public".to_string()),
            ..Default::default()
        };
        assert!(!p.is_empty());
    }
}

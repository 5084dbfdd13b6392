//! Activity category storage. The backing table has been spelled three
//! ways across schema generations; every operation resolves the live
//! name first. Category names cascade into `activities.category`, so
//! their uniqueness (case-insensitive, via the `LOWER(name)` index) is
//! what keeps rename and delete cascades unambiguous.

use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::generate_id;
use crate::db::models::ActivityCategory;
use crate::db::raw::RawRow;
use crate::error::{is_unique_violation, ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: String,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
}

/// Resolve which spelling of the categories table exists.
async fn resolve_table(pool: &PgPool) -> Result<String, ApiError> {
    let name: String = sqlx::query_scalar(
        r#"
        SELECT CASE
            WHEN to_regclass('public."activityCategories"') IS NOT NULL THEN '"activityCategories"'
            WHEN to_regclass('public.activity_categories') IS NOT NULL THEN 'activity_categories'
            WHEN to_regclass('public.activitycategories') IS NOT NULL THEN 'activitycategories'
            ELSE ''
        END
    "#,
    )
    .fetch_one(pool)
    .await?;

    if name.is_empty() {
        return Err(ApiError::Internal(
            "Activity categories table not found".to_string(),
        ));
    }
    Ok(name)
}

fn from_row(row: &Value) -> ActivityCategory {
    let raw = RawRow::new(row.clone());
    ActivityCategory {
        id: raw.text(&["id"]),
        name: raw.text(&["name"]),
        order: raw.int(&["order"]),
        created_at: raw.text(&["createdAt", "created_at", "createdat"]),
    }
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<ActivityCategory>, ApiError> {
    let table = resolve_table(pool).await?;
    let rows: Vec<Value> =
        sqlx::query_scalar(&format!("SELECT to_jsonb(ac) FROM {} ac", table))
            .fetch_all(pool)
            .await?;
    let mut categories: Vec<ActivityCategory> = rows.iter().map(from_row).collect();
    categories.sort_by_key(|c| c.order);
    Ok(categories)
}

pub async fn create(pool: &PgPool, input: CategoryInput) -> Result<ActivityCategory, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Category name is required"));
    }

    let order = match input.order {
        Some(v) => v,
        None => {
            sqlx::query_scalar(r#"SELECT COALESCE(MAX("order"),0)+1 FROM "activityCategories""#)
                .fetch_one(pool)
                .await?
        }
    };

    let id = generate_id("activity_category");
    let result: Result<String, sqlx::Error> = sqlx::query_scalar(
        r#"
        INSERT INTO "activityCategories" (id, name, "order", created_at)
        VALUES ($1,$2,$3,NOW())
        RETURNING to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"')
    "#,
    )
    .bind(&id)
    .bind(name)
    .bind(order)
    .fetch_one(pool)
    .await;

    match result {
        Ok(created_at) => Ok(ActivityCategory {
            id,
            name: name.to_string(),
            order,
            created_at,
        }),
        Err(err) if is_unique_violation(&err) => {
            Err(ApiError::conflict("Category already exists"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Patch a category. A rename cascades to every activity carrying the
/// old name, atomically with the rename itself.
pub async fn patch(pool: &PgPool, id: &str, patch: &CategoryPatch) -> Result<bool, ApiError> {
    let mut tx = pool.begin().await?;

    let old_name: Option<String> =
        sqlx::query_scalar(r#"SELECT name FROM "activityCategories" WHERE id=$1"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let old_name = old_name.ok_or_else(|| ApiError::not_found("Category not found"))?;

    let result = sqlx::query(
        r#"
        UPDATE "activityCategories" SET
            name    = COALESCE($1, name),
            "order" = COALESCE($2, "order")
        WHERE id=$3
    "#,
    )
    .bind(&patch.name)
    .bind(patch.order)
    .bind(id)
    .execute(&mut *tx)
    .await;
    match result {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(ApiError::conflict("Category with this name already exists"));
        }
        Err(err) => return Err(err.into()),
    }

    let mut renamed = false;
    if let Some(new_name) = patch.name.as_deref() {
        if !new_name.trim().is_empty() && new_name != old_name {
            sqlx::query(r#"UPDATE "activities" SET category=$1 WHERE category=$2"#)
                .bind(new_name)
                .bind(&old_name)
                .execute(&mut *tx)
                .await?;
            renamed = true;
        }
    }

    tx.commit().await?;
    Ok(renamed)
}

/// Delete a category and every activity filed under it.
pub async fn delete(pool: &PgPool, id: &str) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let name: Option<String> =
        sqlx::query_scalar(r#"SELECT name FROM "activityCategories" WHERE id=$1"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let name = name.ok_or_else(|| ApiError::not_found("Category not found"))?;

    sqlx::query(r#"DELETE FROM "activityCategories" WHERE id=$1"#)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(r#"DELETE FROM "activities" WHERE category=$1"#)
        .bind(&name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_row_resolves_aliases() {
        let c = from_row(&json!({
            "id": "activity_category_1",
            "name": "Conference",
            "order": "7",
            "created_at": "2024-01-01T00:00:00Z",
        }));
        assert_eq!(c.name, "Conference");
        assert_eq!(c.order, 7);
        assert_eq!(c.created_at, "2024-01-01T00:00:00Z");
    }
}

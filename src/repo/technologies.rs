//! Technology storage. Name uniqueness is case-insensitive and enforced
//! by a unique index on `LOWER(name)`; a violation surfaces as a 409
//! instead of racing a pre-insert existence check.

use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::Technology;
use crate::db::raw::RawRow;
use crate::db::{generate_id, now_iso};
use crate::error::{is_unique_violation, ApiError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TechnologyInput {
    pub name: String,
    pub category: String,
}

fn from_row(row: &Value) -> Technology {
    let raw = RawRow::new(row.clone());
    Technology {
        id: raw.text(&["id"]),
        name: raw.text(&["name"]),
        category: raw.text(&["category"]),
        created_at: raw.text(&["createdAt", "created_at", "createdat"]),
    }
}

/// Alphabetical by name.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Technology>, ApiError> {
    let rows: Vec<Value> =
        sqlx::query_scalar(r#"SELECT to_jsonb(t) FROM "technologies" t ORDER BY t.name ASC"#)
            .fetch_all(pool)
            .await?;
    Ok(rows.iter().map(from_row).collect())
}

pub async fn create(pool: &PgPool, input: TechnologyInput) -> Result<Technology, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Technology name is required"));
    }

    let id = generate_id("tech");
    let result = sqlx::query(
        r#"
        INSERT INTO "technologies" (id, name, category, "createdAt", "updatedAt")
        VALUES ($1,$2,$3,NOW(),NOW())
    "#,
    )
    .bind(&id)
    .bind(name)
    .bind(&input.category)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(Technology {
            id,
            name: name.to_string(),
            category: input.category,
            created_at: now_iso(),
        }),
        Err(err) if is_unique_violation(&err) => {
            Err(ApiError::conflict("Technology already exists"))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn update(pool: &PgPool, id: &str, input: TechnologyInput) -> Result<(), ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Technology name is required"));
    }

    let result = sqlx::query(
        r#"UPDATE "technologies" SET name=$1, category=$2, "updatedAt"=NOW() WHERE id=$3"#,
    )
    .bind(name)
    .bind(&input.category)
    .bind(id)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(ApiError::not_found("Not found")),
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(ApiError::conflict(
            "Technology with this name already exists",
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<(), ApiError> {
    let result = sqlx::query(r#"DELETE FROM "technologies" WHERE id=$1"#)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_row_tolerates_missing_columns() {
        let t = from_row(&json!({"id": "tech_1", "name": "Rust"}));
        assert_eq!(t.name, "Rust");
        assert_eq!(t.category, "");
        assert_eq!(t.created_at, "");
    }
}

//! Section storage. Metadata and payload live in separate tables joined
//! by id; legacy metadata rows may point at their payload through a
//! variously-spelled `section_id` column, so the join tries both.

use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::db::models::{Section, SectionMeta};
use crate::db::normalize::{self, ProfileFields};
use crate::db::raw::RawRow;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub section_type: String,
    pub order: Option<i64>,
    #[serde(default)]
    pub sort_order: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetaPatch {
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    pub order: Option<i64>,
    pub editable: Option<bool>,
    /// History sections carry an `asc`/`desc` display preference.
    pub sort_order: Option<String>,
}

fn from_row(meta_row: &Value, data_row: &Value) -> Section {
    let meta = RawRow::new(meta_row.clone());
    let row = RawRow::new(data_row.clone());

    let raw_type = {
        let t = meta.text(&["type_name", "type"]);
        if t.is_empty() {
            row.text(&["type_name", "type"])
        } else {
            t
        }
    };
    let section_type = normalize::section_type(&raw_type);

    let profile = ProfileFields {
        name: row.text(&["data_name", "name"]),
        hometown: row.text(&["data_hometown", "hometown"]),
        hobbies: row.text(&["data_hobbies", "hobbies"]),
        profile_image: row.text(&[
            "data_profileImage",
            "data_profile_image",
            "profileImage",
            "profile_image",
        ]),
        university: row.text(&["data_university", "university"]),
    };

    let data = normalize::reconcile_section_data(
        &section_type,
        row.value(&["data"]).unwrap_or(&Value::Null),
        &row.array(&["items"]),
        &row.array(&["histories"]),
        &profile,
    );

    Section {
        id: meta.text(&["id"]),
        meta: SectionMeta {
            display_name: meta.text(&["displayName", "display_name"]),
            section_type,
            order: meta.int(&["order"]),
            editable: meta.boolean(&["editable"], true),
            sort_order: Some(meta.text(&["sortOrder", "sort_order", "sortorder"]))
                .filter(|s| !s.is_empty()),
        },
        data,
    }
}

/// All sections in display order, payloads reconciled.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Section>, ApiError> {
    let rows: Vec<(Value, Option<Value>)> = sqlx::query_as(
        r#"
        SELECT to_jsonb(sm), to_jsonb(s)
        FROM "sectionMeta" sm
        LEFT JOIN "sections" s ON (
            s.id = sm.id
            OR s.id = COALESCE(
                NULLIF(to_jsonb(sm)->>'section_id', ''),
                NULLIF(to_jsonb(sm)->>'sectionId', ''),
                NULLIF(to_jsonb(sm)->>'sectionid', '')
            )
        )
    "#,
    )
    .fetch_all(pool)
    .await?;

    let mut sections: Vec<Section> = rows
        .iter()
        .map(|(meta, data)| from_row(meta, data.as_ref().unwrap_or(&Value::Null)))
        .collect();
    sections.sort_by_key(|s| s.meta.order);
    Ok(sections)
}

pub async fn create(pool: &PgPool, input: SectionInput) -> Result<Section, ApiError> {
    if input.id.trim().is_empty()
        || input.display_name.trim().is_empty()
        || input.section_type.trim().is_empty()
    {
        return Err(ApiError::validation("id, displayName, and type are required"));
    }
    let data = match input.data {
        Some(Value::Null) | None => json!({}),
        Some(v) => v,
    };

    let mut tx = pool.begin().await?;

    let order = match input.order {
        Some(v) => v,
        None => {
            sqlx::query_scalar(r#"SELECT COALESCE(MAX("order"),0)+1 FROM "sectionMeta""#)
                .fetch_one(&mut *tx)
                .await?
        }
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO "sectionMeta" (id, section_id, "displayName", type_name, "order", editable, "sortOrder")
        VALUES ($1,$1,$2,$3,$4,true,NULLIF($5,''))
        ON CONFLICT (id) DO NOTHING
    "#,
    )
    .bind(input.id.trim())
    .bind(input.display_name.trim())
    .bind(input.section_type.trim())
    .bind(order)
    .bind(input.sort_order.trim())
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(ApiError::conflict("Section with this ID already exists"));
    }

    sqlx::query(r#"INSERT INTO "sections" (id, type_name, data) VALUES ($1,$2,$3::jsonb)"#)
        .bind(input.id.trim())
        .bind(input.section_type.trim())
        .bind(&data)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Section {
        id: input.id.trim().to_string(),
        meta: SectionMeta {
            display_name: input.display_name.trim().to_string(),
            section_type: input.section_type.trim().to_string(),
            order,
            editable: true,
            sort_order: Some(input.sort_order.trim().to_string()).filter(|s| !s.is_empty()),
        },
        data,
    })
}

/// Merge-patch the payload: supplied top-level keys overwrite, others
/// survive.
pub async fn update_data(pool: &PgPool, id: &str, patch: &Value) -> Result<(), ApiError> {
    let result = sqlx::query(
        r#"UPDATE "sections" SET data = COALESCE(data,'{}'::jsonb) || $2::jsonb WHERE id=$1"#,
    )
    .bind(id)
    .bind(patch)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(())
}

/// Patch metadata fields; absent fields are untouched. Returns false
/// when the patch carried nothing updatable.
pub async fn patch_meta(pool: &PgPool, id: &str, patch: &SectionMetaPatch) -> Result<bool, ApiError> {
    if patch.display_name.is_none()
        && patch.section_type.is_none()
        && patch.order.is_none()
        && patch.editable.is_none()
        && patch.sort_order.is_none()
    {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        UPDATE "sectionMeta" SET
            "displayName" = COALESCE($1, "displayName"),
            type_name     = COALESCE($2, type_name),
            "order"       = COALESCE($3, "order"),
            editable      = COALESCE($4, editable),
            "sortOrder"   = COALESCE($5, "sortOrder")
        WHERE id=$6
    "#,
    )
    .bind(&patch.display_name)
    .bind(&patch.section_type)
    .bind(patch.order)
    .bind(patch.editable)
    .bind(&patch.sort_order)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(true)
}

/// Remove metadata and payload together.
pub async fn delete(pool: &PgPool, id: &str) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;
    sqlx::query(r#"DELETE FROM "sections" WHERE id=$1"#)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query(r#"DELETE FROM "sectionMeta" WHERE id=$1"#)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_reconciles_legacy_profile_columns() {
        let meta = json!({
            "id": "about",
            "display_name": "About",
            "type": "profile",
            "order": 2,
        });
        let row = json!({
            "id": "about",
            "name": "Taro",
            "hometown": "Osaka",
        });
        let s = from_row(&meta, &row);
        assert_eq!(s.id, "about");
        assert_eq!(s.meta.display_name, "About");
        assert_eq!(s.meta.section_type, "single");
        assert_eq!(s.meta.order, 2);
        assert!(s.meta.editable);
        assert_eq!(s.data["data"]["name"], "Taro");
        assert_eq!(s.data["data"]["hometown"], "Osaka");
    }

    #[test]
    fn test_from_row_missing_payload_row_yields_empty_object() {
        let meta = json!({"id": "skills", "displayName": "Skills", "type_name": "list"});
        let s = from_row(&meta, &Value::Null);
        assert_eq!(s.data, json!({}));
        assert_eq!(s.meta.section_type, "list");
        assert!(s.meta.sort_order.is_none());
    }

    #[test]
    fn test_from_row_surfaces_history_sort_order() {
        let meta = json!({
            "id": "career",
            "displayName": "Career",
            "type_name": "history",
            "order": 3,
            "sortOrder": "desc",
        });
        let s = from_row(&meta, &Value::Null);
        assert_eq!(s.meta.sort_order.as_deref(), Some("desc"));
    }

    #[test]
    fn test_from_row_type_falls_back_to_payload_row() {
        let meta = json!({"id": "h", "displayName": "History"});
        let row = json!({"id": "h", "type": "timeline", "histories": [{"year": 2020}]});
        let s = from_row(&meta, &row);
        assert_eq!(s.meta.section_type, "history");
        assert_eq!(s.data, json!({"histories": [{"year": 2020}]}));
    }
}

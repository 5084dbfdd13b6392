//! Product storage. Reads pull whole rows as jsonb and normalize them in
//! process, so legacy tables with snake_case or lowercased columns keep
//! working; writes target the canonical camelCase columns only.

use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::Product;
use crate::db::normalize::{self, PUBLISHED, UNDEPLOYED};
use crate::db::raw::RawRow;
use crate::db::{generate_id, now_iso};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductInput {
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub github_url: String,
    pub category: String,
    pub technologies: Vec<String>,
    pub status: String,
    pub deploy_status: String,
    pub created_year: i64,
    pub created_month: i64,
}

impl ProductInput {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(ApiError::validation("Title and description are required"));
        }
        Ok(())
    }

    /// Fill write-side defaults: current year/month, published, not yet
    /// deployed.
    fn with_defaults(mut self) -> Self {
        let now = chrono::Utc::now();
        if self.created_year == 0 {
            self.created_year = i64::from(chrono::Datelike::year(&now));
        }
        if self.created_month == 0 {
            self.created_month = i64::from(chrono::Datelike::month(&now));
        }
        if self.status.trim().is_empty() {
            self.status = PUBLISHED.to_string();
        }
        if self.deploy_status.trim().is_empty() {
            self.deploy_status = UNDEPLOYED.to_string();
        }
        self
    }
}

pub fn from_row(row: &Value) -> Product {
    let raw = RawRow::new(row.clone());
    Product {
        id: raw.text(&["id"]),
        title: raw.text(&["title"]),
        description: raw.text(&["description"]),
        image: raw.text(&["image"]),
        link: raw.text(&["link"]),
        github_url: raw.text(&["githubUrl", "github_url", "githuburl"]),
        category: raw.text(&["category"]),
        technologies: raw.string_array(&["technologies"]),
        status: normalize::visibility_status(&raw.text(&["status"])),
        deploy_status: normalize::deploy_status(&raw.text(&[
            "deployStatus",
            "deploy_status",
            "deploystatus",
        ])),
        created_year: raw.int(&["createdYear", "created_year", "createdyear"]),
        created_month: raw.int(&["createdMonth", "created_month", "createdmonth"]),
        created_at: raw.text(&["createdAt", "created_at", "createdat"]),
        updated_at: raw.text(&["updatedAt", "updated_at", "updatedat"]),
    }
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Product>, ApiError> {
    let rows: Vec<Value> = sqlx::query_scalar(r#"SELECT to_jsonb(p) FROM "products" p"#)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(from_row).collect())
}

pub async fn create(pool: &PgPool, input: ProductInput) -> Result<Product, ApiError> {
    input.validate()?;
    let input = input.with_defaults();
    let id = generate_id("product");
    let now = now_iso();

    sqlx::query(
        r#"
        INSERT INTO "products"
            (id, title, description, image, link, "githubUrl", category,
             technologies, status, "deployStatus", "createdYear", "createdMonth",
             "createdAt", "updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8::jsonb,$9,$10,$11,$12,NOW(),NOW())
    "#,
    )
    .bind(&id)
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(&input.image)
    .bind(&input.link)
    .bind(&input.github_url)
    .bind(&input.category)
    .bind(Value::from(input.technologies.clone()))
    .bind(&input.status)
    .bind(&input.deploy_status)
    .bind(input.created_year)
    .bind(input.created_month)
    .execute(pool)
    .await?;

    Ok(Product {
        id,
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        image: input.image,
        link: input.link,
        github_url: input.github_url,
        category: input.category,
        technologies: input.technologies,
        status: input.status,
        deploy_status: input.deploy_status,
        created_year: input.created_year,
        created_month: input.created_month,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn update(pool: &PgPool, id: &str, input: ProductInput) -> Result<(), ApiError> {
    input.validate()?;
    let input = input.with_defaults();

    let result = sqlx::query(
        r#"
        UPDATE "products" SET
            title=$1, description=$2, image=$3, link=$4, "githubUrl"=$5,
            category=$6, technologies=$7::jsonb, status=$8, "deployStatus"=$9,
            "createdYear"=$10, "createdMonth"=$11, "updatedAt"=NOW()
        WHERE id=$12
    "#,
    )
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(&input.image)
    .bind(&input.link)
    .bind(&input.github_url)
    .bind(&input.category)
    .bind(Value::from(input.technologies))
    .bind(&input.status)
    .bind(&input.deploy_status)
    .bind(input.created_year)
    .bind(input.created_month)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<(), ApiError> {
    let result = sqlx::query(r#"DELETE FROM "products" WHERE id=$1"#)
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
    fn test_from_row_resolves_column_aliases() {
        let p = from_row(&json!({
            "id": "product_1",
            "title": "Site",
            "description": "A site",
            "github_url": "https://github.com/x/y",
            "deploy_status": "live",
            "created_year": "2023",
            "createdmonth": 4,
            "technologies": ["Rust", 42, "Postgres"],
            "status": "公開",
        }));
        assert_eq!(p.github_url, "https://github.com/x/y");
        assert_eq!(p.deploy_status, "DEPLOYED");
        assert_eq!(p.status, "PUBLISHED");
        assert_eq!(p.created_year, 2023);
        assert_eq!(p.created_month, 4);
        assert_eq!(p.technologies, vec!["Rust", "Postgres"]);
    }

    #[test]
    fn test_from_row_prefers_camel_case_alias() {
        let p = from_row(&json!({
            "id": "p",
            "title": "t",
            "githubUrl": "camel",
            "github_url": "snake",
        }));
        assert_eq!(p.github_url, "camel");
    }

    #[test]
    fn test_input_defaults() {
        let input = ProductInput {
            title: "T".to_string(),
            description: "D".to_string(),
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(input.status, "PUBLISHED");
        assert_eq!(input.deploy_status, "UNDEPLOYED");
        assert!(input.created_year >= 2026);
        assert!((1..=12).contains(&input.created_month));
    }

    #[test]
    fn test_validate_requires_title_and_description() {
        let input = ProductInput {
            title: "  ".to_string(),
            description: "D".to_string(),
            ..Default::default()
        };
        assert!(matches!(input.validate(), Err(ApiError::Validation(_))));
    }
}

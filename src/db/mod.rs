pub mod models;
pub mod normalize;
pub mod query;
pub mod raw;

use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn init_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .idle_timeout(std::time::Duration::from_secs(config.db_idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<std::time::Duration, sqlx::Error> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(start.elapsed())
}

/// Opaque entity identifier: prefix plus creation nanos. Globally unique
/// enough for this dataset and sorts in creation order, which the audit
/// log's keyset pagination relies on as its tie-break.
pub fn generate_id(prefix: &str) -> String {
    format!(
        "{}_{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Canonical schema, applied in order. Tables are created only when they
/// do not exist; legacy-shaped tables are left untouched and the
/// tolerant read layer copes with them.
const MIGRATIONS: &[&str] = &[
    r#"
        CREATE TABLE IF NOT EXISTS "products" (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            image TEXT,
            link TEXT,
            "githubUrl" TEXT,
            category TEXT,
            technologies JSONB NOT NULL DEFAULT '[]'::jsonb,
            status TEXT,
            "deployStatus" TEXT,
            "createdYear" INTEGER,
            "createdMonth" INTEGER,
            "createdAt" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "sectionMeta" (
            id TEXT PRIMARY KEY,
            section_id TEXT,
            "displayName" TEXT NOT NULL,
            type_name TEXT,
            "order" INTEGER NOT NULL DEFAULT 0,
            editable BOOLEAN NOT NULL DEFAULT true,
            "sortOrder" TEXT
        )
    "#,
    // sortOrder arrived after the table did.
    r#"
        ALTER TABLE "sectionMeta" ADD COLUMN IF NOT EXISTS "sortOrder" TEXT
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "sections" (
            id TEXT PRIMARY KEY,
            type_name TEXT,
            data JSONB NOT NULL DEFAULT '{}'::jsonb
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "activities" (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            link TEXT,
            image TEXT,
            status TEXT,
            "order" INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "activityCategories" (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            "order" INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "technologies" (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            "createdAt" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    // Name uniqueness is enforced here rather than by check-then-insert,
    // so concurrent creates cannot race past the check; the violation
    // maps to a 409.
    r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_technologies_name_lower
            ON "technologies" (LOWER(name))
    "#,
    r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_categories_name_lower
            ON "activityCategories" (LOWER(name))
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS inquiries (
            id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
            category TEXT,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            contact_name TEXT,
            contact_email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            replies JSONB NOT NULL DEFAULT '[]'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS "adminLogs" (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            entity TEXT,
            "entityId" TEXT,
            "userId" TEXT,
            "userEmail" TEXT,
            level TEXT NOT NULL DEFAULT 'info',
            details JSONB NOT NULL DEFAULT '{}'::jsonb,
            "createdAt" TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    r#"
        CREATE INDEX IF NOT EXISTS idx_admin_logs_created_at_id
            ON "adminLogs" ("createdAt" DESC, id DESC)
    "#,
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_carries_prefix_and_is_monotonic() {
        let a = generate_id("product");
        let b = generate_id("product");
        assert!(a.starts_with("product_"));
        assert!(b >= a);
    }

    #[test]
    fn test_now_iso_is_rfc3339_utc() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_migrations_enforce_case_insensitive_name_uniqueness() {
        let unique_on_lower_name = |table: &str| {
            MIGRATIONS.iter().any(|stmt| {
                stmt.contains("CREATE UNIQUE INDEX")
                    && stmt.contains(table)
                    && stmt.contains("LOWER(name)")
            })
        };
        assert!(unique_on_lower_name(r#""technologies""#));
        assert!(unique_on_lower_name(r#""activityCategories""#));
    }
}

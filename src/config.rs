//! Process configuration - read from environment variables exactly once at
//! startup and passed by reference into every component that needs it.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is required")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_mode: bool,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_idle_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Web API key for the external identity provider.
    pub identity_api_key: String,
    /// Admin allow-lists (lowercased). Empty sets mean any verified
    /// subject is accepted as admin.
    pub admin_emails: HashSet<String>,
    pub admin_uids: HashSet<String>,
    pub mail_from: String,
    pub mail_to: Vec<String>,
    pub mail_api_url: String,
    pub mail_retry_max: u32,
    pub mail_retry_interval: Duration,
    pub github_token: String,
    pub github_owner: String,
    pub github_repo: String,
    pub github_branch: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let database_url = env_trimmed("DATABASE_URL");
        if database_url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080),
            app_mode: env_parse("APP_MODE", false),
            database_url,
            db_max_connections: env_parse("DB_POOL_MAX", 10),
            db_min_connections: env_parse("DB_POOL_MIN", 2),
            db_idle_timeout_secs: env_parse("DB_IDLE_TIMEOUT", 300),
            allowed_origins: split_csv(&env_or("CORS_ALLOWED_ORIGINS", "*")),
            allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", false),
            identity_api_key: env_trimmed("FIREBASE_WEB_API_KEY"),
            admin_emails: to_lower_set(&split_csv(&env_trimmed("ADMIN_EMAILS"))),
            admin_uids: to_lower_set(&split_csv(&env_trimmed("ADMIN_UIDS"))),
            mail_from: env_trimmed("MAIL_FROM"),
            mail_to: split_csv(&env_trimmed("MAIL_TO")),
            mail_api_url: env_trimmed("MAIL_API_URL"),
            mail_retry_max: env_parse("MAIL_RETRY_MAX", 3),
            mail_retry_interval: Duration::from_millis(env_parse(
                "MAIL_RETRY_INTERVAL_MS",
                500,
            )),
            github_token: env_trimmed("GITHUB_TOKEN"),
            github_owner: env_trimmed("GITHUB_OWNER"),
            github_repo: env_trimmed("GITHUB_REPO"),
            github_branch: env_or("GITHUB_BRANCH", "main"),
        })
    }
}

fn env_trimmed(key: &str) -> String {
    std::env::var(key).unwrap_or_default().trim().to_string()
}

fn env_or(key: &str, fallback: &str) -> String {
    let v = env_trimmed(key);
    if v.is_empty() {
        fallback.to_string()
    } else {
        v
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    let v = env_trimmed(key);
    if v.is_empty() {
        return fallback;
    }
    v.parse().unwrap_or(fallback)
}

pub fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn to_lower_set(values: &[String]) -> HashSet<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_trims_and_drops_blanks() {
        assert_eq!(
            split_csv(" a@example.com , ,b@example.com"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ,").is_empty());
    }

    #[test]
    fn test_to_lower_set() {
        let set = to_lower_set(&["Admin@Example.com".to_string()]);
        assert!(set.contains("admin@example.com"));
    }

    #[test]
    fn test_env_parse_fallback_on_garbage() {
        std::env::set_var("TEST_ENV_PARSE_GARBAGE", "not-a-number");
        let v: u32 = env_parse("TEST_ENV_PARSE_GARBAGE", 42);
        assert_eq!(v, 42);
        std::env::remove_var("TEST_ENV_PARSE_GARBAGE");
    }
}

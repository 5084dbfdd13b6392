//! Bearer-token verification against the external identity provider.
//!
//! The backend never issues credentials itself: login and refresh proxy
//! the provider's REST endpoints, and every admin-tier request is
//! verified by looking the token up at the provider. When an admin
//! allow-list is configured the verified subject must also match it.

use std::collections::HashSet;
use std::time::Duration;

use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::ApiError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Clone)]
pub struct Claims {
    pub uid: String,
    pub email: String,
}

pub struct Verifier {
    http: reqwest::Client,
    api_key: String,
    admin_emails: HashSet<String>,
    admin_uids: HashSet<String>,
}

impl Verifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(UPSTREAM_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: config.identity_api_key.clone(),
            admin_emails: config.admin_emails.clone(),
            admin_uids: config.admin_uids.clone(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            IDENTITY_TOOLKIT_URL,
            method,
            urlencode(&self.api_key)
        )
    }

    fn require_key(&self) -> Result<(), ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::Internal(
                "Identity provider is not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Verify an id token and enforce the admin allow-list. Invalid or
    /// expired tokens are Unauthorized; a valid token whose subject is
    /// not on a non-empty allow-list is Forbidden.
    pub async fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        self.require_key()?;

        let res = self
            .http
            .post(self.endpoint("lookup"))
            .json(&json!({ "idToken": token }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ApiError::Unauthorized);
        }

        let body: Value = res.json().await?;
        let user = body
            .get("users")
            .and_then(|u| u.as_array())
            .and_then(|u| u.first())
            .ok_or(ApiError::Unauthorized)?;

        let claims = Claims {
            uid: user
                .get("localId")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            email: user
                .get("email")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        };
        if claims.uid.is_empty() {
            return Err(ApiError::Unauthorized);
        }

        self.check_allow_list(&claims)?;
        Ok(claims)
    }

    fn check_allow_list(&self, claims: &Claims) -> Result<(), ApiError> {
        if self.admin_uids.is_empty() && self.admin_emails.is_empty() {
            return Ok(());
        }
        if self.admin_uids.contains(&claims.uid.to_lowercase())
            || self.admin_emails.contains(&claims.email.to_lowercase())
        {
            return Ok(());
        }
        Err(ApiError::Forbidden)
    }

    /// Exchange email/password for provider tokens. A provider rejection
    /// is reported as Unauthorized without detail.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Value, ApiError> {
        self.require_key()?;

        let res = self
            .http
            .post(self.endpoint("signInWithPassword"))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ApiError::Unauthorized);
        }
        Ok(res.json().await?)
    }

    /// Exchange a refresh token for a fresh id token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Value, ApiError> {
        self.require_key()?;

        let res = self
            .http
            .post(format!(
                "{}?key={}",
                SECURE_TOKEN_URL,
                urlencode(&self.api_key)
            ))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ApiError::Unauthorized);
        }
        Ok(res.json().await?)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn urlencode(v: &str) -> String {
    v.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn verifier_with(emails: &[&str], uids: &[&str]) -> Verifier {
        Verifier {
            http: reqwest::Client::new(),
            api_key: "test".to_string(),
            admin_emails: emails.iter().map(|s| s.to_string()).collect(),
            admin_uids: uids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_empty_allow_list_accepts_any_subject() {
        let v = verifier_with(&[], &[]);
        let claims = Claims {
            uid: "u1".to_string(),
            email: "someone@example.com".to_string(),
        };
        assert!(v.check_allow_list(&claims).is_ok());
    }

    #[test]
    fn test_allow_list_matches_case_insensitively() {
        let v = verifier_with(&["admin@example.com"], &[]);
        let claims = Claims {
            uid: "u1".to_string(),
            email: "Admin@Example.COM".to_string(),
        };
        assert!(v.check_allow_list(&claims).is_ok());

        let outsider = Claims {
            uid: "u2".to_string(),
            email: "visitor@example.com".to_string(),
        };
        assert!(matches!(
            v.check_allow_list(&outsider),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_allow_list_matches_uid_too() {
        let v = verifier_with(&[], &["uid-42"]);
        let claims = Claims {
            uid: "UID-42".to_string(),
            email: String::new(),
        };
        assert!(v.check_allow_list(&claims).is_ok());
    }

    #[test]
    fn test_urlencode_escapes_reserved_chars() {
        assert_eq!(urlencode("a b&c"), "a%20b%26c");
        assert_eq!(urlencode("AIzaSy-0._~"), "AIzaSy-0._~");
    }
}

//! Image storage backed by a GitHub repository's contents API.
//!
//! Uploaded files are committed under `public/img/...` of the configured
//! repo and served by the frontend host from the matching public path.
//! Existing files are never overwritten.

use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::ApiError;

const API_VERSION: &str = "2022-11-28";
const EXISTS_TIMEOUT: Duration = Duration::from_secs(15);
const PUT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct GithubStore {
    http: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
    branch: String,
}

impl GithubStore {
    /// `None` when any of token, owner or repo is unset; uploads are
    /// then reported as unconfigured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if config.github_token.is_empty()
            || config.github_owner.is_empty()
            || config.github_repo.is_empty()
        {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            token: config.github_token.clone(),
            owner: config.github_owner.clone(),
            repo: config.github_repo.clone(),
            branch: config.github_branch.clone(),
        })
    }

    fn contents_url(&self, repo_path: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/contents/{}",
            path_escape(&self.owner),
            path_escape(&self.repo),
            repo_path
                .split('/')
                .map(path_escape)
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    fn request(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", "portfolio-api")
    }

    /// True when the path already exists on the configured branch.
    pub async fn file_exists(&self, repo_path: &str) -> Result<bool, ApiError> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(repo_path),
            path_escape(&self.branch)
        );
        let res = self
            .request(self.http.get(url).timeout(EXISTS_TIMEOUT))
            .send()
            .await?;

        match res.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(ApiError::Upstream(format!(
                "github content lookup failed with status {}",
                status
            ))),
        }
    }

    /// Commit the file and return the content blob's sha.
    pub async fn put_file(
        &self,
        repo_path: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, ApiError> {
        let payload = json!({
            "message": format!("Upload image: {}", file_name),
            "content": base64::engine::general_purpose::STANDARD.encode(data),
            "branch": self.branch,
        });

        let res = self
            .request(
                self.http
                    .put(self.contents_url(repo_path))
                    .timeout(PUT_TIMEOUT)
                    .json(&payload),
            )
            .send()
            .await?;

        let status = res.status();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            return Err(ApiError::Upstream(format!(
                "github content upload failed with status {}",
                status
            )));
        }

        let body: Value = res.json().await?;
        Ok(body
            .pointer("/content/sha")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

fn path_escape(segment: &str) -> String {
    segment
        .bytes()
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

    fn store() -> GithubStore {
        GithubStore {
            http: reqwest::Client::new(),
            token: "t".to_string(),
            owner: "owner".to_string(),
            repo: "site repo".to_string(),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn test_absent_when_unconfigured() {
        let mut config = AppConfig::default();
        config.github_token = "t".to_string();
        config.github_owner = "o".to_string();
        assert!(GithubStore::from_config(&config).is_none());

        config.github_repo = "r".to_string();
        config.github_branch = "main".to_string();
        assert!(GithubStore::from_config(&config).is_some());
    }

    #[test]
    fn test_contents_url_escapes_each_segment() {
        let url = store().contents_url("public/img/my file.png");
        assert_eq!(
            url,
            "https://api.github.com/repos/owner/site%20repo/contents/public/img/my%20file.png"
        );
    }
}

//! Outbound mail over an HTTP relay.
//!
//! Delivery is best-effort everywhere this client is used: a send that
//! exhausts its retries is logged and swallowed so the triggering
//! request still succeeds. The client is absent entirely when
//! `MAIL_FROM` or `MAIL_API_URL` is unconfigured.

pub mod templates;

use std::time::Duration;

use serde_json::json;

use crate::config::AppConfig;
use crate::error::ApiError;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Client {
    http: reqwest::Client,
    api_url: String,
    from: String,
    retry_max: u32,
    retry_interval: Duration,
}

impl Client {
    /// `None` when mail is not configured; callers treat that as
    /// "notifications disabled".
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let from = config.mail_from.trim();
        let api_url = config.mail_api_url.trim();
        if from.is_empty() || api_url.is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_url: api_url.to_string(),
            from: from.to_string(),
            retry_max: config.mail_retry_max.max(1),
            retry_interval: config.mail_retry_interval.max(Duration::from_millis(1)),
        })
    }

    /// Send a plain-text message, retrying on failure with a fixed
    /// interval. Blank recipients are dropped; no recipients, no send.
    pub async fn send_text(&self, to: &[&str], subject: &str, body: &str) -> Result<(), ApiError> {
        let recipients: Vec<&str> = to
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if recipients.is_empty() {
            return Ok(());
        }

        let payload = json!({
            "from": self.from,
            "to": recipients,
            "subject": subject,
            "text": body,
        });

        let mut last_err = None;
        for attempt in 1..=self.retry_max {
            match self.http.post(&self.api_url).json(&payload).send().await {
                Ok(res) if res.status().is_success() => return Ok(()),
                Ok(res) => {
                    tracing::warn!(
                        status = %res.status(),
                        attempt,
                        "Mail relay rejected message"
                    );
                    last_err = Some(ApiError::Upstream(format!(
                        "mail relay returned {}",
                        res.status()
                    )));
                }
                Err(err) => {
                    tracing::warn!(error = %err, attempt, "Mail relay unreachable");
                    last_err = Some(ApiError::from(err));
                }
            }
            if attempt < self.retry_max {
                tokio::time::sleep(self.retry_interval).await;
            }
        }

        Err(last_err.unwrap_or_else(|| ApiError::Upstream("mail send failed".to_string())))
    }
}

/// Fire-and-forget wrapper used by request handlers.
pub async fn send_best_effort(client: Option<&Client>, to: &[&str], subject: &str, body: &str) {
    let Some(client) = client else { return };
    if let Err(err) = client.send_text(to, subject, body).await {
        tracing::error!(error = %err, subject, "Failed to send notification mail");
    }
}

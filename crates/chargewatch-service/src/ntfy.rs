//! ntfy push notifications over HTTP

use anyhow::{Context, Result};
use async_trait::async_trait;
use chargewatch_engine::{Notification, Notifier, NotifyError};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

pub const NTFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts each notification body as plain text to one ntfy topic URL.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    client: reqwest::Client,
    url: String,
}

impl NtfyNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, NTFY_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chargewatchd/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .header("Title", notification.title.as_str())
            .body(notification.body.clone())
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        debug!(url = %self.url, status = status.as_u16(), "ntfy accepted notification");
        Ok(())
    }
}

//! Discord incoming-webhook client.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use super::Forwarder;
use crate::models::notification::ChatMessage;
use crate::{AppError, Result};

/// Longest slice of an error reply kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Posts messages to a single Discord webhook URL.
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    /// Create a forwarder for `url`.
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl Forwarder for DiscordWebhook {
    fn forward<'a>(
        &'a self,
        message: &'a ChatMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(&self.url)
                .json(message)
                .send()
                .await
                // The webhook URL embeds its token; keep it out of errors.
                .map_err(|err| {
                    AppError::Forward(format!("discord post failed: {}", err.without_url()))
                })?;

            let status = response.status();
            if status.is_success() {
                info!(%status, embeds = message.embeds.len(), "forwarded to discord");
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            Err(AppError::Forward(format!(
                "discord returned {status}: {body}"
            )))
        })
    }
}

//! Per-request orchestration and HTTP status decisions.
//!
//! A delivery moves through `Received → Verified → Normalized → Built`
//! and ends in exactly one terminal [`Outcome`]. [`Outcome::status`]
//! maps every terminal state to its HTTP status.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use tracing::{error, info, info_span, warn, Instrument};

use super::build::{build, StateColorRules};
use super::enrich::Enricher;
use super::normalize::normalize;
use crate::config::GlobalConfig;
use crate::discord::Forwarder;
use crate::models::notification::ChatMessage;
use crate::reqlog::{RequestLogEntry, RequestLogger};
use crate::signature::{self, SIGNATURE_HEADER};
use crate::AppError;

/// One inbound webhook request as received.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Request path, for logging.
    pub path: &'a str,
    /// Workspace named in the path, if any.
    pub workspace: Option<&'a str>,
    /// Request headers.
    pub headers: &'a HeaderMap,
    /// Raw request body.
    pub body: &'a [u8],
}

/// Terminal state of a delivery.
#[derive(Debug)]
pub enum Outcome {
    /// Notification was accepted by the chat platform.
    Forwarded,
    /// Event was understood but produces no notification.
    Ignored,
    /// Refused before processing: bad signature or relay misconfigured.
    Rejected(AppError),
    /// Processing failed after verification.
    Failed(AppError),
}

impl Outcome {
    /// HTTP status returned to the caller.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forwarded | Self::Ignored => StatusCode::OK,
            Self::Rejected(err) | Self::Failed(err) => status_for(err),
        }
    }

    /// Short plain-text response body.
    #[must_use]
    pub fn body(&self) -> &'static str {
        match self {
            Self::Forwarded | Self::Ignored => "ok",
            Self::Rejected(AppError::Unauthorized(_)) => "invalid signature",
            Self::Rejected(AppError::Config(_)) | Self::Failed(AppError::Config(_)) => {
                "relay not configured"
            }
            Self::Failed(AppError::Parse(_)) => "invalid payload",
            Self::Failed(AppError::Forward(_)) => "failed to forward notification",
            Self::Failed(
                AppError::Upstream(_) | AppError::ImageFetch(_) | AppError::ImageUpload(_),
            ) => "upstream lookup failed",
            Self::Rejected(_) | Self::Failed(_) => "internal error",
        }
    }
}

/// HTTP status for an error reaching a terminal state.
#[must_use]
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
        AppError::Parse(_) => StatusCode::BAD_REQUEST,
        AppError::Upstream(_)
        | AppError::ImageFetch(_)
        | AppError::ImageUpload(_)
        | AppError::Forward(_) => StatusCode::BAD_GATEWAY,
        AppError::Config(_) | AppError::Db(_) | AppError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Runs deliveries through verification, normalization, enrichment,
/// building and forwarding.
pub struct Dispatcher {
    config: Arc<GlobalConfig>,
    enricher: Enricher,
    rules: StateColorRules,
    forwarder: Arc<dyn Forwarder>,
    request_log: Option<Arc<dyn RequestLogger>>,
}

impl Dispatcher {
    /// Create a dispatcher; state rules come from `config.state_colors`.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        enricher: Enricher,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let rules = StateColorRules::from_config(&config.state_colors);
        Self {
            config,
            enricher,
            rules,
            forwarder,
            request_log: None,
        }
    }

    /// Append every delivery to `request_log` before processing.
    #[must_use]
    pub fn with_request_log(mut self, request_log: Arc<dyn RequestLogger>) -> Self {
        self.request_log = Some(request_log);
        self
    }

    /// Process one delivery to a terminal outcome.
    pub async fn handle(&self, delivery: Delivery<'_>) -> Outcome {
        let span = info_span!("webhook", path = delivery.path, workspace = delivery.workspace);
        async {
            self.log_request(&delivery);
            let outcome = self.run(&delivery).await;
            let status = outcome.status().as_u16();
            match &outcome {
                Outcome::Forwarded => info!(status, "notification forwarded"),
                Outcome::Ignored => info!(status, "event acknowledged without notification"),
                Outcome::Rejected(err) => warn!(%err, status, "delivery rejected"),
                Outcome::Failed(err) => error!(%err, status, "delivery failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, delivery: &Delivery<'_>) -> Outcome {
        if let Err(err) = self.check_configuration() {
            return Outcome::Rejected(err);
        }

        let Some(received) = delivery.headers.get(SIGNATURE_HEADER) else {
            return Outcome::Rejected(AppError::Unauthorized(format!(
                "missing {SIGNATURE_HEADER} header"
            )));
        };
        let Ok(received) = received.to_str() else {
            return Outcome::Rejected(AppError::Unauthorized(
                "signature header is not ascii".into(),
            ));
        };
        if let Err(err) = signature::verify(delivery.body, received, &self.config.webhook_secret) {
            return Outcome::Rejected(err);
        }

        let event = match normalize(delivery.body, delivery.workspace) {
            Ok(event) => event,
            Err(err) => return Outcome::Failed(err),
        };
        info!(
            event = event.event_name(),
            action = event.action_name(),
            webhook_id = event.webhook_id().unwrap_or_default(),
            "event received"
        );

        let enriched = match self.enricher.enrich(event).await {
            Ok(enriched) => enriched,
            Err(err) => return Outcome::Failed(err),
        };

        let Some(document) = build(&enriched, &self.rules) else {
            return Outcome::Ignored;
        };

        match self.forwarder.forward(&ChatMessage::single(document)).await {
            Ok(()) => Outcome::Forwarded,
            Err(err) => Outcome::Failed(err),
        }
    }

    fn check_configuration(&self) -> Result<(), AppError> {
        if self.config.webhook_secret.is_empty() {
            return Err(AppError::Config("webhook secret is not configured".into()));
        }
        if self.config.discord.webhook_url.is_empty() {
            return Err(AppError::Config("discord webhook url is not configured".into()));
        }
        Ok(())
    }

    fn log_request(&self, delivery: &Delivery<'_>) {
        let Some(log) = &self.request_log else {
            return;
        };
        let entry = RequestLogEntry::capture(delivery.path, delivery.headers, delivery.body);
        if let Err(err) = log.log_entry(entry) {
            warn!(%err, "failed to append request log");
        }
    }
}

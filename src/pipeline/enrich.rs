//! Augment parsed events with tracking-service context.

use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, warn};

use crate::config::PlaneConfig;
use crate::images::ImageStore;
use crate::models::event::{Actor, InboundEvent, IssueLabel};
use crate::plane::TrackerApi;
use crate::Result;

/// Resolved reference to the work item an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueContext {
    /// Project short key, e.g. `WEB`.
    pub project_identifier: String,
    /// Work item sequence number.
    pub sequence_id: u64,
    /// Work item title.
    pub work_item_name: String,
    /// Browse link to the work item.
    pub url: String,
}

impl IssueContext {
    /// Human-readable reference such as `WEB-42`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}-{}", self.project_identifier, self.sequence_id)
    }
}

/// An event plus everything the builder needs that is not in the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedEvent {
    /// The parsed event.
    pub event: InboundEvent,
    /// Work item context; `None` for deletions and unrecognized events.
    pub context: Option<IssueContext>,
    /// Display names of the issue's labels, in payload order.
    pub labels: Vec<String>,
    /// Absolute (possibly re-hosted) actor avatar URL.
    pub avatar_url: Option<String>,
}

impl EnrichedEvent {
    /// Wrap an event with no added context.
    #[must_use]
    pub fn bare(event: InboundEvent) -> Self {
        Self {
            event,
            context: None,
            labels: Vec::new(),
            avatar_url: None,
        }
    }
}

/// Performs upstream lookups for events.
pub struct Enricher {
    tracker: Arc<dyn TrackerApi>,
    images: Option<Arc<ImageStore>>,
    hostname: Option<String>,
    browse_base: String,
}

impl Enricher {
    /// Create an enricher that does not re-host avatars.
    #[must_use]
    pub fn new(tracker: Arc<dyn TrackerApi>, plane: &PlaneConfig) -> Self {
        Self {
            tracker,
            images: None,
            hostname: plane
                .hostname
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned),
            browse_base: plane.browse_base().to_owned(),
        }
    }

    /// Route actor avatars through `images`.
    #[must_use]
    pub fn with_image_store(mut self, images: Arc<ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    /// Fetch project, work item and label context for `event`.
    ///
    /// Lookups for one event run concurrently; the first failure aborts
    /// the whole enrichment. Avatar re-hosting never fails enrichment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if any tracker lookup fails.
    pub async fn enrich(&self, event: InboundEvent) -> Result<EnrichedEvent> {
        let (context, labels) = match &event {
            InboundEvent::IssueCreated(e) | InboundEvent::IssueUpdated(e) => {
                let (context, labels) = tokio::try_join!(
                    self.issue_context(&e.workspace_id, &e.data.project, &e.data.id),
                    self.label_names(&e.workspace_id, &e.data.project, &e.data.labels),
                )?;
                (Some(context), labels)
            }
            InboundEvent::CommentCreated(e) | InboundEvent::CommentUpdated(e) => {
                let context = self
                    .issue_context(&e.workspace_id, &e.data.project, &e.data.issue)
                    .await?;
                (Some(context), Vec::new())
            }
            InboundEvent::IssueDeleted(_)
            | InboundEvent::CommentDeleted(_)
            | InboundEvent::Unrecognized { .. } => (None, Vec::new()),
        };

        let avatar_url = match event.activity() {
            Some(activity) => self.actor_avatar(&activity.actor).await,
            None => None,
        };

        Ok(EnrichedEvent {
            event,
            context,
            labels,
            avatar_url,
        })
    }

    async fn issue_context(
        &self,
        workspace: &str,
        project_id: &str,
        item_id: &str,
    ) -> Result<IssueContext> {
        let (project, item) = tokio::try_join!(
            self.tracker.project(workspace, project_id),
            self.tracker.work_item(workspace, project_id, item_id),
        )?;

        let url = format!(
            "{}/{workspace}/browse/{}-{}/",
            self.browse_base, project.identifier, item.sequence_id
        );
        Ok(IssueContext {
            project_identifier: project.identifier,
            sequence_id: item.sequence_id,
            work_item_name: item.name,
            url,
        })
    }

    async fn label_names(
        &self,
        workspace: &str,
        project_id: &str,
        labels: &[IssueLabel],
    ) -> Result<Vec<String>> {
        let lookups = labels
            .iter()
            .map(|label| self.tracker.label(workspace, project_id, &label.id));
        let resolved = try_join_all(lookups).await?;
        Ok(resolved.into_iter().map(|label| label.name).collect())
    }

    async fn actor_avatar(&self, actor: &Actor) -> Option<String> {
        let absolute = absolute_avatar(actor.avatar_ref()?, self.hostname.as_deref())?;
        let Some(images) = &self.images else {
            return Some(absolute);
        };
        match images.resolve(&absolute).await {
            Ok(hosted) => {
                debug!(%hosted, "avatar re-hosted");
                Some(hosted)
            }
            Err(err) => {
                warn!(%err, "avatar re-hosting failed; using upstream url");
                Some(absolute)
            }
        }
    }
}

/// Turn an avatar reference into an absolute URL.
///
/// Absolute `http(s)` URLs pass through. Relative paths are resolved
/// against `hostname` over HTTPS; without a hostname there is no usable
/// link and `None` is returned.
#[must_use]
pub fn absolute_avatar(reference: &str, hostname: Option<&str>) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("https://") || reference.starts_with("http://") {
        return Some(reference.to_owned());
    }
    let host = hostname?.trim().trim_end_matches('/');
    if host.is_empty() {
        return None;
    }
    let separator = if reference.starts_with('/') { "" } else { "/" };
    Some(format!("https://{host}{separator}{reference}"))
}

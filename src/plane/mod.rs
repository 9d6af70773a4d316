//! Read-only access to the Plane tracking service.
//!
//! The [`TrackerApi`] trait decouples event enrichment from the HTTP
//! client so tests can substitute canned records.

pub mod client;

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::Result;

pub use client::PlaneClient;

/// Project record; only the short identifier is needed for references.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    /// Project identifier.
    pub id: String,
    /// Short key used in issue references, e.g. `WEB`.
    pub identifier: String,
    /// Project display name.
    #[serde(default)]
    pub name: String,
}

/// Work item (issue) record.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    /// Work item identifier.
    pub id: String,
    /// Work item title.
    pub name: String,
    /// Per-project sequence number.
    pub sequence_id: u64,
}

/// Label record.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Label {
    /// Label identifier.
    pub id: String,
    /// Label display name.
    pub name: String,
}

/// Lookups against the tracking service used during enrichment.
pub trait TrackerApi: Send + Sync {
    /// Fetch a project.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the lookup fails.
    fn project<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Project>> + Send + 'a>>;

    /// Fetch a work item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the lookup fails.
    fn work_item<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
        item_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkItem>> + Send + 'a>>;

    /// Fetch a label.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the lookup fails.
    fn label<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
        label_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Label>> + Send + 'a>>;
}

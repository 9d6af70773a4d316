//! Plane REST API v1 client.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Label, Project, TrackerApi, WorkItem};
use crate::config::PlaneConfig;
use crate::{AppError, Result};

const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the Plane API, authenticated with an API key.
pub struct PlaneClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PlaneClient {
    /// Create a client from Plane configuration.
    ///
    /// `http` should carry the relay-wide request timeout.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &PlaneConfig) -> Self {
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let url = format!("{}/api/v1/workspaces/{path}", self.base_url);
        debug!(%url, "plane lookup");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("GET {url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("GET {url} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::Upstream(format!("GET {url}: invalid body: {err}")))
    }
}

impl TrackerApi for PlaneClient {
    fn project<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Project>> + Send + 'a>> {
        Box::pin(self.get_json(format!("{workspace}/projects/{project_id}/")))
    }

    fn work_item<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
        item_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkItem>> + Send + 'a>> {
        Box::pin(self.get_json(format!(
            "{workspace}/projects/{project_id}/issues/{item_id}/"
        )))
    }

    fn label<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
        label_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Label>> + Send + 'a>> {
        Box::pin(self.get_json(format!(
            "{workspace}/projects/{project_id}/labels/{label_id}/"
        )))
    }
}

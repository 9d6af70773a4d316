//! Append-only log of inbound webhook requests.
//!
//! Provides the [`RequestLogger`] trait and associated types. The primary
//! implementation, [`JsonlRequestWriter`], queues entries for a background
//! task that appends them to daily JSONL files.

pub mod writer;

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One received request as it arrived on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    /// Receive time.
    pub timestamp: DateTime<Utc>,
    /// Request path.
    pub path: String,
    /// Request headers; non-UTF-8 values are dropped.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, or the lossy text when it is not JSON.
    pub body: serde_json::Value,
}

impl RequestLogEntry {
    /// Capture a request for logging.
    #[must_use]
    pub fn capture(path: &str, headers: &HeaderMap, body: &[u8]) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_owned())))
            .collect();
        let body = serde_json::from_slice(body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
        });
        Self {
            timestamp: Utc::now(),
            path: path.to_owned(),
            headers,
            body,
        }
    }
}

/// Accepts request records on the request path.
///
/// Called once per delivery from inside the HTTP handler, so
/// implementations must not block.
pub trait RequestLogger: Send + Sync {
    /// Hand off a single request for recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be accepted.
    fn log_entry(&self, entry: RequestLogEntry) -> crate::Result<()>;
}

pub use writer::JsonlRequestWriter;

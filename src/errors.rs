//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Every variant is request-scoped: a failing request never takes the
/// process down.
#[derive(Debug)]
pub enum AppError {
    /// Required secret or credential is absent, or configuration is invalid.
    Config(String),
    /// Missing, malformed, or mismatched webhook signature.
    Unauthorized(String),
    /// Inbound body is not a well-formed event payload.
    Parse(String),
    /// Lookup against the tracking service failed.
    Upstream(String),
    /// Source image could not be downloaded.
    ImageFetch(String),
    /// Object store rejected or failed the image upload.
    ImageUpload(String),
    /// Chat webhook returned non-2xx or the transport failed.
    Forward(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Upstream(msg) => write!(f, "upstream: {msg}"),
            Self::ImageFetch(msg) => write!(f, "image fetch: {msg}"),
            Self::ImageUpload(msg) => write!(f, "image upload: {msg}"),
            Self::Forward(msg) => write!(f, "forward: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

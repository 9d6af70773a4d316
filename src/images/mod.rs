//! Content-addressed image re-hosting.
//!
//! [`ImageStore::resolve`] downloads an image, keys it by the SHA-256 of
//! its bytes, and uploads it to the [`BlobStore`] only when that digest
//! has never been recorded. Two URLs serving identical bytes share one
//! hosted object; one URL whose bytes change yields a new object.
//!
//! Concurrent misses on the same image are not serialized and may both
//! upload. The cache keeps the first recorded URL, so callers converge
//! on it and the extra object is merely orphaned.

pub mod blob;

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::persistence::db::{self, Database};
use crate::persistence::image_cache_repo::ImageCacheRepo;
use crate::{AppError, Result};

pub use blob::{BlobStore, S3Blobs};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Downloaded image bytes and their declared type.
struct Fetched {
    bytes: Bytes,
    content_type: String,
}

/// An opened image store and the cache pool it writes to.
pub struct Rehosting {
    /// Store to hand to the enricher.
    pub store: Arc<ImageStore>,
    /// Cache pool; close it on shutdown.
    pub db: Arc<Database>,
}

/// Re-hosts remote images through a durable hash cache.
pub struct ImageStore {
    http: reqwest::Client,
    blobs: Arc<dyn BlobStore>,
    cache: ImageCacheRepo,
}

impl ImageStore {
    /// Create a store over an HTTP client, a blob store and the cache.
    #[must_use]
    pub fn new(http: reqwest::Client, blobs: Arc<dyn BlobStore>, cache: ImageCacheRepo) -> Self {
        Self { http, blobs, cache }
    }

    /// Open the S3 store and the cache at `config.db_path` when avatar
    /// re-hosting is enabled.
    ///
    /// Returns `None` without creating the database when `[storage]` is
    /// absent or `rehost_avatars` is false.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the cache cannot be opened and
    /// `AppError::Config` if the object store client cannot be built.
    pub async fn open(config: &GlobalConfig, http: reqwest::Client) -> Result<Option<Rehosting>> {
        let Some(storage) = config.storage.as_ref().filter(|s| s.rehost_avatars) else {
            return Ok(None);
        };
        let blobs = Arc::new(S3Blobs::from_config(storage, config.http_timeout())?);
        let db = Arc::new(db::connect(&config.db_path).await?);
        info!(path = %config.db_path.display(), bucket = %storage.bucket, "image cache opened");

        let store = Self::new(http, blobs, ImageCacheRepo::new(Arc::clone(&db)));
        Ok(Some(Rehosting {
            store: Arc::new(store),
            db,
        }))
    }

    /// Return a hosted URL for the image at `source_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ImageFetch` if the download fails or is empty,
    /// `AppError::Db` if the cache lookup fails, and
    /// `AppError::ImageUpload` if the upload fails. A failed upload is
    /// never recorded.
    pub async fn resolve(&self, source_url: &str) -> Result<String> {
        let fetched = self.fetch(source_url).await?;
        let digest = content_digest(&fetched.bytes);

        if let Some(hosted) = self.cache.get(&digest).await? {
            debug!(%digest, "image cache hit");
            return Ok(hosted);
        }

        let key = format!("{}{}", Uuid::new_v4(), extension_for(&fetched.content_type));
        let size = fetched.bytes.len();
        self.blobs
            .put(&key, fetched.bytes, &fetched.content_type)
            .await?;
        let hosted = self.blobs.public_url(&key);
        info!(%digest, %key, size, "image uploaded");

        match self.cache.record(&digest, &hosted).await {
            Ok(canonical) => Ok(canonical),
            Err(err) => {
                warn!(%err, %digest, "failed to record image hash; object left uncached");
                Ok(hosted)
            }
        }
    }

    async fn fetch(&self, source_url: &str) -> Result<Fetched> {
        let response = self
            .http
            .get(source_url)
            .send()
            .await
            .map_err(|err| AppError::ImageFetch(format!("GET {source_url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ImageFetch(format!(
                "GET {source_url} returned {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_owned(), str::to_owned);

        let bytes = response
            .bytes()
            .await
            .map_err(|err| AppError::ImageFetch(format!("read {source_url}: {err}")))?;
        if bytes.is_empty() {
            return Err(AppError::ImageFetch(format!("GET {source_url} had no body")));
        }

        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// File extension for a declared MIME type; empty when unrecognized.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/avif" => ".avif",
        _ => "",
    }
}

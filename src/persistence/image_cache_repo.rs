//! Content-hash to hosted-URL repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{AppError, Result};

use super::db::Database;

/// A recorded upload: the content hash and where its bytes now live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hex SHA-256 of the image bytes.
    pub image_hash: String,
    /// Public URL of the uploaded object.
    pub hosted_url: String,
    /// First time the hash was recorded.
    pub created_at: DateTime<Utc>,
    /// Last time the hash was re-recorded.
    pub refreshed_at: DateTime<Utc>,
}

/// Repository for image cache records.
#[derive(Clone)]
pub struct ImageCacheRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct CacheRow {
    image_hash: String,
    hosted_url: String,
    created_at: String,
    refreshed_at: String,
}

impl CacheRow {
    fn into_entry(self) -> Result<CacheEntry> {
        Ok(CacheEntry {
            image_hash: self.image_hash,
            hosted_url: self.hosted_url,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            refreshed_at: parse_timestamp(&self.refreshed_at, "refreshed_at")?,
        })
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

impl ImageCacheRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Hosted URL recorded for `image_hash`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, image_hash: &str) -> Result<Option<String>> {
        let url: Option<String> =
            sqlx::query_scalar("SELECT hosted_url FROM image_cache WHERE image_hash = ?1")
                .bind(image_hash)
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(url)
    }

    /// Full record for `image_hash`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a timestamp is corrupt.
    pub async fn entry(&self, image_hash: &str) -> Result<Option<CacheEntry>> {
        let row: Option<CacheRow> = sqlx::query_as(
            "SELECT image_hash, hosted_url, created_at, refreshed_at
             FROM image_cache
             WHERE image_hash = ?1",
        )
        .bind(image_hash)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(CacheRow::into_entry).transpose()
    }

    /// Record `hosted_url` for `image_hash` and return the canonical URL.
    ///
    /// The first URL recorded for a hash is kept forever. Recording the
    /// same hash again only bumps `refreshed_at` and returns the URL that
    /// was already stored, so racing uploads converge on one object.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn record(&self, image_hash: &str, hosted_url: &str) -> Result<String> {
        let now = Utc::now().to_rfc3339();

        let canonical: String = sqlx::query_scalar(
            "INSERT INTO image_cache (image_hash, hosted_url, created_at, refreshed_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(image_hash) DO UPDATE SET refreshed_at = excluded.refreshed_at
             RETURNING hosted_url",
        )
        .bind(image_hash)
        .bind(hosted_url)
        .bind(&now)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(canonical)
    }

    /// Number of recorded images.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_cache")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(count)
    }
}

//! Object store adapter used to re-host images.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload,
};
use tracing::info;

use crate::config::StorageConfig;
use crate::{AppError, Result};

/// Write-only view of a public object store.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` with public-read access.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ImageUpload` if the store rejects the write.
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Bytes,
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Public URL under which `key` is served.
    fn public_url(&self, key: &str) -> String;
}

/// S3-compatible blob store, addressed path-style as `endpoint/bucket/key`.
pub struct S3Blobs {
    store: Arc<dyn ObjectStore>,
    endpoint: String,
    bucket: String,
}

impl S3Blobs {
    /// Build an S3 client from configuration.
    ///
    /// Every request carries `x-amz-acl: public-read` and the given timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the client cannot be built.
    pub fn from_config(config: &StorageConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-amz-acl"),
            HeaderValue::from_static("public-read"),
        );
        let client_options = ClientOptions::new()
            .with_timeout(timeout)
            .with_default_headers(headers);

        let store = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_endpoint(&config.endpoint)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_allow_http(config.endpoint.starts_with("http://"))
            .with_virtual_hosted_style_request(false)
            .with_client_options(client_options)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build s3 client: {err}")))?;

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "object store configured");
        Ok(Self::with_store(
            Arc::new(store),
            config.endpoint.clone(),
            config.bucket.clone(),
        ))
    }

    /// Wrap an existing store, e.g. `object_store::memory::InMemory` in tests.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>, endpoint: String, bucket: String) -> Self {
        Self {
            store,
            endpoint,
            bucket,
        }
    }
}

impl BlobStore for S3Blobs {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Bytes,
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut attributes = Attributes::new();
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_owned()),
            );
            let options = PutOptions {
                attributes,
                ..PutOptions::default()
            };

            self.store
                .put_opts(&ObjectPath::from(key), PutPayload::from(bytes), options)
                .await
                .map_err(|err| AppError::ImageUpload(format!("put {key}: {err}")))?;
            Ok(())
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{key}",
            self.endpoint.trim_end_matches('/'),
            self.bucket
        )
    }
}

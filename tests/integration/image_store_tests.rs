//! Integration tests for content-addressed image re-hosting.
//!
//! Images are served by a local axum server; uploads go to a recording
//! blob store so the tests can count them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use plane_relay::images::{content_digest, ImageStore};
use plane_relay::persistence::db;
use plane_relay::persistence::image_cache_repo::ImageCacheRepo;
use plane_relay::AppError;

use super::test_helpers::{spawn_image_server, ImageTable, RecordingBlobs};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-png-body";

struct Fixture {
    base: String,
    images: ImageTable,
    cache: ImageCacheRepo,
}

impl Fixture {
    async fn new() -> Self {
        let images: ImageTable = Arc::new(Mutex::new(HashMap::new()));
        let base = spawn_image_server(Arc::clone(&images)).await;
        let cache = ImageCacheRepo::new(Arc::new(db::connect_memory().await.expect("db")));
        Self {
            base,
            images,
            cache,
        }
    }

    fn serve(&self, name: &str, content_type: &'static str, bytes: &[u8]) {
        self.images
            .lock()
            .expect("lock")
            .insert(name.to_owned(), (content_type, bytes.to_vec()));
    }

    fn url(&self, name: &str) -> String {
        format!("{}/img/{name}", self.base)
    }

    fn store(&self, blobs: Arc<RecordingBlobs>) -> ImageStore {
        ImageStore::new(reqwest::Client::new(), blobs, self.cache.clone())
    }
}

#[tokio::test]
async fn same_url_twice_uploads_once() {
    let fx = Fixture::new().await;
    fx.serve("a.png", "image/png", PNG);
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let first = store.resolve(&fx.url("a.png")).await.expect("first");
    let second = store.resolve(&fx.url("a.png")).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(blobs.uploads().len(), 1);
    assert_eq!(fx.cache.count().await.expect("count"), 1);
}

#[tokio::test]
async fn identical_bytes_under_two_urls_share_one_object() {
    let fx = Fixture::new().await;
    fx.serve("a.png", "image/png", PNG);
    fx.serve("copy.png", "image/png", PNG);
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let first = store.resolve(&fx.url("a.png")).await.expect("first");
    let second = store.resolve(&fx.url("copy.png")).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(blobs.uploads().len(), 1);
}

#[tokio::test]
async fn changed_content_at_same_url_is_uploaded_again() {
    let fx = Fixture::new().await;
    fx.serve("avatar.png", "image/png", b"version one");
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let first = store.resolve(&fx.url("avatar.png")).await.expect("first");
    fx.serve("avatar.png", "image/png", b"version two");
    let second = store.resolve(&fx.url("avatar.png")).await.expect("second");

    assert_ne!(first, second);
    assert_eq!(blobs.uploads().len(), 2);
    assert_eq!(fx.cache.count().await.expect("count"), 2);
}

#[tokio::test]
async fn upload_carries_bytes_type_and_extension() {
    let fx = Fixture::new().await;
    fx.serve("a.png", "image/png", PNG);
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let hosted = store.resolve(&fx.url("a.png")).await.expect("resolve");

    let uploads = blobs.uploads();
    let upload = &uploads[0];
    assert_eq!(upload.bytes.as_ref(), PNG);
    assert_eq!(upload.content_type, "image/png");
    assert!(upload.key.ends_with(".png"), "{}", upload.key);
    assert_eq!(hosted, format!("https://cdn.test/images/{}", upload.key));
    assert_eq!(
        fx.cache.get(&content_digest(PNG)).await.expect("get"),
        Some(hosted)
    );
}

#[tokio::test]
async fn failed_upload_is_not_recorded() {
    let fx = Fixture::new().await;
    fx.serve("a.png", "image/png", PNG);

    let failing = fx.store(Arc::new(RecordingBlobs::failing()));
    let result = failing.resolve(&fx.url("a.png")).await;
    assert!(matches!(result, Err(AppError::ImageUpload(_))));
    assert_eq!(fx.cache.count().await.expect("count"), 0);

    // A later attempt with a working store uploads afresh.
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));
    store.resolve(&fx.url("a.png")).await.expect("retry");
    assert_eq!(blobs.uploads().len(), 1);
}

#[tokio::test]
async fn missing_image_is_a_fetch_error() {
    let fx = Fixture::new().await;
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let result = store.resolve(&fx.url("absent.png")).await;
    assert!(matches!(result, Err(AppError::ImageFetch(_))));
    assert!(blobs.uploads().is_empty());
}

#[tokio::test]
async fn empty_body_is_a_fetch_error() {
    let fx = Fixture::new().await;
    fx.serve("empty.png", "image/png", b"");
    let blobs = Arc::new(RecordingBlobs::default());
    let store = fx.store(Arc::clone(&blobs));

    let result = store.resolve(&fx.url("empty.png")).await;
    assert!(matches!(result, Err(AppError::ImageFetch(_))));
    assert!(blobs.uploads().is_empty());
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_error() {
    let fx = Fixture::new().await;
    let store = fx.store(Arc::new(RecordingBlobs::default()));
    let result = store.resolve("http://127.0.0.1:1/img/a.png").await;
    assert!(matches!(result, Err(AppError::ImageFetch(_))));
}

fn storage_config(db_path: &std::path::Path, storage: &str) -> plane_relay::GlobalConfig {
    let raw = format!(
        r#"
db_path = "{}"

[plane]
api_base_url = "https://plane.example.com"
{storage}
"#,
        db_path.display()
    );
    let mut config = plane_relay::GlobalConfig::from_toml_str(&raw).expect("config");
    if let Some(storage) = config.storage.as_mut() {
        storage.access_key_id = "key".into();
        storage.secret_access_key = "secret".into();
    }
    config
}

const STORAGE: &str = r#"
[storage]
bucket = "avatars"
endpoint = "http://127.0.0.1:9000"
"#;

#[tokio::test]
async fn cache_is_not_created_without_storage() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cache").join("images.db");

    let config = storage_config(&path, "");
    let opened = ImageStore::open(&config, reqwest::Client::new()).await.expect("open");
    assert!(opened.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn cache_is_not_created_when_rehosting_is_off() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("images.db");

    let config = storage_config(&path, &format!("{STORAGE}rehost_avatars = false\n"));
    let opened = ImageStore::open(&config, reqwest::Client::new()).await.expect("open");
    assert!(opened.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn rehosting_opens_the_cache_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cache").join("images.db");

    let config = storage_config(&path, STORAGE);
    let opened = ImageStore::open(&config, reqwest::Client::new())
        .await
        .expect("open")
        .expect("re-hosting enabled");
    assert!(path.exists());
    opened.db.close().await;
}

//! Unit tests for configuration parsing and validation.

use std::path::PathBuf;
use std::time::Duration;

use plane_relay::config::{Credential, GlobalConfig};
use plane_relay::AppError;

const MINIMAL: &str = r#"
[plane]
api_base_url = "https://plane.example.com/"
"#;

const FULL: &str = r#"
http_port = 8080
bind_address = "127.0.0.1"
db_path = "/var/lib/plane-relay/cache.db"
request_log_dir = "/var/log/plane-relay"
http_timeout_seconds = 5

[plane]
api_base_url = "https://api.plane.example.com"
browse_base_url = "https://app.plane.example.com/"
hostname = "plane.example.com"

[storage]
bucket = "relay-images"
endpoint = "https://s3.example.com"
rehost_avatars = false

[state_colors]
completed = ["Done", "Shipped"]
in_progress = ["Doing"]
"#;

#[test]
fn minimal_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("valid");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.db_path, PathBuf::from("image_cache.db"));
    assert_eq!(config.http_timeout(), Duration::from_secs(10));
    assert!(config.request_log_dir.is_none());
    assert!(config.storage.is_none());
    assert_eq!(config.state_colors.completed, vec!["done".to_owned()]);
    assert_eq!(config.state_colors.in_progress, vec!["in-progress".to_owned()]);
}

#[test]
fn credentials_are_never_read_from_the_file() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("valid");
    assert!(config.webhook_secret.is_empty());
    assert!(config.discord.webhook_url.is_empty());
    assert!(config.plane.api_key.is_empty());
}

#[test]
fn full_config_parses_every_section() {
    let config = GlobalConfig::from_toml_str(FULL).expect("valid");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(
        config.request_log_dir,
        Some(PathBuf::from("/var/log/plane-relay"))
    );
    assert_eq!(config.http_timeout(), Duration::from_secs(5));

    let storage = config.storage.expect("storage section");
    assert_eq!(storage.bucket, "relay-images");
    assert_eq!(storage.region, "us-east-1");
    assert!(!storage.rehost_avatars);

    assert_eq!(config.state_colors.completed.len(), 2);
    assert_eq!(config.plane.hostname.as_deref(), Some("plane.example.com"));
}

#[test]
fn browse_base_falls_back_to_api_base() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("valid");
    assert_eq!(config.plane.browse_base(), "https://plane.example.com");

    let config = GlobalConfig::from_toml_str(FULL).expect("valid");
    assert_eq!(config.plane.browse_base(), "https://app.plane.example.com");
}

#[test]
fn missing_plane_section_is_rejected() {
    let result = GlobalConfig::from_toml_str("http_port = 3000");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn zero_timeout_is_rejected() {
    let raw = format!("http_timeout_seconds = 0\n{MINIMAL}");
    assert!(matches!(
        GlobalConfig::from_toml_str(&raw),
        Err(AppError::Config(_))
    ));
}

#[test]
fn empty_api_base_is_rejected() {
    let raw = "[plane]\napi_base_url = \"  \"\n";
    assert!(matches!(
        GlobalConfig::from_toml_str(raw),
        Err(AppError::Config(_))
    ));
}

#[test]
fn empty_storage_bucket_is_rejected() {
    let raw = format!("{MINIMAL}\n[storage]\nbucket = \"\"\nendpoint = \"https://s3\"\n");
    assert!(matches!(
        GlobalConfig::from_toml_str(&raw),
        Err(AppError::Config(_))
    ));
}

#[test]
fn blank_state_keyword_is_rejected() {
    let raw = format!("{MINIMAL}\n[state_colors]\ncompleted = [\"\"]\n");
    assert!(matches!(
        GlobalConfig::from_toml_str(&raw),
        Err(AppError::Config(_))
    ));
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, FULL).expect("write config");
    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.http_port, 8080);
}

#[test]
fn load_from_missing_path_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn shipped_example_config_is_valid() {
    let config = GlobalConfig::from_toml_str(include_str!("../../config.example.toml"))
        .expect("example config parses");
    assert!(config.storage.is_some());
    assert_eq!(config.plane.browse_base(), "https://app.plane.so");
}

#[test]
fn missing_credential_names_both_sources() {
    let AppError::Config(msg) = Credential::DISCORD_WEBHOOK_URL.missing() else {
        panic!("expected a config error");
    };
    assert!(msg.starts_with("Discord webhook URL is not set"), "{msg}");
    assert!(msg.contains("plane-relay/discord_webhook_url"), "{msg}");
    assert!(msg.contains("DISCORD_WEBHOOK_URL"), "{msg}");
}

#[test]
fn credentials_use_distinct_sources() {
    let all = [
        Credential::WEBHOOK_SECRET,
        Credential::DISCORD_WEBHOOK_URL,
        Credential::PLANE_API_KEY,
        Credential::S3_ACCESS_KEY_ID,
        Credential::S3_SECRET_ACCESS_KEY,
    ];
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            assert_ne!(a.keyring_key, b.keyring_key);
            assert_ne!(a.env_key, b.env_key);
        }
    }
}

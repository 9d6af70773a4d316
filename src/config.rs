//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service under which relay credentials are stored.
const KEYRING_SERVICE: &str = "plane-relay";

/// Discord delivery settings.
///
/// The webhook URL embeds a token, so it is loaded at runtime via OS
/// keychain or environment variable rather than from the TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DiscordConfig {
    /// Incoming-webhook URL of the target channel (populated at runtime).
    #[serde(skip)]
    pub webhook_url: String,
}

/// Upstream Plane instance settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PlaneConfig {
    /// Base URL of the Plane REST API, e.g. `https://api.plane.so`.
    pub api_base_url: String,
    /// Base URL used for human-facing browse links. Defaults to `api_base_url`.
    #[serde(default)]
    pub browse_base_url: Option<String>,
    /// Hostname used to absolutize relative avatar paths.
    #[serde(default)]
    pub hostname: Option<String>,
    /// API key sent as `X-API-Key` (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

impl PlaneConfig {
    /// Base URL for browse links, without a trailing slash.
    #[must_use]
    pub fn browse_base(&self) -> &str {
        self.browse_base_url
            .as_deref()
            .unwrap_or(&self.api_base_url)
            .trim_end_matches('/')
    }
}

/// S3-compatible object store used to re-host images.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Bucket receiving uploaded images.
    pub bucket: String,
    /// Region passed to the S3 client.
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint URL; public object URLs are `endpoint/bucket/key`.
    pub endpoint: String,
    /// Route actor avatars through the image store.
    #[serde(default = "default_true")]
    pub rehost_avatars: bool,
    /// Access key id (populated at runtime).
    #[serde(skip)]
    pub access_key_id: String,
    /// Secret access key (populated at runtime).
    #[serde(skip)]
    pub secret_access_key: String,
}

/// Keywords that recolor `state` transitions on update notifications.
///
/// Matching is case-insensitive against the new state name.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StateColorConfig {
    /// States treated as completion.
    #[serde(default = "default_completed_states")]
    pub completed: Vec<String>,
    /// States treated as work in progress.
    #[serde(default = "default_in_progress_states")]
    pub in_progress: Vec<String>,
}

impl Default for StateColorConfig {
    fn default() -> Self {
        Self {
            completed: default_completed_states(),
            in_progress: default_in_progress_states(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".into()
}

fn default_true() -> bool {
    true
}

fn default_completed_states() -> Vec<String> {
    vec!["done".into()]
}

fn default_in_progress_states() -> Vec<String> {
    vec!["in-progress".into()]
}

fn default_http_port() -> u16 {
    3000
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("image_cache.db")
}

fn default_http_timeout() -> u64 {
    10
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the webhook listener.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Address the listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// `SQLite` file holding the image hash cache.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory for the JSONL request log; disabled when unset.
    #[serde(default)]
    pub request_log_dir: Option<PathBuf>,
    /// Timeout applied to every outbound HTTP call.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Webhook signing secret (populated at runtime).
    #[serde(skip)]
    pub webhook_secret: String,
    /// Discord delivery settings.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Upstream Plane instance.
    pub plane: PlaneConfig,
    /// Image re-hosting; disabled when absent.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    /// State transition recoloring keywords.
    #[serde(default)]
    pub state_colors: StateColorConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load credentials from OS keychain with env-var fallback.
    ///
    /// The webhook secret, Discord webhook URL and Plane API key are
    /// required so the relay never runs unauthenticated. Object store
    /// keys are only loaded when `[storage]` is configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required credential is missing.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.webhook_secret = load_credential(Credential::WEBHOOK_SECRET).await?;
        self.discord.webhook_url = load_credential(Credential::DISCORD_WEBHOOK_URL).await?;
        self.plane.api_key = load_credential(Credential::PLANE_API_KEY).await?;

        if let Some(storage) = self.storage.as_mut() {
            storage.access_key_id = load_credential(Credential::S3_ACCESS_KEY_ID).await?;
            storage.secret_access_key = load_credential(Credential::S3_SECRET_ACCESS_KEY).await?;
        }
        Ok(())
    }

    /// Timeout applied to every outbound HTTP call.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.http_timeout_seconds == 0 {
            return Err(AppError::Config(
                "http_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.plane.api_base_url.trim().is_empty() {
            return Err(AppError::Config("plane.api_base_url must not be empty".into()));
        }

        if let Some(storage) = &self.storage {
            if storage.bucket.trim().is_empty() || storage.endpoint.trim().is_empty() {
                return Err(AppError::Config(
                    "storage.bucket and storage.endpoint must not be empty".into(),
                ));
            }
        }

        let mut all_keywords = self
            .state_colors
            .completed
            .iter()
            .chain(&self.state_colors.in_progress);
        if all_keywords.any(|k| k.trim().is_empty()) {
            return Err(AppError::Config("state_colors keywords must not be empty".into()));
        }

        Ok(())
    }
}

/// A secret the relay reads from the keychain or the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    /// What the secret is, as shown in log and error messages.
    pub label: &'static str,
    /// Entry name under the `plane-relay` keychain service.
    pub keyring_key: &'static str,
    /// Environment variable consulted when the keychain has no value.
    pub env_key: &'static str,
}

impl Credential {
    /// Shared secret Plane signs deliveries with.
    pub const WEBHOOK_SECRET: Self = Self {
        label: "Plane webhook signing secret",
        keyring_key: "webhook_secret",
        env_key: "WEBHOOK_SECRET",
    };
    /// Target Discord channel webhook.
    pub const DISCORD_WEBHOOK_URL: Self = Self {
        label: "Discord webhook URL",
        keyring_key: "discord_webhook_url",
        env_key: "DISCORD_WEBHOOK_URL",
    };
    /// Plane REST API key used for enrichment lookups.
    pub const PLANE_API_KEY: Self = Self {
        label: "Plane API key",
        keyring_key: "plane_api_key",
        env_key: "PLANE_API_KEY",
    };
    /// Object store access key for avatar uploads.
    pub const S3_ACCESS_KEY_ID: Self = Self {
        label: "image bucket access key id",
        keyring_key: "s3_access_key_id",
        env_key: "S3_ACCESS_KEY_ID",
    };
    /// Object store secret for avatar uploads.
    pub const S3_SECRET_ACCESS_KEY: Self = Self {
        label: "image bucket secret access key",
        keyring_key: "s3_secret_access_key",
        env_key: "S3_SECRET_ACCESS_KEY",
    };

    /// Error reported when neither source has a value.
    #[must_use]
    pub fn missing(self) -> AppError {
        AppError::Config(format!(
            "{} is not set: add keychain entry {KEYRING_SERVICE}/{} or export {}",
            self.label, self.keyring_key, self.env_key
        ))
    }
}

async fn load_credential(credential: Credential) -> Result<String> {
    let key = credential.keyring_key;

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => warn!(
            credential = credential.label,
            env = credential.env_key,
            "keychain entry is empty"
        ),
        Err(keyring::Error::NoEntry) => {}
        Err(err) => warn!(
            credential = credential.label,
            env = credential.env_key,
            %err,
            "keychain unavailable"
        ),
    }

    match env::var(credential.env_key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(credential.missing()),
    }
}

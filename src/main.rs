#![forbid(unsafe_code)]

//! `plane-relay`: Plane webhook to Discord relay binary.
//!
//! Bootstraps configuration and credentials, opens the image cache when
//! avatars are re-hosted, wires the Plane, Discord and object store
//! clients, and serves the webhook listener until a shutdown signal
//! arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use plane_relay::config::GlobalConfig;
use plane_relay::discord::client::DiscordWebhook;
use plane_relay::images::ImageStore;
use plane_relay::pipeline::{Dispatcher, Enricher};
use plane_relay::plane::client::PlaneClient;
use plane_relay::reqlog::writer::JsonlRequestWriter;
use plane_relay::{http, AppError, Result};

/// Used when `RUST_LOG` is unset; silences per-statement sqlx logging.
const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

/// How long shutdown waits for queued request log entries.
const REQUEST_LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "plane-relay", about = "Plane to Discord webhook relay", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the listener port from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("plane-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Outbound clients ────────────────────────────────
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

    let tracker = Arc::new(PlaneClient::new(http_client.clone(), &config.plane));
    let mut enricher = Enricher::new(tracker, &config.plane);

    let image_cache = match ImageStore::open(&config, http_client.clone()).await? {
        Some(rehosting) => {
            enricher = enricher.with_image_store(rehosting.store);
            info!("avatar re-hosting enabled");
            Some(rehosting.db)
        }
        None => {
            info!("avatar re-hosting disabled; avatars link upstream");
            None
        }
    };

    let forwarder = Arc::new(DiscordWebhook::new(
        http_client,
        config.discord.webhook_url.clone(),
    ));
    let mut dispatcher = Dispatcher::new(Arc::clone(&config), enricher, forwarder);

    let mut request_log_task = None;
    if let Some(dir) = &config.request_log_dir {
        let (writer, task) = JsonlRequestWriter::spawn(dir.clone())?;
        dispatcher = dispatcher.with_request_log(Arc::new(writer));
        request_log_task = Some(task);
        info!(dir = %dir.display(), "request log enabled");
    }

    // ── Serve ───────────────────────────────────────────
    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let server_config = Arc::clone(&config);
    let dispatcher = Arc::new(dispatcher);
    let server = tokio::spawn(async move {
        let result = http::serve(dispatcher, &server_config, server_ct.clone()).await;
        // Wake the signal wait if the listener stops on its own.
        server_ct.cancel();
        result
    });

    tokio::select! {
        signal = shutdown_signal() => {
            info!(signal, "shutdown signal received");
            ct.cancel();
        }
        () = ct.cancelled() => {}
    }

    let result = server
        .await
        .unwrap_or_else(|err| Err(AppError::Io(format!("webhook listener task failed: {err}"))));
    if let Err(err) = &result {
        error!(%err, "webhook listener stopped with error");
    }

    // The listener task owned the last request log handle, so the
    // writer drains its queue and exits.
    if let Some(task) = request_log_task {
        match tokio::time::timeout(REQUEST_LOG_DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "request log writer failed"),
            Err(_) => warn!("request log writer did not drain before shutdown"),
        }
    }

    if let Some(db) = image_cache {
        db.close().await;
    }
    info!("plane-relay shut down");
    result
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "ctrl-c handler failed; waiting for SIGTERM only");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            warn!("SIGTERM handler unavailable; stop the relay with ctrl-c");
            ctrl_c.await;
            return "ctrl-c";
        };
        tokio::select! {
            () = ctrl_c => "ctrl-c",
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        "ctrl-c"
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}

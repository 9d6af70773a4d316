//! Axum router exposing the webhook endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GlobalConfig;
use crate::pipeline::{Delivery, Dispatcher};
use crate::{AppError, Result};

/// Build the webhook router.
///
/// `POST /webhook` takes the workspace from the payload; the two
/// slug-bearing routes supply it when the payload omits it.
#[must_use]
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/webhook/{workspace}", post(workspace_webhook))
        .route("/{workspace}/webhook", post(workspace_webhook))
        .route("/health", get(health))
        .with_state(dispatcher)
}

async fn health() -> &'static str {
    "ok"
}

async fn webhook(
    State(dispatcher): State<Arc<Dispatcher>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    respond(&dispatcher, uri.path(), None, &headers, &body).await
}

async fn workspace_webhook(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(workspace): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    respond(&dispatcher, uri.path(), Some(&workspace), &headers, &body).await
}

async fn respond(
    dispatcher: &Dispatcher,
    path: &str,
    workspace: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> (StatusCode, &'static str) {
    let outcome = dispatcher
        .handle(Delivery {
            path,
            workspace,
            headers,
            body,
        })
        .await;
    (outcome.status(), outcome.body())
}

/// Serve the webhook router until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind or the server
/// fails.
pub async fn serve(
    dispatcher: Arc<Dispatcher>,
    config: &GlobalConfig,
    ct: CancellationToken,
) -> Result<()> {
    let bind = format!("{}:{}", config.bind_address, config.http_port);
    let addr: SocketAddr = bind
        .parse()
        .map_err(|err| AppError::Config(format!("invalid bind address {bind}: {err}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {addr}: {err}")))?;

    info!(%addr, "webhook listener started");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("http server error: {err}")))?;

    info!("webhook listener shut down");
    Ok(())
}

use crate::config::{Config, REGISTER_WEBHOOK_PATH};
use crate::error::RelayError;
use crate::models::IncomingUpdate;
use crate::notes::NotesClient;
use crate::telegram::notifier::Notifier;
use crate::telegram::{formatter, handler, webhook};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Everything a request needs. Built once, never mutated.
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub notes: NotesClient,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let http = reqwest::Client::new();
        Self {
            notes: NotesClient::new(http.clone(), &config),
            notifier: Notifier::new(&config),
            http,
            config,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let webhook_path = state.config.webhook_path.clone();
    Router::new()
        .route(REGISTER_WEBHOOK_PATH, any(register_webhook))
        .route(&webhook_path, any(telegram_webhook))
        .fallback(health)
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(RelayError::Bind)?;
    let cancel_token = CancellationToken::new();
    spawn_signal_handler(cancel_token.clone());

    tracing::info!(
        addr = %listener.local_addr().map_err(RelayError::Bind)?,
        webhook_path = %config.webhook_path,
        "Relay started"
    );

    serve(listener, Arc::new(AppState::new(config)), cancel_token).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// Serves until `cancel_token` fires, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
) -> Result<(), RelayError> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
        .map_err(RelayError::Serve)
}

fn spawn_signal_handler(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            tracing::info!("Received SIGINT, shutting down...");
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, shutting down...");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to register SIGTERM handler: {e}");
                    let _ = ctrl_c.await;
                    tracing::info!("Received SIGINT, shutting down...");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        cancel_token.cancel();
    });
}

async fn register_webhook(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let origin = match webhook::request_origin(&state.config, &headers) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!("Cannot register webhook: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match webhook::register(&state.http, &state.config, &origin).await {
        Ok(body) => ([(header::CONTENT_TYPE, "text/plain;charset=utf-8")], body).into_response(),
        Err(e) => {
            tracing::error!("Webhook registration failed: {e}");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    if first_secret(&params) != Some(state.config.webhook_secret.as_str()) {
        tracing::warn!("Rejected webhook call with wrong secret");
        return (StatusCode::FORBIDDEN, "Unauthorized").into_response();
    }

    let update: IncomingUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            // Still acknowledged, otherwise Telegram keeps redelivering it.
            tracing::warn!("Malformed update body: {e}");
            return handler::WebhookAck::NoMessage.as_str().into_response();
        }
    };

    handler::handle_update(&state.notes, &state.notifier, update)
        .await
        .as_str()
        .into_response()
}

/// A repeated `secret` parameter is not an error; the first one decides.
fn first_secret(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| key == "secret")
        .map(|(_, value)| value.as_str())
}

async fn health() -> &'static str {
    formatter::HEALTH
}

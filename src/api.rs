//! HTTP handlers for the bot webhook.
//!
//! - **POST /telegram/webhook**: receives bot updates. `/start` binds the
//!   sending chat for notifications and replies with a short channel summary.
//!   Anything else is acknowledged and ignored.
//!
//! - **GET /health**: liveness probe.
//!
//! The webhook always answers `200 OK` to well-formed updates, otherwise the
//! Bot API keeps redelivering them. Failures are reported to the chat instead.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::data_sources::MetricsFetcher;
use crate::error::FetchError;
use crate::model::ChatId;
use crate::storage::Storage;
use crate::telegram::{Command, NotificationSink, Update};

/// Header carrying the secret registered with `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub fetcher: Arc<dyn MetricsFetcher>,
    pub notifier: Arc<dyn NotificationSink>,
    /// Publishes new bindings to the poll loop.
    pub binding: Arc<watch::Sender<Option<ChatId>>>,
    pub channel_id: String,
    pub webhook_secret: Option<String>,
}

/// Build the router with all routes and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/telegram/webhook", post(telegram_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /telegram/webhook - Handle a bot update.
///
/// # Request Body
///
/// A Bot API `Update` object:
///
/// ```json
/// {
///     "update_id": 10,
///     "message": { "chat": { "id": 42 }, "text": "/start" }
/// }
/// ```
///
/// # Response
///
/// `200 OK`, or `401 Unauthorized` when a secret is configured and the
/// request does not carry it.
#[instrument(skip_all, fields(update_id, chat_id))]
pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    tracing::Span::current().record("update_id", update.update_id);

    if let Some(secret) = &state.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_str()) {
            warn!("Rejected webhook call without a valid secret");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let Some(message) = update.message else {
        debug!("Ignoring update without a message");
        return StatusCode::OK;
    };
    tracing::Span::current().record("chat_id", message.chat.id);

    match message.command() {
        Some(Command::Start) => handle_start(&state, message.chat.id).await,
        None => debug!("Ignoring non-command message"),
    }

    StatusCode::OK
}

async fn handle_start(state: &AppState, chat_id: ChatId) {
    if let Err(e) = state.storage.save_chat_binding(chat_id).await {
        warn!(error = %e, "Failed to persist chat binding");
    }
    state.binding.send_replace(Some(chat_id));
    info!("Chat bound for notifications");

    let reply = match state.fetcher.channel_snapshot(&state.channel_id).await {
        Ok(snapshot) => format!(
            "Channel statistics:\nSubscribers: {}\nUploaded videos: {}",
            snapshot.subscriber_count, snapshot.video_count
        ),
        Err(FetchError::QuotaExhausted) => {
            warn!("Quota exhausted while answering /start");
            "API quota exceeded. Try again later.".to_string()
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch channel statistics for /start");
            format!("Error: {}", e)
        }
    };

    if let Err(e) = state.notifier.send(chat_id, &reply).await {
        warn!(error = %e, "Failed to reply to /start");
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

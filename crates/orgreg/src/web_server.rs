//! Webhook HTTP server.
//!
//! Telegram POSTs each update as JSON to `/{token}`. Routes:
//! - `POST /{token}` - process one update (200 processed, ignored or already
//!   seen; 400 malformed; 500 failed before anything was saved)
//! - `GET /`         - liveness string
//! - `GET /health`   - JSON health check

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::types::Update;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use orgreg_core::{Conversation, ReplyGateway};

use crate::telegram::decode_update;

/// Body of `GET /`.
pub const LIVENESS_TEXT: &str = "✅ orgreg is running, bot is online.";

/// Path Telegram delivers updates to for the given bot token.
pub fn webhook_path(token: &str) -> String {
    format!("/{}", token)
}

/// How long an accepted update id is remembered.
pub const DEDUP_TTL: Duration = Duration::from_secs(600);

/// Update ids accepted within the last `ttl`, so a redelivered update is
/// not applied twice.
pub struct RecentUpdates {
    ttl: Duration,
    seen: Mutex<HashMap<u32, Instant>>,
}

impl RecentUpdates {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Records `update_id`; returns `false` if it was already accepted.
    pub async fn accept(&self, update_id: u32) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().await;
        seen.retain(|_, at| now.duration_since(*at) < self.ttl);
        if seen.contains_key(&update_id) {
            return false;
        }
        seen.insert(update_id, now);
        true
    }

    /// Lets a failed update through again when Telegram redelivers it.
    pub async fn forget(&self, update_id: u32) {
        self.seen.lock().await.remove(&update_id);
    }
}

struct WebhookState<G> {
    conversation: Arc<Conversation<G>>,
    recent: RecentUpdates,
}

/// Builds the webhook router around an injected conversation.
pub fn create_webhook_router<G>(conversation: Arc<Conversation<G>>, path: &str) -> Router
where
    G: ReplyGateway + 'static,
{
    let state = Arc::new(WebhookState {
        conversation,
        recent: RecentUpdates::new(DEDUP_TTL),
    });

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(path, post(update_handler::<G>))
        .with_state(state)
}

/// Start the webhook server and serve until Ctrl+C.
pub async fn start_web_server(port: u16, app: Router) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting webhook server on http://{}", addr);
    log::info!("  /         - Liveness");
    log::info!("  /health   - Health check");
    log::info!("  /<token>  - Telegram updates");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C: {}", e);
            }
            log::info!("Shutting down webhook server...");
        })
        .await?;

    Ok(())
}

/// GET / - static liveness string.
async fn root_handler() -> &'static str {
    LIVENESS_TEXT
}

/// GET /health
async fn health_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// POST /{token} - decode one update and run it through the form.
async fn update_handler<G>(State(state): State<Arc<WebhookState<G>>>, body: Bytes) -> Response
where
    G: ReplyGateway + 'static,
{
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Rejected malformed webhook payload ({} bytes): {}", body.len(), e);
            return (StatusCode::BAD_REQUEST, "malformed update").into_response();
        }
    };

    let Some(inbound) = decode_update(&update) else {
        log::debug!("Ignoring update {}", update.id.0);
        return (StatusCode::OK, "OK").into_response();
    };

    if !state.recent.accept(update.id.0).await {
        log::info!("Skipping redelivered update {}", update.id.0);
        return (StatusCode::OK, "OK").into_response();
    }

    let subscriber_id = inbound.subscriber_id;
    match state.conversation.handle(inbound).await {
        Ok(outcome) => {
            log::debug!("Update {} from {}: {:?}", update.id.0, subscriber_id, outcome);
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            log::error!("Error handling update {} from {}: {}", update.id.0, subscriber_id, e);
            state.recent.forget(update.id.0).await;
            (StatusCode::INTERNAL_SERVER_ERROR, "update failed").into_response()
        }
    }
}

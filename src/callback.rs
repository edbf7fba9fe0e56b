//! Loopback HTTP listener receiving the identity provider's redirect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::session::guard::{Handoff, HandoffState, SessionGuard};
use crate::{Error, Result};

/// Shared state of the callback routes.
#[derive(Clone)]
pub struct CallbackState {
    guard: Arc<SessionGuard>,
    handoffs: mpsc::Sender<Handoff>,
}

impl CallbackState {
    /// Completed handoffs are forwarded on `handoffs`.
    pub fn new(guard: SessionGuard, handoffs: mpsc::Sender<Handoff>) -> Self {
        Self {
            guard: Arc::new(guard),
            handoffs,
        }
    }
}

/// Query parameters of the redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub redirect_to: &'static str,
    pub redirect_after_ms: u64,
}

/// GET /health - Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /auth/callback - Completes the redirect handoff.
pub async fn auth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    let handoff = state.guard.complete(params.token.as_deref()).await;

    if state.handoffs.send(handoff.clone()).await.is_err() {
        warn!("Handoff receiver dropped");
    }

    match handoff.state {
        HandoffState::Failed(reason) => Err(Error::HandoffFailed(reason)),
        ref s => {
            let nav = handoff.navigation;
            let response = CallbackResponse {
                status: s.message(),
                redirect_to: nav.map(|n| n.to.path()).unwrap_or("/"),
                redirect_after_ms: nav.map(|n| n.after.as_millis() as u64).unwrap_or(0),
            };
            Ok((StatusCode::OK, Json(response)))
        }
    }
}

/// Build the callback router.
pub fn router() -> Router<CallbackState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/callback", get(auth_callback))
}

/// Binds `127.0.0.1:port` and serves the callback routes in the background.
pub async fn serve(port: u16, state: CallbackState) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
    let addr = listener.local_addr()?;
    info!("Callback listener on http://{}", addr);

    let app = router().layer(TraceLayer::new_for_http()).with_state(state);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Callback listener error: {}", e);
        }
    });

    Ok((addr, handle))
}

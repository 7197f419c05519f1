use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use camlink_core::{ConnectivityState, ControlEvent, SessionManager};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Inbound platform surface: teleop events and the config-change signal
/// arrive here.
#[derive(Clone)]
pub struct AppState {
    pub teleop_tx: mpsc::Sender<ControlEvent>,
    pub sessions: Arc<SessionManager>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/teleop", post(accept_teleop))
        .route("/api/v1/config/reload", post(reload_config))
        .route("/api/v1/state", get(adapter_state))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn accept_teleop(
    State(state): State<AppState>,
    Json(event): Json<ControlEvent>,
) -> StatusCode {
    debug!(channel = %event.channel, "Teleop event received");
    match state.teleop_tx.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// The platform signalled a settings change: full refresh + reconnect.
// Runs in the background; reconnect is single-flight so repeated signals
// collapse into one attempt.
async fn reload_config(State(state): State<AppState>) -> StatusCode {
    info!("Config change signalled; restarting device session");
    tokio::spawn(async move {
        let _ = state.sessions.reconnect().await;
    });
    StatusCode::ACCEPTED
}

async fn adapter_state(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.sessions.connectivity() == ConnectivityState::Connected;
    Json(serde_json::json!({
        "online": true,
        "connected": connected,
    }))
}

//! HTTP status endpoint — exposes hub statistics as JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use hub_services::{Credentials, Hub, HubSnapshot, UserState};

#[derive(Clone)]
pub struct StatusState {
    pub hub: Arc<Hub>,
}

// ── /stats ────────────────────────────────────────────────────────────────────

async fn handle_stats(State(state): State<StatusState>) -> Json<HubSnapshot> {
    Json(state.hub.snapshot().await)
}

// ── /users ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserInfo>,
}

#[derive(Serialize)]
pub struct UserInfo {
    pub sid:          String,
    pub nick:         String,
    pub credentials:  Credentials,
    pub state:        UserState,
    pub shared_size:  u64,
    pub shared_files: u64,
}

async fn handle_users(State(state): State<StatusState>) -> Json<UsersResponse> {
    let users = state
        .hub
        .registry()
        .sessions()
        .await
        .iter()
        .map(|u| UserInfo {
            sid:          u.sid().to_string(),
            nick:         u.nick().to_string(),
            credentials:  u.credentials(),
            state:        u.state(),
            shared_size:  u.limits().shared_size,
            shared_files: u.limits().shared_files,
        })
        .collect();

    Json(UsersResponse { users })
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn app(state: StatusState) -> Router {
    Router::new()
        .route("/stats", get(handle_stats))
        .route("/users", get(handle_users))
        .with_state(state)
}

/// Serve until a shutdown signal arrives. Drops its hub handle on return.
pub async fn serve(
    state: StatusState,
    port: u16,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "status endpoint listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}

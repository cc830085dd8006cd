// ==============================================================================
// read-only json api
// ==============================================================================
// exposes the read model to whatever renders the dashboard. nothing here can
// mutate the store; handlers only take snapshots.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::config::ThresholdConfig;
use crate::domain::DashboardStatus;
use crate::evaluator::{evaluate, DashboardView};
use crate::store::StateStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub thresholds: Arc<ThresholdConfig>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: DashboardStatus,
    pub last_error: Option<String>,
    pub revision: u64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api", get(dashboard_handler))
        .route("/api/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// serve until `shutdown` is cancelled
pub async fn run_server(addr: SocketAddr, state: ApiState, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Dashboard API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// full read model: status plus one card per parameter
async fn dashboard_handler(State(state): State<ApiState>) -> Json<DashboardView> {
    let snapshot = state.store.snapshot().await;
    Json(evaluate(&snapshot, &state.thresholds))
}

async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    // revision first: a change racing in after it only makes the revision look stale
    let revision = state.store.revision();
    let snapshot = state.store.snapshot().await;
    Json(StatusResponse {
        status: snapshot.status,
        last_error: snapshot.last_error,
        revision,
    })
}

async fn health_handler() -> &'static str {
    "ok"
}

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::info;

use ephemera_lifecycle::{LifecycleError, MetricsSnapshot, SweepReport};

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Grants currently held by the ledger, including expired ones the
    /// janitor has not reached yet.
    pub live_grants: usize,
    pub metrics: MetricsSnapshot,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServerError> {
    let live_grants = state
        .coordinator
        .ledger()
        .live_count()
        .await
        .map_err(LifecycleError::from)?;
    Ok(Json(HealthResponse {
        status: "ok",
        live_grants,
        metrics: state.coordinator.metrics().snapshot(),
    }))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    /// Expired grants removed by this sweep.
    pub cleaned: u64,
    #[serde(flatten)]
    pub report: SweepReport,
}

/// `POST /api/cleanup`: run one janitor sweep now.
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>, ServerError> {
    let report = state.janitor.sweep().await?;
    info!(cleaned = report.reclaimed, "manual cleanup complete");
    Ok(Json(CleanupResponse {
        cleaned: report.reclaimed,
        report,
    }))
}

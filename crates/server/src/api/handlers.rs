use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use seedarr_core::SchedulerStatus;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Scheduler state and record counts per lifecycle state.
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    /// Whether the job loops are enabled in config.
    pub enabled: bool,
    #[serde(flatten)]
    pub scheduler: SchedulerStatus,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        enabled: state.config().scheduler.enabled,
        scheduler: state.scheduler().status(),
    })
}

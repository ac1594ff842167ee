use axum::{Json, extract::State, http::StatusCode};
use sentinel_core::HazardEvent;
use sentinel_core::sync::RunReport;
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;
use crate::errors::{AppError, AppResult};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Current contents of the active hazard collection.
pub async fn list_hazards_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<HazardEvent>>> {
    let hazards = state.repository.list_all().await?;
    Ok(Json(hazards))
}

pub async fn last_sync_handler(State(state): State<AppState>) -> AppResult<Json<RunReport>> {
    state
        .scheduler
        .last_report()
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("no sync run has completed yet"))
}

pub async fn trigger_sync_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("manual sync requested");
    state.scheduler.request_run();
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "phase": state.scheduler.pipeline().phase(),
        })),
    )
}

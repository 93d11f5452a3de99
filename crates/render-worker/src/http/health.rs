//! Liveness probe (§6.1). Deliberately shallow — a full round-trip to
//! Redis/Postgres/object storage belongs to a readiness check this worker
//! doesn't expose, since the only consumer is an orchestrator deciding
//! whether to restart the process, not whether to route traffic to it.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_connected: bool,
    pub busy: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_connected = state.queue.check_connectivity().await.is_ok();
    Json(HealthResponse {
        status: "ok",
        queue_connected,
        busy: state.busy.is_busy(),
    })
}

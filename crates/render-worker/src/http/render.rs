//! `POST /render` (§6.1): lets the authoring app push a job onto the same
//! queue the Job Acquirer already consumes from, instead of waiting for
//! the next poll cycle to notice a newly queued row. The response is
//! fire-and-forget — the caller learns the outcome through the job
//! record's state, not through this request.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use render_models::{JobId, ProjectId};
use render_queue::RenderJobMessage;

use super::state::AppState;

#[derive(Deserialize)]
pub struct RenderRequest {
    job_id: String,
    project_id: String,
}

#[derive(Serialize)]
struct RenderAccepted {
    status: &'static str,
    job_id: String,
}

#[derive(Serialize)]
struct RenderError {
    detail: String,
}

pub async fn render(State(state): State<AppState>, Json(body): Json<RenderRequest>) -> Response {
    if body.job_id.trim().is_empty() || body.project_id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(RenderError { detail: "jobId and projectId are required".to_string() })).into_response();
    }

    let job_id = JobId::from_string(body.job_id);
    let message = RenderJobMessage::new(job_id.clone(), ProjectId::from_string(body.project_id));

    match state.queue.enqueue(message).await {
        Ok(_) => (StatusCode::ACCEPTED, Json(RenderAccepted { status: "accepted", job_id: job_id.as_str().to_string() })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(RenderError { detail: e.to_string() })).into_response(),
    }
}

//! `POST /generate-renditions` (§4.6.1, §6.1): fire-and-forget transcode
//! request for a clip into one or more target resolutions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use render_models::ClipId;

use crate::renditions::RenditionRequest;

use super::state::AppState;

#[derive(Deserialize)]
pub struct GenerateRenditionsRequest {
    clip_id: String,
    source_url: String,
    target_resolutions: Vec<String>,
}

#[derive(Serialize)]
struct RenditionsAccepted {
    status: &'static str,
    clip_id: String,
}

#[derive(Serialize)]
struct RenditionsError {
    detail: String,
}

pub async fn generate_renditions(State(state): State<AppState>, Json(body): Json<GenerateRenditionsRequest>) -> Response {
    if body.clip_id.trim().is_empty() || body.source_url.trim().is_empty() || body.target_resolutions.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RenditionsError { detail: "clipId, sourceUrl, and at least one target resolution are required".to_string() }),
        )
            .into_response();
    }

    let clip_id = ClipId::from_string(body.clip_id);
    let request = RenditionRequest {
        clip_id: clip_id.clone(),
        source_url: body.source_url,
        target_resolutions: body.target_resolutions,
    };

    let generator = state.rendition_generator.clone();
    tokio::spawn(async move { generator.generate(request).await });

    (StatusCode::ACCEPTED, Json(RenditionsAccepted { status: "accepted", clip_id: clip_id.as_str().to_string() })).into_response()
}

//! Clip renditions: transcoded derivatives produced by the fire-and-forget
//! `/generate-renditions` surface (§6). Kept separate from `RenderJob` — see
//! DESIGN.md for why.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ClipId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRendition {
    pub clip_id: ClipId,
    pub resolution: String,
    pub url: String,
    pub object_key: String,
    pub created_at: DateTime<Utc>,
}

impl ClipRendition {
    pub fn new(clip_id: ClipId, resolution: impl Into<String>, url: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            clip_id,
            resolution: resolution.into(),
            url: url.into(),
            object_key: object_key.into(),
            created_at: Utc::now(),
        }
    }
}

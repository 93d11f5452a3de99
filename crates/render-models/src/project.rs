//! The Project entity: the durable container a RenderJob renders into.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::job::JobState;
use crate::scene::CropMode;
use crate::timeline::{Resolution, Timeline};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub resolution: Resolution,
    pub fps: f64,
    #[serde(default)]
    pub aspect_mode: CropMode,
    pub timeline: Timeline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Mirrors the latest RenderJob's state.
    #[serde(default)]
    pub status: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Apply a finished render's outputs, mirroring the RenderJob's terminal
    /// state per §4.6.
    pub fn mark_finished(mut self, output_url: impl Into<String>, thumbnail_url: impl Into<String>) -> Self {
        self.output_url = Some(output_url.into());
        self.thumbnail_url = Some(thumbnail_url.into());
        self.status = JobState::Finished;
        self.updated_at = Utc::now();
        self
    }

    pub fn mark_failed(mut self) -> Self {
        self.status = JobState::Failed;
        self.updated_at = Utc::now();
        self
    }
}

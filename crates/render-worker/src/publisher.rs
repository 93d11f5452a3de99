//! The Publisher (§4.6): uploads a finished render's outputs to object
//! storage and builds the permanent URLs written back to the job/project
//! records. Also backs `/generate-renditions` (§4.6.1), which reuses the
//! same upload primitive against a different key layout.

use std::path::Path;

use uuid::Uuid;

use render_db::RenditionRepository;
use render_models::{ClipId, ClipRendition, ProjectId};
use render_storage::keys::{clip_rendition_key, render_output_key, render_thumbnail_key};
use render_storage::ObjectStore;

use crate::error::WorkerResult;

pub struct PublishedRender {
    pub output_url: String,
    pub thumbnail_url: String,
}

#[derive(Clone)]
pub struct Publisher {
    storage: ObjectStore,
    renditions: RenditionRepository,
}

impl Publisher {
    pub fn new(storage: ObjectStore, renditions: RenditionRepository) -> Self {
        Self { storage, renditions }
    }

    /// A fresh id scoping one render's output + thumbnail under the same
    /// prefix, so callers that need the two uploads as separate checkpoints
    /// (§4.2) still end up with a matched pair of keys.
    pub fn new_render_uuid() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn upload_render_video(&self, project_id: &ProjectId, render_uuid: &str, video_path: &Path) -> WorkerResult<String> {
        let key = render_output_key(project_id, render_uuid);
        self.storage.upload_file(video_path, &key, "video/mp4").await?;
        Ok(self.storage.public_url(&key))
    }

    pub async fn upload_render_thumbnail(&self, project_id: &ProjectId, render_uuid: &str, thumbnail_path: &Path) -> WorkerResult<String> {
        let key = render_thumbnail_key(project_id, render_uuid);
        self.storage.upload_file(thumbnail_path, &key, "image/jpeg").await?;
        Ok(self.storage.public_url(&key))
    }

    /// Uploads the finished MP4 and its thumbnail under a fresh uuid scoped
    /// to the project, returning their public URLs, for callers that don't
    /// need the two uploads as separate checkpoints.
    pub async fn publish_render(&self, project_id: &ProjectId, video_path: &Path, thumbnail_path: &Path) -> WorkerResult<PublishedRender> {
        let render_uuid = Self::new_render_uuid();
        let output_url = self.upload_render_video(project_id, &render_uuid, video_path).await?;
        let thumbnail_url = self.upload_render_thumbnail(project_id, &render_uuid, thumbnail_path).await?;
        Ok(PublishedRender { output_url, thumbnail_url })
    }

    /// Uploads one transcoded resolution for `/generate-renditions` and
    /// records it. Each resolution is independent — a failure here doesn't
    /// roll back resolutions already published, matching the fire-and-forget
    /// contract of that endpoint.
    pub async fn publish_rendition(&self, clip_id: &ClipId, resolution: &str, video_path: &Path) -> WorkerResult<ClipRendition> {
        let key = clip_rendition_key(clip_id.as_str(), resolution);
        self.storage.upload_file(video_path, &key, "video/mp4").await?;

        let rendition = ClipRendition { clip_id: clip_id.clone(), resolution: resolution.to_string(), url: self.storage.public_url(&key), object_key: key, created_at: chrono::Utc::now() };
        self.renditions.upsert(&rendition).await?;
        Ok(rendition)
    }
}

//! Rendition generation (§4.6.1): transcodes one source clip into each
//! requested resolution and publishes the result. This is the only place
//! the worker touches the clip-rendition surface the pre-processing
//! service otherwise owns on its own schedule; here it's invoked directly
//! via `/generate-renditions` instead of running as part of a render job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use render_media::{EncodeCommand, Fetcher, FfmpegRunner, InputSpec};
use render_models::{Asset, AssetId, AssetKind, AssetLocation, ClipId};

use crate::error::{WorkerError, WorkerResult};
use crate::publisher::Publisher;

pub struct RenditionRequest {
    pub clip_id: ClipId,
    pub source_url: String,
    pub target_resolutions: Vec<String>,
}

#[derive(Clone)]
pub struct RenditionGenerator {
    fetcher: Fetcher,
    publisher: Publisher,
    work_root: PathBuf,
}

impl RenditionGenerator {
    pub fn new(fetcher: Fetcher, publisher: Publisher, work_root: PathBuf) -> Self {
        Self { fetcher, publisher, work_root }
    }

    /// Generates every requested resolution, logging and continuing past
    /// per-resolution failures rather than aborting the whole request —
    /// this runs fire-and-forget off the HTTP response, so there's no
    /// caller left to report a partial failure to.
    pub async fn generate(&self, request: RenditionRequest) {
        let work_dir = self.work_root.join(format!("rendition-{}", Uuid::new_v4()));
        if let Err(e) = tokio::fs::create_dir_all(&work_dir).await {
            warn!("failed to create rendition work dir: {}", e);
            return;
        }

        for resolution in &request.target_resolutions {
            match self.generate_one(&request.clip_id, &request.source_url, resolution, &work_dir).await {
                Ok(()) => info!("published {} rendition for clip {}", resolution, request.clip_id.as_str()),
                Err(e) => warn!("rendition generation failed for clip {} at {}: {}", request.clip_id.as_str(), resolution, e),
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove rendition work dir {}: {}", work_dir.display(), e);
            }
        }
    }

    async fn generate_one(&self, clip_id: &ClipId, source_url: &str, resolution: &str, work_dir: &Path) -> WorkerResult<()> {
        let (width, height) = parse_resolution(resolution)?;

        let source_asset = Asset {
            id: AssetId::new(),
            kind: AssetKind::Video,
            location: AssetLocation::PublicUrl { url: source_url.to_string() },
            filename: None,
            mime: None,
        };

        let downloaded = self.fetcher.fetch_all(std::slice::from_ref(&source_asset), work_dir).await?;
        let source_path = downloaded
            .get(source_asset.id.as_str())
            .ok_or_else(|| WorkerError::asset_download_failed(source_url.to_string()))?;

        let output_path = work_dir.join(format!("{}.mp4", resolution));
        let cmd = EncodeCommand::new(&output_path)
            .add_input(InputSpec::new(source_path))
            .filter_complex(format!("[0:v]scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2[v]"))
            .map("[v]")
            .map("0:a?")
            .video_codec("libx264")
            .audio_codec("aac")
            .crf(23)
            .preset("medium")
            .audio_bitrate_kbps(128)
            .no_subtitles_or_data()
            .faststart()
            .pixel_format("yuv420p");

        let runner = FfmpegRunner::new();
        runner.run(&cmd).await?;

        self.publisher.publish_rendition(clip_id, resolution, &output_path).await?;
        Ok(())
    }
}

/// Parses a `WIDTHxHEIGHT` resolution string, e.g. `1280x720`.
fn parse_resolution(resolution: &str) -> WorkerResult<(u32, u32)> {
    let (w, h) = resolution
        .split_once('x')
        .ok_or_else(|| WorkerError::config_error(format!("invalid resolution '{resolution}', expected WIDTHxHEIGHT")))?;
    let width: u32 = w.parse().map_err(|_| WorkerError::config_error(format!("invalid width in resolution '{resolution}'")))?;
    let height: u32 = h.parse().map_err(|_| WorkerError::config_error(format!("invalid height in resolution '{resolution}'")))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_resolutions() {
        assert_eq!(parse_resolution("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
    }

    #[test]
    fn rejects_malformed_resolution() {
        assert!(parse_resolution("1280").is_err());
        assert!(parse_resolution("widexhigh").is_err());
    }
}

//! The Job Controller: `render(job_id, project_id)` orchestration (§4.2).
//! Owns one working directory per job exclusively and walks the exact
//! checkpoint schedule — fetch, compile, encode, thumbnail, publish —
//! writing progress at every stop and a terminal `finished`/`failed`
//! record no matter which step raises.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use render_db::{JobRepository, ProjectRepository};
use render_media::{compile, AssetPaths, EncodeProgress, Fetcher, FfmpegRunner};
use render_models::{Asset, AssetId, AssetKind, AssetLocation, JobId, ProjectId, RenderJob, SceneSource, Timeline};
use render_queue::ProgressChannel;
use render_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::publisher::Publisher;
use crate::working_dir::WorkingDir;

/// Where the linear 15-40 asset-download band starts and ends (§4.2).
const DOWNLOAD_START_PERCENT: u8 = 15;
const DOWNLOAD_END_PERCENT: u8 = 40;
/// Where the linear 45-88 encode band starts and ends (§4.2).
const ENCODE_START_PERCENT: u8 = 45;
const ENCODE_END_PERCENT: u8 = 88;
/// Minimum jump between mid-encode progress pushes (§4.2: "throttle to
/// roughly 1 update per 5% change").
const ENCODE_PROGRESS_STEP: u8 = 5;

pub struct Controller {
    jobs: JobRepository,
    projects: ProjectRepository,
    storage: ObjectStore,
    progress: ProgressChannel,
    fetcher: Fetcher,
    publisher: Publisher,
    work_root: std::path::PathBuf,
    presign_expiry: Duration,
}

impl Controller {
    pub fn new(
        jobs: JobRepository,
        projects: ProjectRepository,
        storage: ObjectStore,
        progress: ProgressChannel,
        fetcher: Fetcher,
        publisher: Publisher,
        work_root: std::path::PathBuf,
        presign_expiry: Duration,
    ) -> Self {
        Self { jobs, projects, storage, progress, fetcher, publisher, work_root, presign_expiry }
    }

    /// Runs one job end to end. Always leaves the job/project records in a
    /// terminal state and always removes the working directory, regardless
    /// of which step fails.
    pub async fn render(&self, job_id: JobId, project_id: ProjectId) -> WorkerResult<()> {
        let logger = JobLogger::new(&job_id, "render");
        logger.log_start();

        let work_dir = WorkingDir::create(&self.work_root, &job_id).await.map_err(|e| WorkerError::config_error(e.to_string()))?;

        let mut job = self.jobs.get(&job_id).await?.start();
        self.checkpoint(&mut job, 0, "Starting").await?;

        let outcome = self.render_inner(&project_id, &mut job, &work_dir).await;
        work_dir.finish().await;

        match outcome {
            Ok((output_url, thumbnail_url, duration_sec, byte_size)) => {
                job = job.finish(output_url.clone(), thumbnail_url.clone(), duration_sec, byte_size);
                self.jobs.finish(&job).await?;
                self.projects.mark_finished(&project_id, &output_url, &thumbnail_url).await?;
                self.progress.done(&job_id, output_url, thumbnail_url).await.ok();
                logger.log_completion("render finished");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.jobs.fail(&job_id, &message).await.ok();
                self.projects.mark_failed(&project_id).await.ok();
                self.progress.error(&job_id, &message).await.ok();
                logger.log_error(&message);
                Err(e)
            }
        }
    }

    /// The happy path. Split out so `render` can guarantee working-dir
    /// cleanup and a terminal write regardless of where this returns.
    async fn render_inner(
        &self,
        project_id: &ProjectId,
        job: &mut RenderJob,
        work_dir: &WorkingDir,
    ) -> WorkerResult<(String, String, f64, u64)> {
        let project = self.projects.get(project_id).await?;
        self.checkpoint(job, 5, "Project fetched").await?;

        let timeline = &project.timeline;
        if timeline.scenes.is_empty() {
            return Err(WorkerError::NoScenes);
        }

        let fetch_plan = self.resolve_fetch_plan(timeline).await?;
        self.checkpoint(job, 10, "Downloads prepared").await?;

        let downloaded = self
            .fetcher
            .fetch_all(&fetch_plan, work_dir.path())
            .await
            .map_err(|e| WorkerError::asset_download_failed(e.to_string()))?;
        self.checkpoint(job, DOWNLOAD_START_PERCENT, "Assets downloading").await?;
        self.checkpoint(job, DOWNLOAD_END_PERCENT, "Assets downloaded").await?;

        let mut paths = AssetPaths::new();
        for (key, path) in &downloaded {
            paths.insert(key.clone(), path.clone());
        }

        self.checkpoint(job, 42, "Compilation").await?;
        let output_path = work_dir.path().join("output.mp4");
        let cmd = compile(timeline, &paths, &output_path)?;

        self.checkpoint(job, ENCODE_START_PERCENT, "Encoding").await?;
        self.run_encode(&cmd, job, timeline).await?;
        self.checkpoint(job, ENCODE_END_PERCENT, "Encoding complete").await?;

        self.checkpoint(job, 90, "Thumbnail").await?;
        let thumbnail_path = work_dir.path().join("thumbnail.jpg");
        render_media::generate_thumbnail(&output_path, &thumbnail_path)
            .await
            .map_err(|e| WorkerError::EngineFailed { stderr_tail: e.to_string(), exit_code: None })?;

        let render_uuid = Publisher::new_render_uuid();

        let output_url = self.publisher.upload_render_video(project_id, &render_uuid, &output_path).await?;
        self.checkpoint(job, 93, "Video uploaded").await?;

        let thumbnail_url = self.publisher.upload_render_thumbnail(project_id, &render_uuid, &thumbnail_path).await?;
        self.checkpoint(job, 96, "Thumbnail uploaded").await?;

        self.checkpoint(job, 98, "Finalizing").await?;

        let byte_size = tokio::fs::metadata(&output_path).await.map(|m| m.len()).unwrap_or(0);
        let duration_sec = estimate_output_seconds(timeline);

        Ok((output_url, thumbnail_url, duration_sec, byte_size))
    }

    /// Runs the encode, forwarding throttled progress updates from the
    /// ffmpeg stderr reader to the job record and progress channel. The
    /// callback ffmpeg drives is synchronous, so parsed progress is handed
    /// off over a channel to an async task that does the actual writes —
    /// the same stderr-reader-plus-forwarding shape the engine runner
    /// itself uses internally (§4.5.1).
    async fn run_encode(&self, cmd: &render_media::EncodeCommand, job: &mut RenderJob, timeline: &Timeline) -> WorkerResult<()> {
        let estimated = estimate_output_seconds(timeline).max(0.1);
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
        let last_sent = Arc::new(AtomicU8::new(ENCODE_START_PERCENT));

        let on_progress = {
            let last_sent = last_sent.clone();
            move |p: EncodeProgress| {
                let span = (ENCODE_END_PERCENT - ENCODE_START_PERCENT) as f64;
                let fraction = (p.elapsed_sec / estimated).clamp(0.0, 1.0);
                let percent = ENCODE_START_PERCENT + (fraction * span) as u8;
                let prev = last_sent.load(Ordering::Relaxed);
                if percent >= prev.saturating_add(ENCODE_PROGRESS_STEP) {
                    last_sent.store(percent, Ordering::Relaxed);
                    let _ = tx.send(percent);
                }
            }
        };

        let forwarder = {
            let jobs = self.jobs.clone();
            let progress = self.progress.clone();
            let job_id = job.id.clone();
            tokio::spawn(async move {
                while let Some(percent) = rx.recv().await {
                    let _ = jobs.update_progress(&job_id, percent).await;
                    let _ = progress.progress(&job_id, percent).await;
                }
            })
        };

        let runner = FfmpegRunner::new();
        let result = runner.run_with_progress(cmd, on_progress).await;
        let _ = forwarder.await;

        result.map_err(|e| match e {
            render_media::MediaError::EngineFailed { stderr_tail, exit_code } => WorkerError::EngineFailed { stderr_tail, exit_code },
            other => WorkerError::Media(other),
        })?;

        job.progress = job.progress.max(last_sent.load(Ordering::Relaxed));
        Ok(())
    }

    /// Writes a checkpoint: appends a log line, advances progress, and
    /// persists/publishes both (§4.2.1).
    async fn checkpoint(&self, job: &mut RenderJob, percent: u8, message: &str) -> WorkerResult<()> {
        *job = job.clone().append_log(message).with_progress(percent);
        self.jobs.append_log(job).await?;
        self.jobs.update_progress(&job.id, percent).await?;
        self.progress.progress(&job.id, percent).await.ok();
        self.progress.log(&job.id, message).await.ok();
        Ok(())
    }

    /// Resolves every asset the timeline references into one fetch plan:
    /// the declared catalog (presigning any object-store entries since the
    /// Fetcher only speaks fetchable URLs), plus a synthetic entry for each
    /// raw clip-url scene source and for `Music`'s own URL when it has no
    /// backing asset id.
    async fn resolve_fetch_plan(&self, timeline: &Timeline) -> WorkerResult<Vec<Asset>> {
        let mut plan = Vec::with_capacity(timeline.assets.len());
        let mut seen: HashSet<String> = HashSet::new();

        for asset in &timeline.assets {
            let resolved = self.resolve_location(asset).await?;
            seen.insert(resolved.id.to_string());
            plan.push(resolved);
        }

        for scene in &timeline.scenes {
            if let SceneSource::Clip { clip_url, .. } = &scene.source {
                if seen.insert(clip_url.clone()) {
                    plan.push(Asset {
                        id: AssetId::from_string(clip_url.clone()),
                        kind: AssetKind::Video,
                        location: AssetLocation::PublicUrl { url: clip_url.clone() },
                        filename: None,
                        mime: None,
                    });
                }
            }
        }

        if let Some(music) = &timeline.music {
            let key = music.path_key();
            if seen.insert(key.clone()) {
                plan.push(Asset {
                    id: AssetId::from_string(key),
                    kind: AssetKind::Audio,
                    location: AssetLocation::PublicUrl { url: music.url.clone() },
                    filename: None,
                    mime: None,
                });
            }
        }

        Ok(plan)
    }

    async fn resolve_location(&self, asset: &Asset) -> WorkerResult<Asset> {
        match &asset.location {
            AssetLocation::PublicUrl { .. } => Ok(asset.clone()),
            AssetLocation::ObjectKey { key } => {
                let url = self.storage.presign_get(key, self.presign_expiry).await?;
                Ok(Asset { location: AssetLocation::PublicUrl { url }, ..asset.clone() })
            }
        }
    }
}

/// Rough total output length, used only to scale the mid-encode progress
/// band — not a substitute for the Compiler's own duration reconciliation,
/// which this never needs to match exactly (§9: progress parsing is
/// best-effort with no correctness dependency).
fn estimate_output_seconds(timeline: &Timeline) -> f64 {
    let visual: f64 = timeline.scenes.iter().map(|s| s.duration_sec).sum();
    visual.max(timeline.rendering.voiceover_duration_sec.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_models::{Codec, Export, Resolution, Scene, SceneKind, CropMode, Transition};

    fn scene(duration_sec: f64) -> Scene {
        Scene {
            id: "s1".to_string(),
            source: SceneSource::None,
            kind: SceneKind::Video,
            in_sec: 0.0,
            out_sec: duration_sec,
            duration_sec,
            crop_mode: CropMode::Cover,
            text_overlay: None,
            transition_out: Transition::None,
            transition_duration_sec: 0.0,
            is_talking_head: false,
        }
    }

    fn timeline(scenes: Vec<Scene>) -> Timeline {
        Timeline {
            version: 1,
            resolution: Resolution::portrait_1080x1920(),
            fps: 30.0,
            assets: Vec::new(),
            scenes,
            music: None,
            voiceover: None,
            audio_tracks: Vec::new(),
            sound_effects: Vec::new(),
            image_overlays: Vec::new(),
            text_overlays: Vec::new(),
            captions: None,
            brand: None,
            export: Export { codec: Codec::H264, bitrate_mbps: None, crf: Some(23), audio_kbps: 128 },
            rendering: Default::default(),
        }
    }

    #[test]
    fn estimate_falls_back_to_scene_sum_without_voiceover() {
        let t = timeline(vec![scene(3.0), scene(2.0)]);
        assert_eq!(estimate_output_seconds(&t), 5.0);
    }

    #[test]
    fn estimate_prefers_voiceover_when_longer() {
        let mut t = timeline(vec![scene(3.0)]);
        t.rendering.voiceover_duration_sec = Some(6.5);
        assert_eq!(estimate_output_seconds(&t), 6.5);
    }
}

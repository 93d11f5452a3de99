//! `WorkerError` composes the lower crates' error types and adds the
//! classification methods the Controller uses to decide whether a failed
//! job is worth a future re-enqueue (§7.1). This worker never retries
//! in-process (§5) — the classification only informs what the caller of
//! `/render` or a future operator tool should do with a failed job.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("no scenes in timeline")]
    NoScenes,

    #[error("failed to download asset: {0}")]
    AssetDownloadFailed(String),

    #[error("ffmpeg failed (exit {exit_code:?}): {stderr_tail}")]
    EngineFailed { stderr_tail: String, exit_code: Option<i32> },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("media error: {0}")]
    Media(#[from] render_media::MediaError),

    #[error("storage error: {0}")]
    Storage(#[from] render_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] render_queue::QueueError),

    #[error("database error: {0}")]
    Db(#[from] render_db::DbError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn asset_download_failed(msg: impl Into<String>) -> Self {
        Self::AssetDownloadFailed(msg.into())
    }

    /// Transient failures a future attempt might not hit again: network
    /// blips, storage hiccups, queue connectivity. A rendering defect
    /// (missing scenes, a malformed timeline) is not retryable no matter
    /// how many times it runs.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::AssetDownloadFailed(_) => true,
            WorkerError::Media(render_media::MediaError::DownloadFailed(_)) => true,
            WorkerError::Media(render_media::MediaError::Timeout(_)) => true,
            WorkerError::Storage(_) => true,
            WorkerError::Queue(_) => true,
            WorkerError::Db(_) => true,
            _ => false,
        }
    }

    /// Errors that reflect a defect in the timeline or environment rather
    /// than a transient condition, and won't resolve themselves on retry.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::NoScenes
                | WorkerError::ConfigError(_)
                | WorkerError::Media(render_media::MediaError::NoScenes)
                | WorkerError::Media(render_media::MediaError::FfmpegNotFound)
                | WorkerError::Media(render_media::MediaError::FfprobeNotFound)
        )
    }

    /// A short, loggable/persistable description, used as the `error`
    /// field written to the job/project record on failure.
    pub fn stderr_tail(&self) -> Option<&str> {
        match self {
            WorkerError::EngineFailed { stderr_tail, .. } => Some(stderr_tail),
            WorkerError::Media(render_media::MediaError::EngineFailed { stderr_tail, .. }) => Some(stderr_tail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scenes_is_permanent() {
        assert!(WorkerError::NoScenes.is_permanent_failure());
        assert!(!WorkerError::NoScenes.is_retryable());
    }

    #[test]
    fn asset_download_failure_is_retryable() {
        let err = WorkerError::asset_download_failed("timed out");
        assert!(err.is_retryable());
        assert!(!err.is_permanent_failure());
    }

    #[test]
    fn engine_failure_exposes_stderr_tail() {
        let err = WorkerError::EngineFailed { stderr_tail: "moov atom not found".to_string(), exit_code: Some(1) };
        assert_eq!(err.stderr_tail(), Some("moov atom not found"));
    }
}

//! Media/subprocess/download error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg binary not found on PATH")]
    FfmpegNotFound,

    #[error("ffprobe binary not found on PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed (exit {exit_code:?}): {stderr_tail}")]
    EngineFailed {
        stderr_tail: String,
        exit_code: Option<i32>,
    },

    #[error("ffmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("ffmpeg run was cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("too many redirects resolving {0}")]
    TooManyRedirects(String),

    #[error("consent page handshake failed for {0}")]
    ConsentPageFailed(String),

    #[error("downloaded file is empty or HTML masquerading as media: {0}")]
    EmptyOrHtmlContent(String),

    #[error("no scenes in timeline")]
    NoScenes,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("presign failed: {0}")]
    PresignFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MediaError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn consent_page_failed(msg: impl Into<String>) -> Self {
        Self::ConsentPageFailed(msg.into())
    }

    pub fn invalid_timestamp(msg: impl Into<String>) -> Self {
        Self::InvalidTimestamp(msg.into())
    }
}

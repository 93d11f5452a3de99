//! Redis-backed job queue and progress checkpoint channel.

pub mod error;
pub mod job;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::RenderJobMessage;
pub use progress::{ProgressChannel, ProgressEvent, HEARTBEAT_TTL_SECS, JOB_STATUS_TTL_SECS, PROGRESS_HISTORY_TTL_SECS};
pub use queue::{QueueConfig, RenderQueue};

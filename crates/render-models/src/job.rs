//! RenderJob: the unit of work the Job Controller carries end to end.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, ProjectId};

/// `queued → running → {finished, failed}`. Never transitions out of a
/// terminal state (§8 invariant 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    /// Whether `self -> next` is a legal state-machine edge.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running) | (Running, Finished) | (Running, Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    pub id: JobId,
    pub project_id: ProjectId,
    pub state: JobState,
    pub progress: u8,
    #[serde(default)]
    pub log: Vec<LogLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub fn new(project_id: ProjectId) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            project_id,
            state: JobState::Queued,
            progress: 0,
            log: Vec::new(),
            output_url: None,
            thumbnail_url: None,
            duration_sec: None,
            byte_size: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Transition `queued -> running`. Panics-free: callers check
    /// `state == Queued` beforehand via the compare-and-swap at the
    /// persistence layer; this only updates the in-memory view after that
    /// CAS has already succeeded.
    pub fn start(mut self) -> Self {
        debug_assert!(self.state.can_advance_to(JobState::Running));
        self.state = JobState::Running;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Append a timestamped log line without touching progress or state.
    pub fn append_log(mut self, message: impl Into<String>) -> Self {
        self.log.push(LogLine::new(message));
        self.updated_at = Utc::now();
        self
    }

    /// Advance progress. Progress is non-decreasing within a single run
    /// (§3 invariant) — a lower value than the current one is clamped up
    /// rather than applied, so out-of-order checkpoint writes can't regress
    /// the reported value.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100).max(self.progress);
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job finished. `finished ⇒ progress = 100 and output URL
    /// non-null` (§3 invariant).
    pub fn finish(mut self, output_url: impl Into<String>, thumbnail_url: impl Into<String>, duration_sec: f64, byte_size: u64) -> Self {
        debug_assert!(self.state.can_advance_to(JobState::Finished));
        self.state = JobState::Finished;
        self.progress = 100;
        self.output_url = Some(output_url.into());
        self.thumbnail_url = Some(thumbnail_url.into());
        self.duration_sec = Some(duration_sec);
        self.byte_size = Some(byte_size);
        let now = Utc::now();
        self.updated_at = now;
        self.finished_at = Some(now);
        self
    }

    /// Mark the job failed. `failed ⇒ error non-null` (§3 invariant).
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        debug_assert!(self.state.can_advance_to(JobState::Failed));
        self.state = JobState::Failed;
        self.error = Some(error.into());
        let now = Utc::now();
        self.updated_at = now;
        self.finished_at = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> RenderJob {
        RenderJob::new(ProjectId::new())
    }

    #[test]
    fn new_job_starts_queued_with_zero_progress() {
        let j = job();
        assert_eq!(j.state, JobState::Queued);
        assert_eq!(j.progress, 0);
    }

    #[test]
    fn progress_never_regresses() {
        let j = job().start().with_progress(40).with_progress(10);
        assert_eq!(j.progress, 40);
    }

    #[test]
    fn finish_sets_terminal_invariants() {
        let j = job().start().with_progress(90).finish("https://o/out.mp4", "https://o/thumb.jpg", 5.2, 1024);
        assert!(j.state.is_terminal());
        assert_eq!(j.progress, 100);
        assert!(j.output_url.is_some());
    }

    #[test]
    fn fail_sets_error_and_terminal_state() {
        let j = job().start().fail("engine exited non-zero");
        assert!(j.state.is_terminal());
        assert!(j.error.is_some());
    }

    #[test]
    fn state_machine_rejects_skipping_running() {
        assert!(JobState::Queued.can_advance_to(JobState::Running));
        assert!(!JobState::Queued.can_advance_to(JobState::Finished));
        assert!(!JobState::Finished.can_advance_to(JobState::Running));
    }
}

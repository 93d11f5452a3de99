//! The payload carried on the queue side of job acquisition (§4.1). Deliberately
//! thin — the full Project/Timeline lives in the relational store, keyed by
//! `project_id`, so a queue message never goes stale relative to it.

use serde::{Deserialize, Serialize};

use render_models::{JobId, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJobMessage {
    pub job_id: JobId,
    pub project_id: ProjectId,
}

impl RenderJobMessage {
    pub fn new(job_id: JobId, project_id: ProjectId) -> Self {
        Self { job_id, project_id }
    }

    /// Dedup key for the queue-side SETNX lock — one in-flight message per
    /// job id, regardless of how many times it's been re-enqueued.
    pub fn idempotency_key(&self) -> String {
        format!("render-job:{}", self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let msg = RenderJobMessage::new(JobId::new(), ProjectId::new());
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: RenderJobMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, decoded);
    }
}

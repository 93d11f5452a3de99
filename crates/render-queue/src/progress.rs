//! Progress checkpoint streaming (§4.2). The Job Controller pushes state
//! here on every scheduled checkpoint; a dual write to Pub/Sub and a
//! sorted-set history means a client that connects mid-render still gets
//! the full timeline on reconnect, not just whatever arrives after it.

use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::json;

use render_models::JobId;

use crate::error::QueueResult;

pub const HEARTBEAT_TTL_SECS: u64 = 30;
pub const PROGRESS_HISTORY_TTL_SECS: u64 = 3600;
pub const JOB_STATUS_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { percent: u8 },
    Log { line: String },
    Done { output_url: String, thumbnail_url: String },
    Error { message: String },
}

#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn channel_key(job_id: &JobId) -> String {
        format!("render:progress:{job_id}")
    }

    fn history_key(job_id: &JobId) -> String {
        format!("render:progress-history:{job_id}")
    }

    fn status_key(job_id: &JobId) -> String {
        format!("render:status:{job_id}")
    }

    fn heartbeat_key(job_id: &JobId) -> String {
        format!("render:heartbeat:{job_id}")
    }

    /// Publishes to the live channel and appends to the durable history,
    /// keyed by wall-clock so a late subscriber can replay from any point.
    pub async fn publish(&self, job_id: &JobId, event: ProgressEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(&event)?;

        conn.publish::<_, _, ()>(Self::channel_key(job_id), &payload).await?;

        let score = Utc::now().timestamp_millis() as f64;
        let history_key = Self::history_key(job_id);
        conn.zadd::<_, _, _, ()>(&history_key, &payload, score).await?;
        conn.expire::<_, ()>(&history_key, PROGRESS_HISTORY_TTL_SECS as i64).await?;

        Ok(())
    }

    pub async fn progress(&self, job_id: &JobId, percent: u8) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::status_key(job_id), json!({ "percent": percent }).to_string(), JOB_STATUS_TTL_SECS).await?;
        self.publish(job_id, ProgressEvent::Progress { percent }).await
    }

    pub async fn log(&self, job_id: &JobId, line: impl Into<String>) -> QueueResult<()> {
        self.publish(job_id, ProgressEvent::Log { line: line.into() }).await
    }

    pub async fn done(&self, job_id: &JobId, output_url: impl Into<String>, thumbnail_url: impl Into<String>) -> QueueResult<()> {
        let output_url = output_url.into();
        let thumbnail_url = thumbnail_url.into();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(
            Self::status_key(job_id),
            json!({ "state": "finished", "output_url": output_url, "thumbnail_url": thumbnail_url }).to_string(),
            JOB_STATUS_TTL_SECS,
        )
        .await?;
        self.publish(job_id, ProgressEvent::Done { output_url, thumbnail_url }).await
    }

    pub async fn error(&self, job_id: &JobId, message: impl Into<String>) -> QueueResult<()> {
        let message = message.into();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(
            Self::status_key(job_id),
            json!({ "state": "failed", "error": message }).to_string(),
            JOB_STATUS_TTL_SECS,
        )
        .await?;
        self.publish(job_id, ProgressEvent::Error { message }).await
    }

    /// Renews this job's liveness marker. The controller calls this on
    /// every checkpoint; a stale heartbeat past its TTL means the process
    /// holding the job died without reporting failure.
    pub async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::heartbeat_key(job_id), Utc::now().to_rfc3339(), HEARTBEAT_TTL_SECS).await?;
        Ok(())
    }

    pub async fn is_alive(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.exists(Self::heartbeat_key(job_id)).await?)
    }

    /// Replays the full history recorded so far, oldest first.
    pub async fn history(&self, job_id: &JobId) -> QueueResult<Vec<ProgressEvent>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Vec<String> = conn.zrange(Self::history_key(job_id), 0, -1).await?;
        Ok(raw.into_iter().filter_map(|s| serde_json::from_str(&s).ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serializes_with_type_tag() {
        let event = ProgressEvent::Progress { percent: 42 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 42);
    }

    #[test]
    fn done_event_roundtrips() {
        let event = ProgressEvent::Done { output_url: "https://x/y.mp4".into(), thumbnail_url: "https://x/y.jpg".into() };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: ProgressEvent = serde_json::from_str(&json).unwrap();
        match decoded {
            ProgressEvent::Done { output_url, thumbnail_url } => {
                assert_eq!(output_url, "https://x/y.mp4");
                assert_eq!(thumbnail_url, "https://x/y.jpg");
            }
            _ => panic!("expected Done variant"),
        }
    }
}

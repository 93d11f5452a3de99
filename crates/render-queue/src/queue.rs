//! Redis Streams job queue: one of the Job Acquirer's two concurrent
//! sources (§4.1). A consumer group gives every worker process its own
//! delivery cursor; pending entries idle past the visibility timeout are
//! reclaimed via `claim_pending` rather than left stranded.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::RenderJobMessage;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub stream_name: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "render:jobs".to_string(),
            consumer_group: "render:workers".to_string(),
            dlq_stream_name: "render:dlq".to_string(),
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("RENDER_QUEUE_STREAM").unwrap_or_else(|_| "render:jobs".to_string()),
            consumer_group: std::env::var("RENDER_QUEUE_CONSUMER_GROUP").unwrap_or_else(|_| "render:workers".to_string()),
            dlq_stream_name: std::env::var("RENDER_QUEUE_DLQ_STREAM").unwrap_or_else(|_| "render:dlq".to_string()),
            visibility_timeout: Duration::from_secs(
                std::env::var("RENDER_QUEUE_VISIBILITY_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(600),
            ),
        }
    }
}

pub struct RenderQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RenderQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("created consumer group {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }
        Ok(())
    }

    pub async fn enqueue(&self, message: RenderJobMessage) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&message)?;
        let dedup_key = format!("render:dedup:{}", message.idempotency_key());

        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!("duplicate render job rejected: {}", message.job_id);
            return Err(QueueError::enqueue_failed("duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", 3600).await?;
        info!("enqueued render job {} as {}", message.job_id, message_id);
        Ok(message_id)
    }

    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("XDEL").arg(&self.config.stream_name).arg(message_id).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Pulls up to `count` new messages for this consumer, blocking up to
    /// `block_ms`. A `block_ms` of 0 polls without blocking.
    pub async fn consume(&self, consumer_name: &str, block_ms: u64, count: usize) -> QueueResult<Vec<(String, RenderJobMessage)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut messages = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<RenderJobMessage>(&payload_str) {
                        Ok(message) => messages.push((message_id, message)),
                        Err(e) => {
                            warn!("failed to parse render job payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }
        Ok(messages)
    }

    /// Reclaims pending entries idle past `min_idle_ms`, handling a worker
    /// that crashed mid-job without acking.
    pub async fn claim_pending(&self, consumer_name: &str, min_idle_ms: u64, count: usize) -> QueueResult<Vec<(String, RenderJobMessage)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut ids_to_claim = Vec::new();
        for detail in pending_details {
            if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms))) = (detail.first(), detail.get(2)) {
                if *idle_ms as u64 >= min_idle_ms {
                    if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                        ids_to_claim.push(id);
                    }
                }
            }
        }
        if ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name).arg(&self.config.consumer_group).arg(consumer_name).arg(min_idle_ms);
        for id in &ids_to_claim {
            cmd.arg(id);
        }
        let claimed: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut messages = Vec::new();
        for entry in claimed {
            let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) = (entry.first(), entry.get(1)) else {
                continue;
            };
            let Ok(message_id) = String::from_utf8(id_bytes.clone()) else { continue };

            let mut payload = None;
            let mut i = 0;
            while i + 1 < fields.len() {
                if let (redis::Value::BulkString(k), redis::Value::BulkString(v)) = (&fields[i], &fields[i + 1]) {
                    if k == b"job" {
                        payload = String::from_utf8(v.clone()).ok();
                        break;
                    }
                }
                i += 2;
            }

            if let Some(payload) = payload {
                match serde_json::from_str::<RenderJobMessage>(&payload) {
                    Ok(message) => messages.push((message_id, message)),
                    Err(e) => {
                        warn!("failed to parse claimed render job payload: {}", e);
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }
        Ok(messages)
    }

    pub async fn dlq(&self, message_id: &str, message: &RenderJobMessage, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(message)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;
        warn!("moved render job {} to DLQ: {}", message.job_id, error);
        Ok(())
    }

    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.xlen(&self.config.stream_name).await?)
    }

    pub async fn check_connectivity(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

//! The Job Acquirer (§4.1/§4.1.1): pulls work from two concurrent sources —
//! the Redis queue and a DB poll for stale `queued` rows — behind a single
//! busy flag, so only one render ever runs at a time regardless of which
//! source won the race. The HTTP `/render` route goes through the same
//! flag via [`crate::http::render`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use render_db::JobRepository;
use render_queue::RenderQueue;

use crate::busy_flag::BusyFlag;
use crate::controller::Controller;

pub struct Acquirer {
    queue: Arc<RenderQueue>,
    jobs: JobRepository,
    controller: Arc<Controller>,
    busy: BusyFlag,
    consumer_name: String,
    poll_interval: Duration,
    claim_interval: Duration,
    claim_min_idle: Duration,
}

impl Acquirer {
    pub fn new(
        queue: Arc<RenderQueue>,
        jobs: JobRepository,
        controller: Arc<Controller>,
        busy: BusyFlag,
        poll_interval: Duration,
        claim_interval: Duration,
        claim_min_idle: Duration,
    ) -> Self {
        Self {
            queue,
            jobs,
            controller,
            busy,
            consumer_name: format!("render-worker-{}", uuid::Uuid::new_v4()),
            poll_interval,
            claim_interval,
            claim_min_idle,
        }
    }

    /// Runs until `shutdown` reports `true`, then waits for any in-flight
    /// job to finish before returning (§5: graceful shutdown closes the
    /// queue subscription and waits out the current job, it does not
    /// cancel it).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> crate::error::WorkerResult<()> {
        self.queue.init().await?;
        info!("acquirer '{}' starting", self.consumer_name);

        let mut poll_timer = tokio::time::interval(self.poll_interval);
        let mut claim_timer = tokio::time::interval(self.claim_interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown signal received, draining");
                        break;
                    }
                }
                _ = claim_timer.tick() => {
                    self.try_claim_pending().await;
                }
                _ = poll_timer.tick() => {
                    self.try_poll_db().await;
                }
                result = self.queue.consume(&self.consumer_name, 2_000, 1) => {
                    self.handle_consumed(result).await;
                }
            }
        }

        // Wait out whatever job currently holds the flag rather than
        // cancelling it mid-encode.
        while self.busy.is_busy() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }

    async fn handle_consumed(&self, result: render_queue::QueueResult<Vec<(String, render_queue::RenderJobMessage)>>) {
        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                warn!("queue consume failed: {}", e);
                return;
            }
        };

        for (message_id, message) in messages {
            let Some(guard) = self.busy.try_acquire() else {
                // Another source already won the race for this tick; leave
                // the entry pending so a future consume/claim picks it up.
                break;
            };
            self.dispatch(message_id, message, guard).await;
        }
    }

    async fn try_claim_pending(&self) {
        match self.queue.claim_pending(&self.consumer_name, self.claim_min_idle.as_millis() as u64, 1).await {
            Ok(messages) => {
                for (message_id, message) in messages {
                    let Some(guard) = self.busy.try_acquire() else { break };
                    self.dispatch(message_id, message, guard).await;
                }
            }
            Err(e) => warn!("claim_pending failed: {}", e),
        }
    }

    /// The DB poll path (§4.1): a second, independent source of work for
    /// `queued` rows that never made it onto the queue (or were enqueued
    /// before this worker existed). Gated by the same busy flag as the
    /// queue path, so it never steps on an in-flight queue-sourced job.
    async fn try_poll_db(&self) {
        let Some(guard) = self.busy.try_acquire() else { return };

        match self.jobs.poll_and_acquire_oldest_queued().await {
            Ok(Some(job)) => {
                let controller = self.controller.clone();
                let job_id = job.id.clone();
                let project_id = job.project_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = controller.render(job_id, project_id).await {
                        warn!("render failed: {}", e);
                    }
                    guard.finish();
                });
            }
            Ok(None) => guard.finish(),
            Err(e) => {
                warn!("db poll failed: {}", e);
                guard.finish();
            }
        }
    }

    async fn dispatch(&self, message_id: String, message: render_queue::RenderJobMessage, guard: crate::busy_flag::BusyGuard) {
        let controller = self.controller.clone();
        let queue = self.queue.clone();
        let job_id = message.job_id.clone();
        let project_id = message.project_id.clone();

        tokio::spawn(async move {
            let result = controller.render(job_id, project_id).await;
            match result {
                Ok(()) => {
                    if let Err(e) = queue.ack(&message_id).await {
                        warn!("failed to ack {}: {}", message_id, e);
                    }
                }
                Err(e) => {
                    warn!("render failed for message {}: {}", message_id, e);
                    if let Err(e) = queue.dlq(&message_id, &message, &e.to_string()).await {
                        warn!("failed to move {} to DLQ: {}", message_id, e);
                    }
                }
            }
            guard.finish();
        });
    }
}

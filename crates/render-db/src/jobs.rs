//! RenderJob persistence, including the compare-and-swap acquisition the
//! Job Acquirer's poll-side source relies on.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use render_models::{JobId, JobState, LogLine, ProjectId, RenderJob};

use crate::error::{DbError, DbResult};

fn state_to_str(state: JobState) -> &'static str {
    match state {
        JobState::Queued => "queued",
        JobState::Running => "running",
        JobState::Finished => "finished",
        JobState::Failed => "failed",
    }
}

fn state_from_str(s: &str) -> JobState {
    match s {
        "running" => JobState::Running,
        "finished" => JobState::Finished,
        "failed" => JobState::Failed,
        _ => JobState::Queued,
    }
}

fn row_to_job(row: &sqlx::postgres::PgRow) -> DbResult<RenderJob> {
    let log_json: serde_json::Value = row.try_get("log")?;
    let log: Vec<LogLine> = serde_json::from_value(log_json)?;

    Ok(RenderJob {
        id: JobId::from_string(row.try_get::<String, _>("id")?),
        project_id: ProjectId::from_string(row.try_get::<String, _>("project_id")?),
        state: state_from_str(&row.try_get::<String, _>("state")?),
        progress: row.try_get::<i32, _>("progress")? as u8,
        log,
        output_url: row.try_get("output_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        duration_sec: row.try_get("duration_sec")?,
        byte_size: row.try_get::<Option<i64>, _>("byte_size")?.map(|v| v as u64),
        error: row.try_get("error")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, job: &RenderJob) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO render_jobs (id, project_id, state, progress, log, output_url, thumbnail_url, \
             duration_sec, byte_size, error, created_at, updated_at, started_at, finished_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)",
        )
        .bind(job.id.as_str())
        .bind(job.project_id.as_str())
        .bind(state_to_str(job.state))
        .bind(job.progress as i32)
        .bind(serde_json::to_value(&job.log)?)
        .bind(&job.output_url)
        .bind(&job.thumbnail_url)
        .bind(job.duration_sec)
        .bind(job.byte_size.map(|v| v as i64))
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &JobId) -> DbResult<RenderJob> {
        let row = sqlx::query("SELECT * FROM render_jobs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(id.to_string()))?;
        row_to_job(&row)
    }

    /// The poll-side acquisition path (§4.1): claims a queued job by moving
    /// it to `running` only if it is still `queued`. Returns `None` when
    /// another worker won the race, distinguishing "nothing to do" from
    /// "lost the race" without raising an error.
    pub async fn try_acquire(&self, id: &JobId) -> DbResult<Option<RenderJob>> {
        let row = sqlx::query(
            "UPDATE render_jobs SET state = 'running', started_at = now(), updated_at = now() \
             WHERE id = $1 AND state = 'queued' RETURNING *",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    /// Polls for the oldest queued job and claims it in one round trip, so
    /// two pollers racing on the same row can't both win.
    pub async fn poll_and_acquire_oldest_queued(&self) -> DbResult<Option<RenderJob>> {
        let row = sqlx::query(
            "UPDATE render_jobs SET state = 'running', started_at = now(), updated_at = now() \
             WHERE id = ( \
                 SELECT id FROM render_jobs WHERE state = 'queued' ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn append_log(&self, job: &RenderJob) -> DbResult<()> {
        sqlx::query("UPDATE render_jobs SET log = $2, updated_at = now() WHERE id = $1")
            .bind(job.id.as_str())
            .bind(serde_json::to_value(&job.log)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_progress(&self, id: &JobId, progress: u8) -> DbResult<()> {
        sqlx::query("UPDATE render_jobs SET progress = GREATEST(progress, $2), updated_at = now() WHERE id = $1")
            .bind(id.as_str())
            .bind(progress as i32)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn finish(&self, job: &RenderJob) -> DbResult<()> {
        sqlx::query(
            "UPDATE render_jobs SET state = 'finished', progress = 100, output_url = $2, thumbnail_url = $3, \
             duration_sec = $4, byte_size = $5, updated_at = now(), finished_at = now() WHERE id = $1",
        )
        .bind(job.id.as_str())
        .bind(&job.output_url)
        .bind(&job.thumbnail_url)
        .bind(job.duration_sec)
        .bind(job.byte_size.map(|v| v as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, id: &JobId, error: &str) -> DbResult<()> {
        sqlx::query("UPDATE render_jobs SET state = 'failed', error = $2, updated_at = now(), finished_at = now() WHERE id = $1")
            .bind(id.as_str())
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

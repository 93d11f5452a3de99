//! Project persistence: the parent record a RenderJob's output gets
//! written back onto.

use sqlx::postgres::PgPool;
use sqlx::Row;

use render_models::{CropMode, JobState, Project, ProjectId, Resolution, Timeline};

use crate::error::{DbError, DbResult};

fn aspect_mode_to_str(mode: CropMode) -> &'static str {
    match mode {
        CropMode::Cover => "cover",
        CropMode::Contain => "contain",
        CropMode::Fill => "fill",
    }
}

fn aspect_mode_from_str(s: &str) -> CropMode {
    match s {
        "contain" => CropMode::Contain,
        "fill" => CropMode::Fill,
        _ => CropMode::Cover,
    }
}

fn status_to_str(state: JobState) -> &'static str {
    match state {
        JobState::Queued => "queued",
        JobState::Running => "running",
        JobState::Finished => "finished",
        JobState::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> JobState {
    match s {
        "running" => JobState::Running,
        "finished" => JobState::Finished,
        "failed" => JobState::Failed,
        _ => JobState::Queued,
    }
}

fn row_to_project(row: &sqlx::postgres::PgRow) -> DbResult<Project> {
    let timeline_json: serde_json::Value = row.try_get("timeline")?;
    Ok(Project {
        id: ProjectId::from_string(row.try_get::<String, _>("id")?),
        title: row.try_get("title")?,
        resolution: Resolution {
            width: row.try_get::<i32, _>("resolution_w")? as u32,
            height: row.try_get::<i32, _>("resolution_h")? as u32,
        },
        fps: row.try_get("fps")?,
        aspect_mode: aspect_mode_from_str(&row.try_get::<String, _>("aspect_mode")?),
        timeline: serde_json::from_value(timeline_json)?,
        output_url: row.try_get("output_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        status: status_from_str(&row.try_get::<String, _>("status")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, project: &Project) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO projects (id, title, resolution_w, resolution_h, fps, aspect_mode, timeline, \
             output_url, thumbnail_url, status, created_at, updated_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(project.id.as_str())
        .bind(&project.title)
        .bind(project.resolution.width as i32)
        .bind(project.resolution.height as i32)
        .bind(project.fps)
        .bind(aspect_mode_to_str(project.aspect_mode))
        .bind(serde_json::to_value(&project.timeline)?)
        .bind(&project.output_url)
        .bind(&project.thumbnail_url)
        .bind(status_to_str(project.status))
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &ProjectId) -> DbResult<Project> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(id.to_string()))?;
        row_to_project(&row)
    }

    pub async fn get_timeline(&self, id: &ProjectId) -> DbResult<Timeline> {
        Ok(self.get(id).await?.timeline)
    }

    pub async fn mark_finished(&self, id: &ProjectId, output_url: &str, thumbnail_url: &str) -> DbResult<()> {
        sqlx::query("UPDATE projects SET status = 'finished', output_url = $2, thumbnail_url = $3, updated_at = now() WHERE id = $1")
            .bind(id.as_str())
            .bind(output_url)
            .bind(thumbnail_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: &ProjectId) -> DbResult<()> {
        sqlx::query("UPDATE projects SET status = 'failed', updated_at = now() WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

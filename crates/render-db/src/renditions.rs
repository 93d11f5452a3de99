//! Clip rendition persistence, backing `/generate-renditions` (§4.6.1).

use sqlx::postgres::PgPool;
use sqlx::Row;

use render_models::{ClipId, ClipRendition};

use crate::error::DbResult;

#[derive(Clone)]
pub struct RenditionRepository {
    pool: PgPool,
}

impl RenditionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, rendition: &ClipRendition) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO clip_renditions (clip_id, resolution, url, object_key, created_at) VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (clip_id, resolution) DO UPDATE SET url = EXCLUDED.url, object_key = EXCLUDED.object_key, created_at = EXCLUDED.created_at",
        )
        .bind(rendition.clip_id.as_str())
        .bind(&rendition.resolution)
        .bind(&rendition.url)
        .bind(&rendition.object_key)
        .bind(rendition.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_clip(&self, clip_id: &str) -> DbResult<Vec<ClipRendition>> {
        let rows = sqlx::query("SELECT * FROM clip_renditions WHERE clip_id = $1 ORDER BY resolution")
            .bind(clip_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ClipRendition {
                    clip_id: ClipId::from_string(row.try_get::<String, _>("clip_id")?),
                    resolution: row.try_get("resolution")?,
                    url: row.try_get("url")?,
                    object_key: row.try_get("object_key")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

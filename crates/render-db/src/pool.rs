//! Connection pool setup and migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> DbResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| DbError::config_error("DATABASE_URL not set"))?,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }
}

pub async fn connect(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))
}

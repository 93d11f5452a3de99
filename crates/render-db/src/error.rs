//! Relational store error types.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to configure database pool: {0}")]
    ConfigError(String),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("conditional update did not match any row: {0}")]
    CasMismatch(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn cas_mismatch(msg: impl Into<String>) -> Self {
        Self::CasMismatch(msg.into())
    }
}

//! Postgres-backed repositories for render jobs, projects, and clip
//! renditions.

pub mod error;
pub mod jobs;
pub mod pool;
pub mod projects;
pub mod renditions;

pub use error::{DbError, DbResult};
pub use jobs::JobRepository;
pub use pool::{connect, run_migrations, DbConfig};
pub use projects::ProjectRepository;
pub use renditions::RenditionRepository;

//! Render worker: job acquisition, FFmpeg orchestration, and publishing.
//!
//! This crate provides:
//! - Job acquisition from the render queue and a DB poll fallback
//! - Timeline compilation and FFmpeg execution
//! - Progress checkpoint emission
//! - Output publishing
//! - A small HTTP surface for direct invocation and health checks

pub mod acquirer;
pub mod busy_flag;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod logging;
pub mod publisher;
pub mod renditions;
pub mod working_dir;

pub use acquirer::Acquirer;
pub use busy_flag::{BusyFlag, BusyGuard};
pub use config::{AppConfig, WorkerConfig};
pub use controller::Controller;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use publisher::Publisher;
pub use renditions::RenditionGenerator;
pub use working_dir::WorkingDir;

//! Structured per-job logging helper. Every checkpoint the Controller
//! reaches goes through one of these methods so job-scoped log lines carry
//! consistent fields regardless of call site.

use render_models::JobId;
use tracing::{error, info, warn, Span};

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self { job_id: job_id.to_string(), operation: operation.to_string() }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn log_start(&self) {
        info!(job_id = %self.job_id, operation = %self.operation, "starting");
    }

    pub fn log_progress(&self, percent: u8, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, percent, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = %self.operation, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, "{}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "{}", message);
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = %self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_job_id_and_operation() {
        let job_id = JobId::from_string("job-123".to_string());
        let logger = JobLogger::new(&job_id, "render");
        assert_eq!(logger.job_id(), "job-123");
        assert_eq!(logger.operation(), "render");
    }
}

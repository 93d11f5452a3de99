//! Scoped working-directory guard (§4.2.1, §9). The Controller owns one
//! working directory per job exclusively; it is removed on every exit
//! path, including a panic mid-render, by the same explicit-finish +
//! Drop-cleanup discipline the busy flag uses.

use std::path::{Path, PathBuf};

use render_models::JobId;
use tracing::warn;

pub struct WorkingDir {
    path: PathBuf,
    finished: bool,
}

impl WorkingDir {
    /// Creates `{base}/{job_id}` and returns a guard over it.
    pub async fn create(base: &Path, job_id: &JobId) -> std::io::Result<Self> {
        let path = base.join(job_id.as_str());
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path, finished: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory tree and marks the guard finished so `Drop`
    /// doesn't try again.
    pub async fn finish(mut self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove working dir {}: {}", self.path.display(), e);
            }
        }
        self.finished = true;
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if !self.finished {
            warn!("WorkingDir dropped without finish() - cleaning up {} from Drop", self.path.display());
            let path = self.path.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = tokio::fs::remove_dir_all(&path).await;
                });
            } else {
                let _ = std::fs::remove_dir_all(&path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_makes_job_scoped_directory() {
        let base = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("job-abc");
        let guard = WorkingDir::create(base.path(), &job_id).await.unwrap();
        assert!(guard.path().exists());
        assert_eq!(guard.path(), base.path().join("job-abc"));
        guard.finish().await;
    }

    #[tokio::test]
    async fn finish_removes_the_directory() {
        let base = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("job-def");
        let guard = WorkingDir::create(base.path(), &job_id).await.unwrap();
        let path = guard.path().to_path_buf();
        guard.finish().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_without_finish_still_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("job-ghi");
        let path;
        {
            let guard = WorkingDir::create(base.path(), &job_id).await.unwrap();
            path = guard.path().to_path_buf();
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!path.exists());
    }
}

//! Single-owner busy flag (§4.1.1, §9). The Job Acquirer serializes work
//! across its two concurrent sources — the queue subscription and the DB
//! poll — by requiring both paths to win the same compare-and-swap before
//! they may start a job. The guard returned on success is the only way to
//! release the flag; its `Drop` impl logs a warning if a handler panicked
//! without calling `finish()` explicitly, the same discipline the
//! teacher's own render-job guard applies to its work-directory lease.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

#[derive(Clone)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self { busy: Arc::new(AtomicBool::new(false)) }
    }

    /// Attempts to claim exclusive ownership. Returns `None` if another job
    /// already holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        match self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Some(BusyGuard { busy: self.busy.clone(), finished: false }),
            Err(_) => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for BusyFlag {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BusyGuard {
    busy: Arc<AtomicBool>,
    finished: bool,
}

impl BusyGuard {
    /// Releases the flag. Call this on every exit path of the job handler,
    /// success or failure, before the guard drops.
    pub fn finish(mut self) {
        self.busy.store(false, Ordering::Release);
        self.finished = true;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("BusyGuard dropped without finish() - releasing flag from Drop, job handler likely panicked");
            self.busy.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_held() {
        let flag = BusyFlag::new();
        let first = flag.try_acquire().expect("first acquire succeeds");
        assert!(flag.try_acquire().is_none());
        first.finish();
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn drop_without_finish_still_releases() {
        let flag = BusyFlag::new();
        {
            let _guard = flag.try_acquire().expect("acquire succeeds");
        }
        assert!(!flag.is_busy());
    }
}

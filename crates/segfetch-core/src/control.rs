//! Job control for cancellation: shared cancel tokens and a per-job registry.
//!
//! Every fetcher of a job holds a clone of the job's [`CancelToken`]. Fetch
//! loops check it at each chunk boundary and backoff sleeps wake on it, so a
//! cancelled job stops promptly and leaves its segment state intact.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Cloneable cancellation flag with an interruptible sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless cancelled first.
    /// Returns `true` if the full duration elapsed, `false` on cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            guard = match self.inner.wake.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

/// Registry of job name -> cancel token, so a caller can stop one job while
/// others keep running. `cancel_all` stops every registered job.
#[derive(Debug, Default)]
pub struct JobControl {
    root: CancelToken,
    jobs: RwLock<HashMap<String, CancelToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; returns the token to pass to the engine.
    /// A job registered after `cancel_all` starts out cancelled.
    pub fn register(&self, job: &str) -> CancelToken {
        let token = CancelToken::new();
        if self.root.is_cancelled() {
            token.cancel();
        }
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.to_string(), token.clone());
        token
    }

    /// Unregister a job (call when the job finishes, success or failure).
    pub fn unregister(&self, job: &str) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job);
    }

    /// Request cancellation of one job. Returns false if it is not running.
    pub fn cancel(&self, job: &str) -> bool {
        match self.jobs.read().unwrap_or_else(|e| e.into_inner()).get(job) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running job and any job registered afterwards.
    pub fn cancel_all(&self) {
        self.root.cancel();
        for token in self.jobs.read().unwrap_or_else(|e| e.into_inner()).values() {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }
}

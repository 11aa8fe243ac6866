//! Progress reporting for transfers.
//!
//! The engine only calls into a [`ProgressSink`]; rendering lives with the
//! caller. Sinks are invoked from fetcher threads on every chunk write, so
//! implementations must be cheap and must not block.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Receiver of per-job progress notifications.
pub trait ProgressSink: Send + Sync {
    /// `bytes_delta` new bytes were persisted for `job`.
    fn on_progress(&self, job: &str, bytes_delta: u64);

    /// Transfer of `job` started; `total_length` is 0 when unknown.
    fn on_start(&self, _job: &str, _total_length: u64) {}

    /// `persisted` bytes were already on disk from an earlier attempt.
    fn on_resume(&self, _job: &str, _persisted: u64) {}

    /// `bytes` previously reported for `job` were thrown away and will be fetched again.
    fn on_discard(&self, _job: &str, _bytes: u64) {}

    /// `job` reached a terminal outcome, successful or not.
    fn on_finish(&self, _job: &str) {}
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _job: &str, _bytes_delta: u64) {}
}

/// Snapshot of progress for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes persisted so far, including resumed bytes.
    pub bytes_done: u64,
    /// Bytes fetched in this process (excludes resumed bytes).
    pub bytes_fetched: u64,
    /// Total length; 0 when unknown.
    pub total_bytes: u64,
    /// Seconds since the job started.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Transfer rate of this process in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_fetched as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate or total is unknown).
    pub fn eta_secs(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; None when total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.bytes_done as f64 / self.total_bytes as f64).min(1.0))
    }
}

#[derive(Debug)]
struct JobCounters {
    resumed: u64,
    fetched: u64,
    total: u64,
    started: Instant,
    finished: bool,
}

/// Sink that keeps per-job counters for later inspection or rendering.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    jobs: Mutex<HashMap<String, JobCounters>>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, job: &str) -> Option<ProgressStats> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.get(job).map(|c| ProgressStats {
            bytes_done: c.resumed + c.fetched,
            bytes_fetched: c.fetched,
            total_bytes: c.total,
            elapsed_secs: c.started.elapsed().as_secs_f64(),
        })
    }

    /// Snapshots of every job seen so far, sorted by name.
    pub fn snapshot_all(&self) -> Vec<(String, ProgressStats)> {
        self.snapshots(|_| true)
    }

    /// Snapshots of jobs that have not finished yet, sorted by name.
    pub fn active(&self) -> Vec<(String, ProgressStats)> {
        self.snapshots(|c| !c.finished)
    }

    fn snapshots(&self, keep: impl Fn(&JobCounters) -> bool) -> Vec<(String, ProgressStats)> {
        let names: Vec<String> = {
            let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
            jobs.iter()
                .filter(|(_, c)| keep(c))
                .map(|(n, _)| n.clone())
                .collect()
        };
        let mut out: Vec<_> = names
            .into_iter()
            .filter_map(|n| self.snapshot(&n).map(|s| (n, s)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn with_job(&self, job: &str, f: impl FnOnce(&mut JobCounters)) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let counters = jobs.entry(job.to_string()).or_insert_with(|| JobCounters {
            resumed: 0,
            fetched: 0,
            total: 0,
            started: Instant::now(),
            finished: false,
        });
        f(counters);
    }
}

impl ProgressSink for ProgressCounter {
    fn on_progress(&self, job: &str, bytes_delta: u64) {
        self.with_job(job, |c| c.fetched += bytes_delta);
    }

    fn on_start(&self, job: &str, total_length: u64) {
        self.with_job(job, |c| {
            c.total = total_length;
            c.finished = false;
        });
    }

    fn on_resume(&self, job: &str, persisted: u64) {
        self.with_job(job, |c| c.resumed += persisted);
    }

    fn on_discard(&self, job: &str, bytes: u64) {
        self.with_job(job, |c| {
            let from_resumed = bytes.min(c.resumed);
            c.resumed -= from_resumed;
            c.fetched = c.fetched.saturating_sub(bytes - from_resumed);
        });
    }

    fn on_finish(&self, job: &str) {
        self.with_job(job, |c| c.finished = true);
    }
}

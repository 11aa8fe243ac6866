//! Batch dispatcher: runs many jobs with bounded concurrency.
//!
//! Each job runs on a blocking thread (`spawn_blocking`) inside a `JoinSet`
//! capped at `max_concurrent`. Outcomes travel over a channel to an
//! [`OutcomeCollector`] task that builds the [`Summary`], so no job state is
//! shared between job threads.
//!
//! Jobs whose segment key or artifact name is already taken by an earlier job
//! of the batch are rejected up front, so every store entry and target file
//! has a single writer.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::control::JobControl;
use crate::error::TransferError;
use crate::job::{TransferJob, TransferOutcome};
use crate::orchestrator::TransferEngine;

/// Outcome of one job, tagged with its name.
#[derive(Debug)]
pub struct JobReport {
    pub name: String,
    pub outcome: TransferOutcome,
}

/// Batch result: names of succeeded jobs and failed jobs with their reasons.
#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl Summary {
    pub fn record(&mut self, report: JobReport) {
        match report.outcome {
            TransferOutcome::Success { .. } => self.succeeded.push(report.name),
            TransferOutcome::Failure { reason } => {
                self.failed.push((report.name, reason.to_string()))
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|(name, _)| name.as_str())
    }
}

/// Receives job reports and folds them into a [`Summary`].
pub struct OutcomeCollector {
    rx: mpsc::UnboundedReceiver<JobReport>,
    summary: Summary,
}

impl OutcomeCollector {
    pub fn new(rx: mpsc::UnboundedReceiver<JobReport>) -> Self {
        Self {
            rx,
            summary: Summary::default(),
        }
    }

    /// Runs until every sender is dropped.
    pub async fn run(mut self) -> Summary {
        while let Some(report) = self.rx.recv().await {
            match &report.outcome {
                TransferOutcome::Success { path, .. } => {
                    tracing::info!(job = %report.name, path = %path.display(), "job succeeded")
                }
                TransferOutcome::Failure { reason } => {
                    tracing::warn!(job = %report.name, reason = %reason, "job failed")
                }
            }
            self.summary.record(report);
        }
        self.summary
    }
}

/// Runs `jobs` on `engine`, at most `max_concurrent` at a time.
///
/// Every job yields exactly one report, including jobs that panic or are
/// cancelled through `control`. A failing job never affects the others.
pub async fn run_jobs(
    engine: Arc<TransferEngine>,
    jobs: Vec<TransferJob>,
    max_concurrent: usize,
    control: Arc<JobControl>,
) -> Summary {
    let max_concurrent = max_concurrent.max(1);
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = tokio::spawn(OutcomeCollector::new(rx).run());

    tracing::info!(jobs = jobs.len(), max_concurrent, "dispatching jobs");
    let mut queue = reject_duplicates(jobs, &tx).into_iter();
    let mut running = JoinSet::new();

    loop {
        while running.len() < max_concurrent {
            let Some(job) = queue.next() else { break };
            let engine = Arc::clone(&engine);
            let control = Arc::clone(&control);
            let tx = tx.clone();
            running.spawn_blocking(move || {
                let cancel = control.register(&job.name);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.submit(&job, &cancel)))
                    .unwrap_or_else(|_| {
                        tracing::error!(job = %job.name, "transfer panicked");
                        TransferOutcome::Failure {
                            reason: TransferError::Panicked,
                        }
                    });
                control.unregister(&job.name);
                let _ = tx.send(JobReport {
                    name: job.name,
                    outcome,
                });
            });
        }
        match running.join_next().await {
            Some(Err(e)) => tracing::error!(error = %e, "job task failed to join"),
            Some(Ok(())) => {}
            None => break,
        }
    }
    drop(tx);

    match collector.await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "outcome collector failed");
            Summary::default()
        }
    }
}

/// Keeps the first job for each output name; reports the rest as failed.
fn reject_duplicates(
    jobs: Vec<TransferJob>,
    tx: &mpsc::UnboundedSender<JobReport>,
) -> Vec<TransferJob> {
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut accepted = Vec::with_capacity(jobs.len());
    for job in jobs {
        let names = [job.key(), job.file_name()];
        if let Some(other) = names.iter().find_map(|n| owners.get(n)) {
            let reason = TransferError::DuplicateTarget {
                key: job.key(),
                other: other.clone(),
            };
            tracing::warn!(job = %job.name, error = %reason, "skipping job");
            let _ = tx.send(JobReport {
                name: job.name,
                outcome: TransferOutcome::Failure { reason },
            });
            continue;
        }
        for n in names {
            owners.insert(n, job.name.clone());
        }
        accepted.push(job);
    }
    accepted
}

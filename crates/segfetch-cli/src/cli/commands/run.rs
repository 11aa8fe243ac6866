//! `segfetch run` – download every job of a job file.

use anyhow::Result;
use segfetch_core::config::SegfetchConfig;
use segfetch_core::progress::ProgressCounter;
use segfetch_core::{run_jobs, JobControl, Summary, TransferEngine, TransferJob};
use std::path::Path;
use std::sync::Arc;

use crate::cli::{console, manifest};

pub async fn run_batch(cfg: &SegfetchConfig, jobs_file: &Path) -> Result<i32> {
    let jobs = manifest::load_jobs(jobs_file)?;
    if jobs.is_empty() {
        println!("No jobs in {}.", jobs_file.display());
        return Ok(0);
    }
    let summary = execute(cfg, jobs).await;
    console::print_summary(&summary);
    Ok(if summary.all_succeeded() { 0 } else { 1 })
}

/// Runs `jobs` with a console progress reporter; Ctrl-C cancels every job.
pub(super) async fn execute(cfg: &SegfetchConfig, jobs: Vec<TransferJob>) -> Summary {
    let progress = Arc::new(ProgressCounter::new());
    let engine = Arc::new(TransferEngine::with_defaults(
        cfg.engine_config(),
        progress.clone(),
    ));
    let control = Arc::new(JobControl::new());

    let ctrl_c = console::spawn_ctrl_c_handler(Arc::clone(&control));
    let reporter = console::spawn_reporter(progress);
    let summary = run_jobs(engine, jobs, cfg.max_concurrent_jobs, control).await;
    reporter.abort();
    ctrl_c.abort();
    summary
}

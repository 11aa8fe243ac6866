//! Console output: periodic progress lines, Ctrl-C handling and the final summary.

use segfetch_core::progress::{ProgressCounter, ProgressStats};
use segfetch_core::{JobControl, Summary};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Cancel every job on the first Ctrl-C.
pub fn spawn_ctrl_c_handler(control: Arc<JobControl>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted; stopping transfers (partial segments are kept).");
            tracing::warn!("ctrl-c received, cancelling all jobs");
            control.cancel_all();
        }
    })
}

/// Print one line per unfinished job every 500 ms until aborted.
pub fn spawn_reporter(progress: Arc<ProgressCounter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
        loop {
            tick.tick().await;
            for (name, stats) in progress.active() {
                eprintln!("  {}", format_progress(&name, &stats));
            }
        }
    })
}

pub fn format_progress(name: &str, stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    match stats.fraction() {
        Some(f) => {
            let total_mib = stats.total_bytes as f64 / 1_048_576.0;
            let eta = stats
                .eta_secs()
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{}: {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}",
                name,
                done_mib,
                total_mib,
                f * 100.0,
                rate_mib,
                eta
            )
        }
        None => format!("{}: {:.1} MiB  {:.2} MiB/s", name, done_mib, rate_mib),
    }
}

pub fn print_summary(summary: &Summary) {
    println!(
        "Done: {} succeeded, {} failed.",
        summary.succeeded.len(),
        summary.failed.len()
    );
    for (name, reason) in &summary.failed {
        println!("  FAILED {}: {}", name, reason);
    }
}

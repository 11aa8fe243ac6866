//! `segfetch get` – download one URL.

use anyhow::{bail, Result};
use segfetch_core::config::SegfetchConfig;
use segfetch_core::{JobDescriptor, TransferJob};

use super::run::execute;
use crate::cli::console;

pub async fn run_single(cfg: &SegfetchConfig, url: &str, name: &str, extension: &str) -> Result<i32> {
    let Some(desc) = JobDescriptor::new(name, url, extension) else {
        bail!("url, name and extension must not be empty");
    };
    let summary = execute(cfg, vec![TransferJob::from(desc)]).await;
    console::print_summary(&summary);
    Ok(if summary.all_succeeded() { 0 } else { 1 })
}

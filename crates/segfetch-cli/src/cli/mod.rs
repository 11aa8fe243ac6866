//! CLI for the segfetch transfer engine.

mod commands;
mod console;
mod manifest;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use segfetch_core::config::{self, SegfetchConfig};
use segfetch_core::retry::RetryProfile;
use std::path::{Path, PathBuf};

use commands::{run_batch, run_completions, run_single};

/// Top-level CLI for segfetch.
#[derive(Debug, Parser)]
#[command(name = "segfetch")]
#[command(about = "segfetch: resumable parallel segmented HTTP downloads", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/segfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Settings shared by the commands that transfer files.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TransferArgs {
    /// Directory for finished files and segment files.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Segments per file.
    #[arg(long, value_name = "N")]
    pub segments: Option<usize>,
    /// Allow 50 attempts per segment instead of 5.
    #[arg(long)]
    pub patient: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every job listed in a job file (TOML, or CSV when it ends in `.csv`).
    Run {
        /// Job file: `[[job]]` TOML entries or a CSV with name, url, extension columns.
        jobs_file: PathBuf,
        /// Run up to N jobs concurrently.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Download a single URL.
    Get {
        /// Direct HTTP/HTTPS URL.
        url: String,
        /// Output name (without extension).
        #[arg(long, default_value = "download")]
        name: String,
        /// Output extension.
        #[arg(long = "ext", default_value = "bin")]
        extension: String,
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Print a shell completion script to stdout.
    Completions {
        shell: Shell,
    },
}

impl TransferArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, cfg: &mut SegfetchConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(n) = self.segments {
            cfg.segment_count = n;
        }
        if self.patient {
            cfg.retry_profile = RetryProfile::Patient;
            cfg.retry = None;
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SegfetchConfig> {
    let cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl Cli {
    /// Parse arguments and run the command. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                jobs_file,
                jobs,
                transfer,
            } => {
                let mut cfg = load_config(cli.config.as_deref())?;
                transfer.apply(&mut cfg);
                if let Some(n) = jobs {
                    cfg.max_concurrent_jobs = n;
                }
                run_batch(&cfg, &jobs_file).await
            }
            CliCommand::Get {
                url,
                name,
                extension,
                transfer,
            } => {
                let mut cfg = load_config(cli.config.as_deref())?;
                transfer.apply(&mut cfg);
                run_single(&cfg, &url, &name, &extension).await
            }
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
        }
    }
}

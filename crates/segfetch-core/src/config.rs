use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{RetryPolicy, RetryProfile};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/segfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegfetchConfig {
    /// Directory that receives artifacts and segment files.
    pub output_dir: PathBuf,
    /// Segments per job when the job does not set its own count.
    pub segment_count: usize,
    /// Segment fetches running at once within one job.
    pub max_concurrent_segments: usize,
    /// Jobs running at once.
    pub max_concurrent_jobs: usize,
    /// Bytes buffered per segment before they are appended to disk.
    pub chunk_size_bytes: usize,
    /// Deadline for each size probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Whole-fetch rounds per job before a failing segment is reported.
    pub attempt_rounds: u32,
    /// Pause between rounds, in seconds.
    pub round_delay_secs: u64,
    /// Named attempt budget used when `retry` is absent.
    pub retry_profile: RetryProfile,
    /// Optional explicit retry policy; overrides `retry_profile`.
    pub retry: Option<RetryConfig>,
}

impl Default for SegfetchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            segment_count: 3,
            max_concurrent_segments: 8,
            max_concurrent_jobs: 10,
            chunk_size_bytes: 1024 * 1024,
            probe_timeout_secs: 15,
            attempt_rounds: 3,
            round_delay_secs: 3,
            retry_profile: RetryProfile::Standard,
            retry: None,
        }
    }
}

/// Runtime settings of one [`TransferEngine`](crate::TransferEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub output_dir: PathBuf,
    pub segment_count: usize,
    pub max_concurrent_segments: usize,
    pub chunk_size: usize,
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
    pub attempt_rounds: u32,
    pub round_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        SegfetchConfig::default().engine_config()
    }
}

impl SegfetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        match &self.retry {
            Some(cfg) => RetryPolicy::from_config(cfg),
            None => RetryPolicy::from_profile(self.retry_profile),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            output_dir: self.output_dir.clone(),
            segment_count: self.segment_count,
            max_concurrent_segments: self.max_concurrent_segments.max(1),
            chunk_size: self.chunk_size_bytes.max(1),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            retry: self.retry_policy(),
            attempt_rounds: self.attempt_rounds.max(1),
            round_delay: Duration::from_secs(self.round_delay_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<SegfetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: SegfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SegfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SegfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

//! Job descriptors and outcomes.

use std::path::PathBuf;

use crate::error::TransferError;
use crate::url_model::{file_stem, target_file_name};

/// One entry of a job list: what to fetch and what to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub name: String,
    pub url: String,
    pub extension: String,
}

impl JobDescriptor {
    /// Trims every field; returns `None` if any of them is empty.
    pub fn new(name: &str, url: &str, extension: &str) -> Option<Self> {
        let (name, url, extension) = (name.trim(), url.trim(), extension.trim());
        if name.is_empty() || url.is_empty() || extension.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
            extension: extension.to_string(),
        })
    }
}

/// A unit of work for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    /// Display name; also the basis of the artifact and segment-file names.
    pub name: String,
    pub url: String,
    pub extension: String,
    /// Known total length. 0 means unknown and makes the engine probe.
    pub total_length: u64,
    /// Segments to plan. 0 uses the engine's configured count.
    pub segment_count: usize,
}

impl TransferJob {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extension: extension.into(),
            total_length: 0,
            segment_count: 0,
        }
    }

    pub fn with_segments(mut self, count: usize) -> Self {
        self.segment_count = count;
        self
    }

    pub fn with_total_length(mut self, total_length: u64) -> Self {
        self.total_length = total_length;
        self
    }

    /// Filesystem-safe key that names this job's segment entries.
    pub fn key(&self) -> String {
        file_stem(&self.name)
    }

    /// Final artifact file name: `<key>.<extension>`.
    pub fn file_name(&self) -> String {
        target_file_name(&self.name, &self.extension)
    }
}

impl From<JobDescriptor> for TransferJob {
    fn from(d: JobDescriptor) -> Self {
        TransferJob::new(d.name, d.url, d.extension)
    }
}

/// Terminal result of one job.
#[derive(Debug)]
pub enum TransferOutcome {
    Success { path: PathBuf, bytes: u64 },
    Failure { reason: TransferError },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&TransferError> {
        match self {
            TransferOutcome::Success { .. } => None,
            TransferOutcome::Failure { reason } => Some(reason),
        }
    }
}

impl From<Result<(PathBuf, u64), TransferError>> for TransferOutcome {
    fn from(r: Result<(PathBuf, u64), TransferError>) -> Self {
        match r {
            Ok((path, bytes)) => TransferOutcome::Success { path, bytes },
            Err(reason) => TransferOutcome::Failure { reason },
        }
    }
}

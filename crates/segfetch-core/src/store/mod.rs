//! Durable holder for in-progress segment bytes.
//!
//! Each (job, segment index) maps to one append-only entry whose length is the
//! resume checkpoint: a fetch for that segment restarts at
//! `planned_start + existing_length`. Entries are only ever appended to or
//! cleared as a whole job, never truncated.

mod file;
mod memory;

pub use file::{segment_file_name, FileSegmentStore};
pub use memory::MemorySegmentStore;

use std::io::{self, Read};
use std::path::PathBuf;

/// Failure reading or writing segment state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no stored data for segment {index} of {job}")]
    Missing { job: String, index: usize },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Storage for partial segment data, keyed by job key and segment index.
///
/// `append` is called only by the fetcher that currently owns the segment, so
/// implementations need not serialize writers of the same entry.
pub trait SegmentStore: Send + Sync {
    /// Bytes already persisted for this segment (0 if none).
    fn existing_length(&self, job: &str, index: usize) -> Result<u64, StoreError>;

    /// Appends `bytes`; returns the entry's total persisted length.
    fn append(&self, job: &str, index: usize, bytes: &[u8]) -> Result<u64, StoreError>;

    /// Sequential reader over the entry's bytes.
    fn reader(&self, job: &str, index: usize) -> Result<Box<dyn Read + Send>, StoreError>;

    /// Drops every entry of the job.
    fn clear(&self, job: &str) -> Result<(), StoreError>;
}

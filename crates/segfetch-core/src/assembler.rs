//! Concatenate completed segments into the final artifact.
//!
//! Segments are written in index order into `<target>.part`, which is synced
//! and renamed over the target. A failure removes the temp file; segment
//! entries survive it and are cleared only after the rename.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

use crate::segmenter::Segment;
use crate::store::{SegmentStore, StoreError};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("segment {index} holds {found} of {expected} bytes")]
    IncompleteSegment {
        index: usize,
        expected: u64,
        found: u64,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path of the temp file for a given final path (e.g. `file.iso` -> `file.iso.part`).
pub fn temp_path(target: &Path) -> PathBuf {
    let mut s = target.as_os_str().to_os_string();
    s.push(TEMP_SUFFIX);
    PathBuf::from(s)
}

/// Writes `segments` (any order) of `job` into `target`. Returns the bytes written.
///
/// Every segment must hold at least its planned length; bytes beyond it are
/// ignored. On success the job's store entries are cleared.
pub fn assemble(
    store: &dyn SegmentStore,
    job: &str,
    segments: &[Segment],
    target: &Path,
) -> Result<u64, AssemblyError> {
    let mut ordered = segments.to_vec();
    ordered.sort_by_key(|s| s.index);

    for seg in &ordered {
        let found = store.existing_length(job, seg.index)?;
        if found < seg.len() {
            return Err(AssemblyError::IncompleteSegment {
                index: seg.index,
                expected: seg.len(),
                found,
            });
        }
    }

    let tmp = temp_path(target);
    let written = match write_segments(store, job, &ordered, &tmp)
        .and_then(|n| finalize(&tmp, target).map(|_| n))
    {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    tracing::debug!(job, bytes = written, target = %target.display(), "assembled");

    if let Err(e) = store.clear(job) {
        tracing::warn!(job, error = %e, "assembled but could not clear segment files");
    }
    Ok(written)
}

fn write_segments(
    store: &dyn SegmentStore,
    job: &str,
    segments: &[Segment],
    tmp: &Path,
) -> Result<u64, AssemblyError> {
    let io_err = |op: &'static str, source: io::Error| AssemblyError::Io {
        op,
        path: tmp.to_path_buf(),
        source,
    };
    let file = File::create(tmp).map_err(|e| io_err("create", e))?;
    let mut out = BufWriter::new(file);
    let mut total = 0u64;

    for seg in segments {
        let expected = seg.len();
        let mut reader = store.reader(job, seg.index)?.take(expected);
        let copied = io::copy(&mut reader, &mut out).map_err(|e| io_err("write", e))?;
        if copied != expected {
            return Err(AssemblyError::IncompleteSegment {
                index: seg.index,
                expected,
                found: copied,
            });
        }
        total += copied;
    }

    let file = out
        .into_inner()
        .map_err(|e| io_err("flush", e.into_error()))?;
    file.sync_all().map_err(|e| io_err("sync", e))?;
    Ok(total)
}

fn finalize(tmp: &Path, target: &Path) -> Result<(), AssemblyError> {
    fs::rename(tmp, target).map_err(|source| AssemblyError::Io {
        op: "rename",
        path: target.to_path_buf(),
        source,
    })
}

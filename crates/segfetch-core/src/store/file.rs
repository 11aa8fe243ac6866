//! On-disk segment store: one `<job>.part<index>` file per segment.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::{SegmentStore, StoreError};

/// File name of a segment entry, e.g. `report_2024.part3`.
pub fn segment_file_name(job: &str, index: usize) -> String {
    format!("{}.part{}", job, index)
}

/// Segment store backed by plain files in the output directory. Files survive
/// process restarts until the job is cleared.
#[derive(Debug, Clone)]
pub struct FileSegmentStore {
    dir: PathBuf,
}

impl FileSegmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job: &str, index: usize) -> PathBuf {
        self.dir.join(segment_file_name(job, index))
    }
}

/// True if `file_name` is `<job>.part<digits>`.
fn is_segment_of(file_name: &str, job: &str) -> bool {
    file_name
        .strip_prefix(job)
        .and_then(|rest| rest.strip_prefix(".part"))
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

impl SegmentStore for FileSegmentStore {
    fn existing_length(&self, job: &str, index: usize) -> Result<u64, StoreError> {
        let path = self.path_for(job, index);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StoreError::io("stat", path, e)),
        }
    }

    fn append(&self, job: &str, index: usize, bytes: &[u8]) -> Result<u64, StoreError> {
        let path = self.path_for(job, index);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io("open", &path, e))?;
        file.write_all(bytes)
            .map_err(|e| StoreError::io("append", &path, e))?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::io("stat", &path, e))?
            .len();
        Ok(len)
    }

    fn reader(&self, job: &str, index: usize) -> Result<Box<dyn Read + Send>, StoreError> {
        let path = self.path_for(job, index);
        match File::open(&path) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Missing {
                job: job.to_string(),
                index,
            }),
            Err(e) => Err(StoreError::io("open", path, e)),
        }
    }

    fn clear(&self, job: &str) -> Result<(), StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io("list", &self.dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("list", &self.dir, e))?;
            let name = entry.file_name();
            if !name.to_str().map(|n| is_segment_of(n, job)).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed segment file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io("remove", path, e)),
            }
        }
        Ok(())
    }
}

//! In-memory segment store for tests and ephemeral transfers.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use super::{SegmentStore, StoreError};

#[derive(Debug, Default)]
pub struct MemorySegmentStore {
    entries: Mutex<HashMap<(String, usize), Vec<u8>>>,
}

impl MemorySegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry, e.g. to simulate state left by an earlier run.
    pub fn insert(&self, job: &str, index: usize, bytes: &[u8]) {
        self.lock().insert((job.to_string(), index), bytes.to_vec());
    }

    /// Copy of an entry's bytes.
    pub fn get(&self, job: &str, index: usize) -> Option<Vec<u8>> {
        self.lock().get(&(job.to_string(), index)).cloned()
    }

    /// Number of entries held for `job`.
    pub fn entry_count(&self, job: &str) -> usize {
        self.lock().keys().filter(|(j, _)| j == job).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, usize), Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SegmentStore for MemorySegmentStore {
    fn existing_length(&self, job: &str, index: usize) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .get(&(job.to_string(), index))
            .map(|v| v.len() as u64)
            .unwrap_or(0))
    }

    fn append(&self, job: &str, index: usize, bytes: &[u8]) -> Result<u64, StoreError> {
        let mut entries = self.lock();
        let entry = entries.entry((job.to_string(), index)).or_default();
        entry.extend_from_slice(bytes);
        Ok(entry.len() as u64)
    }

    fn reader(&self, job: &str, index: usize) -> Result<Box<dyn Read + Send>, StoreError> {
        self.get(job, index)
            .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>)
            .ok_or_else(|| StoreError::Missing {
                job: job.to_string(),
                index,
            })
    }

    fn clear(&self, job: &str) -> Result<(), StoreError> {
        self.lock().retain(|(j, _), _| j != job);
        Ok(())
    }
}

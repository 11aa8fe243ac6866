//! Body sink that buffers response bytes and appends them to the segment store.

use crate::control::CancelToken;
use crate::http::{BodySink, ResponseHead, SinkControl};
use crate::progress::ProgressSink;
use crate::retry::SegmentError;
use crate::store::{SegmentStore, StoreError};

/// What a valid response head looks like for this request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Expect {
    /// Ranged segment request starting at `start`; only 206 is accepted.
    Range { start: u64 },
    /// Direct stream resumed at `resume_from` (0 for a fresh request).
    Direct { resume_from: u64 },
}

pub(crate) struct ChunkWriter<'a> {
    store: &'a dyn SegmentStore,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancelToken,
    job_key: &'a str,
    job_name: &'a str,
    index: usize,
    expect: Expect,
    /// Bytes still wanted; `None` accepts the whole body.
    limit: Option<u64>,
    chunk_size: usize,
    buffer: Vec<u8>,
    accepted: u64,
    /// Bytes appended to the store during this request.
    pub persisted: u64,
    /// Server ignored a resume request and sent the full body; the entry was cleared.
    pub restarted: bool,
    pub failure: Option<SegmentError>,
}

impl<'a> ChunkWriter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn SegmentStore,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancelToken,
        job_key: &'a str,
        job_name: &'a str,
        index: usize,
        expect: Expect,
        limit: Option<u64>,
        chunk_size: usize,
    ) -> Self {
        Self {
            store,
            progress,
            cancel,
            job_key,
            job_name,
            index,
            expect,
            limit,
            chunk_size: chunk_size.max(1),
            buffer: Vec::with_capacity(chunk_size.clamp(1, 1 << 20)),
            accepted: 0,
            persisted: 0,
            restarted: false,
            failure: None,
        }
    }

    /// Appends whatever is buffered. Called after every chunk and once more
    /// after the request returns, error or not.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.store.append(self.job_key, self.index, &self.buffer)?;
        let n = self.buffer.len() as u64;
        self.buffer.clear();
        self.persisted += n;
        self.progress.on_progress(self.job_name, n);
        Ok(())
    }

    fn fail(&mut self, e: SegmentError) -> SinkControl {
        self.failure = Some(e);
        SinkControl::Stop
    }

    fn check_range(&self, head: &ResponseHead, start: u64) -> Result<(), SegmentError> {
        match head.status {
            206 => {}
            416 => return Err(SegmentError::RangeNotSatisfiable),
            s if (200..300).contains(&s) => return Err(SegmentError::RangeIgnored(s)),
            s => return Err(SegmentError::Http(s)),
        }
        match head.content_range().and_then(|cr| cr.range) {
            Some((got, _)) if got != start => Err(SegmentError::RangeMismatch {
                expected: start,
                got,
            }),
            _ => Ok(()),
        }
    }

    fn check_direct(&mut self, head: &ResponseHead, resume_from: u64) -> Result<(), SegmentError> {
        match head.status {
            206 if resume_from > 0 => self.check_range(head, resume_from),
            200..=299 => {
                if resume_from > 0 {
                    tracing::info!(
                        job = %self.job_name,
                        discarded = resume_from,
                        "server ignored resume range, restarting stream"
                    );
                    self.store.clear(self.job_key)?;
                    self.progress.on_discard(self.job_name, resume_from);
                    self.restarted = true;
                }
                Ok(())
            }
            416 => Err(SegmentError::RangeNotSatisfiable),
            s => Err(SegmentError::Http(s)),
        }
    }
}

impl BodySink for ChunkWriter<'_> {
    fn begin(&mut self, head: &ResponseHead) -> SinkControl {
        let checked = match self.expect {
            Expect::Range { start } => self.check_range(head, start),
            Expect::Direct { resume_from } => self.check_direct(head, resume_from),
        };
        match checked {
            Ok(()) => SinkControl::Continue,
            Err(e) => self.fail(e),
        }
    }

    fn chunk(&mut self, data: &[u8]) -> SinkControl {
        if self.cancel.is_cancelled() {
            return self.fail(SegmentError::Cancelled);
        }
        let take = match self.limit {
            Some(limit) => (limit - self.accepted).min(data.len() as u64) as usize,
            None => data.len(),
        };
        self.buffer.extend_from_slice(&data[..take]);
        self.accepted += take as u64;

        if self.buffer.len() >= self.chunk_size {
            if let Err(e) = self.flush() {
                return self.fail(e.into());
            }
        }
        match self.limit {
            Some(limit) if self.accepted >= limit => SinkControl::Stop,
            _ => SinkControl::Continue,
        }
    }
}

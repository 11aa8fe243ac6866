//! Segment fetching: one ranged stream per segment, resumed from the store.
//!
//! Every attempt re-reads the persisted length, so a retry (or a later run)
//! asks only for the bytes still missing. Bytes reach the store in
//! `chunk_size` pieces and are never appended past the planned range.

mod direct;
mod sink;

use crate::control::CancelToken;
use crate::http::{HttpClient, RangeSpec, Request};
use crate::progress::ProgressSink;
use crate::retry::{run_with_retry, RetryPolicy, SegmentError};
use crate::segmenter::Segment;
use crate::store::SegmentStore;

pub use direct::DIRECT_INDEX;

use sink::{ChunkWriter, Expect};

/// Per-job fetch context shared by every segment worker of that job.
pub struct SegmentFetcher<'a> {
    client: &'a dyn HttpClient,
    store: &'a dyn SegmentStore,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancelToken,
    policy: RetryPolicy,
    chunk_size: usize,
    job_key: &'a str,
    job_name: &'a str,
}

impl<'a> SegmentFetcher<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: &'a dyn HttpClient,
        store: &'a dyn SegmentStore,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancelToken,
        policy: RetryPolicy,
        chunk_size: usize,
        job_key: &'a str,
        job_name: &'a str,
    ) -> Self {
        Self {
            client,
            store,
            progress,
            cancel,
            policy,
            chunk_size,
            job_key,
            job_name,
        }
    }

    /// Fetches the missing tail of `segment`, retrying per policy.
    /// Returns the bytes appended by this call (0 if it was already complete).
    pub fn fetch(&self, url: &str, segment: &Segment) -> Result<u64, SegmentError> {
        let mut fetched = 0u64;
        run_with_retry(&self.policy, self.cancel, |attempt| {
            let result = self.attempt(url, segment, attempt);
            match result {
                Ok(n) => {
                    fetched += n;
                    Ok(())
                }
                Err((n, e)) => {
                    fetched += n;
                    Err(e)
                }
            }
        })?;
        Ok(fetched)
    }

    /// One ranged request. On error, also reports the bytes it managed to persist.
    fn attempt(&self, url: &str, segment: &Segment, attempt: u32) -> Result<u64, (u64, SegmentError)> {
        let persisted = self
            .store
            .existing_length(self.job_key, segment.index)
            .map_err(|e| (0, e.into()))?;
        let Some(start) = segment.resume_start(persisted) else {
            tracing::debug!(job = %self.job_name, segment = segment.index, "segment already complete");
            return Ok(0);
        };
        let remaining = segment.end - start + 1;
        tracing::debug!(
            job = %self.job_name,
            segment = segment.index,
            attempt,
            start,
            end = segment.end,
            "fetching segment"
        );

        let req = Request::get(url).with_range(RangeSpec::Closed(start, segment.end));
        let mut sink = self.writer(segment.index, Expect::Range { start }, Some(remaining));
        let sent = self.client.send(&req, &mut sink);
        let flushed = sink.flush();
        let got = sink.persisted;

        if let Some(e) = sink.failure.take() {
            return Err((got, e));
        }
        flushed.map_err(|e| (got, e.into()))?;
        let head = sent.map_err(|e| (got, e.into()))?;
        match head.status {
            206 => {}
            416 => return Err((got, SegmentError::RangeNotSatisfiable)),
            s if (200..300).contains(&s) => return Err((got, SegmentError::RangeIgnored(s))),
            s => return Err((got, SegmentError::Http(s))),
        }
        if got < remaining {
            return Err((
                got,
                SegmentError::PartialTransfer {
                    expected: remaining,
                    received: got,
                },
            ));
        }
        Ok(got)
    }

    fn writer(&self, index: usize, expect: Expect, limit: Option<u64>) -> ChunkWriter<'a> {
        ChunkWriter::new(
            self.store,
            self.progress,
            self.cancel,
            self.job_key,
            self.job_name,
            index,
            expect,
            limit,
            self.chunk_size,
        )
    }
}

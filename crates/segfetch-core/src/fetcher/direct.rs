//! Single-stream fetch for resources whose total length is unknown.
//!
//! The stream is stored as segment 0 of the job. A resumed request asks for
//! `bytes=<persisted>-`; a 206 appends, a full 200 restarts the entry and a
//! 416 means nothing is left to fetch.

use crate::http::{RangeSpec, Request};
use crate::retry::{run_with_retry, SegmentError};

use super::sink::Expect;
use super::SegmentFetcher;

/// Store index of the direct stream.
pub const DIRECT_INDEX: usize = 0;

impl SegmentFetcher<'_> {
    /// Streams the whole resource into entry 0, retrying per policy.
    /// Returns the entry's final length.
    pub fn fetch_direct(&self, url: &str) -> Result<u64, SegmentError> {
        run_with_retry(&self.policy, self.cancel, |attempt| {
            self.direct_attempt(url, attempt)
        })?;
        Ok(self.store.existing_length(self.job_key, DIRECT_INDEX)?)
    }

    fn direct_attempt(&self, url: &str, attempt: u32) -> Result<(), SegmentError> {
        let persisted = self.store.existing_length(self.job_key, DIRECT_INDEX)?;
        tracing::debug!(job = %self.job_name, attempt, resume_from = persisted, "direct fetch");

        let mut req = Request::get(url);
        if persisted > 0 {
            req = req.with_range(RangeSpec::From(persisted));
        }
        let mut sink = self.writer(
            DIRECT_INDEX,
            Expect::Direct {
                resume_from: persisted,
            },
            None,
        );
        let sent = self.client.send(&req, &mut sink);
        let flushed = sink.flush();

        match sink.failure.take() {
            Some(SegmentError::RangeNotSatisfiable) if persisted > 0 => return Ok(()),
            Some(e) => return Err(e),
            None => {}
        }
        flushed?;
        let head = sent?;
        match head.status {
            416 if persisted > 0 => return Ok(()),
            200 if persisted > 0 && !sink.restarted => {
                // Full response with no body: the resource is now empty.
                self.store.clear(self.job_key)?;
                self.progress.on_discard(self.job_name, persisted);
            }
            s if (200..300).contains(&s) => {}
            s => return Err(SegmentError::Http(s)),
        }
        if let Some(expected) = head.content_length() {
            if sink.persisted < expected {
                return Err(SegmentError::PartialTransfer {
                    expected,
                    received: sink.persisted,
                });
            }
        }
        Ok(())
    }
}

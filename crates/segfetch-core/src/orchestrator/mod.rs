//! Per-job state machine.
//!
//! `Planning -> SizeKnown -> Segmenting -> Fetching <-> RetryAttempt ->
//! Assembling -> Done`, with `SizeUnknown -> DirectFetch -> Assembling` for
//! resources whose length cannot be discovered. Segment state lives in the
//! store between rounds and between runs, so every round (and every restart
//! of the process) fetches only what is still missing.

mod pool;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::assembler;
use crate::config::EngineConfig;
use crate::control::CancelToken;
use crate::error::TransferError;
use crate::fetcher::{SegmentFetcher, DIRECT_INDEX};
use crate::http::{CurlClient, HttpClient};
use crate::job::{TransferJob, TransferOutcome};
use crate::progress::ProgressSink;
use crate::resolver::SizeResolver;
use crate::retry::SegmentError;
use crate::segmenter::{plan_segments, Segment};
use crate::store::{FileSegmentStore, SegmentStore, StoreError};

#[derive(Debug)]
enum State {
    Planning,
    SizeKnown {
        url: String,
        total: u64,
    },
    SizeUnknown {
        url: String,
    },
    Segmenting {
        url: String,
        total: u64,
    },
    Fetching {
        url: String,
        segments: Vec<Segment>,
        round: u32,
    },
    RetryAttempt {
        url: String,
        segments: Vec<Segment>,
        round: u32,
        index: usize,
        cause: SegmentError,
    },
    DirectFetch {
        url: String,
    },
    Assembling {
        segments: Vec<Segment>,
    },
    Done(Result<(PathBuf, u64), TransferError>),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Planning => "planning",
            State::SizeKnown { .. } => "size-known",
            State::SizeUnknown { .. } => "size-unknown",
            State::Segmenting { .. } => "segmenting",
            State::Fetching { .. } => "fetching",
            State::RetryAttempt { .. } => "retry-attempt",
            State::DirectFetch { .. } => "direct-fetch",
            State::Assembling { .. } => "assembling",
            State::Done(_) => "done",
        }
    }
}

/// Runs transfer jobs. Shared by every job of a batch; each `submit` call is
/// independent and blocking.
pub struct TransferEngine {
    config: EngineConfig,
    client: Arc<dyn HttpClient>,
    store: Arc<dyn SegmentStore>,
    progress: Arc<dyn ProgressSink>,
}

impl TransferEngine {
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn HttpClient>,
        store: Arc<dyn SegmentStore>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            client,
            store,
            progress,
        }
    }

    /// libcurl client and segment files kept next to the artifacts in `output_dir`.
    pub fn with_defaults(config: EngineConfig, progress: Arc<dyn ProgressSink>) -> Self {
        let store = Arc::new(FileSegmentStore::new(config.output_dir.clone()));
        Self::new(config, Arc::new(CurlClient::default()), store, progress)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `job` to a terminal outcome. Never panics on transfer failures.
    pub fn submit(&self, job: &TransferJob, cancel: &CancelToken) -> TransferOutcome {
        let started = Instant::now();
        let result = self.run(job, cancel);
        match &result {
            Ok((path, bytes)) => tracing::info!(
                job = %job.name,
                bytes,
                path = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "transfer complete"
            ),
            Err(e) => tracing::warn!(job = %job.name, error = %e, "transfer failed"),
        }
        self.progress.on_finish(&job.name);
        result.into()
    }

    fn run(&self, job: &TransferJob, cancel: &CancelToken) -> Result<(PathBuf, u64), TransferError> {
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .map_err(|e| StoreError::io("create directory", output_dir, e))?;

        let key = job.key();
        let target = output_dir.join(job.file_name());
        let fetcher = SegmentFetcher::new(
            self.client.as_ref(),
            self.store.as_ref(),
            self.progress.as_ref(),
            cancel,
            self.config.retry,
            self.config.chunk_size,
            &key,
            &job.name,
        );

        let mut state = State::Planning;
        loop {
            tracing::debug!(job = %job.name, state = state.name(), "transfer state");
            state = match state {
                State::Planning => self.plan(job),
                State::SizeKnown { url, total } => {
                    self.progress.on_start(&job.name, total);
                    State::Segmenting { url, total }
                }
                State::Segmenting { url, total } => {
                    let count = match job.segment_count {
                        0 => self.config.segment_count,
                        n => n,
                    };
                    match plan_segments(total, count) {
                        Ok(segments) => {
                            self.report_resumed(&job.name, &key, &segments)?;
                            State::Fetching {
                                url,
                                segments,
                                round: 1,
                            }
                        }
                        Err(e) => State::Done(Err(e.into())),
                    }
                }
                State::SizeUnknown { url } => {
                    self.progress.on_start(&job.name, 0);
                    let persisted = self.store.existing_length(&key, DIRECT_INDEX)?;
                    if persisted > 0 {
                        tracing::info!(job = %job.name, persisted, "resuming direct stream");
                        self.progress.on_resume(&job.name, persisted);
                    }
                    State::DirectFetch { url }
                }
                State::Fetching {
                    url,
                    segments,
                    round,
                } => self.fetch_round(&fetcher, &job.name, &key, url, segments, round, cancel)?,
                State::RetryAttempt {
                    url,
                    segments,
                    round,
                    index,
                    cause,
                } => {
                    if round >= self.config.attempt_rounds {
                        State::Done(Err(TransferError::SegmentExhausted { index, cause }))
                    } else {
                        tracing::warn!(
                            job = %job.name,
                            round,
                            segment = index,
                            error = %cause,
                            "segments failed, starting another round"
                        );
                        if cancel.sleep(self.config.round_delay) {
                            State::Fetching {
                                url,
                                segments,
                                round: round + 1,
                            }
                        } else {
                            State::Done(Err(TransferError::Cancelled))
                        }
                    }
                }
                State::DirectFetch { url } => match fetcher.fetch_direct(&url) {
                    Ok(len) => State::Assembling {
                        segments: direct_segments(len),
                    },
                    Err(SegmentError::Cancelled) => State::Done(Err(TransferError::Cancelled)),
                    Err(SegmentError::Storage(e)) => State::Done(Err(e.into())),
                    Err(e) => State::Done(Err(TransferError::DirectFetchFailed(e))),
                },
                State::Assembling { segments } => {
                    State::Done(self.assemble(&key, &segments, &target))
                }
                State::Done(result) => return result,
            };
        }
    }

    fn plan(&self, job: &TransferJob) -> State {
        if job.total_length > 0 {
            return State::SizeKnown {
                url: job.url.clone(),
                total: job.total_length,
            };
        }
        let resolution =
            SizeResolver::new(self.client.as_ref(), self.config.probe_timeout).probe(&job.url);
        tracing::debug!(
            job = %job.name,
            total = resolution.total_length,
            location = %resolution.location,
            "size probe"
        );
        if resolution.total_length > 0 {
            State::SizeKnown {
                url: resolution.location,
                total: resolution.total_length,
            }
        } else {
            State::SizeUnknown {
                url: resolution.location,
            }
        }
    }

    fn report_resumed(&self, name: &str, key: &str, segments: &[Segment]) -> Result<(), TransferError> {
        let mut persisted = 0u64;
        for seg in segments {
            persisted += self.store.existing_length(key, seg.index)?.min(seg.len());
        }
        if persisted > 0 {
            tracing::info!(job = %name, persisted, "resuming from segment files");
            self.progress.on_resume(name, persisted);
        }
        Ok(())
    }

    /// One pass over the incomplete segments, then the next state.
    #[allow(clippy::too_many_arguments)]
    fn fetch_round(
        &self,
        fetcher: &SegmentFetcher<'_>,
        name: &str,
        key: &str,
        url: String,
        segments: Vec<Segment>,
        round: u32,
        cancel: &CancelToken,
    ) -> Result<State, TransferError> {
        if cancel.is_cancelled() {
            return Ok(State::Done(Err(TransferError::Cancelled)));
        }
        let mut pending = Vec::new();
        for seg in &segments {
            if !seg.is_complete(self.store.existing_length(key, seg.index)?) {
                pending.push(*seg);
            }
        }

        let results = pool::fetch_all(fetcher, &url, pending, self.config.max_concurrent_segments);
        let mut failures: Vec<(usize, SegmentError)> = results
            .into_iter()
            .filter_map(|(index, res)| res.err().map(|e| (index, e)))
            .collect();
        failures.sort_by_key(|(index, _)| *index);

        if failures.is_empty() {
            return Ok(State::Assembling { segments });
        }
        if failures
            .iter()
            .any(|(_, e)| matches!(e, SegmentError::Cancelled))
        {
            return Ok(State::Done(Err(TransferError::Cancelled)));
        }
        if failures
            .iter()
            .any(|(_, e)| matches!(e, SegmentError::RangeIgnored(_)))
        {
            tracing::info!(url = %url, "server ignores byte ranges, switching to a single stream");
            let mut discarded = 0u64;
            for seg in &segments {
                discarded += self.store.existing_length(key, seg.index)?.min(seg.len());
            }
            self.store.clear(key)?;
            self.progress.on_discard(name, discarded);
            return Ok(State::DirectFetch { url });
        }
        if let Some(pos) = failures
            .iter()
            .position(|(_, e)| matches!(e, SegmentError::Storage(_)))
        {
            if let (_, SegmentError::Storage(e)) = failures.remove(pos) {
                return Err(e.into());
            }
        }

        let (index, cause) = failures.remove(0);
        Ok(State::RetryAttempt {
            url,
            segments,
            round,
            index,
            cause,
        })
    }

    fn assemble(
        &self,
        key: &str,
        segments: &[Segment],
        target: &Path,
    ) -> Result<(PathBuf, u64), TransferError> {
        let bytes = assembler::assemble(self.store.as_ref(), key, segments, target)?;
        Ok((target.to_path_buf(), bytes))
    }
}

/// The direct stream as a single planned segment (none for an empty body).
fn direct_segments(len: u64) -> Vec<Segment> {
    if len == 0 {
        return Vec::new();
    }
    vec![Segment {
        index: DIRECT_INDEX,
        start: 0,
        end: len - 1,
    }]
}

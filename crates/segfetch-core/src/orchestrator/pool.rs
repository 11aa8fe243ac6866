//! Bounded segment pool: up to `max_concurrent` scoped worker threads pull
//! segments off a shared queue and report `(index, result)` over a channel.

use std::collections::VecDeque;
use std::sync::{mpsc, Mutex};

use crate::fetcher::SegmentFetcher;
use crate::retry::SegmentError;
use crate::segmenter::Segment;

pub(super) type SegmentResult = Result<u64, SegmentError>;

/// Fetches every segment in `pending` and returns one result per segment,
/// in completion order.
pub(super) fn fetch_all(
    fetcher: &SegmentFetcher<'_>,
    url: &str,
    pending: Vec<Segment>,
    max_concurrent: usize,
) -> Vec<(usize, SegmentResult)> {
    let count = pending.len();
    if count == 0 {
        return Vec::new();
    }
    let indices: Vec<usize> = pending.iter().map(|s| s.index).collect();
    let work = Mutex::new(pending.into_iter().collect::<VecDeque<_>>());
    let (tx, rx) = mpsc::channel();
    let num_workers = max_concurrent.max(1).min(count);

    let mut results: Vec<(usize, SegmentResult)> = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            handles.push(scope.spawn(move || loop {
                let next = work.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                let Some(segment) = next else { break };
                let res = fetcher.fetch(url, &segment);
                if tx.send((segment.index, res)).is_err() {
                    break;
                }
            }));
        }
        drop(tx);

        let received: Vec<_> = rx.iter().collect();
        for h in handles {
            if h.join().is_err() {
                tracing::error!("segment worker panicked");
            }
        }
        received
    });

    // A panicked worker takes its in-flight segment with it.
    for index in indices {
        if !results.iter().any(|(i, _)| *i == index) {
            results.push((index, Err(SegmentError::WorkerPanicked)));
        }
    }
    results
}

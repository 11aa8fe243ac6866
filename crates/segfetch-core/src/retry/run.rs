//! Retry loop: run a closure until success or policy says stop.

use crate::control::CancelToken;

use super::classify;
use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. Backoff sleeps wake early on
/// cancellation, in which case `SegmentError::Cancelled` is returned.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, SegmentError>
where
    F: FnMut(u32) -> Result<T, SegmentError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled);
        }
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(
                            attempt,
                            max_attempts = policy.max_attempts,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "attempt failed, backing off"
                        );
                        if !cancel.sleep(d) {
                            return Err(SegmentError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures, HTTP
//! errors) and exponential backoff decisions shared by the segment fetcher and
//! the direct fetch path.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_http_status, classify_transport};
pub use error::SegmentError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy, RetryProfile};
pub use run::run_with_retry;

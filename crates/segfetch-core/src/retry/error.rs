//! Per-attempt segment error type for retry classification.

use std::fmt;

use crate::http::TransportError;
use crate::store::StoreError;

/// Error returned by one fetch attempt of a segment (or of the direct stream).
/// Classified into an [`ErrorKind`](super::ErrorKind) before deciding retries.
#[derive(Debug)]
pub enum SegmentError {
    /// The client reported a network failure.
    Transport(TransportError),
    /// Response had an error status.
    Http(u32),
    /// 416 for a range that should exist.
    RangeNotSatisfiable,
    /// Server answered a ranged request with a full (non-206) 2xx body.
    RangeIgnored(u32),
    /// 206 whose Content-Range does not start where we asked.
    RangeMismatch { expected: u64, got: u64 },
    /// Stream ended before the requested range was complete.
    PartialTransfer { expected: u64, received: u64 },
    /// Segment storage failed (disk full, permission denied). Not retried.
    Storage(StoreError),
    /// Cancellation was requested.
    Cancelled,
    /// The worker thread fetching the segment panicked.
    WorkerPanicked,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Transport(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::RangeNotSatisfiable => write!(f, "HTTP 416 range not satisfiable"),
            SegmentError::RangeIgnored(code) => {
                write!(f, "server ignored Range header (HTTP {})", code)
            }
            SegmentError::RangeMismatch { expected, got } => {
                write!(f, "Content-Range starts at {}, expected {}", got, expected)
            }
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Cancelled => write!(f, "cancelled"),
            SegmentError::WorkerPanicked => write!(f, "segment worker panicked"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Transport(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SegmentError {
    fn from(e: StoreError) -> Self {
        SegmentError::Storage(e)
    }
}

impl From<TransportError> for SegmentError {
    fn from(e: TransportError) -> Self {
        SegmentError::Transport(e)
    }
}

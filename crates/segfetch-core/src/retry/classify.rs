//! Classify HTTP status and transport errors into retry policy error kinds.

use crate::http::{TransportError, TransportErrorKind};

use super::error::SegmentError;
use super::policy::ErrorKind;

/// Classify an HTTP error status for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        416 => ErrorKind::RangeNotSatisfiable,
        _ => ErrorKind::Http(code.min(u16::MAX as u32) as u16),
    }
}

/// Classify a client-reported transport failure.
pub fn classify_transport(e: &TransportError) -> ErrorKind {
    match e.kind {
        TransportErrorKind::Timeout => ErrorKind::Timeout,
        TransportErrorKind::Connection | TransportErrorKind::Other => ErrorKind::Connection,
    }
}

/// Classify a segment attempt error into an ErrorKind.
pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Transport(t) => classify_transport(t),
        SegmentError::Http(code) => classify_http_status(*code),
        SegmentError::RangeNotSatisfiable => ErrorKind::RangeNotSatisfiable,
        SegmentError::RangeMismatch { .. } => ErrorKind::Http(206),
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        SegmentError::RangeIgnored(_)
        | SegmentError::Storage(_)
        | SegmentError::Cancelled
        | SegmentError::WorkerPanicked => ErrorKind::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_416_is_range_error() {
        assert_eq!(classify_http_status(416), ErrorKind::RangeNotSatisfiable);
    }

    #[test]
    fn other_statuses_keep_code() {
        assert_eq!(classify_http_status(500), ErrorKind::Http(500));
        assert_eq!(classify_http_status(404), ErrorKind::Http(404));
    }

    #[test]
    fn transport_kinds() {
        let t = TransportError::new(TransportErrorKind::Timeout, "timed out");
        assert_eq!(classify(&SegmentError::Transport(t)), ErrorKind::Timeout);
        let c = TransportError::new(TransportErrorKind::Other, "tls");
        assert_eq!(classify(&SegmentError::Transport(c)), ErrorKind::Connection);
    }

    #[test]
    fn non_retryable_errors_are_fatal() {
        assert_eq!(classify(&SegmentError::Cancelled), ErrorKind::Fatal);
        assert_eq!(classify(&SegmentError::RangeIgnored(200)), ErrorKind::Fatal);
        assert_eq!(
            classify(&SegmentError::PartialTransfer { expected: 10, received: 3 }),
            ErrorKind::Connection
        );
    }
}

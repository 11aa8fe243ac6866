//! HTTP transport seam.
//!
//! The engine talks to the network only through [`HttpClient`]. The production
//! implementation is [`CurlClient`] (libcurl via the `curl` crate); tests plug
//! in scripted clients that feed a [`BodySink`] directly.

mod curl_client;
mod head;
#[cfg(test)]
pub(crate) mod testing;

pub use curl_client::{CurlClient, CurlOptions};
pub use head::{parse_content_range, ContentRange, ResponseHead};
pub(crate) use head::HeaderLines;

use std::time::Duration;

/// Request method. Only the two the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// Byte range to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-end`, both inclusive.
    Closed(u64, u64),
    /// `bytes=start-` (open-ended).
    From(u64),
}

impl RangeSpec {
    /// Value of the `Range` header, e.g. `bytes=0-0`.
    pub fn header_value(&self) -> String {
        format!("bytes={}", self.spec())
    }

    /// Range without the unit prefix (the form libcurl expects).
    pub fn spec(&self) -> String {
        match *self {
            RangeSpec::Closed(start, end) => format!("{}-{}", start, end),
            RangeSpec::From(start) => format!("{}-", start),
        }
    }

    pub fn start(&self) -> u64 {
        match *self {
            RangeSpec::Closed(start, _) | RangeSpec::From(start) => start,
        }
    }
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    pub range: Option<RangeSpec>,
    pub follow_redirects: bool,
    /// Overall deadline; `None` uses the client's transfer timeout.
    pub timeout: Option<Duration>,
}

impl<'a> Request<'a> {
    pub fn get(url: &'a str) -> Self {
        Self {
            method: Method::Get,
            url,
            range: None,
            follow_redirects: true,
            timeout: None,
        }
    }

    pub fn head(url: &'a str) -> Self {
        Self {
            method: Method::Head,
            ..Self::get(url)
        }
    }

    pub fn with_range(mut self, range: RangeSpec) -> Self {
        self.range = Some(range);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Whether the client should keep delivering body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Stop,
}

/// Receiver for a response body.
///
/// `begin` is called once with the final response head before the first body
/// byte; it is never called for responses without a body.
pub trait BodySink {
    fn begin(&mut self, head: &ResponseHead) -> SinkControl;
    fn chunk(&mut self, data: &[u8]) -> SinkControl;
}

/// Sink for probes: stops as soon as the body starts.
#[derive(Debug, Default)]
pub struct DiscardBody;

impl BodySink for DiscardBody {
    fn begin(&mut self, _head: &ResponseHead) -> SinkControl {
        SinkControl::Stop
    }

    fn chunk(&mut self, _data: &[u8]) -> SinkControl {
        SinkControl::Stop
    }
}

/// Coarse transport failure category (drives retry classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connect or transfer deadline hit, or throughput stalled.
    Timeout,
    /// DNS, connect, reset, send/recv failure.
    Connection,
    /// Anything else reported by the client (bad URL, TLS, protocol).
    Other,
}

/// Network-level failure reported by an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Blocking HTTP client used by every network-facing component.
///
/// A stop requested by the sink is not an error: `send` returns the response
/// head and the caller inspects its own sink for the reason.
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        request: &Request<'_>,
        sink: &mut dyn BodySink,
    ) -> Result<ResponseHead, TransportError>;

    /// Sends a request and ignores any body.
    fn probe(&self, request: &Request<'_>) -> Result<ResponseHead, TransportError> {
        self.send(request, &mut DiscardBody)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_spec_values() {
        assert_eq!(RangeSpec::Closed(0, 0).header_value(), "bytes=0-0");
        assert_eq!(RangeSpec::Closed(250, 499).spec(), "250-499");
        assert_eq!(RangeSpec::From(4096).header_value(), "bytes=4096-");
        assert_eq!(RangeSpec::From(7).start(), 7);
    }

    #[test]
    fn request_builders() {
        let r = Request::head("http://h/x").follow_redirects(false);
        assert_eq!(r.method, Method::Head);
        assert!(!r.follow_redirects);
        let g = Request::get("http://h/x").with_range(RangeSpec::Closed(1, 2));
        assert_eq!(g.method, Method::Get);
        assert!(g.follow_redirects);
        assert_eq!(g.range, Some(RangeSpec::Closed(1, 2)));
    }
}

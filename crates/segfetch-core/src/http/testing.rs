//! Scripted in-process client for unit tests.

use std::sync::{Arc, Mutex};

use super::{
    BodySink, HttpClient, Method, RangeSpec, Request, ResponseHead, SinkControl, TransportError,
    TransportErrorKind,
};

/// Bytes handed to the sink per `chunk` call.
const DELIVERY: usize = 7;

/// What the scripted server answers for one request.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub head: ResponseHead,
    pub body: Vec<u8>,
    /// Returned after `body` has been delivered.
    pub error: Option<TransportError>,
}

impl Reply {
    pub fn status(status: u32) -> Self {
        Self {
            head: ResponseHead::new(status),
            body: Vec::new(),
            error: None,
        }
    }

    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.head = self.head.with_header(name, value);
        self
    }

    pub fn then_reset(mut self) -> Self {
        self.error = Some(TransportError::new(
            TransportErrorKind::Connection,
            "connection reset by peer",
        ));
        self
    }

    pub fn transport(kind: TransportErrorKind) -> Self {
        Self {
            error: Some(TransportError::new(kind, "scripted transport failure")),
            ..Self::status(0)
        }
    }
}

/// A request as seen by the scripted client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Seen {
    pub method: Method,
    pub url: String,
    pub range: Option<RangeSpec>,
    pub follow_redirects: bool,
}

type Handler = dyn Fn(&Seen) -> Reply + Send + Sync;

pub(crate) struct ScriptedClient {
    handler: Box<Handler>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedClient {
    pub fn new(handler: impl Fn(&Seen) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Well-behaved range server for `data` at any URL.
    pub fn serving(data: Arc<Vec<u8>>) -> Self {
        Self::new(move |req| range_reply(&data, req))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// Ranges of GET requests, in arrival order.
    pub fn ranges(&self) -> Vec<Option<RangeSpec>> {
        self.seen()
            .into_iter()
            .filter(|s| s.method == Method::Get)
            .map(|s| s.range)
            .collect()
    }
}

/// Answer `req` the way a range-capable server holding `data` would.
pub(crate) fn range_reply(data: &[u8], req: &Seen) -> Reply {
    let len = data.len() as u64;
    if req.method == Method::Head {
        return Reply::status(200).with_header("Content-Length", len.to_string());
    }
    let (start, end) = match req.range {
        None => {
            return Reply::status(200)
                .with_header("Content-Length", len.to_string())
                .with_body(data)
        }
        Some(RangeSpec::Closed(s, e)) => (s, e.min(len.saturating_sub(1))),
        Some(RangeSpec::From(s)) => (s, len.saturating_sub(1)),
    };
    if start >= len {
        return Reply::status(416).with_header("Content-Range", format!("bytes */{}", len));
    }
    Reply::status(206)
        .with_header("Content-Range", format!("bytes {}-{}/{}", start, end, len))
        .with_header("Content-Length", (end - start + 1).to_string())
        .with_body(&data[start as usize..=end as usize])
}

impl HttpClient for ScriptedClient {
    fn send(
        &self,
        request: &Request<'_>,
        sink: &mut dyn BodySink,
    ) -> Result<ResponseHead, TransportError> {
        let seen = Seen {
            method: request.method,
            url: request.url.to_string(),
            range: request.range,
            follow_redirects: request.follow_redirects,
        };
        let reply = (self.handler)(&seen);
        self.seen.lock().unwrap().push(seen);

        if request.method == Method::Get && !reply.body.is_empty() {
            if sink.begin(&reply.head) == SinkControl::Stop {
                return Ok(reply.head);
            }
            for piece in reply.body.chunks(DELIVERY) {
                if sink.chunk(piece) == SinkControl::Stop {
                    return Ok(reply.head);
                }
            }
        }
        match reply.error {
            Some(e) => Err(e),
            None => Ok(reply.head),
        }
    }
}

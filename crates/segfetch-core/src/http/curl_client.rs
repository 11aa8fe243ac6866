//! libcurl-backed [`HttpClient`].

use std::cell::RefCell;
use std::time::Duration;

use super::{
    BodySink, HeaderLines, HttpClient, Method, Request, ResponseHead, SinkControl,
    TransportError, TransportErrorKind,
};

/// Per-handle curl settings.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard deadline for requests that do not carry their own timeout.
    pub transfer_timeout: Duration,
    pub max_redirections: u32,
    /// Receive buffer size hint (None = libcurl default).
    pub buffer_size: Option<usize>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            transfer_timeout: Duration::from_secs(3600),
            max_redirections: 10,
            buffer_size: None,
        }
    }
}

/// Blocking client: one curl easy handle per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlClient {
    opts: CurlOptions,
}

impl CurlClient {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, request: &Request<'_>) -> Result<(), curl::Error> {
        easy.url(request.url)?;
        if request.method == Method::Head {
            easy.nobody(true)?;
        }
        easy.follow_location(request.follow_redirects)?;
        if request.follow_redirects {
            easy.max_redirections(self.opts.max_redirections)?;
        }
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.low_speed_limit(self.opts.low_speed_limit)?;
        easy.low_speed_time(self.opts.low_speed_time)?;
        easy.timeout(request.timeout.unwrap_or(self.opts.transfer_timeout))?;
        if let Some(sz) = self.opts.buffer_size {
            easy.buffer_size(sz)?;
        }
        if let Some(range) = request.range {
            // curl expects "start-end" / "start-", not "bytes=..."
            easy.range(&range.spec())?;
        }
        Ok(())
    }
}

impl HttpClient for CurlClient {
    fn send(
        &self,
        request: &Request<'_>,
        sink: &mut dyn BodySink,
    ) -> Result<ResponseHead, TransportError> {
        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, request).map_err(|e| from_curl(&e))?;

        let lines = RefCell::new(HeaderLines::default());
        let mut began = false;
        let mut stopped = false;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    lines.borrow_mut().push(data);
                    true
                })
                .map_err(|e| from_curl(&e))?;
            transfer
                .write_function(|data| {
                    if !began {
                        began = true;
                        let head = lines.borrow().to_head();
                        if sink.begin(&head) == SinkControl::Stop {
                            stopped = true;
                            return Ok(0);
                        }
                    }
                    match sink.chunk(data) {
                        SinkControl::Continue => Ok(data.len()),
                        SinkControl::Stop => {
                            stopped = true;
                            Ok(0)
                        }
                    }
                })
                .map_err(|e| from_curl(&e))?;
            transfer.perform()
        };

        let mut head = lines.into_inner().to_head();
        if head.status == 0 {
            head.status = easy.response_code().unwrap_or(0);
        }
        match performed {
            Ok(()) => Ok(head),
            Err(e) if e.is_write_error() && stopped => Ok(head),
            Err(e) => Err(from_curl(&e)),
        }
    }
}

/// Map a curl error onto the transport taxonomy.
fn from_curl(e: &curl::Error) -> TransportError {
    let kind = if e.is_operation_timedout() {
        TransportErrorKind::Timeout
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        TransportErrorKind::Connection
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_documented_limits() {
        let o = CurlOptions::default();
        assert_eq!(o.connect_timeout, Duration::from_secs(30));
        assert_eq!(o.low_speed_limit, 1024);
        assert_eq!(o.max_redirections, 10);
        assert!(o.buffer_size.is_none());
    }

    #[test]
    fn curl_timeout_maps_to_timeout_kind() {
        let e = curl::Error::new(28); // CURLE_OPERATION_TIMEDOUT
        assert_eq!(from_curl(&e).kind, TransportErrorKind::Timeout);
        let e = curl::Error::new(7); // CURLE_COULDNT_CONNECT
        assert_eq!(from_curl(&e).kind, TransportErrorKind::Connection);
        let e = curl::Error::new(3); // CURLE_URL_MALFORMAT
        assert_eq!(from_curl(&e).kind, TransportErrorKind::Other);
    }
}

//! Total-length discovery for a resource URL.
//!
//! Three strategies run in order until one yields a positive length:
//! a HEAD request, a one-byte ranged GET whose `Content-Range` carries the
//! total, and following a redirect `Location` (re-running both). A result of
//! 0 means "unknown" and sends the job down the single-stream path.

use std::collections::HashSet;
use std::time::Duration;

use crate::http::{HttpClient, RangeSpec, Request};

/// Redirect hops followed before giving up.
const MAX_HOPS: usize = 5;

/// Outcome of a size probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Total length in bytes; 0 when no strategy produced one.
    pub total_length: u64,
    /// URL the length was discovered at (after redirects). Fetches use it.
    pub location: String,
}

enum RangeProbe {
    Total(u64),
    Redirect(String),
    Nothing,
}

pub struct SizeResolver<'a> {
    client: &'a dyn HttpClient,
    timeout: Duration,
}

impl<'a> SizeResolver<'a> {
    pub fn new(client: &'a dyn HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Total length of the resource, or 0 if unknown. Never fails.
    pub fn resolve(&self, url: &str) -> u64 {
        self.probe(url).total_length
    }

    pub fn probe(&self, url: &str) -> Resolution {
        let mut current = url.to_string();
        let mut visited = HashSet::new();

        for _ in 0..=MAX_HOPS {
            visited.insert(current.clone());
            if let Some(total_length) = self.head_length(&current) {
                return Resolution {
                    total_length,
                    location: current,
                };
            }
            match self.range_probe(&current) {
                RangeProbe::Total(total_length) => {
                    return Resolution {
                        total_length,
                        location: current,
                    }
                }
                RangeProbe::Redirect(next) if !visited.contains(&next) => {
                    tracing::debug!(from = %current, to = %next, "probe following redirect");
                    current = next;
                }
                RangeProbe::Redirect(_) | RangeProbe::Nothing => break,
            }
        }

        tracing::debug!(url = %current, "total length unknown");
        Resolution {
            total_length: 0,
            location: current,
        }
    }

    fn head_length(&self, url: &str) -> Option<u64> {
        let req = Request::head(url)
            .follow_redirects(false)
            .with_timeout(self.timeout);
        match self.client.probe(&req) {
            Ok(head) if head.is_success() => head.content_length().filter(|n| *n > 0),
            Ok(head) => {
                tracing::debug!(url, status = head.status, "HEAD probe rejected");
                None
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD probe failed");
                None
            }
        }
    }

    fn range_probe(&self, url: &str) -> RangeProbe {
        let req = Request::get(url)
            .with_range(RangeSpec::Closed(0, 0))
            .follow_redirects(false)
            .with_timeout(self.timeout);
        let head = match self.client.probe(&req) {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!(url, error = %e, "range probe failed");
                return RangeProbe::Nothing;
            }
        };
        if head.status == 206 {
            return match head.content_range().and_then(|cr| cr.total) {
                Some(total) if total > 0 => RangeProbe::Total(total),
                _ => RangeProbe::Nothing,
            };
        }
        if head.is_redirect() {
            if let Some(next) = head.location().and_then(|loc| join_location(url, loc)) {
                return RangeProbe::Redirect(next);
            }
        }
        RangeProbe::Nothing
    }
}

/// Resolve a possibly relative `Location` against the URL that returned it.
fn join_location(base: &str, location: &str) -> Option<String> {
    match url::Url::parse(base) {
        Ok(base) => base.join(location).ok().map(String::from),
        Err(_) => url::Url::parse(location).ok().map(String::from),
    }
}

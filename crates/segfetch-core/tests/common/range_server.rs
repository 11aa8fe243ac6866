//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body at every path except `/redirect`, which answers
//! 302 pointing at `/file`. Every request line and Range header is recorded.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// If true, HEAD returns 405 (simulates servers that block HEAD).
    pub head_blocked: bool,
    /// If true, HEAD omits Content-Length.
    pub head_without_length: bool,
    /// If true, GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// Ranged GETs starting at this offset fail with 500 ...
    pub fail_range_start: Option<u64>,
    /// ... this many times (u32::MAX: always).
    pub fail_times: u32,
    /// Pause between 1 KiB body writes.
    pub throttle: Option<Duration>,
}

/// A request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    /// Raw Range header value, e.g. `bytes=0-99`.
    pub range: Option<String>,
}

struct Shared {
    body: Vec<u8>,
    opts: RangeServerOptions,
    failures_left: AtomicU32,
    seen: Mutex<Vec<SeenRequest>>,
}

pub struct RangeServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/file".
    pub url: String,
    shared: Arc<Shared>,
}

impl RangeServer {
    /// Base address without a path, e.g. "http://127.0.0.1:12345".
    pub fn origin(&self) -> &str {
        self.url.trim_end_matches("/file")
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.shared.seen.lock().unwrap().clone()
    }

    /// Range headers of GET requests, sorted.
    pub fn get_ranges(&self) -> Vec<String> {
        let mut ranges: Vec<String> = self
            .requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .filter_map(|r| r.range)
            .collect();
        ranges.sort();
        ranges
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges ignored, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let shared = Arc::new(Shared {
        body,
        failures_left: AtomicU32::new(opts.fail_times),
        opts,
        seen: Mutex::new(Vec::new()),
    });
    let accept = Arc::clone(&shared);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = Arc::clone(&accept);
            thread::spawn(move || handle(stream, &shared));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/file", port),
        shared,
    }
}

fn write_head(stream: &mut std::net::TcpStream, status: &str, headers: &[String]) {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
}

fn write_body(stream: &mut std::net::TcpStream, body: &[u8], throttle: Option<Duration>) {
    match throttle {
        None => {
            let _ = stream.write_all(body);
        }
        Some(pause) => {
            for piece in body.chunks(1024) {
                if stream.write_all(piece).is_err() {
                    return;
                }
                thread::sleep(pause);
            }
        }
    }
}

fn handle(mut stream: std::net::TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let seen = parse_request(request);
    shared.seen.lock().unwrap().push(seen.clone());

    let opts = &shared.opts;
    let body = shared.body.as_slice();
    let total = body.len() as u64;

    if seen.path == "/redirect" {
        write_head(
            &mut stream,
            "302 Found",
            &["Location: /file".to_string(), "Content-Length: 0".to_string()],
        );
        return;
    }

    if seen.method.eq_ignore_ascii_case("HEAD") {
        if opts.head_blocked {
            write_head(&mut stream, "405 Method Not Allowed", &["Content-Length: 0".to_string()]);
            return;
        }
        let mut headers = Vec::new();
        if !opts.head_without_length {
            headers.push(format!("Content-Length: {}", total));
        }
        if !opts.ignore_ranges {
            headers.push("Accept-Ranges: bytes".to_string());
        }
        write_head(&mut stream, "200 OK", &headers);
        return;
    }

    if !seen.method.eq_ignore_ascii_case("GET") {
        write_head(&mut stream, "405 Method Not Allowed", &["Content-Length: 0".to_string()]);
        return;
    }

    let range = seen.range.as_deref().and_then(parse_range);
    let range = if opts.ignore_ranges { None } else { range };
    let Some((start, end_incl)) = range else {
        write_head(&mut stream, "200 OK", &[format!("Content-Length: {}", total)]);
        write_body(&mut stream, body, opts.throttle);
        return;
    };

    if opts.fail_range_start == Some(start) {
        let left = shared.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                shared.failures_left.fetch_sub(1, Ordering::SeqCst);
            }
            write_head(&mut stream, "500 Internal Server Error", &["Content-Length: 0".to_string()]);
            return;
        }
    }

    let end_incl = end_incl.min(total.saturating_sub(1));
    if start >= total || start > end_incl {
        write_head(
            &mut stream,
            "416 Range Not Satisfiable",
            &[format!("Content-Range: bytes */{}", total), "Content-Length: 0".to_string()],
        );
        return;
    }
    let slice = &body[start as usize..=end_incl as usize];
    write_head(
        &mut stream,
        "206 Partial Content",
        &[
            format!("Content-Length: {}", slice.len()),
            format!("Content-Range: bytes {}-{}/{}", start, end_incl, total),
            "Accept-Ranges: bytes".to_string(),
        ],
    );
    write_body(&mut stream, slice, opts.throttle);
}

fn parse_request(request: &str) -> SeenRequest {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_string();
    let path = first.next().unwrap_or("").to_string();
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            }
        }
    }
    SeenRequest {
        method,
        path,
        range,
    }
}

/// `(start, end_inclusive)` for `bytes=X-Y` or `bytes=X-`.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let part = value.strip_prefix("bytes=")?.trim();
    let (a, b) = part.split_once('-')?;
    let start = a.trim().parse::<u64>().ok()?;
    let end = b.trim();
    let end_incl = if end.is_empty() {
        u64::MAX
    } else {
        end.parse::<u64>().ok()?
    };
    Some((start, end_incl))
}

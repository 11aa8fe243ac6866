//! Response head model and header parsing.

/// Status and headers of the final response (after any followed redirects).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    pub headers: Vec<(String, String)>,
}

/// Parsed `Content-Range` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Inclusive `(start, end)`; `None` for `bytes */total`.
    pub range: Option<(u64, u64)>,
    /// Complete length; `None` for `bytes a-b/*`.
    pub total: Option<u64>,
}

impl ResponseHead {
    pub fn new(status: u32) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    pub fn content_range(&self) -> Option<ContentRange> {
        parse_content_range(self.header("content-range")?)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location").map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Parse `bytes a-b/total`, `bytes a-b/*` or `bytes */total`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let value = value.trim();
    let rest = value
        .get(..6)
        .filter(|unit| unit.eq_ignore_ascii_case("bytes "))
        .map(|_| value[6..].trim())?;
    let (range_part, total_part) = rest.split_once('/')?;
    let total = match total_part.trim() {
        "*" => None,
        t => Some(t.parse::<u64>().ok()?),
    };
    let range = match range_part.trim() {
        "*" => None,
        r => {
            let (a, b) = r.split_once('-')?;
            let start = a.trim().parse::<u64>().ok()?;
            let end = b.trim().parse::<u64>().ok()?;
            if end < start {
                return None;
            }
            Some((start, end))
        }
    };
    if range.is_none() && total.is_none() {
        return None;
    }
    Some(ContentRange { range, total })
}

/// Raw header lines as delivered by the client; keeps only the last response
/// block so redirects and `100 Continue` do not leak into the final head.
#[derive(Debug, Default)]
pub(crate) struct HeaderLines {
    lines: Vec<String>,
}

impl HeaderLines {
    pub(crate) fn push(&mut self, data: &[u8]) {
        let line = String::from_utf8_lossy(data);
        let line = line.trim_end();
        if line.starts_with("HTTP/") {
            self.lines.clear();
        }
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    pub(crate) fn to_head(&self) -> ResponseHead {
        let mut head = ResponseHead::default();
        for line in &self.lines {
            if line.starts_with("HTTP/") {
                head.status = line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|code| code.parse().ok())
                    .unwrap_or(0);
            } else if let Some((name, value)) = line.split_once(':') {
                head.headers
                    .push((name.trim().to_string(), value.trim().to_string()));
            }
        }
        head
    }
}

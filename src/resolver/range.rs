//! HTTP byte ranges (`Range: bytes=...`)

use std::fmt;

/// A single byte range as requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-end`, inclusive
    Bounded { start: u64, end: u64 },
    /// `bytes=start-`
    From(u64),
    /// `bytes=-n`, the last `n` bytes
    Suffix(u64),
}

impl ByteRange {
    /// Parse a `Range` header value. Multi-range requests and malformed
    /// values yield `None` and are served as full responses.
    pub fn parse(header: &str) -> Option<Self> {
        let value = header.trim().strip_prefix("bytes=")?.trim();
        if value.contains(',') {
            return None;
        }
        let (start, end) = value.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => None,
            (true, false) => end.parse().ok().filter(|n| *n > 0).map(ByteRange::Suffix),
            (false, true) => start.parse().ok().map(ByteRange::From),
            (false, false) => {
                let start: u64 = start.parse().ok()?;
                let end: u64 = end.parse().ok()?;
                (end >= start).then_some(ByteRange::Bounded { start, end })
            }
        }
    }

    /// Inclusive `(start, end)` within a resource of `total` bytes, with the
    /// end clamped to the last byte. `None` when the range does not overlap
    /// the resource.
    pub fn resolve(&self, total: u64) -> Option<(u64, u64)> {
        if total == 0 {
            return None;
        }
        let last = total - 1;
        match *self {
            ByteRange::Bounded { start, end } => (start <= last).then(|| (start, end.min(last))),
            ByteRange::From(start) => (start <= last).then_some((start, last)),
            ByteRange::Suffix(n) => Some((total.saturating_sub(n), last)),
        }
    }

    /// First byte of the range when it does not depend on the total size
    pub fn start(&self) -> Option<u64> {
        match *self {
            ByteRange::Bounded { start, .. } | ByteRange::From(start) => Some(start),
            ByteRange::Suffix(_) => None,
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteRange::Bounded { start, end } => write!(f, "bytes={}-{}", start, end),
            ByteRange::From(start) => write!(f, "bytes={}-", start),
            ByteRange::Suffix(n) => write!(f, "bytes=-{}", n),
        }
    }
}

/// Byte span actually present in a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parse `bytes start-end/total` (total may be `*`)
    pub fn parse(header: &str) -> Option<Self> {
        let rest = header.trim().strip_prefix("bytes")?.trim_start();
        let (span, total) = rest.split_once('/')?;
        let (start, end) = span.split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end: u64 = end.trim().parse().ok()?;
        if end < start {
            return None;
        }
        let total = match total.trim() {
            "*" => None,
            n => Some(n.parse().ok()?),
        };
        Some(Self { start, end, total })
    }

    /// Number of bytes in the span
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "bytes {}-{}/{}", self.start, self.end, total),
            None => write!(f, "bytes {}-{}/*", self.start, self.end),
        }
    }
}

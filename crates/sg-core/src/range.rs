//! HTTP `Range` header parsing for single byte ranges.
//!
//! Only `bytes=<start>-[<end>]` is honoured. Anything the parser does not
//! understand (suffix ranges, multiple ranges, garbage) degrades to
//! [`RangeRequest::NoRange`] so clients probing for range support still get
//! the full resource. Bounds that parse but cannot be served yield
//! [`RangeRequest::Unsatisfiable`].

use std::fmt;

use serde::Serialize;

/// An inclusive, zero-indexed byte interval `[start, end]`.
///
/// Constructed by [`parse_range`], which guarantees `start <= end < size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered (`end - start + 1`).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for a resource of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Result of evaluating a `Range` header against a known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// Serve the whole resource with `200 OK`.
    NoRange,
    /// Serve exactly this range with `206 Partial Content`.
    Satisfiable(ByteRange),
    /// Answer `416` without reading any bytes.
    Unsatisfiable,
}

/// Parse a `Range` header value against a resource of `total_size` bytes.
///
/// An `end` at or past the last byte is clamped to `total_size - 1`.
pub fn parse_range(header: Option<&str>, total_size: u64) -> RangeRequest {
    let Some((start, end)) = header.and_then(split_bounds) else {
        return RangeRequest::NoRange;
    };

    if start >= total_size {
        return RangeRequest::Unsatisfiable;
    }

    let last = total_size - 1;
    let end = match end {
        EndBound::Open => last,
        EndBound::At(e) => e.min(last),
        EndBound::Negative => return RangeRequest::Unsatisfiable,
    };
    if start > end {
        return RangeRequest::Unsatisfiable;
    }

    RangeRequest::Satisfiable(ByteRange { start, end })
}

/// Upper bound of a `bytes=` range as written by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndBound {
    Open,
    At(u64),
    Negative,
}

/// Split `bytes=START-END` into numeric bounds.
///
/// Returns `None` for anything that should fall back to a full response.
fn split_bounds(value: &str) -> Option<(u64, EndBound)> {
    let value = value.trim();
    let unit = value.get(..6)?;
    if !unit.eq_ignore_ascii_case("bytes=") {
        return None;
    }
    let interval = value[6..].trim();
    if interval.contains(',') {
        return None;
    }

    let (start_str, end_str) = interval.split_once('-')?;
    let start = parse_bound(start_str.trim())?;

    let end_str = end_str.trim();
    let end = if end_str.is_empty() {
        EndBound::Open
    } else if let Some(magnitude) = end_str.strip_prefix('-') {
        parse_bound(magnitude.trim())?;
        EndBound::Negative
    } else {
        EndBound::At(parse_bound(end_str)?)
    };

    Some((start, end))
}

/// Parse a run of ASCII digits. Values too large for `u64` saturate, so an
/// oversized start is unsatisfiable and an oversized end is clamped.
fn parse_bound(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

//! Byte ranges and their HTTP header forms.
//!
//! Ranges are inclusive on both ends, matching `Range: bytes=start-end`.

use std::fmt;

/// An inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range, returning `None` when `start > end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse a `Content-Range` response header.
///
/// Supports formats:
/// - bytes 0-499/1234
/// - bytes 0-499/* (unknown total)
///
/// Returns the served range and the total length when known.
pub fn parse_content_range(header: &str) -> Option<(ByteRange, Option<u64>)> {
    let header = header.trim().strip_prefix("bytes")?.trim_start();

    let (span, total) = header.split_once('/')?;
    let (start, end) = span.split_once('-')?;

    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    let range = ByteRange::new(start, end)?;

    let total = match total.trim() {
        "*" => None,
        value => {
            let total: u64 = value.parse().ok()?;
            if range.end >= total {
                return None;
            }
            Some(total)
        }
    };

    Some((range, total))
}

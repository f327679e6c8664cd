//! Conversion between playback positions and the `"MM:SS"` wire format.
//!
//! The backend stores resume points as strings such as `"02:30"`. Minutes are
//! left-padded to two digits but never clamped, so a three hour film resumes at
//! `"180:00"`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Encode a position in seconds as `"MM:SS"`.
///
/// Fractional seconds are truncated. Negative or non-finite positions encode
/// as `"00:00"`.
///
/// # Examples
///
/// ```
/// use theatre_common::timecode::encode;
///
/// assert_eq!(encode(65.0), "01:05");
/// assert_eq!(encode(6000.9), "100:00");
/// ```
pub fn encode(seconds: f64) -> String {
    let whole = whole_seconds(seconds);
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Decode a `"MM:SS"` string into whole seconds.
///
/// Fails with [`Error::Format`] unless the input splits on `:` into exactly two
/// unsigned integers.
pub fn decode(value: &str) -> Result<u64> {
    let mut parts = value.trim().split(':');
    let (Some(minutes), Some(seconds), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::format(value));
    };

    let minutes: u64 = minutes.trim().parse().map_err(|_| Error::format(value))?;
    let seconds: u64 = seconds.trim().parse().map_err(|_| Error::format(value))?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| Error::format(value))
}

/// Render a position for on-screen labels: minutes unpadded, seconds padded.
///
/// ```
/// use theatre_common::timecode::clock;
///
/// assert_eq!(clock(65.0), "1:05");
/// ```
pub fn clock(seconds: f64) -> String {
    let whole = whole_seconds(seconds);
    format!("{}:{:02}", whole / 60, whole % 60)
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    }
}

/// A resume offset in its wire form.
///
/// The raw string is kept as received so a malformed value coming from the
/// backend can be reported instead of silently rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timecode(String);

impl Timecode {
    /// The start of the media, `"00:00"`.
    pub fn zero() -> Self {
        Self("00:00".to_string())
    }

    /// Encode a position in seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self(encode(seconds))
    }

    /// Wrap a raw wire value without validating it.
    pub fn from_raw<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode into whole seconds.
    pub fn seconds(&self) -> Result<u64> {
        decode(&self.0)
    }

    /// True when the value decodes to zero. Malformed values are not zero.
    pub fn is_zero(&self) -> bool {
        matches!(self.seconds(), Ok(0))
    }
}

impl Default for Timecode {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timecode {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

//! Trace timestamps and time slice helpers.
//!
//! Timestamps are millisecond counters since a trace-local origin.
//! Text form is `HH:MM:SS.mmm`; offsets are shortened (`1.5`, `1:00`).

use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds since the trace origin
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    pub fn saturating_sub_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_sub(millis))
    }

    /// Milliseconds elapsed since `earlier` (zero if `earlier` is later)
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Shortened text of a time offset, e.g. `1.5`, `1:00`, `0`
    pub fn offset_text(offset_millis: u64) -> String {
        let full = Timestamp(offset_millis).to_string();
        let text = full.trim_start_matches([':', '0']).trim_end_matches('0');
        let text = text.strip_suffix('.').unwrap_or(text);
        if text.is_empty() || text.starts_with('.') {
            format!("0{}", text)
        } else {
            text.to_string()
        }
    }

    /// Parse `H:M:S` with an optional `.ms` suffix
    pub(crate) fn parse_clock(text: &str, require_millis: bool) -> Option<Timestamp> {
        let (clock, millis) = match text.split_once('.') {
            Some((clock, millis)) => (clock, Some(millis)),
            None if require_millis => return None,
            None => (text, None),
        };

        let mut parts = clock.split(':');
        let hours = parse_digits(parts.next()?)?;
        let minutes = parse_digits(parts.next()?)?;
        let seconds = parse_digits(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        let millis = match millis {
            Some(m) => parse_digits(m)?,
            None => 0,
        };

        // oversized fields are rejected rather than wrapped
        let total = hours
            .checked_mul(3_600_000)?
            .checked_add(minutes.checked_mul(60_000)?)?
            .checked_add(seconds.checked_mul(1000)?)?
            .checked_add(millis)?;
        Some(Timestamp(total))
    }
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let seconds = total_secs % 60;
        let minutes = (total_secs / 60) % 60;
        let hours = total_secs / 3600;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for Timestamp {
    type Err = ParseError;

    /// Parse the trace form `H:M:S.ms`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_clock(s.trim(), true).ok_or_else(|| ParseError::InvalidTimestamp(s.to_string()))
    }
}

/// A time slice used for axis tics and activity windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tic {
    value: u64,
    decimals: usize,
}

impl Tic {
    /// Round `raw` up to the nearest power of ten (at least 1)
    ///
    /// 37 becomes 100, 450 becomes 1000, 100 stays 100.
    pub fn rounded(raw: u64) -> Self {
        let mut value: u64 = 1;
        while value < raw {
            match value.checked_mul(10) {
                Some(next) => value = next,
                None => break,
            }
        }
        Self::exact(value)
    }

    /// Use `value` as is
    pub fn exact(value: u64) -> Self {
        let mut decimals = 3;
        let mut rest = value;
        while decimals > 0 && rest != 0 && rest % 10 == 0 {
            decimals -= 1;
            rest /= 10;
        }
        Self { value, decimals }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Slice length in seconds with just enough decimals
    pub fn label(&self) -> String {
        format!("{:.*}", self.decimals, self.value as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_millis(0).to_string(), "00:00:00.000");
        assert_eq!(Timestamp::from_millis(3_723_045).to_string(), "01:02:03.045");
    }

    #[test]
    fn test_parse_trace_timestamp() {
        let ts: Timestamp = "01:02:03.045".parse().unwrap();
        assert_eq!(ts.as_millis(), 3_723_045);
        assert!("01:02:03".parse::<Timestamp>().is_err());
        assert!("1:x:3.0".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_parse_clock_optional_millis() {
        assert_eq!(
            Timestamp::parse_clock("00:00:02", false),
            Some(Timestamp::from_millis(2000))
        );
        assert_eq!(Timestamp::parse_clock("00:00:02", true), None);
        assert_eq!(Timestamp::parse_clock("1:2:3:4", false), None);
    }

    #[test]
    fn test_parse_clock_overflow() {
        assert_eq!(Timestamp::parse_clock("99999999999999999:00:00.000", true), None);
        assert_eq!(Timestamp::parse_clock("0:0:18446744073709551615", false), None);
        assert!("99999999999999999:00:00.000".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_offset_text() {
        assert_eq!(Timestamp::offset_text(0), "0");
        assert_eq!(Timestamp::offset_text(10), "0.01");
        assert_eq!(Timestamp::offset_text(1500), "1.5");
        assert_eq!(Timestamp::offset_text(20_000), "20");
        assert_eq!(Timestamp::offset_text(60_000), "1:00");
        assert_eq!(Timestamp::offset_text(3_600_000), "1:00:00");
    }

    #[test]
    fn test_tic_rounding() {
        assert_eq!(Tic::rounded(37).value(), 100);
        assert_eq!(Tic::rounded(450).value(), 1000);
        assert_eq!(Tic::rounded(100).value(), 100);
        assert_eq!(Tic::rounded(0).value(), 1);
        assert_eq!(Tic::rounded(1).value(), 1);
    }

    #[test]
    fn test_tic_label() {
        assert_eq!(Tic::exact(100).label(), "0.1");
        assert_eq!(Tic::exact(1000).label(), "1");
        assert_eq!(Tic::exact(250).label(), "0.25");
        assert_eq!(Tic::exact(7).label(), "0.007");
    }
}

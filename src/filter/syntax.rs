//! Textual filter ranges.
//!
//! Size ranges look like `1k-4m` (suffixes are powers of 1024), time
//! ranges like `00:00:01.500-00:00:03` (absolute) or `500-2000`
//! (milliseconds after the first evaluated event). Either bound may be
//! left empty.

use super::{Filter, FilterChain};
use crate::trace::Timestamp;
use crate::utils::error::FilterError;
use log::debug;

/// One end of a time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Absolute(Timestamp),
    Offset(u64),
}

/// Parse a `min-max` size range
///
/// # Errors
/// * `FilterError::InvalidSize` - malformed range or size
/// * `FilterError::ConflictingBounds` - minimum above maximum
pub fn parse_size_range(text: &str) -> Result<(Option<u64>, Option<u64>), FilterError> {
    let invalid = || FilterError::InvalidSize(text.to_string());
    let (min, max) = text.split_once('-').ok_or_else(invalid)?;
    let min = parse_size(min).ok_or_else(invalid)?;
    let max = parse_size(max).ok_or_else(invalid)?;

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(FilterError::ConflictingBounds {
                kind: "size",
                min,
                max,
            });
        }
    }
    Ok((min, max))
}

/// `None` means malformed, `Some(None)` means an empty bound
fn parse_size(text: &str) -> Option<Option<u64>> {
    if text.is_empty() {
        return Some(None);
    }
    let (digits, multiplier) = match text.as_bytes()[text.len() - 1] {
        b'k' | b'K' => (&text[..text.len() - 1], 1024),
        b'm' | b'M' => (&text[..text.len() - 1], 1024 * 1024),
        _ => (text, 1),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    Some(Some(value.checked_mul(multiplier)?))
}

/// Parse a `start-end` time range
///
/// # Errors
/// * `FilterError::InvalidTime` - malformed range or bound
/// * `FilterError::ConflictingBounds` - start after end (same bound kind)
pub fn parse_time_range(
    text: &str,
) -> Result<(Option<TimeBound>, Option<TimeBound>), FilterError> {
    let invalid = || FilterError::InvalidTime(text.to_string());
    let (start, end) = text.split_once('-').ok_or_else(invalid)?;
    let start = parse_time_bound(start).ok_or_else(invalid)?;
    let end = parse_time_bound(end).ok_or_else(invalid)?;

    match (start, end) {
        (Some(TimeBound::Absolute(min)), Some(TimeBound::Absolute(max))) if min > max => {
            Err(FilterError::ConflictingBounds {
                kind: "time",
                min: min.as_millis(),
                max: max.as_millis(),
            })
        }
        (Some(TimeBound::Offset(min)), Some(TimeBound::Offset(max))) if min > max => {
            Err(FilterError::ConflictingBounds {
                kind: "time offset",
                min,
                max,
            })
        }
        _ => Ok((start, end)),
    }
}

fn parse_time_bound(text: &str) -> Option<Option<TimeBound>> {
    if text.is_empty() {
        return Some(None);
    }
    if text.contains(':') {
        let ts = Timestamp::parse_clock(text, false)?;
        // a zero clock value is the trace start, i.e. offset 0
        if ts == Timestamp::ZERO {
            return Some(Some(TimeBound::Offset(0)));
        }
        return Some(Some(TimeBound::Absolute(ts)));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().map(|ms| Some(TimeBound::Offset(ms)))
}

/// Build the filter chain from optional size and time ranges
///
/// Size filters come first, then time filters, each min before max.
pub fn build_filters(size: Option<&str>, time: Option<&str>) -> Result<FilterChain, FilterError> {
    let mut chain = FilterChain::new();

    if let Some(text) = size {
        let (min, max) = parse_size_range(text)?;
        if let Some(min) = min {
            chain.push(Filter::MinSize(min));
        }
        if let Some(max) = max {
            chain.push(Filter::MaxSize(max));
        }
    }

    if let Some(text) = time {
        let (start, end) = parse_time_range(text)?;
        match start {
            Some(TimeBound::Absolute(ts)) => chain.push(Filter::MinTime(ts)),
            Some(TimeBound::Offset(ms)) => chain.push(Filter::min_time_offset(ms)),
            None => {}
        }
        match end {
            Some(TimeBound::Absolute(ts)) => chain.push(Filter::MaxTime(ts)),
            Some(TimeBound::Offset(ms)) => chain.push(Filter::max_time_offset(ms)),
            None => {}
        }
    }

    debug!("Event filters: {}", chain.describe());
    Ok(chain)
}

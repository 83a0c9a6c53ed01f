//! Event filters.
//!
//! A [`FilterChain`] is the logical AND of its filters. Filters are
//! evaluated in declaration order; trace-relative time filters anchor
//! their origin on the first event they evaluate, so a chain must be
//! rebuilt before it is used on an unrelated event stream.

pub mod syntax;

pub use syntax::{build_filters, parse_size_range, parse_time_range, TimeBound};

use crate::trace::{Event, Timestamp};
use std::fmt;

/// Origin of a trace-relative time filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// No event evaluated yet
    Pending,
    /// Timestamp of the first evaluated event
    Anchored(Timestamp),
}

impl Origin {
    fn anchor(&mut self, event: &Event) -> Timestamp {
        match *self {
            Origin::Anchored(origin) => origin,
            Origin::Pending => {
                *self = Origin::Anchored(event.timestamp);
                event.timestamp
            }
        }
    }
}

/// A single event predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Event at or after an absolute timestamp
    MinTime(Timestamp),
    /// Event at or before an absolute timestamp
    MaxTime(Timestamp),
    /// Event at or after `offset` ms past the first evaluated event
    MinTimeOffset { offset: u64, origin: Origin },
    /// Event at or before `offset` ms past the first evaluated event
    MaxTimeOffset { offset: u64, origin: Origin },
    /// Nonzero size at least this large
    MinSize(u64),
    /// Nonzero size at most this large
    MaxSize(u64),
}

impl Filter {
    pub fn min_time_offset(offset: u64) -> Self {
        Filter::MinTimeOffset {
            offset,
            origin: Origin::Pending,
        }
    }

    pub fn max_time_offset(offset: u64) -> Self {
        Filter::MaxTimeOffset {
            offset,
            origin: Origin::Pending,
        }
    }

    /// Evaluate the filter, anchoring offset filters on first use
    ///
    /// Size filters let zero-sized events (frees included) through.
    pub fn matches(&mut self, event: &Event) -> bool {
        match self {
            Filter::MinTime(min) => event.timestamp >= *min,
            Filter::MaxTime(max) => event.timestamp <= *max,
            Filter::MinTimeOffset { offset, origin } => {
                event.timestamp >= origin.anchor(event).add_millis(*offset)
            }
            Filter::MaxTimeOffset { offset, origin } => {
                event.timestamp <= origin.anchor(event).add_millis(*offset)
            }
            Filter::MinSize(min) => event.size == 0 || event.size >= *min,
            Filter::MaxSize(max) => event.size == 0 || event.size <= *max,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::MinTime(ts) => write!(f, "time >= {}", ts),
            Filter::MaxTime(ts) => write!(f, "time <= {}", ts),
            Filter::MinTimeOffset { offset, .. } => write!(f, "time >= first event + {} ms", offset),
            Filter::MaxTimeOffset { offset, .. } => write!(f, "time <= first event + {} ms", offset),
            Filter::MinSize(size) => write!(f, "size >= {}", size),
            Filter::MaxSize(size) => write!(f, "size <= {}", size),
        }
    }
}

/// Logical AND of filters
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Check an event against every filter
    ///
    /// Evaluation stops at the first failing filter, so later offset
    /// filters only anchor on events the earlier filters accepted.
    pub fn matches(&mut self, event: &Event) -> bool {
        self.filters.iter_mut().all(|filter| filter.matches(event))
    }

    /// Human-readable chain description, in declaration order
    pub fn describe(&self) -> String {
        if self.filters.is_empty() {
            return "none".to_string();
        }
        self.filters
            .iter()
            .map(Filter::to_string)
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(ms: u64, size: u64) -> Event {
        Event::alloc(0, 0, Timestamp::from_millis(ms), "0x1", size)
    }

    fn free(ms: u64) -> Event {
        Event::free(0, 0, Timestamp::from_millis(ms), "0x1")
    }

    #[test]
    fn test_size_filters_pass_zero_size() {
        let mut min = Filter::MinSize(100);
        assert!(min.matches(&free(0)));
        assert!(min.matches(&alloc(0, 0)));
        assert!(!min.matches(&alloc(0, 99)));
        assert!(min.matches(&alloc(0, 100)));

        let mut max = Filter::MaxSize(10);
        assert!(max.matches(&free(0)));
        assert!(!max.matches(&alloc(0, 11)));
    }

    #[test]
    fn test_absolute_time_filters() {
        let mut chain = FilterChain::new()
            .with(Filter::MinTime(Timestamp::from_millis(10)))
            .with(Filter::MaxTime(Timestamp::from_millis(20)));
        assert!(!chain.matches(&alloc(9, 1)));
        assert!(chain.matches(&alloc(10, 1)));
        assert!(chain.matches(&alloc(20, 1)));
        assert!(!chain.matches(&alloc(21, 1)));
    }

    #[test]
    fn test_offset_filter_anchors_on_first_event() {
        let mut filter = Filter::max_time_offset(100);
        assert!(filter.matches(&alloc(500, 1)));
        assert_eq!(
            filter,
            Filter::MaxTimeOffset {
                offset: 100,
                origin: Origin::Anchored(Timestamp::from_millis(500)),
            }
        );
        assert!(filter.matches(&alloc(600, 1)));
        assert!(!filter.matches(&alloc(601, 1)));
    }

    #[test]
    fn test_min_offset_filter() {
        let mut filter = Filter::min_time_offset(50);
        assert!(!filter.matches(&alloc(1000, 1)));
        assert!(!filter.matches(&alloc(1049, 1)));
        assert!(filter.matches(&alloc(1050, 1)));
    }

    #[test]
    fn test_empty_chain_matches_all() {
        let mut chain = FilterChain::new();
        assert!(chain.matches(&alloc(0, 1)));
        assert_eq!(chain.describe(), "none");
    }

    #[test]
    fn test_describe_keeps_declaration_order() {
        let chain = FilterChain::new()
            .with(Filter::MinSize(16))
            .with(Filter::max_time_offset(5));
        assert_eq!(chain.describe(), "size >= 16 and time <= first event + 5 ms");
    }
}

//! Aggregation of sorted trace events into reports.
//!
//! This module turns the events of a [`TraceData`] into:
//! - Running non-freed totals per context (totals report)
//! - Resource lifespans, paginated (lifetime report)
//! - Sliding-window allocation/deallocation rates (activity report)
//!
//! All three share the pairing engine in [`index`] and push their result
//! into a [`ReportSink`].

pub mod activity;
pub mod index;
pub mod lifetime;
pub mod totals;

// Re-export main types and functions
pub use activity::{compute_activity, ActivityOptions, ActivityReport, WindowPhase};
pub use index::{AllocOutcome, FreeOutcome, ResourceIndex};
pub use lifetime::{compute_lifetimes, Lifetime, LifetimeOptions, LifetimeReport, Pager};
pub use totals::{compute_totals, Tally, TotalsReport, TotalsStats};

use crate::filter::FilterChain;
use crate::report::ReportSink;
use crate::trace::{Timestamp, TraceData};
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fmt;

/// Min/max of the timestamps an aggregator actually processed
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TimeRange {
    bounds: Option<(Timestamp, Timestamp)>,
}

impl TimeRange {
    pub(crate) fn observe(&mut self, timestamp: Timestamp) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(timestamp), max.max(timestamp)),
            None => (timestamp, timestamp),
        });
    }

    pub(crate) fn bounds(&self) -> Option<(Timestamp, Timestamp)> {
        self.bounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Totals,
    Lifetime,
    Activity,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Totals => "totals",
            ReportKind::Lifetime => "lifetime",
            ReportKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one report run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The sink received `series` data series and was rendered
    Written { series: usize },
    /// No event passed the filters, the sink was left untouched
    NoMatchingEvents,
}

/// One of the three report algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Totals,
    Lifetime(LifetimeOptions),
    Activity(ActivityOptions),
}

impl Aggregator {
    pub fn kind(&self) -> ReportKind {
        match self {
            Aggregator::Totals => ReportKind::Totals,
            Aggregator::Lifetime(_) => ReportKind::Lifetime,
            Aggregator::Activity(_) => ReportKind::Activity,
        }
    }

    /// Aggregate `trace` and write the report into `sink`
    ///
    /// **Public** - single entry point used by the report command
    ///
    /// # Arguments
    /// * `trace` - Sorted trace data
    /// * `filters` - Active filter chain (offset filters anchor on first use)
    /// * `sink` - Report destination, rendered once everything is written
    ///
    /// # Returns
    /// `ReportOutcome::NoMatchingEvents` without touching the sink when
    /// nothing passes the filters
    ///
    /// # Errors
    /// Whatever the sink's `render` reports
    ///
    /// # Example
    /// ```ignore
    /// let mut doc = ReportDocument::new("totals");
    /// let outcome = Aggregator::Totals.write_report(&trace, &mut filters, &mut doc)?;
    /// ```
    pub fn write_report(
        &self,
        trace: &TraceData,
        filters: &mut FilterChain,
        sink: &mut dyn ReportSink,
    ) -> Result<ReportOutcome, OutputError> {
        if !trace.is_sorted() {
            debug!("Trace data not marked sorted, results assume (timestamp, index) order");
        }
        info!("Generating {} report (filters: {})", self.kind(), filters.describe());

        let series = match self {
            Aggregator::Totals => compute_totals(trace, filters).map(|r| r.write_to(sink)),
            Aggregator::Lifetime(options) => {
                compute_lifetimes(trace, filters, options).map(|r| r.write_to(sink))
            }
            Aggregator::Activity(options) => {
                compute_activity(trace, filters, options).map(|r| r.write_to(sink))
            }
        };

        let Some(series) = series else {
            return Ok(ReportOutcome::NoMatchingEvents);
        };

        sink.render()?;
        debug!("{} report rendered with {} series", self.kind(), series);
        Ok(ReportOutcome::Written { series })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::report::ReportDocument;

    fn sample_trace() -> TraceData {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        let ts = Timestamp::from_millis;
        trace.register_alloc(1, 0, ts(0), None, "0x10", 64).unwrap();
        trace.register_free(2, 0, ts(40), None, "0x10").unwrap();
        trace.sort();
        trace
    }

    #[test]
    fn test_time_range() {
        let mut range = TimeRange::default();
        assert!(range.bounds().is_none());
        range.observe(Timestamp::from_millis(7));
        range.observe(Timestamp::from_millis(3));
        range.observe(Timestamp::from_millis(5));
        assert_eq!(
            range.bounds(),
            Some((Timestamp::from_millis(3), Timestamp::from_millis(7)))
        );
    }

    #[test]
    fn test_write_report_all_kinds() {
        let trace = sample_trace();
        for aggregator in [
            Aggregator::Totals,
            Aggregator::Lifetime(LifetimeOptions::default()),
            Aggregator::Activity(ActivityOptions::default()),
        ] {
            let mut doc = ReportDocument::new(aggregator.kind().as_str());
            let outcome = aggregator
                .write_report(&trace, &mut FilterChain::new(), &mut doc)
                .unwrap();
            assert!(matches!(outcome, ReportOutcome::Written { series } if series > 0));
            assert!(!doc.title.is_empty(), "{} has no title", aggregator.kind());
        }
    }

    #[test]
    fn test_no_matching_events_leaves_sink_empty() {
        let trace = sample_trace();
        let mut doc = ReportDocument::new("totals");
        let mut filters = FilterChain::new().with(Filter::MinTime(Timestamp::from_millis(1000)));
        let outcome = Aggregator::Totals
            .write_report(&trace, &mut filters, &mut doc)
            .unwrap();
        assert_eq!(outcome, ReportOutcome::NoMatchingEvents);
        assert!(doc.is_empty());
        assert!(doc.title.is_empty());
    }
}

//! Totals report: amount of non-freed allocations over time.
//!
//! For every resource type and context the running total of open,
//! filter-passing allocations is recorded at each genuine open/close.
//! The "all allocations" pass also accumulates leak and ever-allocated
//! counters and remembers the leak peak.

use super::index::{AllocOutcome, FreeOutcome, ResourceIndex};
use super::TimeRange;
use crate::filter::FilterChain;
use crate::report::{Align, Axis, DataStyle, Point, ReportSink, Series, SummaryTable};
use crate::trace::{report_contexts, Context, Event, Timestamp, TraceData};
use log::debug;
use serde::Serialize;

/// Count and size pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub count: u64,
    pub size: u64,
}

impl Tally {
    fn add(&mut self, size: u64) {
        self.count += 1;
        self.size += size;
    }

    fn remove(&mut self, size: u64) {
        self.count = self.count.saturating_sub(1);
        self.size = self.size.saturating_sub(size);
    }
}

/// Leak statistics of one resource type ("all allocations" context)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TotalsStats {
    /// Non-freed allocations at the end of the trace
    pub end_leaks: Tally,
    /// Non-freed allocations at the peak
    pub peak_leaks: Tally,
    /// All allocations up to the end of the trace
    pub end_totals: Tally,
    /// All allocations up to the peak
    pub peak_totals: Tally,
    pub peak_timestamp: Timestamp,
}

impl TotalsStats {
    fn on_open(&mut self, event: &Event) {
        self.end_leaks.add(event.size);
        self.end_totals.add(event.size);
        if self.end_leaks.size > self.peak_leaks.size {
            self.peak_leaks = self.end_leaks;
            self.peak_totals = self.end_totals;
            self.peak_timestamp = event.timestamp;
        }
    }

    fn on_release(&mut self, opened: &Event) {
        self.end_leaks.remove(opened.size);
    }
}

/// Running total series of one context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSeries {
    pub context: Context,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTotals {
    pub resource: String,
    /// Only contexts with at least one point
    pub series: Vec<ContextSeries>,
    pub stats: TotalsStats,
}

impl ResourceTotals {
    pub fn series_for(&self, context_name: &str) -> Option<&ContextSeries> {
        self.series.iter().find(|s| s.context.name == context_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsReport {
    pub resources: Vec<ResourceTotals>,
    pub x_range: (Timestamp, Timestamp),
    pub y_max: u64,
}

/// Compute the totals report
///
/// **Public** - main entry point of the totals aggregator
///
/// # Returns
/// `None` when no event passes the filters
pub fn compute_totals(trace: &TraceData, filters: &mut FilterChain) -> Option<TotalsReport> {
    let contexts = report_contexts(trace.contexts());
    let mut range = TimeRange::default();
    let mut y_max = 0;
    let mut resources = Vec::with_capacity(trace.resources().len());

    for resource in trace.resources() {
        let mut stats = TotalsStats::default();
        let mut series = Vec::new();

        for context in &contexts {
            let leak_stats = context.is_mask_all().then_some(&mut stats);
            let points = running_totals(&resource.events, context, filters, leak_stats, &mut range);
            if let Some(max) = points.iter().map(|p| p.y).max() {
                y_max = y_max.max(max);
            }
            if !points.is_empty() {
                series.push(ContextSeries {
                    context: context.clone(),
                    points,
                });
            }
        }

        debug!(
            "{}: {} context series, end leaks {} / {} bytes",
            resource.name,
            series.len(),
            stats.end_leaks.count,
            stats.end_leaks.size
        );
        resources.push(ResourceTotals {
            resource: resource.name.clone(),
            series,
            stats,
        });
    }

    let x_range = range.bounds()?;
    Some(TotalsReport {
        resources,
        x_range,
        y_max,
    })
}

/// One pass over a resource type for one context
fn running_totals(
    events: &[Event],
    context: &Context,
    filters: &mut FilterChain,
    mut stats: Option<&mut TotalsStats>,
    range: &mut TimeRange,
) -> Vec<Point> {
    let mut index = ResourceIndex::new();
    let mut total: u64 = 0;
    let mut points = Vec::new();

    for event in events {
        if !event.matches_context(context) || !filters.matches(event) {
            continue;
        }
        range.observe(event.timestamp);

        if event.is_alloc() {
            if index.on_alloc(event) == AllocOutcome::Absorbed {
                continue;
            }
            total += event.size;
            if let Some(stats) = stats.as_deref_mut() {
                stats.on_open(event);
            }
        } else {
            let FreeOutcome::Released(opened) = index.on_free(event) else {
                continue;
            };
            total = total.saturating_sub(opened.size);
            if let Some(stats) = stats.as_deref_mut() {
                stats.on_release(opened);
            }
        }

        points.push(Point::new(event.timestamp.as_millis(), total));
    }

    points
}

impl TotalsReport {
    /// Push series, peak markers and the summary table into `sink`
    ///
    /// # Returns
    /// Number of series written
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> usize {
        let mut written = 0;

        for resource in &self.resources {
            for series in &resource.series {
                sink.add_series(Series::line(
                    format!("{}-{:x}", resource.resource, series.context.value),
                    format!("{} ({})", resource.resource, series.context.name),
                    series.points.clone(),
                ));
                written += 1;
            }
            if !resource.series.is_empty() {
                let peak = resource.stats.peak_timestamp;
                sink.add_series(Series::marker(
                    format!("{}-peak", resource.resource),
                    format!("{} (peak:{})", resource.resource, peak),
                    peak.as_millis(),
                    0,
                    self.y_max,
                ));
                written += 1;
            }
        }

        sink.set_title("Amount of non-freed allocations");
        sink.set_axis_x(Axis::new(
            "time (secs)",
            self.x_range.0.as_millis(),
            self.x_range.1.as_millis(),
        ));
        sink.set_axis_y(Axis::new("size", 0, self.y_max));
        sink.set_data_style(DataStyle::Lines);
        sink.add_table(self.summary_table());

        written
    }

    pub fn summary_table(&self) -> SummaryTable {
        let mut table = SummaryTable::new()
            .column(&["Resource"], 10, Align::Left)
            .column(&["State"], 5, Align::Center)
            .column(&["Total", "count"], 8, Align::Right)
            .column(&["Total", "size"], 10, Align::Right)
            .column(&["Non-freed", "count"], 8, Align::Right)
            .column(&["Non-freed", "size"], 10, Align::Right);

        for resource in &self.resources {
            let stats = &resource.stats;
            table.push_row(vec![
                resource.resource.clone(),
                "peak".to_string(),
                stats.peak_totals.count.to_string(),
                stats.peak_totals.size.to_string(),
                stats.peak_leaks.count.to_string(),
                stats.peak_leaks.size.to_string(),
            ]);
            table.push_row(vec![
                String::new(),
                "end".to_string(),
                stats.end_totals.count.to_string(),
                stats.end_totals.size.to_string(),
                stats.end_leaks.count.to_string(),
                stats.end_leaks.size.to_string(),
            ]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::report::ReportDocument;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn two_context_trace() -> TraceData {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_context(0x1, "a");
        trace.register_context(0x2, "b");
        trace.register_alloc(1, 0x1, ts(0), None, "X", 100).unwrap();
        trace.register_alloc(2, 0x2, ts(5), None, "Y", 50).unwrap();
        trace.register_free(3, 0x1, ts(10), None, "X").unwrap();
        trace.sort();
        trace
    }

    #[test]
    fn test_context_series_and_peak() {
        let trace = two_context_trace();
        let report = compute_totals(&trace, &mut FilterChain::new()).unwrap();
        let memory = &report.resources[0];

        let a = memory.series_for("a").unwrap();
        assert_eq!(a.points, vec![Point::new(0, 100), Point::new(10, 0)]);

        let b = memory.series_for("b").unwrap();
        assert_eq!(b.points, vec![Point::new(5, 50)]);

        // no uncategorized events, so no series for "no contexts"
        assert!(memory.series_for("no contexts").is_none());

        let stats = memory.stats;
        assert_eq!(stats.peak_leaks, Tally { count: 2, size: 150 });
        assert_eq!(stats.peak_totals, Tally { count: 2, size: 150 });
        assert_eq!(stats.peak_timestamp, ts(5));
        assert_eq!(stats.end_leaks, Tally { count: 1, size: 50 });
        assert_eq!(stats.end_totals, Tally { count: 2, size: 150 });
        assert_eq!(report.y_max, 150);
        assert_eq!(report.x_range, (ts(0), ts(10)));
    }

    #[test]
    fn test_absorbed_alloc_emits_no_point() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_alloc(1, 0, ts(0), None, "Z", 10).unwrap();
        trace.register_alloc(2, 0, ts(1), None, "Z", 99).unwrap();
        trace.register_free(3, 0, ts(2), None, "Z").unwrap();
        trace.register_free(4, 0, ts(3), None, "Z").unwrap();
        trace.register_free(5, 0, ts(4), None, "unknown").unwrap();
        trace.sort();

        let report = compute_totals(&trace, &mut FilterChain::new()).unwrap();
        let all = report.resources[0].series_for("all allocations").unwrap();
        assert_eq!(all.points, vec![Point::new(0, 10), Point::new(3, 0)]);
        assert_eq!(report.resources[0].stats.end_totals, Tally { count: 1, size: 10 });
    }

    #[test]
    fn test_no_matching_events() {
        let trace = two_context_trace();
        let mut filters = FilterChain::new().with(Filter::MinTime(ts(1000)));
        assert!(compute_totals(&trace, &mut filters).is_none());
    }

    #[test]
    fn test_filtered_free_keeps_resource_open() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_alloc(1, 0, ts(0), None, "X", 10).unwrap();
        trace.register_free(2, 0, ts(50), None, "X").unwrap();
        trace.sort();

        let mut filters = FilterChain::new().with(Filter::MaxTime(ts(20)));
        let report = compute_totals(&trace, &mut filters).unwrap();
        assert_eq!(report.resources[0].stats.end_leaks, Tally { count: 1, size: 10 });
    }

    #[test]
    fn test_write_to_sink() {
        let trace = two_context_trace();
        let report = compute_totals(&trace, &mut FilterChain::new()).unwrap();
        let mut doc = ReportDocument::new("totals");
        let written = report.write_to(&mut doc);

        // all allocations, a, b and the peak marker
        assert_eq!(written, 4);
        assert!(doc.series_named("memory-ffffffff").is_some());
        assert!(doc.series_named("memory-1").is_some());
        let peak = doc.series_named("memory-peak").unwrap();
        assert_eq!(peak.points, vec![Point::new(5, 0), Point::new(5, 150)]);
        assert_eq!(peak.title, "memory (peak:00:00:00.005)");

        let table = &doc.tables[0];
        assert_eq!(table.rows[0][1], "peak");
        assert_eq!(table.rows[0][5], "150");
        assert_eq!(table.rows[1][5], "50");
    }
}

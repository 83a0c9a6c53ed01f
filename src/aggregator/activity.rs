//! Activity report: allocation/deallocation rate over a sliding window.
//!
//! A time pointer starts at the earliest event of the trace and moves in
//! steps of half the window. At every step the events up to the pointer
//! are absorbed into a queue, events older than one window are evicted
//! and one point with the running counters is emitted.

use super::index::{AllocOutcome, FreeOutcome, ResourceIndex};
use super::TimeRange;
use crate::filter::FilterChain;
use crate::report::{Align, Axis, DataStyle, Point, ReportSink, Series, SummaryTable, YAxis};
use crate::trace::{report_contexts, Context, Event, Tic, Timestamp, TraceData};
use crate::utils::config::SLICE_DIVISOR;
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;

/// Activity report settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityOptions {
    /// Window length in milliseconds, derived from the trace range if unset
    pub slice: Option<u64>,
}

/// Progress of one resource/context pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Less than one window of time consumed
    Scanning,
    /// Full windows over the event sequence
    Emitting,
    /// Events exhausted, stepping over buffered events only
    Draining,
    Done,
}

impl WindowPhase {
    /// Next phase after a point was emitted
    ///
    /// Every pass goes through all four phases in order, one transition
    /// per step at most.
    pub fn advance(self, window_full: bool, exhausted: bool, drained: bool) -> Self {
        match self {
            WindowPhase::Scanning if window_full || exhausted => WindowPhase::Emitting,
            WindowPhase::Emitting if exhausted => WindowPhase::Draining,
            WindowPhase::Draining if drained => WindowPhase::Done,
            phase => phase,
        }
    }
}

/// Genuine allocations and frees inside the current window
#[derive(Debug, Default)]
struct Window<'a> {
    events: VecDeque<&'a Event>,
    total: u64,
    allocs: u64,
    frees: u64,
}

impl<'a> Window<'a> {
    fn push(&mut self, event: &'a Event) {
        if event.is_alloc() {
            self.total += event.size;
            self.allocs += 1;
        } else {
            self.frees += 1;
        }
        self.events.push_back(event);
    }

    /// Drop events older than `start`
    fn evict(&mut self, start: Timestamp) {
        while let Some(front) = self.events.front() {
            if front.timestamp >= start {
                break;
            }
            if front.is_alloc() {
                self.total -= front.size;
                self.allocs -= 1;
            } else {
                self.frees -= 1;
            }
            self.events.pop_front();
        }
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn point(&self, timestamp: Timestamp) -> ActivityPoint {
        ActivityPoint {
            timestamp,
            total: self.total,
            allocs: self.allocs,
            frees: self.frees,
        }
    }
}

/// Window counters at one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityPoint {
    pub timestamp: Timestamp,
    /// Size of the genuine allocations in the window
    pub total: u64,
    pub allocs: u64,
    pub frees: u64,
}

/// Peak values of the "all allocations" context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityPeaks {
    pub size: ActivityPoint,
    pub allocs: ActivityPoint,
    pub frees: ActivityPoint,
}

impl ActivityPeaks {
    fn new(origin: Timestamp) -> Self {
        let start = ActivityPoint {
            timestamp: origin,
            ..ActivityPoint::default()
        };
        Self {
            size: start,
            allocs: start,
            frees: start,
        }
    }

    fn update(&mut self, point: &ActivityPoint) {
        if point.total > self.size.total {
            self.size = *point;
        }
        if point.allocs > self.allocs.allocs {
            self.allocs = *point;
        }
        if point.frees > self.frees.frees {
            self.frees = *point;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextActivity {
    pub context: Context,
    pub points: Vec<ActivityPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceActivity {
    pub resource: String,
    /// Only contexts with at least one matching event
    pub contexts: Vec<ContextActivity>,
    pub peaks: ActivityPeaks,
}

impl ResourceActivity {
    pub fn context(&self, name: &str) -> Option<&ContextActivity> {
        self.contexts.iter().find(|c| c.context.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityReport {
    pub resources: Vec<ResourceActivity>,
    pub slice: Tic,
    pub step: u64,
    pub x_range: (Timestamp, Timestamp),
    pub y_max: u64,
    pub y2_max: u64,
}

/// Compute the activity report
///
/// **Public** - main entry point of the activity aggregator
///
/// Without an explicit slice the window is a hundredth of the unfiltered
/// trace range, rounded up to a power of ten.
///
/// # Returns
/// `None` when no event passes the filters
pub fn compute_activity(
    trace: &TraceData,
    filters: &mut FilterChain,
    options: &ActivityOptions,
) -> Option<ActivityReport> {
    let (origin, end) = trace.full_time_range()?;
    let slice = match options.slice {
        Some(value) => Tic::exact(value.max(1)),
        None => Tic::rounded(end.since(origin) / SLICE_DIVISOR),
    };
    let step = (slice.value() / 2).max(1);
    debug!("Activity window {} ms, step {} ms", slice.value(), step);

    let contexts = report_contexts(trace.contexts());
    let mut range = TimeRange::default();
    let mut y_max = 0;
    let mut y2_max = 0;
    let mut resources = Vec::with_capacity(trace.resources().len());

    for resource in trace.resources() {
        let mut peaks = ActivityPeaks::new(origin);
        let mut series = Vec::new();

        for context in &contexts {
            let all_peaks = context.is_mask_all().then_some(&mut peaks);
            let pass = WindowPass {
                events: &resource.events,
                context,
                origin,
                window: slice.value(),
                step,
            };
            let Some(points) = pass.run(filters, all_peaks, &mut range) else {
                continue;
            };
            for point in &points {
                y_max = y_max.max(point.total);
                y2_max = y2_max.max(point.allocs).max(point.frees);
            }
            series.push(ContextActivity {
                context: context.clone(),
                points,
            });
        }

        debug!("{}: {} context series", resource.name, series.len());
        resources.push(ResourceActivity {
            resource: resource.name.clone(),
            contexts: series,
            peaks,
        });
    }

    let x_range = range.bounds()?;
    Some(ActivityReport {
        resources,
        slice,
        step,
        x_range,
        y_max,
        y2_max,
    })
}

/// One sliding-window pass over a resource type for one context
struct WindowPass<'a> {
    events: &'a [Event],
    context: &'a Context,
    origin: Timestamp,
    window: u64,
    step: u64,
}

impl<'a> WindowPass<'a> {
    /// Returns `None` when no event of the pass matched
    fn run(
        &self,
        filters: &mut FilterChain,
        mut peaks: Option<&mut ActivityPeaks>,
        range: &mut TimeRange,
    ) -> Option<Vec<ActivityPoint>> {
        let mut index = ResourceIndex::new();
        let mut window = Window::default();
        let mut phase = WindowPhase::Scanning;
        let mut matched = TimeRange::default();
        let mut points = Vec::new();
        let mut position = 0;
        let mut now = self.origin;

        while phase != WindowPhase::Done {
            while let Some(event) = self.events.get(position) {
                if event.timestamp > now {
                    break;
                }
                position += 1;
                if !event.matches_context(self.context) || !filters.matches(event) {
                    continue;
                }
                matched.observe(now);

                let genuine = if event.is_alloc() {
                    index.on_alloc(event) == AllocOutcome::Opened
                } else {
                    matches!(index.on_free(event), FreeOutcome::Released(_))
                };
                if genuine {
                    window.push(event);
                }
            }

            window.evict(now.saturating_sub_millis(self.window));
            let point = window.point(now);
            if let Some(peaks) = peaks.as_deref_mut() {
                peaks.update(&point);
            }
            points.push(point);

            phase = phase.advance(
                now.since(self.origin) >= self.window,
                position == self.events.len(),
                window.is_empty(),
            );
            now = now.add_millis(self.step);
        }

        let (first, _) = matched.bounds()?;
        range.observe(first);
        if let Some(last) = points.last() {
            range.observe(last.timestamp);
        }
        Some(points)
    }
}

impl ActivityReport {
    /// Push rate series, peak markers and the summary table into `sink`
    ///
    /// # Returns
    /// Number of series written
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> usize {
        let mut written = 0;

        for resource in &self.resources {
            let name = &resource.resource;
            for activity in &resource.contexts {
                let context = &activity.context;

                sink.add_series(Series::line(
                    format!("{}-size-{:x}", name, context.value),
                    format!("{} (rate:{})", name, context.name),
                    column(&activity.points, |p| p.total),
                ));
                sink.add_series(
                    Series::line(
                        format!("{}-allocs-{:x}", name, context.value),
                        format!("{} (allocs:{})", name, context.name),
                        column(&activity.points, |p| p.allocs),
                    )
                    .on_axis(YAxis::Secondary),
                );
                sink.add_series(
                    Series::line(
                        format!("{}-frees-{:x}", name, context.value),
                        format!("{} (frees:{})", name, context.name),
                        column(&activity.points, |p| p.frees),
                    )
                    .on_axis(YAxis::Secondary),
                );
                written += 3;
            }

            if resource.contexts.is_empty() {
                continue;
            }
            let peaks = &resource.peaks;
            for (metric, label, peak) in [
                ("size", "rate", &peaks.size),
                ("allocs", "allocs", &peaks.allocs),
                ("frees", "frees", &peaks.frees),
            ] {
                sink.add_series(Series::marker(
                    format!("{}-{}-peak", name, metric),
                    format!("{} (peak {}:{})", name, label, peak.timestamp),
                    peak.timestamp.as_millis(),
                    0,
                    self.y_max,
                ));
                written += 1;
            }
        }

        let label = self.slice.label();
        sink.set_title("Allocation/deallocation rate");
        sink.set_axis_x(Axis::new(
            "time (secs)",
            self.x_range.0.as_millis(),
            self.x_range.1.as_millis(),
        ));
        sink.set_axis_y(Axis::new(format!("amount per {} sec", label), 0, self.y_max));
        sink.set_axis_y2(Axis::new(format!("count per {} sec", label), 0, self.y2_max));
        sink.set_data_style(DataStyle::Lines);
        sink.add_table(self.summary_table());

        written
    }

    pub fn summary_table(&self) -> SummaryTable {
        let mut table = SummaryTable::new()
            .column(&["Resource"], 10, Align::Left)
            .column(&["State"], 10, Align::Center)
            .column(&["Count"], 8, Align::Right)
            .column(&["Size"], 10, Align::Right);

        for resource in &self.resources {
            let peaks = &resource.peaks;
            let rows = [
                (resource.resource.clone(), "peak size", peaks.size.allocs, peaks.size.total),
                (String::new(), "peak allocs", peaks.allocs.allocs, peaks.allocs.total),
                (String::new(), "peak frees", peaks.frees.frees, peaks.frees.total),
            ];
            for (name, state, count, size) in rows {
                table.push_row(vec![name, state.to_string(), count.to_string(), size.to_string()]);
            }
        }
        table
    }
}

fn column(points: &[ActivityPoint], value: fn(&ActivityPoint) -> u64) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(p.timestamp.as_millis(), value(p)))
        .collect()
}

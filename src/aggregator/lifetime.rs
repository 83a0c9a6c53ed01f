//! Lifetime report: how long each resource stayed allocated.
//!
//! Every allocation that gets released becomes one interval from its
//! allocation to the releasing free. Resources still open at the end of
//! the trace get an interval ending at the last observed timestamp.
//! Intervals are split into pages so huge traces produce several
//! data shards instead of one unmanageable plot.

use super::index::{FreeOutcome, ResourceIndex};
use super::TimeRange;
use crate::filter::FilterChain;
use crate::report::{Axis, DataStyle, Point, ReportSink, Series, SeriesStyle, YAxis};
use crate::trace::{Timestamp, TraceData};
use crate::utils::config::{DEFAULT_PAGE_CAPACITY, DETAILS_LIMIT, PAGE_WARNING_LIMIT};
use log::{debug, warn};
use serde::Serialize;

/// One resource lifespan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lifetime {
    pub start: Timestamp,
    pub end: Timestamp,
    pub size: u64,
}

/// Lifetime report settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeOptions {
    /// Maximum intervals per page
    pub page_capacity: usize,
    /// Page count after which an advisory is raised
    pub page_warning_limit: usize,
}

impl Default for LifetimeOptions {
    fn default() -> Self {
        Self {
            page_capacity: DEFAULT_PAGE_CAPACITY,
            page_warning_limit: PAGE_WARNING_LIMIT,
        }
    }
}

impl LifetimeOptions {
    pub fn with_page_capacity(mut self, capacity: usize) -> Self {
        self.page_capacity = capacity;
        self
    }
}

/// Splits intervals into pages of bounded size
#[derive(Debug, Clone)]
pub struct Pager {
    capacity: usize,
    pages: Vec<Vec<Lifetime>>,
}

impl Pager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pages: Vec::new(),
        }
    }

    pub fn push(&mut self, lifetime: Lifetime) {
        match self.pages.last_mut() {
            Some(page) if page.len() < self.capacity => page.push(lifetime),
            _ => self.pages.push(vec![lifetime]),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn pages(&self) -> &[Vec<Lifetime>] {
        &self.pages
    }
}

#[derive(Debug, Clone)]
pub struct ResourceLifetimes {
    pub resource: String,
    pub pager: Pager,
}

impl ResourceLifetimes {
    /// All intervals in emission order
    pub fn lifetimes(&self) -> impl Iterator<Item = &Lifetime> {
        self.pager.pages().iter().flatten()
    }
}

#[derive(Debug, Clone)]
pub struct LifetimeReport {
    pub resources: Vec<ResourceLifetimes>,
    pub x_range: (Timestamp, Timestamp),
    pub y_max: u64,
    pub advisories: Vec<String>,
}

impl LifetimeReport {
    pub fn total(&self) -> usize {
        self.resources.iter().map(|r| r.pager.total()).sum()
    }
}

/// Compute the lifetime report
///
/// **Public** - main entry point of the lifetime aggregator
///
/// Filters apply before indexing: a filtered-out free never closes an
/// interval.
///
/// # Returns
/// `None` when no event passes the filters
pub fn compute_lifetimes(
    trace: &TraceData,
    filters: &mut FilterChain,
    options: &LifetimeOptions,
) -> Option<LifetimeReport> {
    let mut range = TimeRange::default();
    let mut y_max = 0;
    let mut advisories = Vec::new();
    let mut resources = Vec::with_capacity(trace.resources().len());
    let mut still_open = Vec::with_capacity(trace.resources().len());

    for resource in trace.resources() {
        let mut pager = Pager::new(options.page_capacity);
        let mut index = ResourceIndex::new();

        for event in &resource.events {
            if !filters.matches(event) {
                continue;
            }
            range.observe(event.timestamp);

            if event.is_alloc() {
                index.on_alloc(event);
                continue;
            }
            if let FreeOutcome::Released(opened) = index.on_free(event) {
                y_max = y_max.max(opened.size);
                pager.push(Lifetime {
                    start: opened.timestamp,
                    end: event.timestamp,
                    size: opened.size,
                });
            }
        }

        debug!(
            "{}: {} closed lifetimes, {} still open",
            resource.name,
            pager.total(),
            index.len()
        );
        still_open.push(index.into_open());
        resources.push(ResourceLifetimes {
            resource: resource.name.clone(),
            pager,
        });
    }

    let x_range = range.bounds()?;

    // open resources end at the last timestamp of the whole trace
    for (resource, open) in resources.iter_mut().zip(still_open) {
        for opened in open {
            y_max = y_max.max(opened.size);
            resource.pager.push(Lifetime {
                start: opened.timestamp,
                end: x_range.1,
                size: opened.size,
            });
        }

        if resource.pager.page_count() > options.page_warning_limit {
            let text = format!(
                "{}: number of resources exceeding {} pages, processing could take a lot of time",
                resource.resource, options.page_warning_limit
            );
            warn!("{}", text);
            advisories.push(text);
        }
    }

    Some(LifetimeReport {
        resources,
        x_range,
        y_max,
        advisories,
    })
}

impl LifetimeReport {
    /// Push one segment series per page into `sink`
    ///
    /// # Returns
    /// Number of series written
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> usize {
        let mut written = 0;

        for resource in &self.resources {
            for (page_index, page) in resource.pager.pages().iter().enumerate() {
                let page_number = page_index + 1;
                let points = page
                    .iter()
                    .flat_map(|l| {
                        [
                            Point::new(l.start.as_millis(), l.size),
                            Point::new(l.end.as_millis(), l.size),
                        ]
                    })
                    .collect();
                sink.add_series(Series {
                    name: format!("{}-{}", resource.resource, page_number),
                    title: String::new(),
                    axis: YAxis::Primary,
                    style: SeriesStyle::Segments,
                    page: Some(page_number),
                    points,
                });
                written += 1;
            }
        }

        for advisory in &self.advisories {
            sink.add_advisory(advisory);
        }

        sink.set_title("Resource life-time");
        sink.set_axis_x(Axis::new(
            "time (secs)",
            self.x_range.0.as_millis(),
            self.x_range.1.as_millis(),
        ));
        sink.set_axis_y(Axis::new("size", 0, self.y_max));
        sink.set_data_style(if self.total() > DETAILS_LIMIT {
            DataStyle::Lines
        } else {
            DataStyle::LinesPoints
        });

        written
    }
}

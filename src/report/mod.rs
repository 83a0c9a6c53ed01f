//! Report sink abstraction.
//!
//! Aggregators describe their output as axes, data series and summary
//! tables pushed into a [`ReportSink`]. The sink decides how it ends up
//! on disk: [`ReportDocument`] just records it (and serializes to JSON),
//! the gnuplot sink in `output::gnuplot` turns it into a plot.

pub mod document;
pub mod table;

pub use document::ReportDocument;
pub use table::{Align, SummaryTable, TableColumn};

use crate::utils::error::OutputError;
use serde::{Deserialize, Serialize};

/// Axis range and label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub label: String,
    pub min: u64,
    pub max: u64,
}

impl Axis {
    pub fn new(label: impl Into<String>, min: u64, max: u64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }
}

/// Which Y axis a series is plotted against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxis {
    #[default]
    Primary,
    Secondary,
}

/// How the points of a series are connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesStyle {
    /// A polyline through all points
    Line,
    /// Every two consecutive points form an independent segment
    Segments,
    /// A vertical marker line (two points sharing X)
    Marker,
}

/// Default drawing style of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStyle {
    Lines,
    LinesPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u64,
    pub y: u64,
}

impl Point {
    pub fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// A named data series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Stable identifier, also used as the data file stem
    pub name: String,
    /// Legend title
    pub title: String,
    pub axis: YAxis,
    pub style: SeriesStyle,
    /// Page (shard) number for paginated reports, starting at 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub points: Vec<Point>,
}

impl Series {
    pub fn line(name: impl Into<String>, title: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            axis: YAxis::Primary,
            style: SeriesStyle::Line,
            page: None,
            points,
        }
    }

    /// Vertical marker at `x` spanning `y_min..=y_max`
    pub fn marker(
        name: impl Into<String>,
        title: impl Into<String>,
        x: u64,
        y_min: u64,
        y_max: u64,
    ) -> Self {
        Self {
            style: SeriesStyle::Marker,
            ..Self::line(name, title, vec![Point::new(x, y_min), Point::new(x, y_max)])
        }
    }

    pub fn on_axis(mut self, axis: YAxis) -> Self {
        self.axis = axis;
        self
    }
}

/// Consumer of aggregated report data
pub trait ReportSink {
    fn set_title(&mut self, title: &str);

    fn set_data_style(&mut self, style: DataStyle);

    fn set_axis_x(&mut self, axis: Axis);

    fn set_axis_y(&mut self, axis: Axis);

    fn set_axis_y2(&mut self, axis: Axis);

    fn add_series(&mut self, series: Series);

    fn add_table(&mut self, table: SummaryTable);

    /// Record a non-fatal warning about the report
    fn add_advisory(&mut self, text: &str);

    /// Produce the final output
    fn render(&mut self) -> Result<(), OutputError>;
}

//! Recording report sink.
//!
//! Keeps everything an aggregator emits. Serialized as the JSON report
//! and used as the intermediate form of the gnuplot sink.

use super::{Axis, DataStyle, ReportSink, Series, SummaryTable};
use crate::utils::config::REPORT_SCHEMA_VERSION;
use crate::utils::error::OutputError;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Schema version for compatibility checking
    pub version: String,

    /// Report kind ("totals", "lifetime", "activity")
    pub kind: String,

    pub title: String,

    pub data_style: DataStyle,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_x: Option<Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_y: Option<Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_y2: Option<Axis>,

    pub series: Vec<Series>,

    pub tables: Vec<SummaryTable>,

    #[serde(default)]
    pub advisories: Vec<String>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

impl ReportDocument {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            version: REPORT_SCHEMA_VERSION.to_string(),
            kind: kind.into(),
            title: String::new(),
            data_style: DataStyle::Lines,
            axis_x: None,
            axis_y: None,
            axis_y2: None,
            series: Vec::new(),
            tables: Vec::new(),
            advisories: Vec::new(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn series_named(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Series of one page of a paginated report
    pub fn page(&self, page: usize) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(move |s| s.page == Some(page))
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.tables.is_empty()
    }
}

impl ReportSink for ReportDocument {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_data_style(&mut self, style: DataStyle) {
        self.data_style = style;
    }

    fn set_axis_x(&mut self, axis: Axis) {
        self.axis_x = Some(axis);
    }

    fn set_axis_y(&mut self, axis: Axis) {
        self.axis_y = Some(axis);
    }

    fn set_axis_y2(&mut self, axis: Axis) {
        self.axis_y2 = Some(axis);
    }

    fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    fn add_table(&mut self, table: SummaryTable) {
        self.tables.push(table);
    }

    fn add_advisory(&mut self, text: &str) {
        self.advisories.push(text.to_string());
    }

    fn render(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

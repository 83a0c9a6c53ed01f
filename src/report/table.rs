//! Summary tables attached to reports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Column with a (possibly multi-line) header and a character width
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub header: Vec<String>,
    pub width: usize,
    pub align: Align,
}

/// Labeled rows and columns summarizing a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, header: &[&str], width: usize, align: Align) -> Self {
        self.columns.push(TableColumn {
            header: header.iter().map(|h| h.to_string()).collect(),
            width,
            align,
        });
        self
    }

    /// Append a row, padding missing cells with empty text
    pub fn push_row(&mut self, cells: Vec<String>) {
        let mut cells = cells;
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    /// Number of header lines (tallest column header)
    pub fn header_lines(&self) -> usize {
        self.columns.iter().map(|c| c.header.len()).max().unwrap_or(0)
    }

    /// Plain-text rendering, used for terminal summaries
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let lines = self.header_lines();
        for line in 0..lines {
            // headers are bottom-aligned
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    let offset = lines - c.header.len();
                    let text = if line >= offset {
                        c.header[line - offset].as_str()
                    } else {
                        ""
                    };
                    pad(text, c.width, Align::Center)
                })
                .collect();
            out.push_str(cells.join(" ").trim_end());
            out.push('\n');
        }
        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(row)
                .map(|(c, text)| pad(text, c.width, c.align))
                .collect();
            out.push_str(cells.join(" ").trim_end());
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Center => format!("{:^width$}", text, width = width),
        Align::Right => format!("{:>width$}", text, width = width),
    }
}

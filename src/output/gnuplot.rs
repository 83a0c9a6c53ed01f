//! gnuplot report sink.
//!
//! Records the report like [`ReportDocument`] and on render writes a
//! gnuplot configuration file plus one data file per series into a work
//! directory, then runs gnuplot on it.

use super::{create_parent_dirs, validate_output_path};
use crate::report::{
    Align, Axis, DataStyle, ReportDocument, ReportSink, Series, SeriesStyle, SummaryTable, YAxis,
};
use crate::trace::{Tic, Timestamp};
use crate::utils::config::{CFG_FILENAME, GNUPLOT_BIN};
use crate::utils::error::OutputError;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Lines between the plot and a summary table
const TABLE_MARGIN: usize = 9;

/// Minimal bottom margin when a table is present
const MIN_BOTTOM_MARGIN: usize = 15;

/// Output image format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Terminal {
    Png,
    #[default]
    Eps,
}

impl Terminal {
    fn setup(&self) -> &'static str {
        match self {
            Terminal::Png => "set terminal png enhanced size 1024,728",
            Terminal::Eps => "set terminal postscript eps enhanced color",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Terminal::Png => "png",
            Terminal::Eps => "eps",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GnuplotConfig {
    pub terminal: Terminal,
    /// Rendered image path
    pub output: PathBuf,
    /// Directory receiving the configuration and data files
    pub work_dir: PathBuf,
    /// Keep the configuration and data files after rendering
    pub keep_files: bool,
    /// gnuplot executable
    pub program: String,
}

impl GnuplotConfig {
    pub fn new(terminal: Terminal, output: impl Into<PathBuf>) -> Self {
        Self {
            terminal,
            output: output.into(),
            work_dir: PathBuf::from("."),
            keep_files: false,
            program: GNUPLOT_BIN.to_string(),
        }
    }
}

/// Report sink producing a gnuplot image
pub struct GnuplotSink {
    config: GnuplotConfig,
    document: ReportDocument,
}

impl GnuplotSink {
    pub fn new(kind: impl Into<String>, config: GnuplotConfig) -> Self {
        Self {
            config,
            document: ReportDocument::new(kind),
        }
    }

    /// Everything recorded so far
    pub fn document(&self) -> &ReportDocument {
        &self.document
    }

    pub fn into_document(self) -> ReportDocument {
        self.document
    }

    /// Write the configuration and data files without running gnuplot
    ///
    /// # Returns
    /// Paths of all written files, the configuration file first
    pub fn write_files(&self) -> Result<Vec<PathBuf>, OutputError> {
        let work_dir = &self.config.work_dir;
        fs::create_dir_all(work_dir)?;

        let mut written = Vec::with_capacity(self.document.series.len() + 1);
        let mut plots = Vec::with_capacity(self.document.series.len());
        for series in &self.document.series {
            let file_name = data_file_name(&series.name);
            let path = work_dir.join(&file_name);
            fs::write(&path, data_text(series))?;
            plots.push(plot_clause(&file_name, series));
            written.push(path);
        }

        let cfg_path = work_dir.join(CFG_FILENAME);
        fs::write(&cfg_path, self.config_text(&plots)?)?;
        written.insert(0, cfg_path);

        debug!("Wrote {} gnuplot files to {}", written.len(), work_dir.display());
        Ok(written)
    }

    fn config_text(&self, plots: &[String]) -> Result<String, OutputError> {
        let doc = &self.document;
        let output = absolute(&self.config.output)?;
        let mut cfg = String::new();

        cfg.push_str(&format!("{}\n", self.config.terminal.setup()));
        cfg.push_str(&format!("set output \"{}\"\n", escape(&output.display().to_string())));
        cfg.push_str("set key bmargin\n");
        cfg.push_str(&format!("set title \"{}\"\n", escape(&doc.title)));
        let style = match doc.data_style {
            DataStyle::Lines => "lines",
            DataStyle::LinesPoints => "linespoints",
        };
        cfg.push_str(&format!("set style data {}\n", style));

        if let Some(axis) = &doc.axis_x {
            cfg.push_str(&axis_x_text(axis));
        }
        if let Some(axis) = &doc.axis_y {
            let (min, max) = axis_range(axis);
            cfg.push_str(&format!("set yrange[{}:{}]\n", min, max));
            cfg.push_str("set format y \"%.1s%c\"\n");
            cfg.push_str("set ytics out\n");
            cfg.push_str(&format!("set ylabel \"{}\"\n", escape(&axis.label)));
        }
        if let Some(axis) = &doc.axis_y2 {
            let (min, max) = axis_range(axis);
            cfg.push_str(&format!("set y2range[{}:{}]\n", min, max));
            cfg.push_str("set y2tics out\n");
            cfg.push_str("set ytics nomirror\n");
            cfg.push_str(&format!("set y2label \"{}\"\n", escape(&axis.label)));
        }

        if doc.series.iter().any(|s| s.style == SeriesStyle::Segments) {
            cfg.push_str("set style line 1 lt 1 lc rgb \"blue\"\n");
        }

        if !doc.tables.is_empty() {
            let lines: usize = doc.tables.iter().map(table_lines).sum();
            cfg.push_str(&format!("set bmargin {}\n", (TABLE_MARGIN + lines).max(MIN_BOTTOM_MARGIN)));
            let mut top = lines;
            for table in &doc.tables {
                cfg.push_str(&table_labels(table, top));
                top -= table_lines(table);
            }
        }

        if plots.is_empty() {
            warn!("Report has no data series, gnuplot output will be empty");
        } else {
            cfg.push_str(&format!("plot \\\n{}\n", plots.join(", \\\n")));
        }
        Ok(cfg)
    }

    fn remove_files(&self, files: &[PathBuf]) {
        for file in files {
            if let Err(e) = fs::remove_file(file) {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}

impl ReportSink for GnuplotSink {
    fn set_title(&mut self, title: &str) {
        self.document.set_title(title);
    }

    fn set_data_style(&mut self, style: DataStyle) {
        self.document.set_data_style(style);
    }

    fn set_axis_x(&mut self, axis: Axis) {
        self.document.set_axis_x(axis);
    }

    fn set_axis_y(&mut self, axis: Axis) {
        self.document.set_axis_y(axis);
    }

    fn set_axis_y2(&mut self, axis: Axis) {
        self.document.set_axis_y2(axis);
    }

    fn add_series(&mut self, series: Series) {
        self.document.add_series(series);
    }

    fn add_table(&mut self, table: SummaryTable) {
        self.document.add_table(table);
    }

    fn add_advisory(&mut self, text: &str) {
        self.document.add_advisory(text);
    }

    /// Write the files and run gnuplot
    ///
    /// # Errors
    /// * `OutputError::InvalidPath` - Output path is unusable
    /// * `OutputError::WriteFailed` - Files could not be written
    /// * `OutputError::RendererFailed` - gnuplot missing or exited non-zero
    fn render(&mut self) -> Result<(), OutputError> {
        validate_output_path(&self.config.output)?;
        create_parent_dirs(&self.config.output)?;
        let files = self.write_files()?;

        info!(
            "Rendering {} with {}",
            self.config.output.display(),
            self.config.program
        );
        let status = Command::new(&self.config.program)
            .arg(CFG_FILENAME)
            .current_dir(&self.config.work_dir)
            .status()
            .map_err(|e| {
                OutputError::RendererFailed(format!("cannot run {}: {}", self.config.program, e))
            })?;

        if !status.success() {
            return Err(OutputError::RendererFailed(format!(
                "{} exited with {}",
                self.config.program, status
            )));
        }

        if !self.config.keep_files {
            self.remove_files(&files);
        }
        info!("Report rendered to {}", self.config.output.display());
        Ok(())
    }
}

/// Data file name of a series, limited to portable characters
fn data_file_name(series_name: &str) -> String {
    let stem: String = series_name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    format!("{}.dat", stem)
}

/// Segment series keep all starts on the first row and all ends on the
/// second, every other series has one point per line.
fn data_text(series: &Series) -> String {
    let mut text = String::new();
    match series.style {
        SeriesStyle::Segments => {
            let (starts, ends): (Vec<String>, Vec<String>) = series
                .points
                .chunks(2)
                .filter(|pair| pair.len() == 2)
                .map(|pair| {
                    (
                        format!("{} {}", pair[0].x, pair[0].y),
                        format!("{} {}", pair[1].x, pair[1].y),
                    )
                })
                .unzip();
            text.push_str(&format!("{}\n", starts.join(" ")));
            text.push_str(&format!("{}\n", ends.join(" ")));
        }
        SeriesStyle::Line | SeriesStyle::Marker => {
            for point in &series.points {
                text.push_str(&format!("{} {}\n", point.x, point.y));
            }
        }
    }
    text
}

fn plot_clause(file_name: &str, series: &Series) -> String {
    let axes = match series.axis {
        YAxis::Primary => "",
        YAxis::Secondary => " axes x1y2",
    };
    match series.style {
        SeriesStyle::Segments => format!(
            "for [i=1:{}] \"{}\" using (column(2*i-1)):(column(2*i)) ls 1 notitle{}",
            (series.points.len() / 2).max(1),
            file_name,
            axes
        ),
        SeriesStyle::Line | SeriesStyle::Marker => format!(
            "\"{}\" using 1:2 title \"{}\"{}",
            file_name,
            escape(&series.title),
            axes
        ),
    }
}

/// X axis with manual time tics: absolute time and offset from start
fn axis_x_text(axis: &Axis) -> String {
    let (min, max) = axis_range(axis);
    let mut text = String::new();
    text.push_str(&format!("set xlabel \"{}\" offset 0,-4\n", escape(&axis.label)));
    text.push_str(&format!("set xrange[{}:{}]\n", min, max));
    // autotics outside of the range
    text.push_str(&format!("set xtics {},{}\n", max.saturating_mul(2), max.saturating_mul(2)));
    text.push_str("set xtics rotate\n");

    let step = Tic::rounded((max - min) / 10).value();
    let mut tic = min;
    while let Some(next) = tic.checked_add(step).filter(|next| *next <= max) {
        text.push_str(&tic_text(tic, min));
        tic = next;
    }
    text.push_str(&tic_text(max, min));
    text
}

fn tic_text(tic: u64, min: u64) -> String {
    format!(
        "set xtics add (\"{}\\n+{}\" {})\n",
        Timestamp::from_millis(tic),
        Timestamp::offset_text(tic - min),
        tic
    )
}

/// gnuplot rejects empty ranges
fn axis_range(axis: &Axis) -> (u64, u64) {
    let max = if axis.max > axis.min { axis.max } else { axis.min.saturating_add(1) };
    (axis.min, max)
}

/// Header lines, one blank line and the rows
fn table_lines(table: &SummaryTable) -> usize {
    table.header_lines() + 1 + table.rows.len()
}

/// Table cells as character-positioned labels below the plot
fn table_labels(table: &SummaryTable, top: usize) -> String {
    let mut text = String::new();
    let headers = table.header_lines();
    let mut offset = 1;

    for (index, column) in table.columns.iter().enumerate() {
        let (x, align) = match column.align {
            Align::Left => (offset, "left"),
            Align::Center => (offset + column.width / 2, "center"),
            Align::Right => (offset + column.width.saturating_sub(1), "right"),
        };

        // headers are bottom aligned and centered
        let first = headers - column.header.len();
        for (line, header) in column.header.iter().enumerate() {
            text.push_str(&format!(
                "set label \"{}\" at character {},{} center\n",
                escape(header),
                offset + column.width / 2,
                top - first - line
            ));
        }
        for (row, cells) in table.rows.iter().enumerate() {
            let Some(cell) = cells.get(index) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            text.push_str(&format!(
                "set label \"{}\" at character {},{} {}\n",
                escape(cell),
                x,
                top - headers - 1 - row,
                align
            ));
        }
        offset += column.width;
    }
    text
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn absolute(path: &Path) -> Result<PathBuf, OutputError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

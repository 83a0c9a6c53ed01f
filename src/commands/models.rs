use crate::aggregator::ReportKind;
use std::path::PathBuf;

/// Arguments for the report commands
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Report to generate
    pub kind: ReportKind,

    /// sp-rtrace log, stdin when absent
    pub input: Option<PathBuf>,

    /// Rendered image path, `timeline.eps`/`timeline.png` when absent
    pub output: Option<PathBuf>,

    /// Render PNG instead of EPS
    pub png: bool,

    /// Activity window in milliseconds
    pub slice: Option<u64>,

    /// Lifetime intervals per page
    pub page_capacity: Option<usize>,

    /// Size range filter, e.g. "1k-4m"
    pub filter_size: Option<String>,

    /// Time range filter, e.g. "10:00:00-10:05:00" or "500-"
    pub filter_time: Option<String>,

    /// Also write the report as JSON
    pub json: Option<PathBuf>,

    /// Skip gnuplot rendering
    pub no_render: bool,

    /// Keep gnuplot configuration and data files
    pub keep_files: bool,

    /// Directory for gnuplot configuration and data files
    pub work_dir: Option<PathBuf>,

    /// Print summary tables to stdout
    pub print_summary: bool,

    /// TOML configuration file
    pub config: Option<PathBuf>,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            kind: ReportKind::Totals,
            input: None,
            output: None,
            png: false,
            slice: None,
            page_capacity: None,
            filter_size: None,
            filter_time: None,
            json: None,
            no_render: false,
            keep_files: false,
            work_dir: None,
            print_summary: false,
            config: None,
        }
    }
}

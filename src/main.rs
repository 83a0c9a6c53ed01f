//! rtrace-timeline CLI
//!
//! Generates resource usage timeline reports from sp-rtrace logs.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use rtrace_timeline::aggregator::ReportKind;
use rtrace_timeline::commands::{
    display_version, execute_report, validate_args, validate_report_file, ReportArgs,
};

/// rtrace-timeline - resource usage reports for sp-rtrace logs
#[derive(Parser, Debug)]
#[command(name = "rtrace-timeline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by all reports
#[derive(Args, Debug)]
struct ReportOptions {
    /// sp-rtrace log file (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Rendered image path (default timeline.eps, or timeline.png with --png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render PNG instead of EPS
    #[arg(short, long)]
    png: bool,

    /// Size range filter, e.g. "1k-4m"
    #[arg(long)]
    filter_size: Option<String>,

    /// Time range filter: H:M:S[.ms] is absolute, bare milliseconds are
    /// relative to the first event, e.g. "500-" or "10:00:00-10:05:00"
    #[arg(long)]
    filter_time: Option<String>,

    /// Also write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Skip gnuplot rendering
    #[arg(long)]
    no_render: bool,

    /// Keep gnuplot configuration and data files
    #[arg(long)]
    keep_files: bool,

    /// Directory for gnuplot configuration and data files
    #[arg(long, env = "RTRACE_TIMELINE_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Print summary tables to stdout
    #[arg(long)]
    summary: bool,

    /// TOML configuration file
    #[arg(long, env = "RTRACE_TIMELINE_CONFIG")]
    config: Option<PathBuf>,
}

impl ReportOptions {
    fn into_args(self, kind: ReportKind) -> ReportArgs {
        ReportArgs {
            kind,
            input: self.input,
            output: self.output,
            png: self.png,
            filter_size: self.filter_size,
            filter_time: self.filter_time,
            json: self.json,
            no_render: self.no_render,
            keep_files: self.keep_files,
            work_dir: self.work_dir,
            print_summary: self.summary,
            config: self.config,
            ..Default::default()
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Amount of non-freed allocations over time
    Totals {
        #[command(flatten)]
        options: ReportOptions,
    },

    /// Life-time of every resource
    Lifetime {
        #[command(flatten)]
        options: ReportOptions,

        /// Lifetime intervals per data page
        #[arg(long)]
        page_capacity: Option<usize>,
    },

    /// Allocation/deallocation rate over a sliding window
    Activity {
        #[command(flatten)]
        options: ReportOptions,

        /// Window size in milliseconds (1/100 of the trace range when omitted)
        #[arg(short, long)]
        slice: Option<u64>,
    },

    /// Validate a JSON report file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    let args = match cli.command {
        Commands::Totals { options } => options.into_args(ReportKind::Totals),
        Commands::Lifetime {
            options,
            page_capacity,
        } => ReportArgs {
            page_capacity,
            ..options.into_args(ReportKind::Lifetime)
        },
        Commands::Activity { options, slice } => ReportArgs {
            slice,
            ..options.into_args(ReportKind::Activity)
        },
        Commands::Validate { file } => return validate_report_file(file),
        Commands::Version => {
            display_version();
            return Ok(());
        }
    };

    // Validate args first
    validate_args(&args)?;

    execute_report(args)?;

    Ok(())
}

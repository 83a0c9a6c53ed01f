//! Report command implementation.
//!
//! The report commands:
//! 1. Load the optional configuration file
//! 2. Parse the sp-rtrace log
//! 3. Build the filter chain
//! 4. Aggregate and render the report
//! 5. Write the JSON report and summary

use super::models::ReportArgs;
use crate::aggregator::{ActivityOptions, Aggregator, LifetimeOptions, ReportKind, ReportOutcome};
use crate::filter::build_filters;
use crate::output::{write_report, GnuplotConfig, GnuplotSink, Terminal};
use crate::parser::parse_trace;
use crate::report::ReportDocument;
use crate::trace::TraceData;
use crate::utils::config::{load_config, ReportConfig};
use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Instant;

/// Execute a report command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Report command arguments
///
/// # Returns
/// `ReportOutcome::NoMatchingEvents` when the filters left nothing to
/// report; nothing is written in that case
///
/// # Errors
/// * Configuration or filter errors
/// * Trace parsing errors
/// * File write or renderer errors
///
/// # Example
/// ```ignore
/// let args = ReportArgs {
///     kind: ReportKind::Lifetime,
///     input: Some(PathBuf::from("app.rtrace.txt")),
///     png: true,
///     ..Default::default()
/// };
///
/// execute_report(args)?;
/// ```
pub fn execute_report(args: ReportArgs) -> Result<ReportOutcome> {
    let start_time = Instant::now();

    info!("Starting {} report", args.kind);

    // Step 1: Load configuration
    info!("Step 1/5: Loading configuration...");
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ReportConfig::default(),
    };

    // Step 2: Parse trace
    info!("Step 2/5: Parsing trace...");
    let trace = read_trace(args.input.as_ref())?;
    debug!(
        "Trace: {} resource types, {} contexts, {} events",
        trace.resources().len(),
        trace.contexts().len(),
        trace.event_count()
    );

    // Step 3: Build filters (command line overrides configuration)
    info!("Step 3/5: Building filters...");
    let size = args.filter_size.as_deref().or(config.filters.size.as_deref());
    let time = args.filter_time.as_deref().or(config.filters.time.as_deref());
    let mut filters = build_filters(size, time).context("Invalid filter")?;
    debug!("Filters: {}", filters.describe());

    // Step 4: Aggregate and render
    let aggregator = build_aggregator(&args, &config);
    let (outcome, document) = if args.no_render {
        info!("Step 4/5: Aggregating (rendering disabled)...");
        let mut document = ReportDocument::new(args.kind.as_str());
        let outcome = aggregator
            .write_report(&trace, &mut filters, &mut document)
            .context("Failed to generate report")?;
        (outcome, document)
    } else {
        info!("Step 4/5: Aggregating and rendering...");
        let mut sink = GnuplotSink::new(args.kind.as_str(), gnuplot_config(&args, &config));
        let outcome = aggregator
            .write_report(&trace, &mut filters, &mut sink)
            .context("Failed to render report")?;
        (outcome, sink.into_document())
    };

    if outcome == ReportOutcome::NoMatchingEvents {
        warn!("No events matching the filters ({}), no report generated", filters.describe());
        return Ok(outcome);
    }

    // Step 5: Write outputs
    info!("Step 5/5: Writing outputs...");
    if let Some(json_path) = &args.json {
        write_report(&document, json_path).context("Failed to write JSON report")?;
        info!("✓ JSON report written to: {}", json_path.display());
    }

    if args.print_summary {
        print_summary(&document);
    }

    let elapsed = start_time.elapsed();
    info!("Report completed in {:.2}s", elapsed.as_secs_f64());

    Ok(outcome)
}

fn read_trace(input: Option<&PathBuf>) -> Result<TraceData> {
    let mut trace = TraceData::new();
    let stats = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open trace {}", path.display()))?;
            parse_trace(BufReader::new(file), &mut trace)
                .with_context(|| format!("Failed to parse trace {}", path.display()))?
        }
        None => parse_trace(io::stdin().lock(), &mut trace)
            .context("Failed to parse trace from stdin")?,
    };
    info!(
        "Parsed {} allocations and {} frees ({} lines)",
        stats.allocs, stats.frees, stats.lines
    );

    trace.sort();
    Ok(trace)
}

fn build_aggregator(args: &ReportArgs, config: &ReportConfig) -> Aggregator {
    match args.kind {
        ReportKind::Totals => Aggregator::Totals,
        ReportKind::Lifetime => Aggregator::Lifetime(
            LifetimeOptions::default()
                .with_page_capacity(args.page_capacity.unwrap_or(config.lifetime.page_capacity)),
        ),
        ReportKind::Activity => Aggregator::Activity(ActivityOptions {
            slice: args.slice.or(config.activity.slice_ms),
        }),
    }
}

fn gnuplot_config(args: &ReportArgs, config: &ReportConfig) -> GnuplotConfig {
    let terminal = if args.png || config.output.png {
        Terminal::Png
    } else {
        Terminal::Eps
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("timeline.{}", terminal.extension())));

    let mut gnuplot = GnuplotConfig::new(terminal, output);
    gnuplot.keep_files = args.keep_files || config.output.keep_files;
    if let Some(dir) = args.work_dir.clone().or_else(|| config.output.work_dir.clone()) {
        gnuplot.work_dir = dir;
    }
    gnuplot
}

fn print_summary(document: &ReportDocument) {
    println!("\n{}", "=".repeat(80));
    println!("{}", document.title.to_uppercase().bold());
    println!("{}", "=".repeat(80));
    println!("Series: {}", document.series.len());
    for table in &document.tables {
        println!("\n{}", table.to_text());
    }
    for advisory in &document.advisories {
        println!("{} {}", "warning:".yellow().bold(), advisory);
    }
    println!("{}", "=".repeat(80));
}

/// Validate report arguments
///
/// **Public** - can be called before execute_report for early validation
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &ReportArgs) -> Result<()> {
    if args.slice == Some(0) {
        anyhow::bail!("slice must be greater than 0");
    }

    if args.page_capacity == Some(0) {
        anyhow::bail!("page capacity must be greater than 0");
    }

    if args.slice.is_some() && args.kind != ReportKind::Activity {
        anyhow::bail!("slice only applies to the activity report");
    }

    if args.page_capacity.is_some() && args.kind != ReportKind::Lifetime {
        anyhow::bail!("page capacity only applies to the lifetime report");
    }

    if let Some(input) = &args.input {
        if !input.is_file() {
            anyhow::bail!("Input trace not found: {}", input.display());
        }
    }

    if let Some(output) = &args.output {
        if output.is_dir() {
            anyhow::bail!("Output path is a directory: {}", output.display());
        }
    }

    if args.no_render && args.output.is_some() {
        warn!("--output is ignored when rendering is disabled");
    }

    // surface filter syntax errors before reading the trace
    build_filters(args.filter_size.as_deref(), args.filter_time.as_deref())
        .context("Invalid filter")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const LOG: &str = "\
<1> : memory (memory allocation in bytes)
1. [00:00:00.000] malloc(100) = 0x10
2. [00:00:00.005] malloc(50) = 0x20
3. [00:00:00.010] free(0x10)
";

    fn trace_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LOG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_args_defaults() {
        assert!(validate_args(&ReportArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_zero_slice() {
        let args = ReportArgs {
            kind: ReportKind::Activity,
            slice: Some(0),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_slice_outside_activity() {
        let args = ReportArgs {
            kind: ReportKind::Totals,
            slice: Some(10),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_page_capacity() {
        let args = ReportArgs {
            kind: ReportKind::Lifetime,
            page_capacity: Some(0),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_missing_input() {
        let args = ReportArgs {
            input: Some(PathBuf::from("/nonexistent/trace.txt")),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_bad_filter() {
        let args = ReportArgs {
            filter_size: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_execute_report_writes_json() {
        let input = trace_file();
        let dir = tempdir().unwrap();
        let json = dir.path().join("totals.json");
        let args = ReportArgs {
            kind: ReportKind::Totals,
            input: Some(input.path().to_path_buf()),
            json: Some(json.clone()),
            no_render: true,
            ..Default::default()
        };

        let outcome = execute_report(args).unwrap();
        assert!(matches!(outcome, ReportOutcome::Written { .. }));

        let doc = crate::output::read_report(&json).unwrap();
        assert_eq!(doc.kind, "totals");
        assert_eq!(doc.tables[0].rows[0][5], "150");
    }

    #[test]
    fn test_execute_report_no_matching_events() {
        let input = trace_file();
        let dir = tempdir().unwrap();
        let json = dir.path().join("lifetime.json");
        let args = ReportArgs {
            kind: ReportKind::Lifetime,
            input: Some(input.path().to_path_buf()),
            filter_size: Some("1m-".to_string()),
            filter_time: Some("1000-".to_string()),
            json: Some(json.clone()),
            no_render: true,
            ..Default::default()
        };

        assert_eq!(execute_report(args).unwrap(), ReportOutcome::NoMatchingEvents);
        assert!(!json.exists());
    }
}

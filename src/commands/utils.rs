use crate::output::read_report;
use crate::report::YAxis;
use crate::utils::config::REPORT_SCHEMA_VERSION;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Validate a JSON report file
pub fn validate_report_file(file_path: impl AsRef<Path>) -> Result<()> {
    let file_path = file_path.as_ref();
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Invalid report {}", file_path.display()))?;

    if report.version != REPORT_SCHEMA_VERSION {
        anyhow::bail!(
            "Unsupported report version {} (expected {})",
            report.version,
            REPORT_SCHEMA_VERSION
        );
    }

    let secondary = report
        .series
        .iter()
        .filter(|s| s.axis == YAxis::Secondary)
        .count();

    println!("{}", "✓ Valid report JSON".green());
    println!("  Version: {}", report.version);
    println!("  Kind: {}", report.kind);
    println!("  Title: {}", report.title);
    println!("  Series: {} ({} on secondary axis)", report.series.len(), secondary);
    println!("  Tables: {}", report.tables.len());
    println!("  Generated: {}", report.generated_at);
    for advisory in &report.advisories {
        println!("  {} {}", "warning:".yellow(), advisory);
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("rtrace-timeline v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", REPORT_SCHEMA_VERSION);
    println!();
    println!("Resource usage timeline reports for sp-rtrace allocation logs.");
}

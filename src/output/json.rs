//! JSON report writer.
//!
//! Writes recorded report documents to JSON files with proper formatting.

use super::{create_parent_dirs, validate_output_path};
use crate::report::ReportDocument;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write a report document to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Recorded report
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let mut doc = ReportDocument::new("totals");
/// Aggregator::Totals.write_report(&trace, &mut filters, &mut doc)?;
/// write_report(&doc, "totals.json")?;
/// ```
pub fn write_report(report: &ReportDocument, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(OutputError::SerializationFailed)?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a report to a pretty JSON string
pub fn report_to_string(report: &ReportDocument) -> Result<String, OutputError> {
    serde_json::to_string_pretty(report).map_err(OutputError::SerializationFailed)
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a report document from a JSON file
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<ReportDocument, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let report: ReportDocument =
        serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report loaded: version {}, kind {}, {} series",
        report.version,
        report.kind,
        report.series.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Point, ReportSink, Series};
    use tempfile::NamedTempFile;

    fn create_test_report() -> ReportDocument {
        let mut doc = ReportDocument::new("totals");
        doc.set_title("Amount of non-freed allocations");
        doc.add_series(Series::line(
            "memory-ffffffff",
            "memory (all allocations)",
            vec![Point::new(0, 100), Point::new(10, 0)],
        ));
        doc
    }

    #[test]
    fn test_write_and_read_report() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        write_report(&report, path).unwrap();
        let loaded = read_report(path).unwrap();

        assert_eq!(loaded, report);
    }

    #[test]
    fn test_report_to_string() {
        let text = report_to_string(&create_test_report()).unwrap();
        assert!(text.contains("\"kind\": \"totals\""));
        assert!(text.contains("memory-ffffffff"));
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/report.json");

        write_report(&create_test_report(), &nested_path).unwrap();

        assert!(nested_path.exists());
    }
}

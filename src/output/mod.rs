//! Output writers for report data.
//!
//! This module handles writing reports to disk:
//! - JSON report documents
//! - gnuplot configuration and data files, rendered to PNG or EPS

pub mod gnuplot;
pub mod json;

// Re-export main types and functions
pub use gnuplot::{GnuplotConfig, GnuplotSink, Terminal};
pub use json::{read_report, report_to_string, write_report};

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

/// Validate that output path is writable
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Create the parent directories of `path` if needed
fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}

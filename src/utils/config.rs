//! Configuration and constants for the report generator.
//!
//! Constants carry the defaults; [`ReportConfig`] is the optional TOML
//! file that overrides them. Command line flags override both.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Current JSON report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Lifetime intervals per page (one gnuplot data file per page)
pub const DEFAULT_PAGE_CAPACITY: usize = 1000;

/// Page count after which the lifetime report warns about its size
pub const PAGE_WARNING_LIMIT: usize = 150;

/// Up to this many lifetime intervals are drawn with point markers
pub const DETAILS_LIMIT: usize = 20;

/// The automatic activity slice is 1/SLICE_DIVISOR of the trace range
pub const SLICE_DIVISOR: u64 = 100;

/// Name of the generated gnuplot configuration file
pub const CFG_FILENAME: &str = "timeline.cfg";

/// Name of the gnuplot executable
pub const GNUPLOT_BIN: &str = "gnuplot";

/// Label of the synthetic context matching every event
pub const ALL_CONTEXTS_LABEL: &str = "all allocations";

/// Label of the synthetic context matching uncategorized events
pub const NO_CONTEXTS_LABEL: &str = "no contexts";

/// Report configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Activity report settings
    #[serde(default)]
    pub activity: ActivitySettings,

    /// Lifetime report settings
    #[serde(default)]
    pub lifetime: LifetimeSettings,

    /// Default event filters
    #[serde(default)]
    pub filters: FilterSettings,

    /// Output settings
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActivitySettings {
    /// Window size in milliseconds, derived from the trace when absent
    pub slice_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifetimeSettings {
    /// Intervals per page
    #[serde(default = "default_page_capacity")]
    pub page_capacity: usize,
}

impl Default for LifetimeSettings {
    fn default() -> Self {
        Self {
            page_capacity: DEFAULT_PAGE_CAPACITY,
        }
    }
}

fn default_page_capacity() -> usize {
    DEFAULT_PAGE_CAPACITY
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterSettings {
    /// Size range, e.g. "1k-4m"
    pub size: Option<String>,

    /// Time range, e.g. "00:00:01.000-" or "500-2000"
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Render PNG instead of EPS
    #[serde(default)]
    pub png: bool,

    /// Keep gnuplot configuration and data files after rendering
    #[serde(default)]
    pub keep_files: bool,

    /// Directory for gnuplot configuration and data files
    pub work_dir: Option<PathBuf>,
}

/// Load report configuration from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Toml` - If TOML is invalid
/// * `ConfigError::Invalid` - If a value is out of range
///
/// # Example
/// ```ignore
/// let config = load_config("timeline.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ReportConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: ReportConfig = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ReportConfig) -> Result<(), ConfigError> {
    if config.lifetime.page_capacity == 0 {
        return Err(ConfigError::Invalid(
            "lifetime.page_capacity must be greater than 0".to_string(),
        ));
    }
    if config.activity.slice_ms == Some(0) {
        return Err(ConfigError::Invalid(
            "activity.slice_ms must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ReportConfig = toml::from_str("").unwrap();
        assert_eq!(config.lifetime.page_capacity, DEFAULT_PAGE_CAPACITY);
        assert!(config.activity.slice_ms.is_none());
        assert!(!config.output.png);
    }

    #[test]
    fn test_partial_config() {
        let text = r#"
            [activity]
            slice_ms = 250

            [filters]
            size = "1k-"
        "#;
        let config: ReportConfig = toml::from_str(text).unwrap();
        assert_eq!(config.activity.slice_ms, Some(250));
        assert_eq!(config.filters.size.as_deref(), Some("1k-"));
        assert_eq!(config.lifetime.page_capacity, DEFAULT_PAGE_CAPACITY);
    }

    #[test]
    fn test_zero_page_capacity_rejected() {
        let config: ReportConfig = toml::from_str("[lifetime]\npage_capacity = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.toml");
        std::fs::write(&path, "[output]\npng = true\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.output.png);
    }
}

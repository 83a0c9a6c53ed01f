//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while registering events into a trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Event without resource type, but {0} resource types are declared")]
    AmbiguousResource(usize),
}

/// Errors that can occur while reading an sp-rtrace log
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Errors that can occur while building the filter chain
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid size filter value: {0}")]
    InvalidSize(String),

    #[error("Invalid timestamp filter value: {0}")]
    InvalidTime(String),

    #[error("Conflicting {kind} filter bounds: minimum {min} exceeds maximum {max}")]
    ConflictingBounds {
        kind: &'static str,
        min: u64,
        max: u64,
    },
}

/// Errors that can occur while loading report configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during report output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Renderer failed: {0}")]
    RendererFailed(String),
}

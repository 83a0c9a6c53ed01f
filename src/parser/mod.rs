//! Trace log ingestion.
//!
//! This module handles:
//! - Reading sp-rtrace text logs
//! - Registering resource types and contexts
//! - Registering allocation/deallocation events

pub mod rtrace;

// Re-export main types
pub use rtrace::{parse_trace, ParseStats, TraceParser};

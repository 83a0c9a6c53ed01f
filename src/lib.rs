//! rtrace-timeline
//!
//! Resource usage reports for sp-rtrace allocation logs: non-freed
//! totals, resource lifetimes and allocation/deallocation activity,
//! rendered with gnuplot or written as JSON.
//!
//! This crate provides the core implementation for the
//! `rtrace-timeline` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! cargo install rtrace-timeline
//! rtrace-timeline totals -i app.rtrace.txt --png
//! ```
//!
//! ## Library use
//!
//! ```ignore
//! let mut trace = TraceData::new();
//! parse_trace(reader, &mut trace)?;
//! trace.sort();
//!
//! let mut doc = ReportDocument::new("totals");
//! Aggregator::Totals.write_report(&trace, &mut FilterChain::new(), &mut doc)?;
//! ```

pub mod aggregator;
pub mod commands;
pub mod filter;
pub mod output;
pub mod parser;
pub mod report;
pub mod trace;
pub mod utils;

//! Trace data model.
//!
//! This module holds:
//! - Timestamps and time slices
//! - Contexts and context matching
//! - Allocation/deallocation events
//! - The per-trace event store

pub mod context;
pub mod data;
pub mod event;
pub mod timestamp;

// Re-export main types
pub use context::{report_contexts, Context, MASK_ALL, MASK_NONE};
pub use data::{ResourceEvents, TraceData};
pub use event::{Event, EventKind};
pub use timestamp::{Tic, Timestamp};

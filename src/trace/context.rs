//! Allocation contexts.
//!
//! A context is a named bitmask tagging an allocation site or category.
//! Two sentinel masks exist: [`MASK_ALL`] matches every event and
//! [`MASK_NONE`] matches only uncategorized events (context exactly 0).

use crate::utils::config::{ALL_CONTEXTS_LABEL, NO_CONTEXTS_LABEL};
use serde::{Deserialize, Serialize};

/// Matches every event
pub const MASK_ALL: u32 = 0xFFFF_FFFF;

/// Matches events without any context
pub const MASK_NONE: u32 = 0;

/// A named context mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub value: u32,
    pub name: String,
}

impl Context {
    pub fn new(value: u32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }

    /// The synthetic "all allocations" context
    pub fn all() -> Self {
        Self::new(MASK_ALL, ALL_CONTEXTS_LABEL)
    }

    /// The synthetic "no contexts" context
    pub fn none() -> Self {
        Self::new(MASK_NONE, NO_CONTEXTS_LABEL)
    }

    pub fn is_mask_all(&self) -> bool {
        self.value == MASK_ALL
    }

    pub fn is_mask_none(&self) -> bool {
        self.value == MASK_NONE
    }

    /// Check whether an event context bitmask belongs to this context
    ///
    /// `MASK_NONE` requires the event context to be exactly zero rather
    /// than merely disjoint from the mask.
    pub fn matches(&self, event_context: u32) -> bool {
        if self.is_mask_none() {
            event_context == 0
        } else {
            self.is_mask_all() || self.value & event_context != 0
        }
    }
}

/// Contexts a report iterates over, in order
///
/// Always starts with "all allocations". When the trace declares
/// contexts, "no contexts" follows and then the declared ones.
pub fn report_contexts(declared: &[Context]) -> Vec<Context> {
    let mut contexts = vec![Context::all()];
    if !declared.is_empty() {
        contexts.push(Context::none());
        contexts.extend(declared.iter().cloned());
    }
    contexts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_all_matches_everything() {
        let all = Context::all();
        for ctx in [0, 1, 0x80, MASK_ALL] {
            assert!(all.matches(ctx));
        }
    }

    #[test]
    fn test_mask_none_requires_zero() {
        let none = Context::none();
        assert!(none.matches(0));
        assert!(!none.matches(1));
        assert!(!none.matches(0x100));
    }

    #[test]
    fn test_declared_context_overlap() {
        let ctx = Context::new(0x6, "io");
        assert!(ctx.matches(0x2));
        assert!(ctx.matches(0x7));
        assert!(!ctx.matches(0x1));
        assert!(!ctx.matches(0));
    }

    #[test]
    fn test_report_contexts_without_declarations() {
        let contexts = report_contexts(&[]);
        assert_eq!(contexts, vec![Context::all()]);
    }

    #[test]
    fn test_report_contexts_with_declarations() {
        let declared = vec![Context::new(1, "a"), Context::new(2, "b")];
        let contexts = report_contexts(&declared);
        let names: Vec<_> = contexts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["all allocations", "no contexts", "a", "b"]);
    }
}

//! Allocation and deallocation events.

use super::context::Context;
use super::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Alloc,
    Free,
}

/// One allocation or deallocation of a resource
///
/// `index` is the position in the trace log and breaks ties between
/// events sharing a timestamp. Free events always have size 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub index: u64,
    pub context: u32,
    pub timestamp: Timestamp,
    pub resource_id: String,
    pub size: u64,
}

impl Event {
    pub fn alloc(
        index: u64,
        context: u32,
        timestamp: Timestamp,
        resource_id: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            kind: EventKind::Alloc,
            index,
            context,
            timestamp,
            resource_id: resource_id.into(),
            size,
        }
    }

    pub fn free(
        index: u64,
        context: u32,
        timestamp: Timestamp,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Free,
            index,
            context,
            timestamp,
            resource_id: resource_id.into(),
            size: 0,
        }
    }

    pub fn is_alloc(&self) -> bool {
        self.kind == EventKind::Alloc
    }

    pub fn matches_context(&self, context: &Context) -> bool {
        context.matches(self.context)
    }

    /// Sort key: timestamp first, log position second
    pub fn order_key(&self) -> (Timestamp, u64) {
        (self.timestamp, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_has_zero_size() {
        let free = Event::free(3, 0, Timestamp::from_millis(5), "0x10");
        assert_eq!(free.size, 0);
        assert!(!free.is_alloc());
    }

    #[test]
    fn test_matches_context() {
        let event = Event::alloc(1, 0x2, Timestamp::ZERO, "0x10", 8);
        assert!(event.matches_context(&Context::all()));
        assert!(!event.matches_context(&Context::none()));
        assert!(event.matches_context(&Context::new(0x3, "ab")));
        assert!(!event.matches_context(&Context::new(0x1, "a")));
    }
}

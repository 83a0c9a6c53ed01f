//! Resource index pairing allocations with deallocations.
//!
//! Identifiers are reference counted: allocating an id that is already
//! open acquires another reference instead of opening a new resource,
//! and only the free that drops the count to zero releases it. Frees of
//! unknown ids are ignored.

use crate::trace::Event;
use std::collections::HashMap;

/// Result of indexing an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocOutcome {
    /// A new resource was opened
    Opened,
    /// The id was already open, its reference count grew
    Absorbed,
}

/// Result of indexing a deallocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome<'a> {
    /// No open entry for the id
    Unmatched,
    /// The reference count dropped but stays above zero
    Absorbed,
    /// The last reference was dropped; carries the opening allocation
    Released(&'a Event),
}

#[derive(Debug, Clone)]
struct IndexEntry<'a> {
    event: &'a Event,
    ref_count: u32,
}

/// Open resources keyed by identifier
///
/// Built fresh for every resource type and context pass.
#[derive(Debug, Default)]
pub struct ResourceIndex<'a> {
    entries: HashMap<&'a str, IndexEntry<'a>>,
}

impl<'a> ResourceIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_alloc(&mut self, event: &'a Event) -> AllocOutcome {
        match self.entries.get_mut(event.resource_id.as_str()) {
            Some(entry) => {
                entry.ref_count += 1;
                AllocOutcome::Absorbed
            }
            None => {
                self.entries.insert(
                    event.resource_id.as_str(),
                    IndexEntry {
                        event,
                        ref_count: 1,
                    },
                );
                AllocOutcome::Opened
            }
        }
    }

    pub fn on_free(&mut self, event: &Event) -> FreeOutcome<'a> {
        let Some(entry) = self.entries.get_mut(event.resource_id.as_str()) else {
            return FreeOutcome::Unmatched;
        };
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return FreeOutcome::Absorbed;
        }
        let opened = entry.event;
        self.entries.remove(event.resource_id.as_str());
        FreeOutcome::Released(opened)
    }

    pub fn ref_count(&self, resource_id: &str) -> Option<u32> {
        self.entries.get(resource_id).map(|e| e.ref_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Opening allocations still unmatched, in trace order
    pub fn into_open(self) -> Vec<&'a Event> {
        let mut open: Vec<&'a Event> = self.entries.into_values().map(|e| e.event).collect();
        open.sort_by_key(|e| e.order_key());
        open
    }
}

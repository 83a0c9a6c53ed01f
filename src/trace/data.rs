//! Event collections of one trace.
//!
//! [`TraceData`] owns the declared resource types (each with its own event
//! list), the declared contexts and the sort order every report relies on.
//! A fresh instance is built for each report run.

use super::context::Context;
use super::event::Event;
use super::timestamp::Timestamp;
use crate::utils::error::TraceError;
use log::debug;

/// Events of a single resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceEvents {
    pub name: String,
    pub events: Vec<Event>,
}

/// Resource types, contexts and events of one trace
#[derive(Debug, Clone, Default)]
pub struct TraceData {
    resources: Vec<ResourceEvents>,
    contexts: Vec<Context>,
    sorted: bool,
}

impl TraceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a trackable resource type
    ///
    /// Declaring the same type twice keeps the existing event list.
    pub fn register_resource(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.resources.iter().any(|r| r.name == name) {
            debug!("Resource {} already registered", name);
            return;
        }
        debug!("Registered resource: {}", name);
        self.resources.push(ResourceEvents {
            name,
            events: Vec::new(),
        });
    }

    /// Declare a named context
    pub fn register_context(&mut self, value: u32, name: impl Into<String>) {
        self.contexts.push(Context::new(value, name));
    }

    /// Register an allocation event
    ///
    /// # Errors
    /// * `TraceError::UnknownResource` - `resource` was never declared
    /// * `TraceError::AmbiguousResource` - `resource` omitted while not
    ///   exactly one type is declared
    pub fn register_alloc(
        &mut self,
        index: u64,
        context: u32,
        timestamp: Timestamp,
        resource: Option<&str>,
        resource_id: impl Into<String>,
        size: u64,
    ) -> Result<(), TraceError> {
        let event = Event::alloc(index, context, timestamp, resource_id, size);
        self.push_event(resource, event)
    }

    /// Register a deallocation event
    ///
    /// # Errors
    /// Same as [`TraceData::register_alloc`].
    pub fn register_free(
        &mut self,
        index: u64,
        context: u32,
        timestamp: Timestamp,
        resource: Option<&str>,
        resource_id: impl Into<String>,
    ) -> Result<(), TraceError> {
        let event = Event::free(index, context, timestamp, resource_id);
        self.push_event(resource, event)
    }

    fn push_event(&mut self, resource: Option<&str>, event: Event) -> Result<(), TraceError> {
        let target = match resource {
            Some(name) => self
                .resources
                .iter_mut()
                .find(|r| r.name == name)
                .ok_or_else(|| TraceError::UnknownResource(name.to_string()))?,
            None => match self.resources.as_mut_slice() {
                [only] => only,
                [] => return Err(TraceError::UnknownResource("<unspecified>".to_string())),
                many => return Err(TraceError::AmbiguousResource(many.len())),
            },
        };
        target.events.push(event);
        self.sorted = false;
        Ok(())
    }

    /// Stable sort of every event list by timestamp, then log index
    pub fn sort(&mut self) {
        for resource in &mut self.resources {
            resource.events.sort_by_key(Event::order_key);
        }
        self.sorted = true;
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn resources(&self) -> &[ResourceEvents] {
        &self.resources
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn event_count(&self) -> usize {
        self.resources.iter().map(|r| r.events.len()).sum()
    }

    /// Earliest and latest timestamp over all resource types, unfiltered
    ///
    /// Expects sorted events. `None` when the trace has no events.
    pub fn full_time_range(&self) -> Option<(Timestamp, Timestamp)> {
        self.resources
            .iter()
            .filter_map(|r| Some((r.events.first()?.timestamp, r.events.last()?.timestamp)))
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_unknown_resource_rejected() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        let err = trace
            .register_alloc(1, 0, ts(0), Some("fd"), "0x1", 4)
            .unwrap_err();
        assert!(matches!(err, TraceError::UnknownResource(name) if name == "fd"));
    }

    #[test]
    fn test_omitted_resource_uses_sole_type() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_alloc(1, 0, ts(0), None, "0x1", 4).unwrap();
        assert_eq!(trace.resources()[0].events.len(), 1);
    }

    #[test]
    fn test_omitted_resource_ambiguous() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_resource("fd");
        let err = trace.register_free(1, 0, ts(0), None, "0x1").unwrap_err();
        assert!(matches!(err, TraceError::AmbiguousResource(2)));
    }

    #[test]
    fn test_sort_is_stable_on_timestamp_then_index() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_free(7, 0, ts(10), None, "0x1").unwrap();
        trace.register_alloc(5, 0, ts(10), None, "0x1", 4).unwrap();
        trace.register_alloc(9, 0, ts(2), None, "0x2", 4).unwrap();
        trace.sort();

        let order: Vec<u64> = trace.resources()[0].events.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![9, 5, 7]);
        assert!(trace.is_sorted());
    }

    #[test]
    fn test_full_time_range_spans_resources() {
        let mut trace = TraceData::new();
        trace.register_resource("memory");
        trace.register_resource("fd");
        trace.register_resource("empty");
        trace.register_alloc(1, 0, ts(50), Some("memory"), "0x1", 4).unwrap();
        trace.register_alloc(2, 0, ts(20), Some("fd"), "3", 1).unwrap();
        trace.register_free(3, 0, ts(70), Some("fd"), "3").unwrap();
        trace.sort();

        assert_eq!(trace.full_time_range(), Some((ts(20), ts(70))));
        assert_eq!(TraceData::new().full_time_range(), None);
    }
}

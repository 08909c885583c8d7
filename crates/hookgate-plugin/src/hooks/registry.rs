//! Handler index: event type → handlers in plugin registration order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::contract::{HookBinding, HookHandler};
use super::definitions::EventType;

/// Mapping from event type to its ordered handler list.
///
/// Built once while the hook context initializes and never mutated
/// afterwards, so concurrent dispatches read it without locking.
#[derive(Debug, Default)]
pub struct HandlerIndex {
    /// Event type → handlers, in the order their plugins were registered.
    handlers: HashMap<EventType, Vec<Arc<dyn HookHandler>>>,
}

impl HandlerIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the end of its event's list.
    pub fn insert(&mut self, binding: HookBinding) {
        debug!(
            event = %binding.event,
            plugin_id = %binding.handler.plugin_id(),
            "Hook handler bound"
        );
        self.handlers
            .entry(binding.event)
            .or_default()
            .push(binding.handler);
    }

    /// Returns the handlers for an event type. Unbound events yield an empty slice.
    pub fn handlers(&self, event: EventType) -> &[Arc<dyn HookHandler>] {
        self.handlers
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of handlers bound to an event type.
    pub fn handler_count(&self, event: EventType) -> usize {
        self.handlers(event).len()
    }

    /// Returns every event type with at least one handler, in code order.
    pub fn bound_events(&self) -> Vec<EventType> {
        let mut events: Vec<EventType> = self.handlers.keys().copied().collect();
        events.sort_by_key(EventType::code);
        events
    }

    /// Returns the total number of bindings.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Returns whether no handler is bound at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

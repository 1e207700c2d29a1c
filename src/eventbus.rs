use crate::device::DeviceIdentity;
use crate::event::{RawInputEvent, RawPayload};
use std::collections::HashMap;

/// Trait for reacting to routed raw input events.
///
/// Listeners run synchronously on the window's message-pump thread.
pub trait InputListener {
    fn on_input(&mut self, event: &RawInputEvent);
}

impl<F: FnMut(&RawInputEvent)> InputListener for F {
    fn on_input(&mut self, event: &RawInputEvent) {
        self(event)
    }
}

/// Determines which events a listener wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    All,
    KeyboardOnly,
    MouseOnly,
    HidOnly,
    Custom(fn(&RawInputEvent) -> bool),
}

impl EventFilter {
    pub fn accepts(&self, event: &RawInputEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::KeyboardOnly => matches!(event.payload, RawPayload::Keyboard(_)),
            EventFilter::MouseOnly => matches!(event.payload, RawPayload::Mouse(_)),
            EventFilter::HidOnly => matches!(event.payload, RawPayload::Hid(_)),
            EventFilter::Custom(f) => f(event),
        }
    }
}

/// Metadata-wrapped listener with filters and control flags.
struct ListenerEntry {
    listener: Box<dyn InputListener>,
    enabled: bool,
    filter: EventFilter,
    device: Option<DeviceIdentity>,
}

/// Fan-out of routed events to registered listeners.
///
/// Listeners are called in registration order.
#[derive(Default)]
pub struct InputEventBus {
    next_id: u64,
    order: Vec<u64>,
    listeners: HashMap<u64, ListenerEntry>,
}

impl InputEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with a filter and an optional device restriction.
    pub fn add_listener(
        &mut self,
        listener: impl InputListener + 'static,
        filter: EventFilter,
        device: Option<DeviceIdentity>,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
                device,
            },
        );
        self.order.push(id);
        self.next_id += 1;
        id
    }

    /// Enables a previously registered listener.
    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Disables (mutes) a listener without removing it.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    /// Unregisters a listener entirely.
    pub fn remove_listener(&mut self, id: u64) -> bool {
        self.order.retain(|x| *x != id);
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Emits one event to all active and matching listeners.
    pub fn emit(&mut self, event: &RawInputEvent) {
        for id in &self.order {
            let Some(entry) = self.listeners.get_mut(id) else {
                continue;
            };
            if !entry.enabled {
                continue;
            }

            // If restricted, ensure this listener wants this event's device
            if let Some(wanted) = entry.device {
                if event.identity != wanted {
                    continue;
                }
            }

            if entry.filter.accepts(event) {
                entry.listener.on_input(event);
            }
        }
    }

    /// Emits a batch of events to matching listeners.
    pub fn emit_all(&mut self, events: &[RawInputEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

//! Event dispatchers and an in-memory experiment host

use std::sync::{Arc, Mutex, RwLock};

use tracing::{error, info};

use crate::domain::experiment::{
    AssignmentEvent, EventDispatcher, ExperimentAttributes, ExperimentHost, SlotHandle,
};

/// Keeps every dispatched event for later inspection
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<AssignmentEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AssignmentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: &AssignmentEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(e) => error!(error = %e, "Failed to record assignment event"),
        }
    }
}

/// Writes each event to the log as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl EventDispatcher for LoggingDispatcher {
    fn dispatch(&self, event: &AssignmentEvent) {
        match serde_json::to_string(event) {
            Ok(detail) => info!(
                event_type = event.event_type(),
                bubbles = event.bubbles(),
                composed = event.composed(),
                detail = %detail,
                "Assignment event dispatched"
            ),
            Err(e) => error!(error = %e, "Failed to serialize assignment event"),
        }
    }
}

/// An experiment element held entirely in memory
pub struct InMemoryExperimentHost {
    attributes: RwLock<ExperimentAttributes>,
    slots: Vec<SlotHandle>,
    dispatchers: Vec<Arc<dyn EventDispatcher>>,
}

impl InMemoryExperimentHost {
    pub fn new(attributes: ExperimentAttributes, slots: Vec<SlotHandle>) -> Self {
        Self {
            attributes: RwLock::new(attributes),
            slots,
            dispatchers: Vec::new(),
        }
    }

    /// Add a listener that receives every event dispatched from this host
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn set_attributes(&self, attributes: ExperimentAttributes) {
        match self.attributes.write() {
            Ok(mut current) => *current = attributes,
            Err(e) => error!(error = %e, "Failed to update host attributes"),
        }
    }

    /// All slots, whether or not a controller currently holds them
    pub fn slots(&self) -> &[SlotHandle] {
        &self.slots
    }
}

impl EventDispatcher for InMemoryExperimentHost {
    fn dispatch(&self, event: &AssignmentEvent) {
        for dispatcher in &self.dispatchers {
            dispatcher.dispatch(event);
        }
    }
}

impl ExperimentHost for InMemoryExperimentHost {
    fn attributes(&self) -> ExperimentAttributes {
        self.attributes
            .read()
            .map(|attributes| attributes.clone())
            .unwrap_or_default()
    }

    fn variant_slots(&self) -> Vec<SlotHandle> {
        self.slots.clone()
    }
}

//! Assignment notification

use serde::{Deserialize, Serialize};

use super::entity::Trigger;

/// Notification emitted once per successful assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    pub experiment_id: String,
    pub variant_id: String,
    pub trigger: Trigger,
}

impl AssignmentEvent {
    /// Event type name listeners subscribe to
    pub const EVENT_TYPE: &'static str = "web-experiment:variant-assigned";

    pub fn new(
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
        trigger: Trigger,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            variant_id: variant_id.into(),
            trigger,
        }
    }

    pub const fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    /// The event propagates to ancestors of the host
    pub const fn bubbles(&self) -> bool {
        true
    }

    /// The event crosses encapsulation boundaries
    pub const fn composed(&self) -> bool {
        true
    }
}

/// Delivers assignment notifications to listeners around the host
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: &AssignmentEvent);
}

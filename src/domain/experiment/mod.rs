//! Experiment domain module for web A/B testing
//!
//! Decides which variant of an experiment a visitor sees, keeps that
//! decision sticky through a [`VariantStore`], and announces it through an
//! [`AssignmentEvent`] and optional analytics integrations.

mod analytics;
mod attributes;
mod controller;
mod entity;
mod event;
mod policy;
mod selection;
mod slot;
mod store;
mod validation;

// Re-export all public types
pub use analytics::{
    impression_label, AnalyticsHooks, AnalyticsReport, DataLayer, Gtag, Integration,
    IMPRESSION_EVENT, IMPRESSION_PREFIX,
};
pub use attributes::{
    ExperimentAttributes, PageContext, ATTR_DEBUG_MODE, ATTR_EXPERIMENT_ID, ATTR_GTAG, ATTR_GTM,
    ATTR_STORAGE,
};
pub use controller::{AttachStatus, ExperimentController, ExperimentHost};
pub use entity::{
    AssignmentOutcome, AssignmentState, ExperimentId, Lifecycle, Trigger, VariantDescriptor,
};
pub use event::{AssignmentEvent, EventDispatcher};
pub use policy::{DecisionPolicy, PolicyDecision, PolicyNote};
pub use selection::{
    bucket_for, select_weighted, total_weight, RandomSource, SeededRandom, SequenceRandom,
    ThreadRandom, WeightedPick,
};
pub use slot::{SlotHandle, VariantSlot};
pub use store::{storage_key, StorageBackend, VariantStore, VariantStoreFactory, STORAGE_PREFIX};
pub use validation::{
    normalize_weight, parse_weight, validate_experiment_id, ExperimentValidationError,
};

#[cfg(test)]
pub use store::{MockVariantStore, MockVariantStoreFactory};

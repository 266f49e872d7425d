//! Variant slot capability

use std::sync::Arc;

use super::entity::VariantDescriptor;

/// A labeled, weighted content container that can be shown or hidden.
///
/// Slots are owned by the surrounding document; controllers only hold
/// shared references to them.
pub trait VariantSlot: Send + Sync {
    /// Identifier of the variant held by this slot
    fn variant_id(&self) -> String;

    /// Relative selection weight, already normalized to `>= 0`
    fn weight(&self) -> f64;

    /// Whether the server marked this slot as the chosen variant
    fn is_pre_selected(&self) -> bool;

    /// Make the slot's content visible
    fn show(&self);

    /// Hide the slot's content
    fn hide(&self);

    /// Whether the slot is currently hidden
    fn is_hidden(&self) -> bool;

    /// Snapshot the slot for the decision policy
    fn descriptor(&self) -> VariantDescriptor {
        VariantDescriptor::new(self.variant_id(), self.weight(), self.is_pre_selected())
    }
}

/// Shared handle to a slot discovered under an experiment
pub type SlotHandle = Arc<dyn VariantSlot>;

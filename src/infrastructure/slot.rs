//! In-memory variant slot

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::experiment::{normalize_weight, parse_weight, SlotHandle, VariantSlot};

pub const ATTR_VARIANT_ID: &str = "variant-id";
pub const ATTR_WEIGHT: &str = "weight";
pub const ATTR_SELECTED: &str = "selected";

/// Declarative description of a slot, as written in a page file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SlotSpec {
    pub variant_id: String,
    pub weight: Option<String>,
    pub selected: bool,
}

/// A variant slot whose visibility lives in memory.
///
/// Starts hidden; the controller reveals at most one slot.
#[derive(Debug)]
pub struct StaticVariantSlot {
    variant_id: String,
    weight: f64,
    selected: bool,
    hidden: AtomicBool,
}

impl StaticVariantSlot {
    pub fn new(variant_id: impl Into<String>, weight: f64) -> Self {
        Self {
            variant_id: variant_id.into(),
            weight: normalize_weight(weight),
            selected: false,
            hidden: AtomicBool::new(true),
        }
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Build from raw `(name, value)` attribute pairs.
    ///
    /// A missing `variant-id` yields an empty id; a missing or unparsable
    /// `weight` yields `0`.
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut slot = Self::new("", 0.0);

        for (name, value) in attributes {
            match name.as_ref() {
                ATTR_VARIANT_ID => slot.variant_id = value.as_ref().to_string(),
                ATTR_WEIGHT => slot.weight = parse_weight(value.as_ref()),
                ATTR_SELECTED => slot.selected = true,
                _ => {}
            }
        }

        slot
    }

    pub fn from_spec(spec: &SlotSpec) -> Self {
        let weight = spec.weight.as_deref().map(parse_weight).unwrap_or(0.0);
        Self::new(spec.variant_id.clone(), weight).with_selected(spec.selected)
    }

    pub fn into_handle(self) -> SlotHandle {
        Arc::new(self)
    }
}

impl VariantSlot for StaticVariantSlot {
    fn variant_id(&self) -> String {
        self.variant_id.clone()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_pre_selected(&self) -> bool {
        self.selected
    }

    fn show(&self) {
        self.hidden.store(false, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_attributes() {
        let slot = StaticVariantSlot::from_attributes([
            ("variant-id", "B"),
            ("weight", "30px"),
            ("selected", ""),
        ]);

        assert_eq!(slot.variant_id(), "B");
        assert_eq!(slot.weight(), 30.0);
        assert!(slot.is_pre_selected());
        assert!(slot.is_hidden());
    }

    #[test]
    fn test_missing_attributes_default() {
        let slot = StaticVariantSlot::from_attributes(Vec::<(&str, &str)>::new());

        assert_eq!(slot.variant_id(), "");
        assert_eq!(slot.weight(), 0.0);
        assert!(!slot.is_pre_selected());
    }

    #[test]
    fn test_invalid_weights_normalize_to_zero() {
        assert_eq!(StaticVariantSlot::from_attributes([("weight", "-10")]).weight(), 0.0);
        assert_eq!(StaticVariantSlot::from_attributes([("weight", "heavy")]).weight(), 0.0);
        assert_eq!(StaticVariantSlot::new("A", f64::NAN).weight(), 0.0);
    }

    #[test]
    fn test_show_hide() {
        let slot = StaticVariantSlot::new("A", 1.0);
        slot.show();
        assert!(!slot.is_hidden());
        slot.hide();
        assert!(slot.is_hidden());
    }

    #[test]
    fn test_from_spec() {
        let spec: SlotSpec = toml::from_str(
            r#"
            variant-id = "control"
            weight = "25"
            "#,
        )
        .unwrap();

        let slot = StaticVariantSlot::from_spec(&spec);
        assert_eq!(slot.variant_id(), "control");
        assert_eq!(slot.weight(), 25.0);
        assert!(!slot.is_pre_selected());

        let descriptor = slot.descriptor();
        assert_eq!(descriptor.id(), "control");
        assert!(descriptor.is_eligible());
    }
}

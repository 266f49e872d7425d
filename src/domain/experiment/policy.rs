//! Three-tier assignment policy
//!
//! Tiers are evaluated in strict priority order:
//!
//! 1. server pre-selection (no storage access at all)
//! 2. stored assignment (read once; stale values are cleared)
//! 3. fresh weighted random selection (persisted through the tier-2 store)
//!
//! If the store cannot be constructed the policy stops with `Unassigned`
//! rather than drawing, so a visitor whose stored assignment is temporarily
//! unreadable is never silently re-bucketed.

use std::fmt;

use tracing::{debug, error, warn};

use super::entity::{AssignmentOutcome, ExperimentId, Trigger, VariantDescriptor};
use super::selection::{select_weighted, RandomSource};
use super::store::{StorageBackend, VariantStore, VariantStoreFactory};

/// Non-fatal conditions met while deciding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyNote {
    /// The experiment has no variant slots
    NoVariantSlots,
    /// More than one slot carried the pre-selection marker
    MultiplePreSelected { variant_ids: Vec<String> },
    /// The store could not be constructed
    StoreUnavailable { message: String },
    /// The stored value matched no current slot and was cleared
    StaleStoredVariant { value: String },
    /// Every slot has a non-positive weight
    NoEligibleVariants,
}

impl fmt::Display for PolicyNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVariantSlots => write!(f, "No variant children found"),
            Self::MultiplePreSelected { variant_ids } => write!(
                f,
                "Multiple variants have the 'selected' attribute ({}); using the first",
                variant_ids.join(", ")
            ),
            Self::StoreUnavailable { message } => {
                write!(f, "Failed to initialize persistence: {message}")
            }
            Self::StaleStoredVariant { value } => write!(
                f,
                "Stored variant \"{value}\" not found among current variants; clearing"
            ),
            Self::NoEligibleVariants => write!(f, "No variants available for weighted selection"),
        }
    }
}

/// Outcome of one policy run plus everything worth reporting about it
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    pub outcome: AssignmentOutcome,
    pub notes: Vec<PolicyNote>,
    /// Random point drawn in tier 3, if a draw was taken
    pub draw: Option<f64>,
}

impl PolicyDecision {
    fn new(outcome: AssignmentOutcome) -> Self {
        Self {
            outcome,
            notes: Vec::new(),
            draw: None,
        }
    }

    fn with_notes(mut self, notes: Vec<PolicyNote>) -> Self {
        self.notes = notes;
        self
    }
}

/// Runs the tiers for one experiment
pub struct DecisionPolicy<'a> {
    experiment_id: &'a ExperimentId,
    backend: StorageBackend,
    store_factory: &'a dyn VariantStoreFactory,
    random: &'a mut dyn RandomSource,
    debug_mode: bool,
}

impl<'a> DecisionPolicy<'a> {
    pub fn new(
        experiment_id: &'a ExperimentId,
        backend: StorageBackend,
        store_factory: &'a dyn VariantStoreFactory,
        random: &'a mut dyn RandomSource,
    ) -> Self {
        Self {
            experiment_id,
            backend,
            store_factory,
            random,
            debug_mode: false,
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Decide which variant to show.
    ///
    /// `variants` must be in document order; order drives both the
    /// pre-selection tie-break and the bucket layout.
    pub fn decide(&mut self, variants: &[VariantDescriptor]) -> PolicyDecision {
        if let Some(decision) = self.pre_selected(variants) {
            return decision;
        }

        let mut notes = Vec::new();

        let store = match self.store_factory.create(self.backend, self.experiment_id) {
            Ok(store) => store,
            Err(e) => {
                error!(
                    experiment_id = %self.experiment_id,
                    error = %e,
                    "WebExperiment: Failed to initialize persistence"
                );
                notes.push(PolicyNote::StoreUnavailable {
                    message: e.to_string(),
                });
                return PolicyDecision::new(AssignmentOutcome::Unassigned).with_notes(notes);
            }
        };

        if let Some(stored) = store.read() {
            if variants.iter().any(|v| v.id() == stored) {
                if self.debug_mode {
                    debug!(
                        experiment_id = %self.experiment_id,
                        variant_id = %stored,
                        backend = %self.backend,
                        "Loaded stored variant"
                    );
                }
                return PolicyDecision::new(AssignmentOutcome::assigned(stored, Trigger::Load))
                    .with_notes(notes);
            }

            warn!(
                experiment_id = %self.experiment_id,
                "WebExperiment: Stored variant \"{}\" not found among current variants. Clearing.",
                stored
            );
            store.clear();
            notes.push(PolicyNote::StaleStoredVariant { value: stored });
        }

        self.fresh_selection(variants, store.as_ref(), notes)
    }

    fn pre_selected(&self, variants: &[VariantDescriptor]) -> Option<PolicyDecision> {
        let marked: Vec<&VariantDescriptor> =
            variants.iter().filter(|v| v.is_pre_selected()).collect();

        let first = marked.first()?;
        let mut notes = Vec::new();

        if marked.len() > 1 {
            let variant_ids: Vec<String> = marked.iter().map(|v| v.id().to_string()).collect();
            warn!(
                experiment_id = %self.experiment_id,
                variant_ids = ?variant_ids,
                "WebExperiment: Multiple variants have the 'selected' attribute. \
                 Using the first one."
            );
            notes.push(PolicyNote::MultiplePreSelected { variant_ids });
        }

        if self.debug_mode {
            debug!(
                experiment_id = %self.experiment_id,
                variant_id = %first.id(),
                "Using server pre-selected variant"
            );
        }

        Some(
            PolicyDecision::new(AssignmentOutcome::assigned(first.id(), Trigger::PreSelected))
                .with_notes(notes),
        )
    }

    fn fresh_selection(
        &mut self,
        variants: &[VariantDescriptor],
        store: &dyn VariantStore,
        mut notes: Vec<PolicyNote>,
    ) -> PolicyDecision {
        let Some(pick) = select_weighted(variants, &mut *self.random) else {
            warn!(
                experiment_id = %self.experiment_id,
                "WebExperiment: No variants available for weighted selection."
            );
            notes.push(PolicyNote::NoEligibleVariants);
            return PolicyDecision::new(AssignmentOutcome::Unassigned).with_notes(notes);
        };

        if self.debug_mode {
            debug!(
                experiment_id = %self.experiment_id,
                variant_id = %pick.variant.id(),
                point = pick.point,
                total = pick.total,
                "Selected variant by weight"
            );
        }

        store.write(pick.variant.id());

        let mut decision =
            PolicyDecision::new(AssignmentOutcome::assigned(pick.variant.id(), Trigger::Select))
                .with_notes(notes);
        decision.draw = Some(pick.point);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::selection::SequenceRandom;
    use crate::domain::experiment::store::{MockVariantStore, MockVariantStoreFactory};
    use crate::domain::DomainError;

    fn ab() -> Vec<VariantDescriptor> {
        vec![
            VariantDescriptor::new("A", 50.0, false),
            VariantDescriptor::new("B", 50.0, false),
        ]
    }

    fn factory_with(store: MockVariantStore) -> MockVariantStoreFactory {
        let mut factory = MockVariantStoreFactory::new();
        factory
            .expect_create()
            .times(1)
            .return_once(move |_, _| Ok(Box::new(store) as Box<dyn VariantStore>));
        factory
    }

    fn decide(
        variants: &[VariantDescriptor],
        factory: &MockVariantStoreFactory,
        random: &mut SequenceRandom,
    ) -> PolicyDecision {
        let id = ExperimentId::new("exp").unwrap();
        DecisionPolicy::new(&id, StorageBackend::Cookie, factory, random).decide(variants)
    }

    #[test]
    fn test_pre_selected_skips_storage() {
        let mut factory = MockVariantStoreFactory::new();
        factory.expect_create().never();
        let mut random = SequenceRandom::constant(0.1);

        let variants = vec![
            VariantDescriptor::new("A", 50.0, false),
            VariantDescriptor::new("B", 50.0, true),
        ];
        let decision = decide(&variants, &factory, &mut random);

        assert_eq!(
            decision.outcome,
            AssignmentOutcome::assigned("B", Trigger::PreSelected)
        );
        assert!(decision.notes.is_empty());
        assert_eq!(random.draws(), 0);
    }

    #[test]
    fn test_multiple_pre_selected_uses_first() {
        let mut factory = MockVariantStoreFactory::new();
        factory.expect_create().never();
        let mut random = SequenceRandom::constant(0.9);

        let variants = vec![
            VariantDescriptor::new("A", 0.0, true),
            VariantDescriptor::new("B", 50.0, true),
        ];
        let decision = decide(&variants, &factory, &mut random);

        assert_eq!(decision.outcome.variant_id(), Some("A"));
        assert_eq!(
            decision.notes,
            vec![PolicyNote::MultiplePreSelected {
                variant_ids: vec!["A".to_string(), "B".to_string()]
            }]
        );
    }

    #[test]
    fn test_stored_variant_is_loaded_without_write() {
        let mut store = MockVariantStore::new();
        store.expect_read().times(1).returning(|| Some("B".to_string()));
        store.expect_write().never();
        store.expect_clear().never();
        let factory = factory_with(store);
        let mut random = SequenceRandom::constant(0.1);

        let decision = decide(&ab(), &factory, &mut random);

        assert_eq!(decision.outcome, AssignmentOutcome::assigned("B", Trigger::Load));
        assert_eq!(random.draws(), 0);
        assert!(decision.draw.is_none());
    }

    #[test]
    fn test_stale_value_is_cleared_once_then_drawn() {
        let mut store = MockVariantStore::new();
        store.expect_read().times(1).returning(|| Some("Z".to_string()));
        store.expect_clear().times(1).return_const(());
        store
            .expect_write()
            .withf(|variant_id| variant_id == "A")
            .times(1)
            .return_const(());
        let factory = factory_with(store);
        let mut random = SequenceRandom::constant(0.1);

        let decision = decide(&ab(), &factory, &mut random);

        assert_eq!(decision.outcome, AssignmentOutcome::assigned("A", Trigger::Select));
        assert_eq!(
            decision.notes,
            vec![PolicyNote::StaleStoredVariant {
                value: "Z".to_string()
            }]
        );
        assert!(decision.notes[0].to_string().contains("\"Z\""));
        assert_eq!(random.draws(), 1);
    }

    #[test]
    fn test_empty_store_draws_and_persists() {
        let mut store = MockVariantStore::new();
        store.expect_read().times(1).returning(|| None);
        store
            .expect_write()
            .withf(|variant_id| variant_id == "A")
            .times(1)
            .return_const(());
        let factory = factory_with(store);
        let mut random = SequenceRandom::constant(0.1);

        let decision = decide(&ab(), &factory, &mut random);

        assert_eq!(decision.outcome, AssignmentOutcome::assigned("A", Trigger::Select));
        assert!((decision.draw.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_store_failure_abandons_selection() {
        let mut factory = MockVariantStoreFactory::new();
        factory
            .expect_create()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("cookie", "blocked")));
        let mut random = SequenceRandom::constant(0.1);

        let decision = decide(&ab(), &factory, &mut random);

        assert_eq!(decision.outcome, AssignmentOutcome::Unassigned);
        assert!(matches!(
            decision.notes.as_slice(),
            [PolicyNote::StoreUnavailable { .. }]
        ));
        assert_eq!(random.draws(), 0);
    }

    #[test]
    fn test_zero_weights_write_nothing() {
        let mut store = MockVariantStore::new();
        store.expect_read().times(1).returning(|| None);
        store.expect_write().never();
        let factory = factory_with(store);
        let mut random = SequenceRandom::constant(0.1);

        let variants = vec![
            VariantDescriptor::new("NW", 0.0, false),
            VariantDescriptor::new("C", 0.0, false),
        ];
        let decision = decide(&variants, &factory, &mut random);

        assert_eq!(decision.outcome, AssignmentOutcome::Unassigned);
        assert_eq!(decision.notes, vec![PolicyNote::NoEligibleVariants]);
    }

    #[test]
    fn test_backend_is_forwarded_to_factory() {
        let mut store = MockVariantStore::new();
        store.expect_read().returning(|| Some("A".to_string()));
        let mut factory = MockVariantStoreFactory::new();
        factory
            .expect_create()
            .withf(|backend, id| *backend == StorageBackend::Local && id.as_str() == "exp")
            .times(1)
            .return_once(move |_, _| Ok(Box::new(store) as Box<dyn VariantStore>));

        let id = ExperimentId::new("exp").unwrap();
        let mut random = SequenceRandom::constant(0.1);
        let decision =
            DecisionPolicy::new(&id, StorageBackend::Local, &factory, &mut random).decide(&ab());

        assert_eq!(decision.outcome, AssignmentOutcome::assigned("A", Trigger::Load));
    }
}

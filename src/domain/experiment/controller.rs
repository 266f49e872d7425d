//! Experiment controller
//!
//! Owns one experiment instance: discovers its variant slots, runs the
//! decision policy once, applies visibility, then notifies listeners and
//! analytics.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::analytics::{AnalyticsHooks, AnalyticsReport};
use super::attributes::{ExperimentAttributes, PageContext};
use super::entity::{AssignmentOutcome, AssignmentState, ExperimentId, Lifecycle, Trigger};
use super::event::{AssignmentEvent, EventDispatcher};
use super::policy::{DecisionPolicy, PolicyNote};
use super::selection::{RandomSource, ThreadRandom};
use super::slot::SlotHandle;
use super::store::{StorageBackend, VariantStoreFactory};

/// The element an experiment is mounted on
pub trait ExperimentHost: EventDispatcher {
    /// Current configuration attributes of the host
    fn attributes(&self) -> ExperimentAttributes;

    /// Direct child slots, in document order
    fn variant_slots(&self) -> Vec<SlotHandle>;
}

/// Result of a call to [`ExperimentController::attach`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachStatus {
    /// The policy ran during this call
    Initialized(AssignmentOutcome),
    /// A previous call already initialized the controller
    AlreadyInitialized,
    /// No experiment id was configured; nothing happened
    MissingExperimentId,
}

/// Runs a single experiment on a host
pub struct ExperimentController<H: ExperimentHost> {
    host: H,
    store_factory: Arc<dyn VariantStoreFactory>,
    random: Box<dyn RandomSource>,
    analytics: AnalyticsHooks,
    attributes: ExperimentAttributes,
    /// Page-wide debug switch from the [`PageContext`]
    global_debug: bool,
    debug_mode: bool,
    state: AssignmentState,
    slots: Vec<SlotHandle>,
    notes: Vec<PolicyNote>,
    reports: Vec<AnalyticsReport>,
}

impl<H: ExperimentHost> ExperimentController<H> {
    pub fn new(host: H, store_factory: Arc<dyn VariantStoreFactory>) -> Self {
        let attributes = host.attributes();
        let debug_mode = attributes.debug_mode;

        Self {
            host,
            store_factory,
            random: Box::new(ThreadRandom),
            analytics: AnalyticsHooks::default(),
            attributes,
            global_debug: false,
            debug_mode,
            state: AssignmentState::new(),
            slots: Vec::new(),
            notes: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Apply page-wide settings; the global debug flag can only turn debug on
    pub fn with_page_context(mut self, context: PageContext) -> Self {
        self.global_debug = context.debug_mode;
        self.debug_mode = self.attributes.debug_mode || self.global_debug;
        self.analytics = context.analytics;
        self
    }

    pub fn with_random_source(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Initialize the experiment once.
    ///
    /// Later calls return [`AttachStatus::AlreadyInitialized`] without
    /// touching storage, slots or listeners.
    pub fn attach(&mut self) -> AttachStatus {
        if self.state.is_initialized() {
            if self.debug_mode {
                debug!(
                    experiment_id = self.attributes.experiment_id.as_deref().unwrap_or_default(),
                    "WebExperiment: Reconnected, skipping initialization"
                );
            }
            return AttachStatus::AlreadyInitialized;
        }

        // Attributes may have changed since a failed attach.
        self.attributes = self.host.attributes();
        self.debug_mode = self.attributes.debug_mode || self.global_debug;

        let experiment_id = match self
            .attributes
            .experiment_id
            .clone()
            .map(ExperimentId::new)
        {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                error!(error = %e, "WebExperiment: {}", e);
                return AttachStatus::MissingExperimentId;
            }
            None => {
                error!("WebExperiment: \"experiment-id\" attribute is required");
                return AttachStatus::MissingExperimentId;
            }
        };

        self.slots = self.host.variant_slots();

        let outcome = if self.slots.is_empty() {
            warn!(
                experiment_id = %experiment_id,
                "WebExperiment: No variant children found"
            );
            self.notes.push(PolicyNote::NoVariantSlots);
            AssignmentOutcome::Unassigned
        } else {
            self.run_policy(&experiment_id)
        };

        self.state.record(&outcome);
        self.apply_visibility(&outcome);

        if let AssignmentOutcome::Assigned {
            variant_id,
            trigger,
        } = &outcome
        {
            self.notify(&experiment_id, variant_id, *trigger);
        }

        self.state.mark_initialized();

        info!(
            experiment_id = %experiment_id,
            variant_id = outcome.variant_id().unwrap_or("none"),
            trigger = outcome.trigger().map(|t| t.as_str()).unwrap_or("none"),
            "Experiment initialized"
        );

        AttachStatus::Initialized(outcome)
    }

    /// Release the slot references taken during attach.
    ///
    /// The assignment itself survives so that a later attach is a no-op.
    pub fn detach(&mut self) {
        self.slots.clear();
    }

    fn run_policy(&mut self, experiment_id: &ExperimentId) -> AssignmentOutcome {
        let descriptors: Vec<_> = self.slots.iter().map(|slot| slot.descriptor()).collect();

        let decision = DecisionPolicy::new(
            experiment_id,
            self.attributes.storage,
            self.store_factory.as_ref(),
            self.random.as_mut(),
        )
        .with_debug_mode(self.debug_mode)
        .decide(&descriptors);

        self.notes.extend(decision.notes);
        decision.outcome
    }

    fn apply_visibility(&self, outcome: &AssignmentOutcome) {
        let mut shown = false;

        for slot in &self.slots {
            let matches = outcome.variant_id() == Some(slot.variant_id().as_str());

            // Duplicate ids: only the first match in document order is shown.
            if matches && !shown {
                slot.show();
                shown = true;
            } else {
                slot.hide();
            }
        }
    }

    fn notify(&mut self, experiment_id: &ExperimentId, variant_id: &str, trigger: Trigger) {
        let event = AssignmentEvent::new(experiment_id.as_str(), variant_id, trigger);

        if self.debug_mode {
            debug!(
                experiment_id = %experiment_id,
                variant_id = %variant_id,
                trigger = %trigger,
                event_type = event.event_type(),
                "Dispatching assignment event"
            );
        }

        self.host.dispatch(&event);

        self.reports = self
            .analytics
            .report(&event, self.attributes.gtag, self.attributes.gtm);
    }

    // ========================================================================
    // Read-only properties
    // ========================================================================

    pub fn experiment_id(&self) -> Option<&str> {
        self.attributes.experiment_id.as_deref()
    }

    pub fn assigned_variant(&self) -> Option<&str> {
        self.state.assigned_variant_id()
    }

    pub fn trigger(&self) -> Option<Trigger> {
        self.state.trigger()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    pub fn storage(&self) -> StorageBackend {
        self.attributes.storage
    }

    /// Effective debug flag: attribute or page-wide switch
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn gtag_enabled(&self) -> bool {
        self.attributes.gtag
    }

    pub fn gtm_enabled(&self) -> bool {
        self.attributes.gtm
    }

    /// Non-fatal conditions met during initialization
    pub fn notes(&self) -> &[PolicyNote] {
        &self.notes
    }

    /// Outcome of each enabled analytics integration
    pub fn analytics_reports(&self) -> &[AnalyticsReport] {
        &self.reports
    }

    /// Slots held since the last attach
    pub fn slots(&self) -> &[SlotHandle] {
        &self.slots
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

//! Experiment domain entities

use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{normalize_weight, validate_experiment_id, ExperimentValidationError};

// ============================================================================
// ExperimentId
// ============================================================================

/// Caller-supplied identifier of an experiment.
///
/// Scopes the persisted assignment and is carried in every notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create a new experiment ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_experiment_id(&id)?;
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentId> for String {
    fn from(id: ExperimentId) -> Self {
        id.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// Why a variant was shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Forced by the server through the `selected` marker
    #[serde(rename = "pre-selected")]
    PreSelected,
    /// Loaded from a previously persisted assignment
    #[serde(rename = "load")]
    Load,
    /// Freshly drawn by weighted random selection
    #[serde(rename = "select")]
    Select,
}

impl Trigger {
    /// Wire name of the trigger
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreSelected => "pre-selected",
            Self::Load => "load",
            Self::Select => "select",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VariantDescriptor
// ============================================================================

/// Snapshot of a variant slot taken when a decision is made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    id: String,
    weight: f64,
    pre_selected: bool,
}

impl VariantDescriptor {
    /// Create a descriptor, clamping the weight to `>= 0`
    pub fn new(id: impl Into<String>, weight: f64, pre_selected: bool) -> Self {
        Self {
            id: id.into(),
            weight: normalize_weight(weight),
            pre_selected,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_pre_selected(&self) -> bool {
        self.pre_selected
    }

    /// Whether this variant can take part in weighted random selection
    pub fn is_eligible(&self) -> bool {
        self.weight > 0.0
    }
}

// ============================================================================
// AssignmentOutcome
// ============================================================================

/// Result of running the decision policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// A variant was chosen
    Assigned { variant_id: String, trigger: Trigger },
    /// No variant could be chosen; every slot stays hidden
    Unassigned,
}

impl AssignmentOutcome {
    pub fn assigned(variant_id: impl Into<String>, trigger: Trigger) -> Self {
        Self::Assigned {
            variant_id: variant_id.into(),
            trigger,
        }
    }

    pub fn variant_id(&self) -> Option<&str> {
        match self {
            Self::Assigned { variant_id, .. } => Some(variant_id),
            Self::Unassigned => None,
        }
    }

    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            Self::Assigned { trigger, .. } => Some(*trigger),
            Self::Unassigned => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

// ============================================================================
// Lifecycle / AssignmentState
// ============================================================================

/// Initialization lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Initialized,
}

/// Per-controller assignment state.
///
/// Write-once: the lifecycle only moves forward and the assignment, once
/// recorded, never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentState {
    lifecycle: Lifecycle,
    assignment: Option<(String, Trigger)>,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized
    }

    pub fn assigned_variant_id(&self) -> Option<&str> {
        self.assignment.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn trigger(&self) -> Option<Trigger> {
        self.assignment.as_ref().map(|(_, trigger)| *trigger)
    }

    /// Record the outcome of a decision.
    ///
    /// Returns `false` without changing anything if an assignment was
    /// already recorded.
    pub fn record(&mut self, outcome: &AssignmentOutcome) -> bool {
        if self.assignment.is_some() {
            return false;
        }

        if let AssignmentOutcome::Assigned {
            variant_id,
            trigger,
        } = outcome
        {
            self.assignment = Some((variant_id.clone(), *trigger));
        }

        true
    }

    pub fn mark_initialized(&mut self) {
        self.lifecycle = Lifecycle::Initialized;
    }
}

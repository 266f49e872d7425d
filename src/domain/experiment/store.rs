//! Variant persistence capability

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::ExperimentId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Prefix applied to every persisted key
pub const STORAGE_PREFIX: &str = "web_experiment_";

/// Build the persisted key for an experiment
pub fn storage_key(experiment_id: &ExperimentId) -> String {
    format!("{}{}", STORAGE_PREFIX, experiment_id.as_str())
}

// ============================================================================
// StorageBackend
// ============================================================================

/// Where assignments are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageBackend {
    /// Site-wide cookie with a long expiry
    #[default]
    Cookie,
    /// Browser local storage, no expiry
    Local,
}

impl StorageBackend {
    /// Parse the `storage` attribute; anything other than `local` means cookie
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("local") => Self::Local,
            _ => Self::Cookie,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Local => "local",
        }
    }
}

impl From<String> for StorageBackend {
    fn from(value: String) -> Self {
        Self::from_attribute(Some(&value))
    }
}

impl From<StorageBackend> for String {
    fn from(backend: StorageBackend) -> Self {
        backend.as_str().to_string()
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VariantStore
// ============================================================================

/// Persistence of one experiment's assigned variant.
///
/// Implementations absorb their own I/O failures: a failed read looks like
/// an empty store and failed writes or clears are no-ops.
#[cfg_attr(test, automock)]
pub trait VariantStore: Send + Sync {
    /// Read the stored variant ID, if any
    fn read(&self) -> Option<String>;

    /// Persist a variant ID
    fn write(&self, variant_id: &str);

    /// Remove the stored variant ID
    fn clear(&self);
}

/// Builds stores scoped to an experiment
#[cfg_attr(test, automock)]
pub trait VariantStoreFactory: Send + Sync {
    /// Create a store for `experiment_id` on `backend`.
    ///
    /// Failing here means persistence is unavailable for this visit.
    fn create(
        &self,
        backend: StorageBackend,
        experiment_id: &ExperimentId,
    ) -> Result<Box<dyn VariantStore>, DomainError>;
}

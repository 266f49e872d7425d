//! Browser profile persisted between runs
//!
//! Holds a cookie jar and a local storage area as a single JSON document so
//! that assignments stay sticky across separate CLI invocations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;

use super::storage::{
    DefaultVariantStoreFactory, InMemoryCookieJar, InMemoryStorageArea, StoredCookie,
};

/// Serialized form of a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSnapshot {
    pub cookies: BTreeMap<String, StoredCookie>,
    pub local_storage: BTreeMap<String, String>,
}

/// Live cookie jar and storage area backed by a snapshot file
#[derive(Debug, Clone, Default)]
pub struct BrowserProfile {
    cookie_jar: Arc<InMemoryCookieJar>,
    storage_area: Arc<InMemoryStorageArea>,
}

impl BrowserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ProfileSnapshot) -> Self {
        Self {
            cookie_jar: Arc::new(InMemoryCookieJar::from_snapshot(snapshot.cookies)),
            storage_area: Arc::new(InMemoryStorageArea::from_snapshot(snapshot.local_storage)),
        }
    }

    /// Load a profile; a missing file yields an empty profile
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "Profile not found, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainError::internal(format!("Failed to read profile {}: {}", path.display(), e))
        })?;

        let snapshot: ProfileSnapshot = serde_json::from_str(&content).map_err(|e| {
            DomainError::validation(format!("Invalid profile {}: {}", path.display(), e))
        })?;

        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> Result<ProfileSnapshot, DomainError> {
        Ok(ProfileSnapshot {
            cookies: self.cookie_jar.snapshot()?,
            local_storage: self.storage_area.snapshot()?,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DomainError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.snapshot()?)
            .map_err(|e| DomainError::internal(format!("Failed to serialize profile: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DomainError::internal(format!(
                    "Failed to create profile directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            DomainError::internal(format!("Failed to write profile {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Profile saved");
        Ok(())
    }

    /// A store factory reading and writing this profile's storage
    pub fn store_factory(&self) -> DefaultVariantStoreFactory {
        DefaultVariantStoreFactory::new(self.cookie_jar.clone(), self.storage_area.clone())
    }

    pub fn cookie_jar(&self) -> &Arc<InMemoryCookieJar> {
        &self.cookie_jar
    }

    pub fn storage_area(&self) -> &Arc<InMemoryStorageArea> {
        &self.storage_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ExperimentId, StorageBackend, VariantStoreFactory};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("web-experiment-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let profile = BrowserProfile::load(temp_path("does-not-exist.json")).unwrap();
        assert_eq!(profile.snapshot().unwrap(), ProfileSnapshot::default());
    }

    #[test]
    fn test_save_and_load_keeps_assignments() {
        let path = temp_path("profile.json");
        let id = ExperimentId::new("hero").unwrap();

        let profile = BrowserProfile::new();
        let factory = profile.store_factory();
        factory.create(StorageBackend::Cookie, &id).unwrap().write("A");
        factory.create(StorageBackend::Local, &id).unwrap().write("B");
        profile.save(&path).unwrap();

        let restored = BrowserProfile::load(&path).unwrap();
        let factory = restored.store_factory();
        assert_eq!(
            factory.create(StorageBackend::Cookie, &id).unwrap().read(),
            Some("A".to_string())
        );
        assert_eq!(
            factory.create(StorageBackend::Local, &id).unwrap().read(),
            Some("B".to_string())
        );

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["localStorage"]["web_experiment_hero"], "B");
        assert_eq!(json["cookies"]["web_experiment_hero"]["value"], "A");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let path = temp_path("invalid.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            BrowserProfile::load(&path),
            Err(DomainError::Validation { .. })
        ));

        fs::remove_file(&path).ok();
    }
}

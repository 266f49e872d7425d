//! Local-storage-backed variant persistence

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::error;

use crate::domain::experiment::{storage_key, ExperimentId, VariantStore};
use crate::domain::DomainError;

/// A `localStorage`-style key/value area with no expiry
pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError>;
    fn remove_item(&self, key: &str) -> Result<(), DomainError>;
}

/// Thread-safe in-memory storage area
#[derive(Debug, Default)]
pub struct InMemoryStorageArea {
    items: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStorageArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(items: BTreeMap<String, String>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn snapshot(&self) -> Result<BTreeMap<String, String>, DomainError> {
        let items = self.items.read().map_err(|e| {
            DomainError::storage("local", format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(items.clone())
    }
}

impl StorageArea for InMemoryStorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        let items = self.items.read().map_err(|e| {
            DomainError::storage("local", format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut items = self.items.write().map_err(|e| {
            DomainError::storage("local", format!("Failed to acquire write lock: {}", e))
        })?;

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), DomainError> {
        let mut items = self.items.write().map_err(|e| {
            DomainError::storage("local", format!("Failed to acquire write lock: {}", e))
        })?;

        items.remove(key);
        Ok(())
    }
}

/// Stores an assignment in a storage area until explicitly cleared
pub struct LocalVariantStore {
    area: Arc<dyn StorageArea>,
    key: String,
}

impl LocalVariantStore {
    pub fn new(area: Arc<dyn StorageArea>, experiment_id: &ExperimentId) -> Self {
        Self {
            area,
            key: storage_key(experiment_id),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl VariantStore for LocalVariantStore {
    fn read(&self) -> Option<String> {
        match self.area.get_item(&self.key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                error!(key = %self.key, error = %e, "WebExperiment: Failed to read local storage");
                None
            }
        }
    }

    fn write(&self, variant_id: &str) {
        if variant_id.is_empty() {
            return;
        }

        if let Err(e) = self.area.set_item(&self.key, variant_id) {
            error!(key = %self.key, error = %e, "WebExperiment: Failed to write local storage");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.area.remove_item(&self.key) {
            error!(key = %self.key, error = %e, "WebExperiment: Failed to clear local storage");
        }
    }
}

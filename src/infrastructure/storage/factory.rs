//! Variant store factory for runtime backend selection

use std::sync::Arc;

use tracing::debug;

use crate::domain::experiment::{ExperimentId, StorageBackend, VariantStore, VariantStoreFactory};
use crate::domain::DomainError;

use super::cookie::{CookieJar, CookieVariantStore, InMemoryCookieJar};
use super::local::{InMemoryStorageArea, LocalVariantStore, StorageArea};

/// Builds cookie or local stores over shared backing areas
pub struct DefaultVariantStoreFactory {
    cookie_jar: Arc<dyn CookieJar>,
    storage_area: Arc<dyn StorageArea>,
}

impl Default for DefaultVariantStoreFactory {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryCookieJar::new()),
            Arc::new(InMemoryStorageArea::new()),
        )
    }
}

impl DefaultVariantStoreFactory {
    pub fn new(cookie_jar: Arc<dyn CookieJar>, storage_area: Arc<dyn StorageArea>) -> Self {
        Self {
            cookie_jar,
            storage_area,
        }
    }
}

impl VariantStoreFactory for DefaultVariantStoreFactory {
    fn create(
        &self,
        backend: StorageBackend,
        experiment_id: &ExperimentId,
    ) -> Result<Box<dyn VariantStore>, DomainError> {
        if experiment_id.as_str().is_empty() {
            return Err(DomainError::configuration(
                "Experiment ID is required for persistence",
            ));
        }

        debug!(experiment_id = %experiment_id, backend = %backend, "Creating variant store");

        match backend {
            StorageBackend::Cookie => Ok(Box::new(CookieVariantStore::new(
                self.cookie_jar.clone(),
                experiment_id,
            ))),
            StorageBackend::Local => Ok(Box::new(LocalVariantStore::new(
                self.storage_area.clone(),
                experiment_id,
            ))),
        }
    }
}

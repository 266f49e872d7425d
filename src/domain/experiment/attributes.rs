//! Declarative configuration of an experiment host

use serde::{Deserialize, Serialize};

use super::analytics::AnalyticsHooks;
use super::store::StorageBackend;

pub const ATTR_EXPERIMENT_ID: &str = "experiment-id";
pub const ATTR_STORAGE: &str = "storage";
pub const ATTR_DEBUG_MODE: &str = "debug-mode";
pub const ATTR_GTAG: &str = "gtag";
pub const ATTR_GTM: &str = "gtm";

/// Attributes set on the experiment host element.
///
/// Flags follow boolean-attribute semantics: present means enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExperimentAttributes {
    pub experiment_id: Option<String>,
    pub storage: StorageBackend,
    pub debug_mode: bool,
    pub gtag: bool,
    pub gtm: bool,
}

impl ExperimentAttributes {
    pub fn new(experiment_id: impl Into<String>) -> Self {
        Self {
            experiment_id: Some(experiment_id.into()),
            ..Self::default()
        }
    }

    /// Build from raw `(name, value)` attribute pairs; unknown names are ignored
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = Self::default();

        for (name, value) in attributes {
            match name.as_ref() {
                ATTR_EXPERIMENT_ID => parsed.experiment_id = Some(value.as_ref().to_string()),
                ATTR_STORAGE => {
                    parsed.storage = StorageBackend::from_attribute(Some(value.as_ref()))
                }
                ATTR_DEBUG_MODE => parsed.debug_mode = true,
                ATTR_GTAG => parsed.gtag = true,
                ATTR_GTM => parsed.gtm = true,
                _ => {}
            }
        }

        parsed
    }

    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_gtag(mut self, enabled: bool) -> Self {
        self.gtag = enabled;
        self
    }

    pub fn with_gtm(mut self, enabled: bool) -> Self {
        self.gtm = enabled;
        self
    }
}

/// Page-wide settings supplied from outside the experiment element
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Global debug switch shared by every experiment on the page
    pub debug_mode: bool,
    /// Reporting objects available on the page
    pub analytics: AnalyticsHooks,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_analytics(mut self, analytics: AnalyticsHooks) -> Self {
        self.analytics = analytics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_attributes() {
        let attributes = ExperimentAttributes::from_attributes([
            ("experiment-id", "hero"),
            ("storage", "local"),
            ("gtag", ""),
            ("class", "banner"),
        ]);

        assert_eq!(attributes.experiment_id.as_deref(), Some("hero"));
        assert_eq!(attributes.storage, StorageBackend::Local);
        assert!(attributes.gtag);
        assert!(!attributes.gtm);
        assert!(!attributes.debug_mode);
    }

    #[test]
    fn test_from_attributes_defaults() {
        let attributes = ExperimentAttributes::from_attributes(Vec::<(String, String)>::new());
        assert_eq!(attributes, ExperimentAttributes::default());
        assert_eq!(attributes.storage, StorageBackend::Cookie);
        assert!(attributes.experiment_id.is_none());
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let attributes: ExperimentAttributes = toml::from_str(
            r#"
            experiment-id = "pricing"
            storage = "local"
            debug-mode = true
            gtm = true
            "#,
        )
        .unwrap();

        assert_eq!(attributes.experiment_id.as_deref(), Some("pricing"));
        assert_eq!(attributes.storage, StorageBackend::Local);
        assert!(attributes.debug_mode);
        assert!(attributes.gtm);
        assert!(!attributes.gtag);
    }
}

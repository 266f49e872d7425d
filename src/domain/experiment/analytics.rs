//! Analytics integrations fired after an assignment

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::event::AssignmentEvent;

/// Event name sent to both integrations
pub const IMPRESSION_EVENT: &str = "experience_impression";

/// Prefix of the impression label
pub const IMPRESSION_PREFIX: &str = "web-experiment";

/// Build the `<prefix>-<experimentId>-<variantId>` impression label
pub fn impression_label(experiment_id: &str, variant_id: &str) -> String {
    format!("{}-{}-{}", IMPRESSION_PREFIX, experiment_id, variant_id)
}

/// Function-style reporting entry point (`gtag(command, action, params)`)
pub trait Gtag: Send + Sync {
    fn call(&self, command: &str, action: &str, params: Value);
}

/// Queue-style reporting entry point (`dataLayer.push(entry)`)
pub trait DataLayer: Send + Sync {
    fn push(&self, entry: Value);
}

/// Which integration a report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Gtag,
    DataLayer,
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gtag => write!(f, "gtag"),
            Self::DataLayer => write!(f, "dataLayer"),
        }
    }
}

/// What happened when an enabled integration was probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsReport {
    Reported(Integration),
    Missing(Integration),
}

/// External reporting objects available on the page
#[derive(Clone, Default)]
pub struct AnalyticsHooks {
    gtag: Option<Arc<dyn Gtag>>,
    data_layer: Option<Arc<dyn DataLayer>>,
}

impl AnalyticsHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gtag(mut self, gtag: Arc<dyn Gtag>) -> Self {
        self.gtag = Some(gtag);
        self
    }

    pub fn with_data_layer(mut self, data_layer: Arc<dyn DataLayer>) -> Self {
        self.data_layer = Some(data_layer);
        self
    }

    pub fn has_gtag(&self) -> bool {
        self.gtag.is_some()
    }

    pub fn has_data_layer(&self) -> bool {
        self.data_layer.is_some()
    }

    /// Report an impression to every enabled integration.
    ///
    /// Disabled integrations are never probed.
    pub fn report(
        &self,
        event: &AssignmentEvent,
        gtag_enabled: bool,
        data_layer_enabled: bool,
    ) -> Vec<AnalyticsReport> {
        let label = impression_label(&event.experiment_id, &event.variant_id);
        let mut reports = Vec::new();

        if gtag_enabled {
            match &self.gtag {
                Some(gtag) => {
                    gtag.call(
                        "event",
                        IMPRESSION_EVENT,
                        json!({ "exp_variant_string": label }),
                    );
                    debug!(
                        experiment_id = %event.experiment_id,
                        label = %label,
                        "Reported impression to gtag"
                    );
                    reports.push(AnalyticsReport::Reported(Integration::Gtag));
                }
                None => {
                    warn!("WebExperiment: Google Analytics gtag not found.");
                    reports.push(AnalyticsReport::Missing(Integration::Gtag));
                }
            }
        }

        if data_layer_enabled {
            match &self.data_layer {
                Some(data_layer) => {
                    data_layer.push(json!({
                        "event": IMPRESSION_EVENT,
                        "exp_variant_string": label,
                    }));
                    debug!(
                        experiment_id = %event.experiment_id,
                        label = %label,
                        "Reported impression to dataLayer"
                    );
                    reports.push(AnalyticsReport::Reported(Integration::DataLayer));
                }
                None => {
                    warn!("WebExperiment: Google Tag Manager data layer not found.");
                    reports.push(AnalyticsReport::Missing(Integration::DataLayer));
                }
            }
        }

        reports
    }
}

impl fmt::Debug for AnalyticsHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsHooks")
            .field("gtag", &self.gtag.is_some())
            .field("data_layer", &self.data_layer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Trigger;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingGtag {
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    impl Gtag for CapturingGtag {
        fn call(&self, command: &str, action: &str, params: Value) {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), action.to_string(), params));
        }
    }

    #[derive(Default)]
    struct CapturingDataLayer {
        entries: Mutex<Vec<Value>>,
    }

    impl DataLayer for CapturingDataLayer {
        fn push(&self, entry: Value) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    fn event() -> AssignmentEvent {
        AssignmentEvent::new("ga-exp", "A", Trigger::Select)
    }

    #[test]
    fn test_impression_label() {
        assert_eq!(impression_label("hero", "B"), "web-experiment-hero-B");
    }

    #[test]
    fn test_disabled_integrations_are_not_probed() {
        let gtag = Arc::new(CapturingGtag::default());
        let hooks = AnalyticsHooks::new().with_gtag(gtag.clone());

        let reports = hooks.report(&event(), false, false);

        assert!(reports.is_empty());
        assert!(gtag.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gtag_payload() {
        let gtag = Arc::new(CapturingGtag::default());
        let hooks = AnalyticsHooks::new().with_gtag(gtag.clone());

        let reports = hooks.report(&event(), true, false);

        assert_eq!(reports, vec![AnalyticsReport::Reported(Integration::Gtag)]);
        let calls = gtag.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "event");
        assert_eq!(calls[0].1, "experience_impression");
        assert_eq!(
            calls[0].2,
            json!({ "exp_variant_string": "web-experiment-ga-exp-A" })
        );
    }

    #[test]
    fn test_data_layer_payload() {
        let data_layer = Arc::new(CapturingDataLayer::default());
        let hooks = AnalyticsHooks::new().with_data_layer(data_layer.clone());

        let reports = hooks.report(&event(), false, true);

        assert_eq!(
            reports,
            vec![AnalyticsReport::Reported(Integration::DataLayer)]
        );
        assert_eq!(
            data_layer.entries.lock().unwrap()[0],
            json!({
                "event": "experience_impression",
                "exp_variant_string": "web-experiment-ga-exp-A"
            })
        );
    }

    #[test]
    fn test_missing_integrations_are_reported() {
        let hooks = AnalyticsHooks::new();

        let reports = hooks.report(&event(), true, true);

        assert_eq!(
            reports,
            vec![
                AnalyticsReport::Missing(Integration::Gtag),
                AnalyticsReport::Missing(Integration::DataLayer),
            ]
        );
    }
}

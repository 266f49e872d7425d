//! Assign command - runs one experiment against a stored profile

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::experiment::{
    AnalyticsHooks, AnalyticsReport, AssignmentEvent, AssignmentOutcome, AttachStatus,
    ExperimentAttributes, ExperimentController, PageContext, RandomSource, SeededRandom,
    ThreadRandom,
};
use crate::infrastructure::analytics::{GtagCall, RecordingDataLayer, RecordingGtag};
use crate::infrastructure::events::{InMemoryExperimentHost, LoggingDispatcher, RecordingDispatcher};
use crate::infrastructure::profile::BrowserProfile;
use crate::infrastructure::slot::{SlotSpec, StaticVariantSlot};

/// Arguments for the assign command
#[derive(Args, Clone)]
pub struct AssignArgs {
    /// Page description (TOML)
    #[arg(long)]
    pub page: PathBuf,

    /// Profile file (overrides config)
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Enable debug diagnostics for this run
    #[arg(long)]
    pub debug: bool,

    /// Seed the random draw for reproducible assignments
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Analytics integration points present on the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PageAnalytics {
    pub gtag: bool,
    pub data_layer: bool,
}

/// A page holding one experiment element
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PageSpec {
    #[serde(flatten)]
    pub experiment: ExperimentAttributes,
    #[serde(default)]
    pub analytics: PageAnalytics,
    #[serde(default)]
    pub variants: Vec<SlotSpec>,
}

impl PageSpec {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Invalid page {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotVisibility {
    pub variant_id: String,
    pub visible: bool,
}

/// Everything observable about one assign run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReport {
    pub experiment_id: Option<String>,
    pub outcome: Option<AssignmentOutcome>,
    pub event: Option<AssignmentEvent>,
    pub slots: Vec<SlotVisibility>,
    pub notes: Vec<String>,
    pub gtag_calls: Vec<GtagCall>,
    pub data_layer: Vec<serde_json::Value>,
    pub missing_integrations: Vec<String>,
}

pub fn run(args: AssignArgs) -> anyhow::Result<()> {
    let page = PageSpec::load(&args.page)?;

    let config = super::bootstrap(debug_requested(&args, &page));
    let path = super::profile_path(args.profile, &config);
    let profile = BrowserProfile::load(&path)?;

    let random: Box<dyn RandomSource> = match args.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };

    let report = execute(&page, &profile, args.debug || config.debug_mode, random);

    profile.save(&path)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Whether the flag or the page's experiment asks for debug output
fn debug_requested(args: &AssignArgs, page: &PageSpec) -> bool {
    args.debug || page.experiment.debug_mode
}

/// Attach the page's experiment once and collect what happened
pub fn execute(
    page: &PageSpec,
    profile: &BrowserProfile,
    debug_mode: bool,
    random: Box<dyn RandomSource>,
) -> AssignReport {
    let slots = page
        .variants
        .iter()
        .map(|spec| StaticVariantSlot::from_spec(spec).into_handle())
        .collect();

    let recorder = Arc::new(RecordingDispatcher::new());
    let host = InMemoryExperimentHost::new(page.experiment.clone(), slots)
        .with_dispatcher(recorder.clone())
        .with_dispatcher(Arc::new(LoggingDispatcher));

    let gtag = Arc::new(RecordingGtag::new());
    let data_layer = Arc::new(RecordingDataLayer::new());
    let mut analytics = AnalyticsHooks::new();
    if page.analytics.gtag {
        analytics = analytics.with_gtag(gtag.clone());
    }
    if page.analytics.data_layer {
        analytics = analytics.with_data_layer(data_layer.clone());
    }

    let context = PageContext::new()
        .with_debug_mode(debug_mode)
        .with_analytics(analytics);

    let mut controller = ExperimentController::new(host, Arc::new(profile.store_factory()))
        .with_page_context(context)
        .with_random_source(random);

    let outcome = match controller.attach() {
        AttachStatus::Initialized(outcome) => Some(outcome),
        _ => None,
    };

    info!(
        experiment_id = controller.experiment_id().unwrap_or_default(),
        variant_id = controller.assigned_variant().unwrap_or("none"),
        "Assign finished"
    );

    let slots = controller
        .host()
        .slots()
        .iter()
        .map(|slot| SlotVisibility {
            variant_id: slot.variant_id(),
            visible: !slot.is_hidden(),
        })
        .collect();

    let missing_integrations = controller
        .analytics_reports()
        .iter()
        .filter_map(|report| match report {
            AnalyticsReport::Missing(integration) => Some(integration.to_string()),
            AnalyticsReport::Reported(_) => None,
        })
        .collect();

    AssignReport {
        experiment_id: controller.experiment_id().map(str::to_string),
        outcome,
        event: recorder.events().into_iter().next(),
        slots,
        notes: controller.notes().iter().map(ToString::to_string).collect(),
        gtag_calls: gtag.calls(),
        data_layer: data_layer.entries(),
        missing_integrations,
    }
}

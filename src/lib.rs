//! web-experiment
//!
//! Sticky A/B variant assignment for experiment elements:
//! - Server pre-selection, stored assignments and weighted random draws
//! - Cookie and local storage persistence
//! - Assignment events and analytics impressions

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::experiment::{
    AssignmentEvent, AssignmentOutcome, AttachStatus, ExperimentAttributes, ExperimentController,
    ExperimentHost, PageContext, Trigger, VariantSlot, VariantStore, VariantStoreFactory,
};
pub use domain::DomainError;

//! Show command - prints a stored assignment

use tracing::debug;

use crate::domain::experiment::{storage_key, ExperimentId, VariantStoreFactory};
use crate::infrastructure::profile::BrowserProfile;

use super::StoredVariantArgs;

pub fn run(args: StoredVariantArgs) -> anyhow::Result<()> {
    let config = super::bootstrap(false);
    let path = super::profile_path(args.profile, &config);

    let experiment_id = ExperimentId::new(args.experiment_id)?;
    let profile = BrowserProfile::load(&path)?;
    let store = profile
        .store_factory()
        .create(args.storage, &experiment_id)?;

    debug!(key = %storage_key(&experiment_id), backend = %args.storage, "Reading stored variant");

    match store.read() {
        Some(variant_id) => println!("{}", variant_id),
        None => println!("(none)"),
    }

    Ok(())
}

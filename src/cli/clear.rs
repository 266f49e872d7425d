//! Clear command - forgets a stored assignment

use tracing::info;

use crate::domain::experiment::{ExperimentId, VariantStoreFactory};
use crate::infrastructure::profile::BrowserProfile;

use super::StoredVariantArgs;

pub fn run(args: StoredVariantArgs) -> anyhow::Result<()> {
    let config = super::bootstrap(false);
    let path = super::profile_path(args.profile, &config);

    let experiment_id = ExperimentId::new(args.experiment_id)?;
    let profile = BrowserProfile::load(&path)?;

    profile
        .store_factory()
        .create(args.storage, &experiment_id)?
        .clear();
    profile.save(&path)?;

    info!(experiment_id = %experiment_id, backend = %args.storage, "Stored variant cleared");
    Ok(())
}

pub mod calibration;
pub mod check;
pub mod menu;
pub mod plan;
pub mod serve;

use anyhow::Context;
use barkeep_core::config::Snapshot;
use std::path::Path;

/// Load the configuration, naming the file in the error.
pub(crate) fn load(config: &Path) -> anyhow::Result<Snapshot> {
    Snapshot::load(config)
        .with_context(|| format!("failed to load config from {}", config.display()))
}

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "barkeep.yaml";

/// Walk upward from `start` looking for a `barkeep.yaml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

use barkeep_core::paths::{find_config, CONFIG_FILE};
use std::path::{Path, PathBuf};

/// Resolve the configuration file path.
///
/// Priority:
/// 1. `--config` flag / `BARKEEP_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `barkeep.yaml`
/// 3. Fall back to `cwd/barkeep.yaml`
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_config(&cwd).unwrap_or_else(|| cwd.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("elsewhere.yaml");
        assert_eq!(resolve_config(Some(&path)), path);
    }

    #[test]
    fn fallback_names_the_default_file() {
        let resolved = resolve_config(None);
        assert_eq!(
            resolved.file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
    }
}

use crate::output::print_json;
use barkeep_core::config::WarnLevel;
use std::path::Path;

/// Hard errors already fail the load; what remains are warnings.
pub fn run(config: &Path, json: bool) -> anyhow::Result<()> {
    let snapshot = super::load(config)?;
    let warnings = snapshot.validate();

    if json {
        print_json(&serde_json::json!({
            "path": config,
            "pumps": snapshot.pumps.len(),
            "recipes": snapshot.recipes.len(),
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!(
            "Config is valid: {} pumps, {} recipes. No warnings.",
            snapshot.pumps.len(),
            snapshot.recipes.len()
        );
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

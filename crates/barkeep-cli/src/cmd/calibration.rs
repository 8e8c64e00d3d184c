use crate::output::{print_json, print_table};
use barkeep_core::calibration;
use std::path::Path;

pub fn run(config: &Path, json: bool) -> anyhow::Result<()> {
    let snapshot = super::load(config)?;
    let entries = calibration::report(&snapshot);

    if json {
        return print_json(&serde_json::json!({
            "default_rate": snapshot.settings.default_rate,
            "pumps": entries,
        }));
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.pump_id.clone(),
                e.channel.to_string(),
                e.label.clone(),
                format!("{:.4}", e.rate),
                if e.calibrated {
                    "yes"
                } else if e.rate == snapshot.settings.default_rate {
                    "default"
                } else {
                    // rate comes from another pump on the same channel
                    "shared"
                }
                .to_string(),
            ]
        })
        .collect();
    print_table(&["PUMP", "CHANNEL", "LABEL", "S/UNIT", "CALIBRATED"], &rows);
    println!(
        "\nDefault rate: {:.4} s/unit",
        snapshot.settings.default_rate
    );
    Ok(())
}

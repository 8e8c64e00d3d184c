use crate::output::{print_json, print_table, secs};
use barkeep_core::planner;
use std::path::Path;

pub fn run(config: &Path, recipe_id: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = super::load(config)?;
    let (plan, name) = planner::build_recipe_plan(recipe_id, &snapshot)?;
    let estimate = plan.estimated_total(snapshot.pacing().settle).as_secs_f64();

    if json {
        return print_json(&serde_json::json!({
            "name": name,
            "steps": plan,
            "estimated_seconds": estimate,
        }));
    }

    println!("{name}");
    if plan.is_empty() {
        println!("Nothing to dispense.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = plan
        .steps()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                (i + 1).to_string(),
                s.channel.to_string(),
                s.label.clone(),
                s.amount.to_string(),
                secs(s.duration_secs),
            ]
        })
        .collect();
    print_table(&["#", "CHANNEL", "LABEL", "AMOUNT", "TIME"], &rows);
    println!("\nEstimated total: {}", secs(estimate));
    Ok(())
}

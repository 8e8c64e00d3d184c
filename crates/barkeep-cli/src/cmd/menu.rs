use crate::output::{print_json, print_table};
use std::path::Path;

pub fn run(config: &Path, json: bool) -> anyhow::Result<()> {
    let snapshot = super::load(config)?;

    if json {
        return print_json(&snapshot.recipes);
    }

    if snapshot.recipes.is_empty() {
        println!("No recipes configured.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = snapshot
        .recipes
        .iter()
        .map(|r| {
            let ingredients: Vec<String> = r
                .ingredients
                .iter()
                .map(|i| format!("{} {}", i.amount, i.describe()))
                .collect();
            vec![
                r.id.to_string(),
                r.name.clone(),
                ingredients.join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "INGREDIENTS"], &rows);
    Ok(())
}

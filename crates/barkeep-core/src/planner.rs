use crate::calibration::CalibrationTable;
use crate::config::{IngredientTarget, Snapshot};
use crate::error::{BarkeepError, Result};
use crate::plan::{DispensePlan, DispenseStep};
use crate::types::Channel;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Build the plan for `recipe_id`, returning it with the recipe's display name.
///
/// Steps follow the recipe's ingredient order exactly. Ingredients given by
/// tag resolve through [`Snapshot::pump_for_ingredient`], so the configured
/// tie-break decides between pumps sharing a tag.
pub fn build_recipe_plan(recipe_id: &str, snapshot: &Snapshot) -> Result<(DispensePlan, String)> {
    let recipe = snapshot
        .recipe(recipe_id)
        .ok_or_else(|| BarkeepError::RecipeNotFound(recipe_id.to_string()))?;
    let table = CalibrationTable::from_snapshot(snapshot);

    let mut steps = Vec::with_capacity(recipe.ingredients.len());
    for line in &recipe.ingredients {
        let pump = match line.target() {
            Some(IngredientTarget::Pump(id)) => {
                snapshot
                    .pump(id)
                    .ok_or_else(|| BarkeepError::PumpUnconfigured {
                        recipe: recipe_id.to_string(),
                        pump: id.to_string(),
                    })?
            }
            Some(IngredientTarget::Tag(tag)) => snapshot.pump_for_ingredient(tag).ok_or_else(|| {
                BarkeepError::IngredientUnmapped {
                    recipe: recipe_id.to_string(),
                    ingredient: tag.to_string(),
                }
            })?,
            None => {
                return Err(BarkeepError::ConfigMalformed(format!(
                    "recipe '{recipe_id}': ingredient '{}' names neither a tag nor a pump",
                    line.describe()
                )))
            }
        };

        let rate = table.rate(pump.channel);
        steps.push(DispenseStep::measured(
            pump.channel,
            pump.label.clone(),
            line.amount,
            rate,
        ));
    }

    Ok((DispensePlan::new(steps), recipe.name.clone()))
}

// ---------------------------------------------------------------------------
// Manual plans
// ---------------------------------------------------------------------------

/// One requested test actuation. Both fields are loosely typed because they
/// come straight from client JSON; anything unusable is dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualEntry {
    #[serde(default)]
    pub channel: serde_json::Value,
    #[serde(default)]
    pub seconds: serde_json::Value,
}

impl ManualEntry {
    pub fn new(channel: u32, seconds: f64) -> Self {
        Self {
            channel: channel.into(),
            seconds: seconds.into(),
        }
    }

    fn parse(&self) -> Option<(Channel, f64)> {
        let channel = Channel::from_value(&self.channel)?;
        let seconds = match &self.seconds {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (seconds.is_finite() && seconds > 0.0).then_some((channel, seconds))
    }
}

/// Build a test plan from raw `(channel, seconds)` entries, in input order.
///
/// Entries with an unparsable channel or a non-positive duration are skipped
/// without error; only an empty result is reported.
pub fn build_manual_plan(entries: &[ManualEntry]) -> Result<DispensePlan> {
    let steps: Vec<DispenseStep> = entries
        .iter()
        .filter_map(|entry| {
            let parsed = entry.parse();
            if parsed.is_none() {
                debug!(channel = %entry.channel, seconds = %entry.seconds, "dropping manual entry");
            }
            parsed
        })
        .map(|(channel, seconds)| DispenseStep::test(channel, format!("test channel {channel}"), seconds))
        .collect();

    if steps.is_empty() {
        return Err(BarkeepError::InvalidManualEntry);
    }
    Ok(DispensePlan::new(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TieBreak;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot::from_yaml(
            r#"
pumps:
  - { id: pump_1, channel: 17, label: Rum, ingredient: rum, rate: 0.27 }
  - { id: pump_4, channel: 23, label: Lime, ingredient: lime, flow_rate: 4 }
  - { id: pump_5, channel: 24, label: Lime (spare), ingredient: lime, flow_rate: 2 }
  - { id: pump_6, channel: 25, label: Soda, ingredient: soda }
recipes:
  - id: mojito
    name: Mojito
    ingredients:
      - { ingredient: rum, amount: 50 }
      - { ingredient: lime, amount: 30 }
      - { pump: pump_6, amount: 100 }
  - id: daiquiri
    name: Daiquiri
    ingredients:
      - { ingredient: lime, amount: 20 }
      - { ingredient: rum, amount: 60 }
  - id: ghost
    name: Ghost
    ingredients:
      - { ingredient: mint, amount: 5 }
  - id: broken
    name: Broken
    ingredients:
      - { pump: pump_9, amount: 5 }
  - id: 7
    name: Nothing
    ingredients: []
"#,
        )
        .unwrap()
    }

    #[test]
    fn recipe_plan_follows_ingredient_order() {
        let (plan, name) = build_recipe_plan("mojito", &snapshot()).unwrap();
        assert_eq!(name, "Mojito");
        let channels: Vec<u32> = plan.steps().iter().map(|s| s.channel.0).collect();
        assert_eq!(channels, vec![17, 23, 25]);

        let (plan, _) = build_recipe_plan("daiquiri", &snapshot()).unwrap();
        let channels: Vec<u32> = plan.steps().iter().map(|s| s.channel.0).collect();
        assert_eq!(channels, vec![23, 17]);
    }

    #[test]
    fn durations_use_resolved_rate() {
        let (plan, _) = build_recipe_plan("mojito", &snapshot()).unwrap();
        let steps = plan.steps();
        assert!((steps[0].duration_secs - 13.5).abs() < 1e-9);
        assert_eq!(steps[0].rate_used, 0.27);
        assert!((steps[1].duration_secs - 7.5).abs() < 1e-9);
        // soda has no calibration: default 1/3 s per unit
        assert!((steps[2].duration_secs - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(steps[2].amount, 100.0);
    }

    #[test]
    fn first_matching_pump_wins_by_default() {
        let (plan, _) = build_recipe_plan("daiquiri", &snapshot()).unwrap();
        assert_eq!(plan.steps()[0].channel, Channel(23));
        assert_eq!(plan.steps()[0].label, "Lime");
    }

    #[test]
    fn last_matching_pump_wins_when_configured() {
        let mut snap = snapshot();
        snap.settings.duplicate_ingredient = TieBreak::Last;
        let (plan, _) = build_recipe_plan("daiquiri", &snap).unwrap();
        assert_eq!(plan.steps()[0].channel, Channel(24));
        assert!((plan.steps()[0].duration_secs - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_recipe_is_not_found() {
        let err = build_recipe_plan("pina_colada", &snapshot()).unwrap_err();
        assert!(matches!(err, BarkeepError::RecipeNotFound(id) if id == "pina_colada"));
    }

    #[test]
    fn unmapped_ingredient_names_the_ingredient() {
        let err = build_recipe_plan("ghost", &snapshot()).unwrap_err();
        assert!(err.to_string().contains("mint"));
        assert!(matches!(err, BarkeepError::IngredientUnmapped { .. }));
    }

    #[test]
    fn unknown_pump_is_unconfigured() {
        let err = build_recipe_plan("broken", &snapshot()).unwrap_err();
        assert!(matches!(err, BarkeepError::PumpUnconfigured { pump, .. } if pump == "pump_9"));
    }

    #[test]
    fn empty_recipe_builds_empty_plan() {
        let (plan, name) = build_recipe_plan("7", &snapshot()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(name, "Nothing");
    }

    #[test]
    fn plan_is_unaffected_by_later_calibration_changes() {
        let mut snap = snapshot();
        let (plan, _) = build_recipe_plan("mojito", &snap).unwrap();
        snap.pumps[0].rate = Some(1.0);
        assert!((plan.steps()[0].duration_secs - 13.5).abs() < 1e-9);
    }

    #[test]
    fn manual_plan_drops_non_positive_entries() {
        let plan = build_manual_plan(&[ManualEntry::new(17, 2.0), ManualEntry::new(27, -1.0)]).unwrap();
        assert_eq!(plan.len(), 1);
        let step = &plan.steps()[0];
        assert_eq!(step.channel, Channel(17));
        assert_eq!(step.duration_secs, 2.0);
        assert_eq!(step.amount, 0.0);
    }

    #[test]
    fn manual_plan_drops_unparsable_entries() {
        let entries = vec![
            ManualEntry { channel: json!("abc"), seconds: json!(1) },
            ManualEntry { channel: json!(22), seconds: json!("soon") },
            ManualEntry { channel: json!("24"), seconds: json!("1.5") },
            ManualEntry::default(),
        ];
        let plan = build_manual_plan(&entries).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].channel, Channel(24));
        assert_eq!(plan.steps()[0].duration_secs, 1.5);
    }

    #[test]
    fn manual_plan_keeps_input_order() {
        let plan = build_manual_plan(&[
            ManualEntry::new(25, 1.0),
            ManualEntry::new(17, 1.0),
            ManualEntry::new(25, 0.5),
        ])
        .unwrap();
        let channels: Vec<u32> = plan.steps().iter().map(|s| s.channel.0).collect();
        assert_eq!(channels, vec![25, 17, 25]);
    }

    #[test]
    fn manual_plan_with_nothing_valid_is_rejected() {
        let err = build_manual_plan(&[ManualEntry::new(17, 0.0), ManualEntry::new(27, -1.0)])
            .unwrap_err();
        assert!(matches!(err, BarkeepError::InvalidManualEntry));
        assert!(matches!(build_manual_plan(&[]), Err(BarkeepError::InvalidManualEntry)));
    }
}

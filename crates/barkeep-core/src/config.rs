use crate::error::{BarkeepError, Result};
use crate::plan::{saturating_secs, Pacing};
use crate::types::{Channel, RecipeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Seconds per unit used for any pump without a usable calibration
/// (a pump moving 3 units per second).
pub const DEFAULT_RATE: f64 = 1.0 / 3.0;

/// Pause between consecutive steps when the config does not set one.
pub const DEFAULT_SETTLE_DELAY_SECS: f64 = 0.5;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Which pump wins when several declare the same ingredient tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The first matching pump in declaration order.
    #[default]
    First,
    /// The last matching pump in declaration order.
    Last,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_preparation_secs: Option<f64>,
    #[serde(default = "default_rate")]
    pub default_rate: f64,
    #[serde(default)]
    pub duplicate_ingredient: TieBreak,
}

fn default_settle_delay() -> f64 {
    DEFAULT_SETTLE_DELAY_SECS
}

fn default_rate() -> f64 {
    DEFAULT_RATE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay(),
            max_preparation_secs: None,
            default_rate: default_rate(),
            duplicate_ingredient: TieBreak::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PumpDef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpDef {
    pub id: String,
    pub channel: Channel,
    pub label: String,
    /// Ingredient tag this pump dispenses. A pump without one can still be
    /// referenced from a recipe by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<String>,
    /// Measured flow in units per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    /// Explicit calibration in seconds per unit; wins over `flow_rate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// RecipeDef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAmount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<String>,
    pub amount: f64,
}

/// What an ingredient line points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientTarget<'a> {
    Tag(&'a str),
    Pump(&'a str),
}

impl IngredientAmount {
    pub fn target(&self) -> Option<IngredientTarget<'_>> {
        match (&self.pump, &self.ingredient) {
            (Some(pump), None) => Some(IngredientTarget::Pump(pump)),
            (None, Some(tag)) => Some(IngredientTarget::Tag(tag)),
            _ => None,
        }
    }

    /// Human-readable name of whatever this line refers to.
    pub fn describe(&self) -> &str {
        self.ingredient
            .as_deref()
            .or(self.pump.as_deref())
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDef {
    pub id: RecipeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
}

// ---------------------------------------------------------------------------
// Snapshot (top-level)
// ---------------------------------------------------------------------------

/// Point-in-time view of the configuration document.
///
/// Every call to [`Snapshot::load`] reads the file again; nothing is cached,
/// so edits to calibration or recipes apply on the very next request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub pumps: Vec<PumpDef>,
    #[serde(default)]
    pub recipes: Vec<RecipeDef>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read_to_string(path).map_err(|source| BarkeepError::ConfigUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&data).map_err(|e| match e {
            BarkeepError::ConfigMalformed(msg) => {
                BarkeepError::ConfigMalformed(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse and check a YAML (or JSON) document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_yaml::from_str(data)?;
        snapshot.check()?;
        Ok(snapshot)
    }

    pub fn recipe(&self, id: &str) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.id.as_str() == id)
    }

    pub fn pump(&self, id: &str) -> Option<&PumpDef> {
        self.pumps.iter().find(|p| p.id == id)
    }

    /// Pump dispensing `tag`, honouring the configured tie-break.
    pub fn pump_for_ingredient(&self, tag: &str) -> Option<&PumpDef> {
        let mut matching = self
            .pumps
            .iter()
            .filter(|p| p.ingredient.as_deref() == Some(tag));
        match self.settings.duplicate_ingredient {
            TieBreak::First => matching.next(),
            TieBreak::Last => matching.last(),
        }
    }

    /// Every distinct channel, in declaration order.
    pub fn channels(&self) -> Vec<Channel> {
        let mut seen = HashSet::new();
        self.pumps
            .iter()
            .map(|p| p.channel)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            settle: saturating_secs(self.settings.settle_delay_secs),
            max_total: self.settings.max_preparation_secs.map(saturating_secs),
        }
    }

    // -----------------------------------------------------------------------
    // Hard checks (reject the document)
    // -----------------------------------------------------------------------

    fn check(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BarkeepError::ConfigMalformed(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let s = &self.settings;

        // 1. Settings ranges
        if !(s.settle_delay_secs.is_finite() && s.settle_delay_secs >= 0.0) {
            warnings.push(ConfigWarning::error(format!(
                "settings.settle_delay_secs must be >= 0 (got {})",
                s.settle_delay_secs
            )));
        }
        if let Some(max) = s.max_preparation_secs {
            if !(max.is_finite() && max > 0.0) {
                warnings.push(ConfigWarning::error(format!(
                    "settings.max_preparation_secs must be > 0 (got {max})"
                )));
            }
        }
        if !(s.default_rate.is_finite() && s.default_rate > 0.0) {
            warnings.push(ConfigWarning::error(format!(
                "settings.default_rate must be > 0 (got {})",
                s.default_rate
            )));
        }

        // 2. Pumps
        let mut channels: HashMap<Channel, &str> = HashMap::new();
        let mut tags: HashMap<&str, &str> = HashMap::new();
        let mut ids = HashSet::new();
        for pump in &self.pumps {
            if !ids.insert(pump.id.as_str()) {
                warnings.push(ConfigWarning::error(format!(
                    "pump id '{}' is declared more than once",
                    pump.id
                )));
            }
            for (field, value) in [("flow_rate", pump.flow_rate), ("rate", pump.rate)] {
                if let Some(v) = value {
                    if !v.is_finite() || v < 0.0 {
                        warnings.push(ConfigWarning::error(format!(
                            "pump '{}' has invalid {field} {v}",
                            pump.id
                        )));
                    }
                }
            }
            if crate::calibration::pump_rate(pump).is_none() {
                warnings.push(ConfigWarning::warning(format!(
                    "pump '{}' (channel {}) has no calibration; the default rate applies",
                    pump.id, pump.channel
                )));
            }
            if let Some(other) = channels.insert(pump.channel, &pump.id) {
                warnings.push(ConfigWarning::warning(format!(
                    "pumps '{other}' and '{}' share channel {}",
                    pump.id, pump.channel
                )));
            }
            if let Some(tag) = pump.ingredient.as_deref() {
                if let Some(other) = tags.insert(tag, &pump.id) {
                    warnings.push(ConfigWarning::warning(format!(
                        "pumps '{other}' and '{}' both dispense '{tag}'; \
                         duplicate_ingredient={:?} decides",
                        pump.id, s.duplicate_ingredient
                    )));
                }
            }
        }

        // 3. Recipes
        let mut recipe_ids = HashSet::new();
        for recipe in &self.recipes {
            if !recipe_ids.insert(recipe.id.as_str()) {
                warnings.push(ConfigWarning::warning(format!(
                    "recipe id '{}' is declared more than once; the first one is used",
                    recipe.id
                )));
            }
            if recipe.ingredients.is_empty() {
                warnings.push(ConfigWarning::warning(format!(
                    "recipe '{}' has no ingredients and cannot be ordered",
                    recipe.id
                )));
            }
            for line in &recipe.ingredients {
                if !line.amount.is_finite() || line.amount < 0.0 {
                    warnings.push(ConfigWarning::error(format!(
                        "recipe '{}': amount for '{}' must be >= 0 (got {})",
                        recipe.id,
                        line.describe(),
                        line.amount
                    )));
                }
                match line.target() {
                    None => warnings.push(ConfigWarning::error(format!(
                        "recipe '{}': each ingredient needs exactly one of 'ingredient' or 'pump'",
                        recipe.id
                    ))),
                    Some(IngredientTarget::Tag(tag)) if self.pump_for_ingredient(tag).is_none() => {
                        warnings.push(ConfigWarning::warning(format!(
                            "recipe '{}': ingredient '{tag}' is not mapped to any pump",
                            recipe.id
                        )))
                    }
                    Some(IngredientTarget::Pump(id)) if self.pump(id).is_none() => {
                        warnings.push(ConfigWarning::warning(format!(
                            "recipe '{}': pump '{id}' is not configured",
                            recipe.id
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
settings:
  settle_delay_secs: 2
  max_preparation_secs: 60
pumps:
  - id: pump_1
    channel: 17
    label: Rum
    ingredient: rum
    flow_rate: 3.7
  - id: pump_6
    channel: 25
    label: Soda
    ingredient: soda
recipes:
  - id: mojito
    name: Mojito
    ingredients:
      - ingredient: rum
        amount: 50
      - pump: pump_6
        amount: 100
  - id: 2
    name: Rum Shot
    ingredients:
      - ingredient: rum
        amount: 30
"#;

    #[test]
    fn parses_sample_document() {
        let snap = Snapshot::from_yaml(SAMPLE).unwrap();
        assert_eq!(snap.pumps.len(), 2);
        assert_eq!(snap.recipes.len(), 2);
        assert!(snap.recipe("mojito").is_some());
        assert!(snap.recipe("2").is_some());
        assert_eq!(snap.settings.duplicate_ingredient, TieBreak::First);
    }

    #[test]
    fn pacing_comes_from_settings() {
        let snap = Snapshot::from_yaml(SAMPLE).unwrap();
        let pacing = snap.pacing();
        assert_eq!(pacing.settle, Duration::from_secs(2));
        assert_eq!(pacing.max_total, Some(Duration::from_secs(60)));
    }

    #[test]
    fn huge_ceiling_saturates_rather_than_zeroing() {
        let snap = Snapshot::from_yaml("settings:\n  max_preparation_secs: 1e20\n").unwrap();
        assert_eq!(snap.pacing().max_total, Some(Duration::MAX));
        assert!(snap.validate().iter().all(|w| w.level != WarnLevel::Error));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let snap = Snapshot::from_yaml("{}").unwrap();
        assert!(snap.pumps.is_empty());
        assert_eq!(snap.settings.settle_delay_secs, DEFAULT_SETTLE_DELAY_SECS);
        assert_eq!(snap.settings.default_rate, DEFAULT_RATE);
        assert!(snap.settings.max_preparation_secs.is_none());
    }

    #[test]
    fn json_documents_are_accepted() {
        let json = r#"{"pumps": [{"id": "p", "channel": 4, "label": "Gin", "ingredient": "gin"}]}"#;
        let snap = Snapshot::from_yaml(json).unwrap();
        assert_eq!(snap.pumps[0].channel, Channel(4));
    }

    #[test]
    fn load_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, BarkeepError::ConfigUnreadable { .. }));
    }

    #[test]
    fn load_garbage_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("barkeep.yaml");
        std::fs::write(&path, "pumps: [[[").unwrap();
        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, BarkeepError::ConfigMalformed(_)));
    }

    #[test]
    fn load_reads_fresh_each_call() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("barkeep.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(Snapshot::load(&path).unwrap().recipes.len(), 2);

        std::fs::write(&path, "recipes: []\n").unwrap();
        assert!(Snapshot::load(&path).unwrap().recipes.is_empty());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let yaml = r#"
pumps:
  - { id: a, channel: 1, label: A, ingredient: a }
recipes:
  - id: bad
    name: Bad
    ingredients:
      - { ingredient: a, amount: -5 }
"#;
        let err = Snapshot::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("must be >= 0"));
    }

    #[test]
    fn ingredient_with_both_targets_is_rejected() {
        let yaml = r#"
recipes:
  - id: bad
    name: Bad
    ingredients:
      - { ingredient: a, pump: p, amount: 5 }
"#;
        assert!(matches!(
            Snapshot::from_yaml(yaml),
            Err(BarkeepError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn non_positive_default_rate_is_rejected() {
        let yaml = "settings:\n  default_rate: 0\n";
        assert!(Snapshot::from_yaml(yaml).is_err());
    }

    #[test]
    fn tie_break_first_and_last() {
        let yaml = r#"
pumps:
  - { id: a, channel: 1, label: A, ingredient: lime }
  - { id: b, channel: 2, label: B, ingredient: lime }
"#;
        let mut snap = Snapshot::from_yaml(yaml).unwrap();
        assert_eq!(snap.pump_for_ingredient("lime").unwrap().id, "a");
        snap.settings.duplicate_ingredient = TieBreak::Last;
        assert_eq!(snap.pump_for_ingredient("lime").unwrap().id, "b");
    }

    #[test]
    fn validate_flags_duplicates_and_unmapped() {
        let yaml = r#"
pumps:
  - { id: a, channel: 1, label: A, ingredient: lime, flow_rate: 2 }
  - { id: b, channel: 1, label: B, ingredient: lime, flow_rate: 2 }
recipes:
  - id: r
    name: R
    ingredients:
      - { ingredient: mint, amount: 5 }
"#;
        let snap = Snapshot::from_yaml(yaml).unwrap();
        let messages: Vec<String> = snap.validate().into_iter().map(|w| w.message).collect();
        assert!(messages.iter().any(|m| m.contains("share channel 1")));
        assert!(messages.iter().any(|m| m.contains("both dispense 'lime'")));
        assert!(messages.iter().any(|m| m.contains("'mint' is not mapped")));
    }

    #[test]
    fn validate_flags_uncalibrated_pump() {
        let snap = Snapshot::from_yaml(SAMPLE).unwrap();
        let warnings = snap.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("pump_6")));
    }

    #[test]
    fn channels_are_deduplicated_in_order() {
        let yaml = r#"
pumps:
  - { id: a, channel: 5, label: A }
  - { id: b, channel: 3, label: B }
  - { id: c, channel: 5, label: C }
"#;
        let snap = Snapshot::from_yaml(yaml).unwrap();
        assert_eq!(snap.channels(), vec![Channel(5), Channel(3)]);
    }

    #[test]
    fn bundled_example_config_loads() {
        let snap = Snapshot::from_yaml(include_str!("../../../barkeep.example.yaml")).unwrap();
        assert_eq!(snap.recipes.len(), 3);
        assert!(snap.validate().iter().all(|w| w.level == WarnLevel::Warning));
    }
}

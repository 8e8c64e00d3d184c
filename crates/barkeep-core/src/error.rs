use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarkeepError {
    #[error("config unreadable at {path}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config malformed: {0}")]
    ConfigMalformed(String),

    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("ingredient '{ingredient}' (recipe '{recipe}') is not mapped to any pump")]
    IngredientUnmapped { recipe: String, ingredient: String },

    #[error("pump '{pump}' (recipe '{recipe}') is not configured")]
    PumpUnconfigured { recipe: String, pump: String },

    #[error("no valid manual entries: each entry needs a channel and a positive number of seconds")]
    InvalidManualEntry,

    #[error("nothing to dispense for '{0}'")]
    EmptyPlan(String),

    #[error("dispense worker is not running")]
    WorkerUnavailable,
}

impl From<serde_yaml::Error> for BarkeepError {
    fn from(err: serde_yaml::Error) -> Self {
        BarkeepError::ConfigMalformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BarkeepError>;

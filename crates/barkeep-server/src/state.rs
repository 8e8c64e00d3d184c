use barkeep_core::config::Snapshot;
use barkeep_core::{Dispatcher, Result};
use std::path::PathBuf;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config_path: PathBuf,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config_path: PathBuf, dispatcher: Dispatcher) -> Self {
        Self {
            config_path,
            dispatcher,
        }
    }

    /// Read the configuration from disk on a blocking thread.
    ///
    /// Not cached: every request sees the file as it is now.
    pub async fn snapshot(&self) -> std::result::Result<Result<Snapshot>, tokio::task::JoinError> {
        let path = self.config_path.clone();
        tokio::task::spawn_blocking(move || Snapshot::load(&path)).await
    }
}

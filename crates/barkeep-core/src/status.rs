use crate::queue::JobQueue;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Advisory snapshot of what the machine is doing.
///
/// `busy` and `queue_depth` are read separately, so they can disagree for a
/// moment while the worker picks up a job. Never use this for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub busy: bool,
    pub queue_depth: usize,
    /// Display name of the job in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// Busy flag shared between the worker (writer) and status readers.
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    active: Arc<Mutex<Option<String>>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_some()
    }

    pub fn get(&self, queue: &JobQueue) -> SystemStatus {
        let current = self.lock().clone();
        SystemStatus {
            busy: current.is_some(),
            queue_depth: queue.size(),
            current,
        }
    }

    /// Mark the worker busy until the returned guard drops.
    pub(crate) fn enter(&self, job_name: &str) -> BusyGuard<'_> {
        *self.lock() = Some(job_name.to_string());
        BusyGuard { registry: self }
    }
}

/// Clears the busy flag on drop, whatever path the job took out.
#[must_use = "the worker is only busy while the guard is alive"]
pub(crate) struct BusyGuard<'a> {
    registry: &'a StatusRegistry,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.registry.lock() = None;
    }
}

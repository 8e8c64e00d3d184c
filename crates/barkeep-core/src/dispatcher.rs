use crate::actuator::Actuator;
use crate::error::{BarkeepError, Result};
use crate::plan::{DispensePlan, Pacing};
use crate::queue::{job_queue, JobQueue};
use crate::status::{StatusRegistry, SystemStatus};
use crate::worker::{self, JobEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// An accepted request: validated, planned, and waiting for (or undergoing)
/// execution.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub plan: DispensePlan,
    pub pacing: Pacing,
    pub accepted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(name: impl Into<String>, plan: DispensePlan, pacing: Pacing) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            plan,
            pacing,
            accepted_at: Utc::now(),
        }
    }
}

/// What a caller gets back when a job is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub job_id: Uuid,
    pub name: String,
    pub steps: usize,
    pub estimated_seconds: f64,
    pub queue_depth: usize,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Process-wide handle to the job queue, the worker and its status.
///
/// Construct one with [`Dispatcher::start`] and clone it into every request
/// handler. The actuator moves into the worker task and is never reachable
/// from here, so nothing but the worker can toggle a relay.
#[derive(Clone)]
pub struct Dispatcher {
    queue: JobQueue,
    status: StatusRegistry,
    events: broadcast::Sender<JobEvent>,
}

impl Dispatcher {
    /// Spawn the dispense worker on the current Tokio runtime.
    pub fn start<A: Actuator>(actuator: A) -> Self {
        let (queue, receiver) = job_queue();
        let status = StatusRegistry::new();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tokio::spawn(worker::run(
            actuator,
            receiver,
            status.clone(),
            events.clone(),
        ));

        Self {
            queue,
            status,
            events,
        }
    }

    /// Queue a planned job. Never blocks.
    ///
    /// Empty plans are refused here so that every job reaching the worker
    /// actually does something.
    pub fn submit(
        &self,
        name: impl Into<String>,
        plan: DispensePlan,
        pacing: Pacing,
    ) -> Result<Receipt> {
        let name = name.into();
        if plan.is_empty() {
            return Err(BarkeepError::EmptyPlan(name));
        }

        let job = Job::new(name, plan, pacing);
        let job_id = job.id;
        let name = job.name.clone();
        let steps = job.plan.len();
        let estimated_seconds = job.plan.estimated_total(pacing.settle).as_secs_f64();

        let queue_depth = self.queue.enqueue(job).map_err(|job| {
            error!(job_id = %job.id, "dispense worker is gone, job dropped");
            BarkeepError::WorkerUnavailable
        })?;

        info!(job_id = %job_id, name = %name, steps, estimated_seconds, queue_depth, "job queued");
        let _ = self.events.send(JobEvent::Accepted {
            job_id,
            name: name.clone(),
            queue_depth,
        });

        Ok(Receipt {
            job_id,
            name,
            steps,
            estimated_seconds,
            queue_depth,
        })
    }

    pub fn status(&self) -> SystemStatus {
        self.status.get(&self.queue)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.size()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Wait until every job accepted so far has finished.
    pub async fn join(&self) {
        self.queue.join().await
    }
}

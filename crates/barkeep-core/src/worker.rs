//! The dispense worker: sole consumer of the job queue and sole driver of the
//! pump hardware.
//!
//! Jobs run strictly one after another and steps strictly in plan order, so
//! two relays are never on at the same time. A step failure is logged and the
//! job carries on; the only thing that cuts a job short is the preparation
//! time ceiling.

use crate::actuator::{ActuationError, Actuator};
use crate::dispatcher::Job;
use crate::queue::JobReceiver;
use crate::status::StatusRegistry;
use crate::types::Channel;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Outcomes and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every step ran. `failures` counts steps whose actuation errored.
    Completed { failures: usize },
    /// The time ceiling was hit; the job still counts as done.
    TimedOut {
        executed: usize,
        skipped: usize,
        failures: usize,
    },
}

/// Lifecycle notifications for observers (the SSE stream, logs, tests).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Accepted {
        job_id: Uuid,
        name: String,
        queue_depth: usize,
    },
    Started {
        job_id: Uuid,
        name: String,
        steps: usize,
    },
    Finished {
        job_id: Uuid,
        name: String,
        outcome: JobOutcome,
        elapsed_secs: f64,
    },
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

/// Drain the queue forever. Returns only when every producer has been
/// dropped, which in practice means the process is going away.
pub(crate) async fn run<A: Actuator>(
    mut actuator: A,
    mut jobs: JobReceiver,
    status: StatusRegistry,
    events: broadcast::Sender<JobEvent>,
) {
    info!("dispense worker started");
    while let Some(job) = jobs.dequeue().await {
        let started = Instant::now();
        let outcome = {
            let _busy = status.enter(&job.name);
            let _ = events.send(JobEvent::Started {
                job_id: job.id,
                name: job.name.clone(),
                steps: job.plan.len(),
            });
            execute(&mut actuator, &job).await
        };
        let elapsed = started.elapsed();

        match &outcome {
            JobOutcome::Completed { failures: 0 } => {
                info!(job_id = %job.id, name = %job.name, elapsed_secs = elapsed.as_secs_f64(), "job ready")
            }
            JobOutcome::Completed { failures } => warn!(
                job_id = %job.id,
                name = %job.name,
                failures,
                elapsed_secs = elapsed.as_secs_f64(),
                "job finished with failed steps"
            ),
            JobOutcome::TimedOut {
                executed, skipped, ..
            } => warn!(
                job_id = %job.id,
                name = %job.name,
                executed,
                skipped,
                elapsed_secs = elapsed.as_secs_f64(),
                "job cut short by preparation time limit"
            ),
        }

        let _ = events.send(JobEvent::Finished {
            job_id: job.id,
            name: job.name.clone(),
            outcome,
            elapsed_secs: elapsed.as_secs_f64(),
        });
        jobs.task_done();
    }
    info!("dispense worker stopped: queue closed");
}

/// Run one job's plan to completion or to the time ceiling.
pub(crate) async fn execute<A: Actuator + ?Sized>(actuator: &mut A, job: &Job) -> JobOutcome {
    let steps = job.plan.steps();
    let total = steps.len();
    let start = Instant::now();
    let mut failures = 0;

    info!(job_id = %job.id, name = %job.name, steps = total, "starting job");

    for (idx, step) in steps.iter().enumerate() {
        let mut hold = step.duration();
        let mut truncated = false;

        if let Some(max) = job.pacing.max_total {
            let elapsed = start.elapsed();
            if elapsed >= max {
                warn!(
                    job_id = %job.id,
                    limit_secs = max.as_secs_f64(),
                    skipped = total - idx,
                    "preparation time limit reached, skipping remaining steps"
                );
                return JobOutcome::TimedOut {
                    executed: idx,
                    skipped: total - idx,
                    failures,
                };
            }
            let remaining = max - elapsed;
            if hold > remaining {
                hold = remaining;
                truncated = true;
            }
        }

        if step.is_test() {
            info!(
                step = idx + 1,
                of = total,
                channel = %step.channel,
                hold_secs = hold.as_secs_f64(),
                "manual test step"
            );
        } else {
            info!(
                step = idx + 1,
                of = total,
                channel = %step.channel,
                label = %step.label,
                amount = step.amount,
                hold_secs = hold.as_secs_f64(),
                "dispensing"
            );
        }

        if let Err(e) = actuate(actuator, step.channel, hold).await {
            failures += 1;
            error!(job_id = %job.id, step = idx + 1, error = %e, "actuation failed, continuing");
        }

        if truncated {
            warn!(
                job_id = %job.id,
                step = idx + 1,
                planned_secs = step.duration_secs,
                held_secs = hold.as_secs_f64(),
                "step truncated at preparation time limit"
            );
            return JobOutcome::TimedOut {
                executed: idx + 1,
                skipped: total - idx - 1,
                failures,
            };
        }

        if idx + 1 < total {
            tokio::time::sleep(job.pacing.settle).await;
        }
    }

    JobOutcome::Completed { failures }
}

/// On, hold, off. A failed activation still gets an attempt to switch the
/// line off before the error is returned.
async fn actuate<A: Actuator + ?Sized>(
    actuator: &mut A,
    channel: Channel,
    hold: Duration,
) -> Result<(), ActuationError> {
    if let Err(e) = contained(actuator, channel, |a| a.activate(channel)) {
        if let Err(off) = contained(actuator, channel, |a| a.deactivate(channel)) {
            error!(channel = %channel, error = %off, "could not switch relay off after failed activation");
        }
        return Err(e);
    }
    tokio::time::sleep(hold).await;
    contained(actuator, channel, |a| a.deactivate(channel))
}

/// Run one driver call, turning a panic into an `ActuationError` so the
/// worker outlives a misbehaving driver.
fn contained<A, F>(actuator: &mut A, channel: Channel, op: F) -> Result<(), ActuationError>
where
    A: Actuator + ?Sized,
    F: FnOnce(&mut A) -> Result<(), ActuationError>,
{
    panic::catch_unwind(AssertUnwindSafe(|| op(actuator)))
        .unwrap_or_else(|payload| Err(ActuationError::Panicked(channel, panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

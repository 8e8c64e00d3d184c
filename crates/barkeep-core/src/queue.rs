use crate::dispatcher::Job;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Counters shared by both ends of the queue.
#[derive(Debug, Default)]
struct Shared {
    /// Jobs enqueued and not yet picked up by the worker.
    depth: AtomicUsize,
    /// Jobs enqueued and not yet marked done.
    unfinished: AtomicUsize,
    all_done: Notify,
}

/// Producer side of the job queue. Cheap to clone; any number of request
/// handlers may hold one.
///
/// The queue is unbounded and applies no backpressure.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

/// Consumer side. Exactly one exists, owned by the dispense worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
    shared: Arc<Shared>,
}

pub fn job_queue() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());
    (
        JobQueue {
            tx,
            shared: Arc::clone(&shared),
        },
        JobReceiver { rx, shared },
    )
}

impl JobQueue {
    /// Append a job without blocking. Returns the queue depth after the
    /// insert, or the job back if the worker is gone.
    pub fn enqueue(&self, job: Job) -> Result<usize, Job> {
        self.shared.unfinished.fetch_add(1, Ordering::SeqCst);
        let depth = self.shared.depth.fetch_add(1, Ordering::SeqCst) + 1;
        match self.tx.send(job) {
            Ok(()) => Ok(depth),
            Err(mpsc::error::SendError(job)) => {
                self.shared.depth.fetch_sub(1, Ordering::SeqCst);
                self.shared.unfinished.fetch_sub(1, Ordering::SeqCst);
                Err(job)
            }
        }
    }

    /// Jobs waiting to be picked up (the one in flight is not counted).
    pub fn size(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    /// Wait until every job enqueued so far has been marked done.
    pub async fn join(&self) {
        loop {
            let notified = self.shared.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.unfinished.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` only once every producer is dropped.
    pub async fn dequeue(&mut self) -> Option<Job> {
        let job = self.rx.recv().await?;
        self.shared.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    /// Mark one dequeued job as finished.
    pub fn task_done(&self) {
        let prev = self.shared.unfinished.fetch_sub(1, Ordering::SeqCst);
        if prev <= 1 {
            self.shared.all_done.notify_waiters();
        }
    }
}

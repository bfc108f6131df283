use std::any::Any;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::job::{Job, JobOutcome};
use crate::journal::Journal;

/// `Worker` pulls jobs off the dispatch queue and runs them on the blocking pool
pub(crate) struct Worker {
    worker_id: usize,
    journal: Arc<Journal>,
}

impl Worker {
    pub(crate) const fn new(worker_id: usize, journal: Arc<Journal>) -> Self {
        Self { worker_id, journal }
    }

    /// Runs the worker loop until shutdown or until every sender is gone
    pub(crate) async fn run(&self, receiver: flume::Receiver<Job>, shutdown_token: CancellationToken) {
        debug!("Dispatch worker {} started", self.worker_id);

        loop {
            tokio::select! {
                () = shutdown_token.cancelled() => {
                    debug!("Dispatch worker {} received shutdown signal", self.worker_id);
                    break;
                }
                result = receiver.recv_async() => {
                    match result {
                        Ok(job) => self.process_job(job).await,
                        Err(flume::RecvError::Disconnected) => {
                            info!("Dispatch queue closed for worker {}", self.worker_id);
                            break;
                        }
                    }
                }
            }
        }

        debug!("Dispatch worker {} stopped", self.worker_id);
    }

    async fn process_job(&self, job: Job) {
        let Job { topic, id, run } = job;

        debug!(
            topic = %topic,
            job_id = id,
            "Worker {} running job",
            self.worker_id
        );

        match tokio::task::spawn_blocking(run).await {
            Ok(JobOutcome::Succeeded) => self.journal.record_succeeded(),
            Ok(JobOutcome::Failed(message)) => {
                self.journal.record_failed();
                warn!(
                    topic = %topic,
                    job_id = id,
                    error = %message,
                    "Worker {} handler failed",
                    self.worker_id
                );
            }
            Err(e) => {
                self.journal.record_lost();
                let message = if e.is_panic() {
                    panic_message(&*e.into_panic())
                } else {
                    e.to_string()
                };
                error!(
                    topic = %topic,
                    job_id = id,
                    error = %message,
                    "Worker {} lost job",
                    self.worker_id
                );
            }
        }
    }
}

/// Extracts a readable message from a panic payload
#[must_use]
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

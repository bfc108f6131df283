use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::dispatcher::Shared;
use crate::error::{DispatchError, DispatchResult};
use crate::job::{Job, JobOutcome};

type Handler<P, T, E> = dyn Fn(P) -> Result<T, E> + Send + Sync;

/// Handle to a registered topic
///
/// Obtained from [`crate::Dispatcher::on`]; holding one proves the topic has a
/// handler, so there is no way to dispatch to an unregistered topic.
pub struct Topic<P, T, E> {
    name: Arc<str>,
    handler: Arc<Handler<P, T, E>>,
    shared: Arc<Shared>,
}

impl<P, T, E> Clone for Topic<P, T, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            handler: Arc::clone(&self.handler),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P, T, E> std::fmt::Debug for Topic<P, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("name", &self.name).finish()
    }
}

impl<P, T, E> Topic<P, T, E>
where
    P: Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    pub(crate) fn new(
        name: Arc<str>,
        handler: Arc<Handler<P, T, E>>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            name,
            handler,
            shared,
        }
    }

    /// Queues `payload` for the topic's handler without waiting for a worker
    ///
    /// The returned [`Pending`] resolves once the handler has run. Dropping it turns the
    /// dispatch into fire-and-forget; failures are then only journaled.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` if the queue is at capacity, or `Closed` after shutdown. In
    /// both cases the payload is dropped.
    pub fn dispatch(&self, payload: P) -> DispatchResult<Pending<T, E>, E> {
        if self.shared.shutdown_token.is_cancelled() {
            return Err(DispatchError::Closed {
                topic: self.name.to_string(),
            });
        }

        let id = self.shared.next_job_id();
        let (completion_tx, completion_rx) = oneshot::channel();
        let handler = Arc::clone(&self.handler);
        let topic = Arc::clone(&self.name);

        let run = Box::new(move || {
            let (outcome, completion) = match handler(payload) {
                Ok(value) => (JobOutcome::Succeeded, Ok(value)),
                Err(e) => (
                    JobOutcome::Failed(e.to_string()),
                    Err(DispatchError::Handler(e)),
                ),
            };

            if completion_tx.send(completion).is_err() {
                debug!(topic = %topic, job_id = id, "Completion dropped, nobody is waiting for it");
            }

            outcome
        });

        let job = Job {
            topic: Arc::clone(&self.name),
            id,
            run,
        };

        match self.shared.enqueue(job) {
            Ok(()) => {
                self.shared.journal.record_dispatched();
                Ok(Pending {
                    topic: Arc::clone(&self.name),
                    receiver: completion_rx,
                })
            }
            Err(flume::TrySendError::Full(_)) => {
                self.shared.journal.record_rejected();
                warn!(topic = %self.name, job_id = id, "Dispatch queue full, rejecting job");
                Err(DispatchError::QueueFull {
                    topic: self.name.to_string(),
                })
            }
            Err(flume::TrySendError::Disconnected(_)) => Err(DispatchError::Closed {
                topic: self.name.to_string(),
            }),
        }
    }

    /// Dispatches `payload` and calls `on_complete` with the outcome
    ///
    /// `on_complete` runs exactly once, on a runtime task and never inline in this call,
    /// whether the job succeeds, fails, or cannot be queued at all.
    pub fn dispatch_and_await<F>(&self, payload: P, on_complete: F)
    where
        F: FnOnce(DispatchResult<T, E>) + Send + 'static,
    {
        let dispatched = self.dispatch(payload);
        self.shared.runtime.spawn(async move {
            let outcome = match dispatched {
                Ok(pending) => pending.await,
                Err(e) => Err(e),
            };
            on_complete(outcome);
        });
    }
}

/// Completion of a dispatched job
///
/// Resolves to the handler's value, or to the reason it did not produce one.
#[must_use = "a pending completion does nothing unless awaited"]
pub struct Pending<T, E> {
    topic: Arc<str>,
    receiver: oneshot::Receiver<DispatchResult<T, E>>,
}

impl<T, E> std::fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").field("topic", &self.topic).finish()
    }
}

impl<T, E> Pending<T, E> {
    /// Waits at most `after` for the completion
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if nothing arrived in time, otherwise whatever the job produced.
    pub async fn with_timeout(self, after: Duration) -> DispatchResult<T, E> {
        let topic = Arc::clone(&self.topic);
        tokio::time::timeout(after, self).await.unwrap_or_else(|_| {
            Err(DispatchError::TimedOut {
                topic: topic.to_string(),
                after,
            })
        })
    }
}

impl<T, E> Future for Pending<T, E> {
    type Output = DispatchResult<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(DispatchError::WorkerLost {
                    topic: this.topic.to_string(),
                })
            })
        })
    }
}

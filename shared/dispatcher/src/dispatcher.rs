use std::collections::HashSet;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::job::Job;
use crate::journal::{DispatcherStats, Journal};
use crate::topic::Topic;
use crate::worker::Worker;

/// State shared between the dispatcher and every topic handle
pub(crate) struct Shared {
    sender: flume::Sender<Job>,
    receiver: flume::Receiver<Job>,
    pub(crate) journal: Arc<Journal>,
    pub(crate) shutdown_token: CancellationToken,
    pub(crate) runtime: Handle,
    topics: Mutex<HashSet<String>>,
    next_job_id: AtomicU64,
}

impl Shared {
    pub(crate) fn next_job_id(&self) -> u64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Queues `job` without waiting
    ///
    /// A job that lands after shutdown has started is dropped straight away, so its
    /// caller sees a lost worker instead of waiting forever.
    pub(crate) fn enqueue(&self, job: Job) -> Result<(), flume::TrySendError<Job>> {
        self.sender.try_send(job)?;

        if self.shutdown_token.is_cancelled() {
            let dropped = self.drain_lost();
            if dropped > 0 {
                warn!("Dropped {} jobs queued during shutdown", dropped);
            }
        }

        Ok(())
    }

    /// Drops every queued job, counting each as lost
    ///
    /// Dropping an unstarted job drops its completion sender.
    fn drain_lost(&self) -> u64 {
        let mut dropped = 0_u64;
        while let Ok(job) = self.receiver.try_recv() {
            self.journal.record_lost();
            drop(job);
            dropped += 1;
        }
        dropped
    }
}

/// Dispatcher that owns the worker pool and the topic registration table
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Starts the worker pool on the current Tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime
    #[must_use]
    pub fn start(config: DispatcherConfig) -> Self {
        let (sender, receiver) = flume::bounded::<Job>(config.queue_capacity);
        info!(
            "Starting dispatcher with {} workers, queue capacity: {}",
            config.num_workers, config.queue_capacity
        );

        let shared = Arc::new(Shared {
            sender,
            receiver,
            journal: Arc::new(Journal::default()),
            shutdown_token: CancellationToken::new(),
            runtime: Handle::current(),
            topics: Mutex::new(HashSet::new()),
            next_job_id: AtomicU64::new(1),
        });

        let worker_handles = Self::spawn_workers(&config, &shared);

        Self {
            shared,
            worker_handles,
        }
    }

    /// Registers the handler for a topic and returns the handle used to dispatch to it
    ///
    /// A topic keeps its handler for the lifetime of the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTopic` if `name` already has a handler.
    pub fn on<P, T, E, F>(&self, name: &str, handler: F) -> DispatchResult<Topic<P, T, E>, E>
    where
        P: Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(P) -> Result<T, E> + Send + Sync + 'static,
    {
        let inserted = self
            .shared
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());

        if !inserted {
            error!(topic = name, "Refusing second handler registration");
            return Err(DispatchError::DuplicateTopic(name.to_string()));
        }

        info!(topic = name, "Registered topic handler");
        Ok(Topic::new(
            Arc::from(name),
            Arc::new(handler),
            Arc::clone(&self.shared),
        ))
    }

    /// Returns a snapshot of the dispatcher counters
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.shared.journal.snapshot()
    }

    /// Returns a handle for reading counters after the dispatcher itself has moved
    #[must_use]
    pub fn stats_handle(&self) -> StatsHandle {
        StatsHandle(Arc::clone(&self.shared.journal))
    }

    /// Stops the workers and resolves every queued job as lost
    ///
    /// Jobs already running finish first. Dispatching after this returns `Closed`.
    pub async fn shutdown(self) {
        self.shared.shutdown_token.cancel();
        info!("Dispatcher shutdown initiated");

        for handle in self.worker_handles {
            if let Err(e) = handle.await {
                error!("Dispatch worker task error: {}", e);
            }
        }

        let dropped = self.shared.drain_lost();
        if dropped > 0 {
            info!("Dropped {} queued jobs on shutdown", dropped);
        }

        info!("All dispatch workers stopped");
    }

    fn spawn_workers(config: &DispatcherConfig, shared: &Arc<Shared>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(config.num_workers);

        for i in 0..config.num_workers {
            let worker = Worker::new(i, Arc::clone(&shared.journal));
            let rx = shared.receiver.clone();
            let shutdown_token = shared.shutdown_token.clone();

            let handle = shared.runtime.spawn(async move {
                worker.run(rx, shutdown_token).await;
            });

            handles.push(handle);
        }

        handles
    }
}

/// Cloneable read-only view of the dispatcher counters
#[derive(Debug, Clone)]
pub struct StatsHandle(Arc<Journal>);

impl StatsHandle {
    /// Returns a snapshot of the dispatcher counters
    #[must_use]
    pub fn snapshot(&self) -> DispatcherStats {
        self.0.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn setup_test_tracing() {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    }

    fn double(n: u32) -> Result<u32, String> {
        if n == 0 {
            Err("zero is not allowed".to_string())
        } else {
            Ok(n * 2)
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_handler_value() {
        setup_test_tracing();
        let dispatcher = Dispatcher::start(DispatcherConfig::new(2));
        let topic = dispatcher.on("double", double).unwrap();

        let value = topic.dispatch(21).unwrap().await.unwrap();
        assert_eq!(value, 42);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_handler_error_is_delivered_as_handler_failure() {
        setup_test_tracing();
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));
        let topic = dispatcher.on("double", double).unwrap();

        let err = topic.dispatch(0).unwrap().await.unwrap_err();
        assert_eq!(err.handler_error().map(String::as_str), Some("zero is not allowed"));
        assert_eq!(err.to_string(), "zero is not allowed");

        // Counters are final once the workers have stopped
        let stats = dispatcher.stats_handle();
        dispatcher.shutdown().await;
        let stats = stats.snapshot();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[tokio::test]
    async fn test_duplicate_topic_is_rejected() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));
        let _topic = dispatcher.on("double", double).unwrap();

        let err = dispatcher.on("double", double).unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateTopic(name) if name == "double"));

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_handler_loses_only_its_own_job() {
        setup_test_tracing();
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));
        let topic = dispatcher
            .on("fragile", |n: u32| -> Result<u32, String> {
                assert!(n != 13, "unlucky payload");
                Ok(n)
            })
            .unwrap();

        let err = topic.dispatch(13).unwrap().await.unwrap_err();
        assert!(matches!(err, DispatchError::WorkerLost { ref topic } if topic == "fragile"));

        // The same worker keeps serving jobs
        let value = topic.dispatch(7).unwrap().await.unwrap();
        assert_eq!(value, 7);

        let stats = dispatcher.stats_handle();
        dispatcher.shutdown().await;
        let stats = stats.snapshot();
        assert_eq!(stats.lost, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn test_dispatch_and_await_calls_back_exactly_once() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(2));
        let topic = dispatcher.on("double", double).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = tokio::sync::mpsc::unbounded_channel();

        for n in [0_u32, 1, 2, 3] {
            let calls = Arc::clone(&calls);
            let done_tx = done_tx.clone();
            topic.dispatch_and_await(n, move |outcome| {
                calls.fetch_add(1, Ordering::SeqCst);
                done_tx.send((n, outcome.is_ok())).ok();
            });
        }
        drop(done_tx);

        let mut outcomes = Vec::new();
        let mut done_rx = done_rx;
        while let Some(outcome) = done_rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_unstable();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcomes, vec![(0, false), (1, true), (2, true), (3, true)]);

        dispatcher.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_queue_rejects_dispatch() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1).with_queue_capacity(1));

        let (started_tx, started_rx) = flume::unbounded::<()>();
        let (release_tx, release_rx) = flume::unbounded::<()>();
        let topic = dispatcher
            .on("blocking", move |n: u32| -> Result<u32, String> {
                started_tx.send(()).ok();
                release_rx.recv().ok();
                Ok(n)
            })
            .unwrap();

        let first = topic.dispatch(1).unwrap();
        started_rx.recv_async().await.unwrap();

        // The worker is busy, so this one waits in the queue
        let second = topic.dispatch(2).unwrap();

        let err = topic.dispatch(3).unwrap_err();
        assert!(matches!(err, DispatchError::QueueFull { .. }));
        assert_eq!(dispatcher.stats().rejected, 1);

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);

        dispatcher.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pending_times_out() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));

        let (release_tx, release_rx) = flume::unbounded::<()>();
        let topic = dispatcher
            .on("slow", move |n: u32| -> Result<u32, String> {
                release_rx.recv().ok();
                Ok(n)
            })
            .unwrap();

        let err = topic
            .dispatch(1)
            .unwrap()
            .with_timeout(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TimedOut { ref topic, .. } if topic == "slow"));

        release_tx.send(()).unwrap();
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_closed() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));
        let topic = dispatcher.on("double", double).unwrap();

        dispatcher.shutdown().await;

        let err = topic.dispatch(1).unwrap_err();
        assert!(matches!(err, DispatchError::Closed { .. }));
    }

    #[tokio::test]
    async fn test_job_queued_during_shutdown_is_lost_not_stranded() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(1));
        let shared = Arc::clone(&dispatcher.shared);
        let stats = dispatcher.stats_handle();

        dispatcher.shutdown().await;

        // A dispatch that passed its shutdown check just before the workers stopped
        let (completion_tx, completion_rx) = tokio::sync::oneshot::channel::<u32>();
        let job = Job {
            topic: Arc::from("late"),
            id: 99,
            run: Box::new(move || {
                completion_tx.send(1).ok();
                crate::job::JobOutcome::Succeeded
            }),
        };
        assert!(shared.enqueue(job).is_ok());

        assert!(completion_rx.await.is_err());
        assert_eq!(stats.snapshot().lost, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completions_may_arrive_out_of_order() {
        let dispatcher = Dispatcher::start(DispatcherConfig::new(4));
        let topic = dispatcher
            .on("sleepy", |millis: u64| -> Result<u64, String> {
                std::thread::sleep(Duration::from_millis(millis));
                Ok(millis)
            })
            .unwrap();

        let slow = topic.dispatch(200).unwrap();
        let fast = topic.dispatch(10).unwrap();

        let first = tokio::select! {
            r = slow => r.unwrap(),
            r = fast => r.unwrap(),
        };
        assert_eq!(first, 10);

        dispatcher.shutdown().await;
    }
}

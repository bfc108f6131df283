use std::sync::Arc;

/// What a worker learns about a job once it has run
pub(crate) enum JobOutcome {
    Succeeded,
    Failed(String),
}

/// A unit of work waiting for a worker
///
/// `run` owns the payload, the handler and the completion sender, so dropping an
/// unstarted job releases the payload and resolves the caller with a lost worker.
pub(crate) struct Job {
    pub(crate) topic: Arc<str>,
    pub(crate) id: u64,
    pub(crate) run: Box<dyn FnOnce() -> JobOutcome + Send + 'static>,
}

use std::time::Duration;

use thiserror::Error;

/// Result type alias for dispatch operations
pub type DispatchResult<T, E> = Result<T, DispatchError<E>>;

/// Error types for dispatch operations
///
/// `E` is the error type returned by the topic's handler.
#[derive(Error, Debug)]
pub enum DispatchError<E> {
    /// A handler is already registered for this topic
    #[error("Topic '{0}' already has a registered handler")]
    DuplicateTopic(String),

    /// Every worker is busy and the queue is at capacity
    #[error("Dispatch queue for topic '{topic}' is full")]
    QueueFull {
        /// Topic the job was dispatched to
        topic: String,
    },

    /// The dispatcher has been shut down
    #[error("Dispatcher is shut down, cannot run topic '{topic}'")]
    Closed {
        /// Topic the job was dispatched to
        topic: String,
    },

    /// The handler ran and returned an error
    #[error("{0}")]
    Handler(E),

    /// The worker running the job panicked or was torn down before completing it
    #[error("Worker for topic '{topic}' stopped before completing the job")]
    WorkerLost {
        /// Topic the job was dispatched to
        topic: String,
    },

    /// No completion arrived within the allowed time
    #[error("Topic '{topic}' did not complete within {after:?}")]
    TimedOut {
        /// Topic the job was dispatched to
        topic: String,
        /// How long the caller waited
        after: Duration,
    },
}

impl<E> DispatchError<E> {
    /// Returns the handler error, if this failure came from the handler itself
    #[must_use]
    pub const fn handler_error(&self) -> Option<&E> {
        match self {
            Self::Handler(e) => Some(e),
            _ => None,
        }
    }
}

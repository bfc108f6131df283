//! Typed asynchronous dispatcher
//!
//! Handlers are registered once per topic at startup and run on a bounded pool of
//! workers, off the threads that accept and serve connections. Every dispatch is
//! correlated with exactly one completion delivered back to the caller that
//! submitted it.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Worker pool configuration
pub mod config;
/// Dispatcher lifecycle and topic registration
pub mod dispatcher;
/// Error types for dispatch operations
pub mod error;
/// Failure journal and counters
pub mod journal;
/// Typed topic handles and pending completions
pub mod topic;

mod job;
mod worker;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, StatsHandle};
pub use error::{DispatchError, DispatchResult};
pub use journal::DispatcherStats;
pub use topic::{Pending, Topic};

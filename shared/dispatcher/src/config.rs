/// Configuration for the dispatcher worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Number of jobs that may run at the same time
    pub num_workers: usize,
    /// Number of jobs that may wait for a free worker before dispatch is rejected
    pub queue_capacity: usize,
}

impl DispatcherConfig {
    /// Creates a config with the given pool size and a queue of `2 * num_workers`
    ///
    /// A pool size of zero is raised to one.
    #[must_use]
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        Self {
            num_workers,
            queue_capacity: num_workers.saturating_mul(2),
        }
    }

    /// Overrides the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(2),
        )
    }
}

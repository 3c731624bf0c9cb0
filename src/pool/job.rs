use serde::{Deserialize, Serialize};

use crate::Result;

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 10;

/// Pool settings shared by the fetchers.
///
/// A worker count of zero means "not configured" and resolves to
/// [`DEFAULT_WORKERS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    workers: usize,
}

impl PoolConfig {
    /// Creates a config with the given worker count.
    pub fn new(workers: usize) -> Self {
        PoolConfig { workers }
    }

    /// Returns the configured worker count, falling back to the default.
    pub fn workers(&self) -> usize {
        if self.workers == 0 {
            DEFAULT_WORKERS
        } else {
            self.workers
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// A batch of independent inputs bound to the function that processes them.
///
/// A job holds no execution state. It is consumed by a
/// [`PoolExecutor`](super::PoolExecutor), which calls `worker_fn` exactly
/// once for every input, duplicates included.
pub struct Job<I, F> {
    inputs: Vec<I>,
    worker_fn: F,
    workers: usize,
}

impl<I, F> Job<I, F> {
    /// Creates a job using the default pool configuration.
    pub fn new<R>(worker_fn: F, inputs: Vec<I>) -> Self
    where
        F: Fn(&I) -> Result<R>,
    {
        Self::with_config(worker_fn, inputs, &PoolConfig::default())
    }

    /// Creates a job whose worker count comes from `config`.
    pub fn with_config<R>(worker_fn: F, inputs: Vec<I>, config: &PoolConfig) -> Self
    where
        F: Fn(&I) -> Result<R>,
    {
        Job {
            inputs,
            worker_fn,
            workers: config.workers(),
        }
    }

    /// Sets the worker count. Values below 1 are clamped to 1.
    pub fn with_workers(mut self, workers: i64) -> Self {
        self.workers = usize::try_from(workers.max(1)).unwrap_or(usize::MAX);
        self
    }

    /// Returns the requested worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the number of workers an executor will actually start.
    ///
    /// Never more than there are inputs.
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.inputs.len())
    }

    /// Returns the inputs in submission order.
    pub fn inputs(&self) -> &[I] {
        &self.inputs
    }

    /// Returns the number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns true if the job has no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub(super) fn into_inner(self) -> (Vec<I>, F) {
        (self.inputs, self.worker_fn)
    }
}

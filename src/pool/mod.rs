use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::error;

use crate::{FeedError, Result};

/// An executor that runs a [`Job`] over a bounded number of workers.
///
/// Implementors invoke the job's worker function once per input, at most
/// [`Job::effective_workers`] at a time, and block until every input has
/// been processed. A panic inside the worker function is caught and
/// recorded as that item's error; it never aborts the rest of the batch.
pub trait PoolExecutor {
    /// Executes the job and returns the per-item outcome.
    ///
    /// Result and error slots are index-aligned with the job's inputs,
    /// regardless of the order in which items complete.
    fn execute<I, R, F>(&self, job: Job<I, F>) -> Outcome<R>
    where
        I: Sync,
        R: Send + Default,
        F: Fn(&I) -> Result<R> + Sync;
}

/// Executes the job on a [`SharedQueuePool`].
pub fn execute<I, R, F>(job: Job<I, F>) -> Outcome<R>
where
    I: Sync,
    R: Send + Default,
    F: Fn(&I) -> Result<R> + Sync,
{
    SharedQueuePool.execute(job)
}

/// Runs the worker function on a single input, turning a panic into an
/// item-level error.
fn run_item<I, R, F>(worker_fn: &F, input: &I, index: usize) -> Result<R>
where
    F: Fn(&I) -> Result<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| worker_fn(input))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Worker function panicked on item {index}: {message}");
            Err(FeedError::WorkerPanicked { index, message })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

mod job;
mod outcome;
mod rayon_pool;
mod shared_queue;

pub use self::job::{Job, PoolConfig, DEFAULT_WORKERS};
pub use self::outcome::{classify, Outcome};
pub use self::rayon_pool::RayonPool;
pub use self::shared_queue::SharedQueuePool;

use log::{debug, error};
use rayon::prelude::*;

use super::{run_item, Job, Outcome, PoolExecutor};
use crate::Result;

/// A pool backed by the `rayon` library.
///
/// Builds a dedicated rayon pool with one thread per effective worker and
/// lets its work-stealing scheduler distribute the items.
pub struct RayonPool;

impl PoolExecutor for RayonPool {
    fn execute<I, R, F>(&self, job: Job<I, F>) -> Outcome<R>
    where
        I: Sync,
        R: Send + Default,
        F: Fn(&I) -> Result<R> + Sync,
    {
        if job.is_empty() {
            return Outcome::empty();
        }

        let workers = job.effective_workers();
        let (inputs, worker_fn) = job.into_inner();

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|id| format!("rayon-pool-worker-{id}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to build rayon pool with {workers} threads: {e}");
                return Outcome::from_claimed((0..inputs.len()).map(|_| None).collect());
            }
        };

        debug!("Running {} items on {workers} rayon threads", inputs.len());
        let slots: Vec<Result<R>> = pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| run_item(&worker_fn, input, index))
                .collect()
        });

        Outcome::from_slots(slots)
    }
}

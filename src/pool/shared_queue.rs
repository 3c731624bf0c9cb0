use crossbeam::channel;
use crossbeam::thread;
use log::{debug, error};

use super::{run_item, Job, Outcome, PoolExecutor};
use crate::Result;

/// A pool of scoped worker threads sharing one queue of item indices.
///
/// Every index is sent once into an MPMC channel that is closed before the
/// workers start, so each index is claimed by exactly one worker and the
/// workers exit once the queue is drained. Results travel back tagged with
/// their index and are placed by the calling thread.
pub struct SharedQueuePool;

impl PoolExecutor for SharedQueuePool {
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
        let total = inputs.len();

        let (index_tx, index_rx) = channel::bounded::<usize>(total);
        for index in 0..total {
            // The channel has room for every index and its receiver is alive.
            let _ = index_tx.send(index);
        }
        drop(index_tx);

        let (done_tx, done_rx) = channel::unbounded::<(usize, Result<R>)>();
        let inputs = &inputs;
        let worker_fn = &worker_fn;

        debug!("Starting {workers} workers for {total} items");
        let scoped = thread::scope(|scope| {
            for id in 0..workers {
                let index_rx = index_rx.clone();
                let done_tx = done_tx.clone();
                let spawned = scope
                    .builder()
                    .name(format!("pool-worker-{id}"))
                    .spawn(move |_| {
                        while let Ok(index) = index_rx.recv() {
                            debug!("Worker {id} processing item {index}");
                            let result = run_item(worker_fn, &inputs[index], index);
                            if done_tx.send((index, result)).is_err() {
                                return;
                            }
                        }
                        debug!("Worker {id}: queue drained, shutting down");
                    });
                if let Err(e) = spawned {
                    error!("Failed to spawn pool worker {id}: {e}");
                }
            }
        });
        if scoped.is_err() {
            error!("A pool worker panicked outside of its worker function");
        }
        drop(done_tx);

        let mut slots: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
        for (index, result) in done_rx.iter() {
            slots[index] = Some(result);
        }

        Outcome::from_claimed(slots)
    }
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_utils::thread as scoped;
use panic_control::chain_hook_ignoring;

use livefeed::pool::{classify, DEFAULT_WORKERS};
use livefeed::{
    execute, FeedError, Job, Outcome, PoolConfig, PoolExecutor, RayonPool, Result,
    SharedQueuePool,
};

#[derive(Debug)]
struct ExpectedPanic;

fn fetch_name(name: &&str) -> Result<String> {
    if name.starts_with('b') {
        Err(FeedError::MissingField("name"))
    } else {
        Ok(name.to_uppercase())
    }
}

fn partial_failure_keeps_slots<P: PoolExecutor>(pool: P) {
    let job = Job::new(fetch_name, vec!["alice", "bob", "carol"]);
    let (results, errors, summary) = pool.execute(job).into_parts();

    assert_eq!(results, vec!["ALICE".to_owned(), String::new(), "CAROL".to_owned()]);
    assert!(errors[0].is_none());
    assert!(matches!(errors[1], Some(FeedError::MissingField("name"))));
    assert!(errors[2].is_none());
    assert!(matches!(summary, Err(FeedError::PartialContent { failed: 1 })));
}

fn empty_job_never_calls_worker<P: PoolExecutor>(pool: P) {
    let calls = AtomicUsize::new(0);
    let job = Job::new(
        |_: &u32| -> Result<u32> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        },
        Vec::new(),
    );
    let outcome = pool.execute(job);

    assert!(outcome.is_empty());
    assert!(outcome.errors().is_empty());
    assert!(outcome.summary().is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

fn results_stay_in_input_order<P: PoolExecutor>(pool: P) {
    let inputs: Vec<u64> = (0..64).collect();
    // Earlier items sleep longer so they complete last.
    let job = Job::new(
        |n: &u64| -> Result<u64> {
            thread::sleep(Duration::from_millis(64 - n));
            Ok(n * 2)
        },
        inputs.clone(),
    )
    .with_workers(8);
    let outcome = pool.execute(job);

    assert_eq!(outcome.len(), inputs.len());
    assert_eq!(outcome.errors().len(), inputs.len());
    let expected: Vec<u64> = inputs.iter().map(|n| n * 2).collect();
    assert_eq!(outcome.results(), expected.as_slice());
    assert!(outcome.summary().is_ok());
}

fn single_failure_is_no_content<P: PoolExecutor>(pool: P) {
    let always_fails = |_: &&str| -> Result<String> { Err(FeedError::MetadataNotFound) };
    let outcome = pool.execute(Job::new(always_fails, vec!["x"]).with_workers(4));

    assert_eq!(outcome.failed(), 1);
    assert!(matches!(outcome.summary(), Err(FeedError::NoContent)));
    assert_eq!(outcome.results(), &[String::new()]);
}

fn in_flight_is_bounded<P: PoolExecutor>(pool: P, workers: i64, items: usize) -> usize {
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let job = Job::new(
        |_: &usize| -> Result<()> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        },
        (0..items).collect(),
    )
    .with_workers(workers);
    let outcome = pool.execute(job);

    assert!(outcome.summary().is_ok());
    peak.load(Ordering::SeqCst)
}

fn threads_used<P: PoolExecutor>(pool: P, workers: i64, items: usize) -> usize {
    let threads = Mutex::new(HashSet::new());
    let job = Job::new(
        |_: &usize| -> Result<()> {
            threads.lock().unwrap().insert(thread::current().id());
            thread::sleep(Duration::from_millis(10));
            Ok(())
        },
        (0..items).collect(),
    )
    .with_workers(workers);
    assert!(pool.execute(job).summary().is_ok());

    let count = threads.lock().unwrap().len();
    count
}

fn panic_is_isolated<P: PoolExecutor>(pool: P) {
    chain_hook_ignoring::<ExpectedPanic>();
    let job = Job::new(
        |name: &&str| -> Result<usize> {
            if *name == "bob" {
                std::panic::panic_any(ExpectedPanic);
            }
            Ok(name.len())
        },
        vec!["alice", "bob", "carol", "dave"],
    )
    .with_workers(2);
    let (results, errors, summary) = pool.execute(job).into_parts();

    assert_eq!(results, vec![5, 0, 5, 4]);
    assert!(matches!(
        errors[1],
        Some(FeedError::WorkerPanicked { index: 1, .. })
    ));
    assert!(matches!(summary, Err(FeedError::PartialContent { failed: 1 })));
}

#[test]
fn shared_queue_partial_failure() {
    partial_failure_keeps_slots(SharedQueuePool);
}

#[test]
fn rayon_partial_failure() {
    partial_failure_keeps_slots(RayonPool);
}

#[test]
fn shared_queue_empty_job() {
    empty_job_never_calls_worker(SharedQueuePool);
}

#[test]
fn rayon_empty_job() {
    empty_job_never_calls_worker(RayonPool);
}

#[test]
fn shared_queue_input_order() {
    results_stay_in_input_order(SharedQueuePool);
}

#[test]
fn rayon_input_order() {
    results_stay_in_input_order(RayonPool);
}

#[test]
fn shared_queue_single_failure() {
    single_failure_is_no_content(SharedQueuePool);
}

#[test]
fn rayon_single_failure() {
    single_failure_is_no_content(RayonPool);
}

#[test]
fn shared_queue_bounds_workers() {
    assert!(in_flight_is_bounded(SharedQueuePool, 3, 12) <= 3);
    assert_eq!(in_flight_is_bounded(SharedQueuePool, 1, 5), 1);
}

#[test]
fn rayon_bounds_workers() {
    assert!(in_flight_is_bounded(RayonPool, 3, 12) <= 3);
    assert_eq!(in_flight_is_bounded(RayonPool, 1, 5), 1);
}

#[test]
fn shared_queue_threads_capped_by_inputs() {
    let used = threads_used(SharedQueuePool, 100, 3);
    assert!((1..=3).contains(&used));
}

#[test]
fn rayon_threads_capped_by_inputs() {
    let used = threads_used(RayonPool, 100, 3);
    assert!((1..=3).contains(&used));
}

#[test]
fn shared_queue_panic_isolation() {
    panic_is_isolated(SharedQueuePool);
}

#[test]
fn rayon_panic_isolation() {
    panic_is_isolated(RayonPool);
}

#[test]
fn shared_queue_runs_all_workers_at_once() {
    // Every item waits for all the others, so this only finishes if four
    // workers are alive simultaneously.
    let barrier = Barrier::new(4);
    let job = Job::new(
        |n: &u8| -> Result<u8> {
            barrier.wait();
            Ok(*n)
        },
        vec![1, 2, 3, 4],
    )
    .with_workers(4);
    let outcome = SharedQueuePool.execute(job);

    assert_eq!(outcome.results(), &[1, 2, 3, 4]);
}

#[test]
fn panic_message_is_captured() {
    let job = Job::new(
        |n: &i32| -> Result<i32> {
            if *n < 0 {
                panic!("negative input {n}");
            }
            Ok(*n)
        },
        vec![1, -1],
    );
    let outcome = execute(job);

    match &outcome.errors()[1] {
        Some(FeedError::WorkerPanicked { index, message }) => {
            assert_eq!(*index, 1);
            assert_eq!(message, "negative input -1");
        }
        other => panic!("unexpected error slot: {other:?}"),
    }
    assert_eq!(outcome.results(), &[1, 0]);
}

#[test]
fn duplicate_inputs_are_processed_independently() {
    let calls = AtomicUsize::new(0);
    let job = Job::new(
        |name: &&str| -> Result<String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(name.to_string())
        },
        vec!["a", "a", "a"],
    );
    let outcome = execute(job);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.results(), &["a", "a", "a"]);
}

#[test]
fn worker_count_is_clamped() {
    let job = Job::new(fetch_name, vec!["a", "b"]);
    assert_eq!(job.workers(), DEFAULT_WORKERS);
    assert_eq!(job.effective_workers(), 2);

    let job = job.with_workers(0);
    assert_eq!(job.workers(), 1);
    let job = job.with_workers(-7);
    assert_eq!(job.workers(), 1);
    assert_eq!(job.effective_workers(), 1);

    let job = job.with_workers(i64::MAX);
    assert!(job.workers() >= u32::MAX as usize);
    assert_eq!(job.effective_workers(), 2);

    let job = Job::with_config(fetch_name, vec!["a"; 20], &PoolConfig::new(0));
    assert_eq!(job.workers(), DEFAULT_WORKERS);
    let job = Job::with_config(fetch_name, vec!["a"; 20], &PoolConfig::new(3));
    assert_eq!(job.effective_workers(), 3);
}

#[test]
fn summary_classification() {
    assert!(classify(0, 0).is_ok());
    assert!(classify(0, 5).is_ok());
    assert!(matches!(classify(1, 1), Err(FeedError::NoContent)));
    assert!(matches!(classify(5, 5), Err(FeedError::NoContent)));
    assert!(matches!(
        classify(2, 5),
        Err(FeedError::PartialContent { failed: 2 })
    ));

    let err = classify(2, 5).unwrap_err();
    assert!(err.is_partial_content());
    assert!(err.to_string().contains('2'));
    assert!(classify(3, 3).unwrap_err().is_no_content());
}

#[test]
fn unclaimed_slots_are_worker_unavailable() {
    let outcome = Outcome::from_claimed(vec![
        Some(Ok(7u32)),
        None,
        Some(Err(FeedError::MetadataNotFound)),
        None,
    ]);

    assert_eq!(outcome.results(), &[7, 0, 0, 0]);
    assert!(outcome.errors()[0].is_none());
    assert!(matches!(outcome.errors()[1], Some(FeedError::WorkerUnavailable(1))));
    assert!(matches!(outcome.errors()[2], Some(FeedError::MetadataNotFound)));
    assert!(matches!(outcome.errors()[3], Some(FeedError::WorkerUnavailable(3))));
    assert!(matches!(outcome.summary(), Err(FeedError::PartialContent { failed: 3 })));

    let outcome: Outcome<u32> = Outcome::from_claimed(vec![None, None]);
    assert!(matches!(outcome.summary(), Err(FeedError::NoContent)));
}

#[test]
fn successes_keep_input_order() {
    let outcome = execute(Job::new(fetch_name, vec!["alice", "bob", "carol", "ben"]));
    let labels = ["alice", "bob", "carol", "ben"];
    let (successes, summary) = outcome.into_successes(&labels, "test");

    assert_eq!(successes, vec!["ALICE".to_owned(), "CAROL".to_owned()]);
    assert!(matches!(summary, Err(FeedError::PartialContent { failed: 2 })));
}

#[test]
fn concurrent_executions_do_not_interfere() {
    scoped::scope(|s| {
        let handles: Vec<_> = (0..4u64)
            .map(|offset| {
                s.spawn(move |_| {
                    let inputs: Vec<u64> = (0..50).map(|n| n + offset * 100).collect();
                    let job = Job::new(|n: &u64| -> Result<u64> { Ok(*n) }, inputs.clone());
                    let outcome = execute(job.with_workers(5));
                    assert_eq!(outcome.results(), inputs.as_slice());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    })
    .unwrap();
}

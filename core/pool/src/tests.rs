use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use authsync_context::Context;

use super::error::PoolSaturated;
use super::error::PoolStopped;
use super::PoolConf;
use super::StopOutcome;
use super::Task;
use super::WorkerPool;

/// Pool configuration for tests.
fn conf(workers: usize, queue_capacity: usize) -> PoolConf {
    PoolConf {
        queue_capacity,
        stop_grace_sec: 5,
        submit_timeout_ms: 5000,
        task_timeout_sec: 5,
        workers,
    }
}

/// Task that increments a counter when it runs.
fn count(context: &Context, counter: &Arc<AtomicUsize>) -> Task {
    let counter = counter.clone();
    Task::new(context, "count", async move {
        counter.fetch_add(1, Ordering::AcqRel);
        Ok(())
    })
}

/// Task that never completes.
fn hang(context: &Context) -> Task {
    Task::new(context, "hang", async move {
        futures::future::pending::<()>().await;
        Ok(())
    })
}

/// Tracks how many tasks run at the same time and the highest value seen.
#[derive(Clone, Default)]
struct Concurrency {
    current: Arc<AtomicUsize>,
    done: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Concurrency {
    fn task(&self, context: &Context, sleep: Duration) -> Task {
        let tracker = self.clone();
        Task::new(context, "concurrency", async move {
            let now = tracker.current.fetch_add(1, Ordering::AcqRel) + 1;
            tracker.peak.fetch_max(now, Ordering::AcqRel);
            tokio::time::sleep(sleep).await;
            tracker.current.fetch_sub(1, Ordering::AcqRel);
            tracker.done.fetch_add(1, Ordering::AcqRel);
            Ok(())
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_bounded_by_workers() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(3, 4));
    let tracker = Concurrency::default();
    for _ in 0..30 {
        let task = tracker.task(&context, Duration::from_millis(10));
        pool.submit(&context, task).await.unwrap();
    }

    let outcome = pool.stop(&context).await;
    assert_eq!(outcome, StopOutcome::Drained);
    assert_eq!(tracker.done.load(Ordering::Acquire), 30);
    let peak = tracker.peak.load(Ordering::Acquire);
    assert!(peak >= 1);
    assert!(peak <= 3, "observed {} concurrent tasks with 3 workers", peak);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_worker_runs_one_task_at_a_time() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(1, 16));
    let tracker = Concurrency::default();
    for _ in 0..8 {
        let task = tracker.task(&context, Duration::from_millis(5));
        pool.submit(&context, task).await.unwrap();
    }
    pool.stop(&context).await;
    assert_eq!(tracker.done.load(Ordering::Acquire), 8);
    assert_eq!(tracker.peak.load(Ordering::Acquire), 1);
}

#[tokio::test]
async fn stop_drains_queued_tasks() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(2, 32));
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..20 {
        pool.submit(&context, count(&context, &counter)).await.unwrap();
    }

    let outcome = pool.stop(&context).await;
    assert_eq!(outcome, StopOutcome::Drained);
    assert_eq!(counter.load(Ordering::Acquire), 20);
    let stats = pool.stats();
    assert_eq!(stats.completed, 20);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.active, 0);
}

#[tokio::test]
async fn stop_abandons_tasks_after_grace() {
    let context = Context::fixture();
    let mut conf = conf(1, 4);
    conf.stop_grace_sec = 0;
    let pool = WorkerPool::start(&context, conf);
    pool.submit(&context, hang(&context)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.stats().active, 1);

    let start = Instant::now();
    let outcome = pool.stop(&context).await;
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(
        outcome,
        StopOutcome::Abandoned {
            active: 1,
            queued: 0
        }
    );

    // Aborted workers release their active slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_with_blocked_submitter_counts_only_queued_tasks() {
    let context = Context::fixture();
    let mut conf = conf(1, 1);
    conf.stop_grace_sec = 0;
    let pool = WorkerPool::start(&context, conf);
    pool.submit(&context, hang(&context)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.stats().active, 1);
    pool.submit(&context, hang(&context)).await.unwrap();

    // The queue is full so this submission waits for a slot.
    let blocked = {
        let pool = pool.clone();
        let context = context.clone();
        tokio::spawn(async move { pool.submit(&context, hang(&context)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.stats().queued, 1);

    let outcome = pool.stop(&context).await;
    assert_eq!(
        outcome,
        StopOutcome::Abandoned {
            active: 1,
            queued: 1
        }
    );

    let error = blocked.await.unwrap().unwrap_err();
    assert!(error.is::<PoolStopped>());
    let stats = pool.stats();
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.active, 0);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(2, 4));
    assert_eq!(pool.stop(&context).await, StopOutcome::Drained);
    assert_eq!(pool.stop(&context).await, StopOutcome::AlreadyStopped);
}

#[tokio::test]
async fn submit_after_stop_fails() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(2, 4));
    pool.stop(&context).await;

    let counter = Arc::new(AtomicUsize::new(0));
    let error = pool
        .submit(&context, count(&context, &counter))
        .await
        .unwrap_err();
    assert!(error.is::<PoolStopped>());
    assert_eq!(pool.stats().queued, 0);
}

#[tokio::test]
async fn submit_does_not_wait_for_hanging_tasks() {
    let context = Context::fixture();
    let mut conf = conf(1, 1);
    conf.stop_grace_sec = 0;
    let pool = WorkerPool::start(&context, conf);

    // The first task occupies the only worker, the second fills the queue.
    let start = Instant::now();
    pool.submit(&context, hang(&context)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    pool.submit(&context, hang(&context)).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));

    // With the pool saturated the submission gives up at the caller deadline.
    let bounded = context
        .derive()
        .timeout(Duration::from_millis(100))
        .build();
    let start = Instant::now();
    let error = pool.submit(&bounded, hang(&context)).await.unwrap_err();
    let elapsed = start.elapsed();
    assert!(error.is::<PoolSaturated>());
    assert!(elapsed >= Duration::from_millis(90));
    assert!(elapsed < Duration::from_secs(2));

    let stats = pool.stats();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.queued, 1);
    pool.stop(&context).await;
}

#[tokio::test]
async fn submit_uses_pool_timeout_without_deadline() {
    let context = Context::fixture();
    let mut conf = conf(1, 1);
    conf.stop_grace_sec = 0;
    conf.submit_timeout_ms = 50;
    let pool = WorkerPool::start(&context, conf);
    pool.submit(&context, hang(&context)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    pool.submit(&context, hang(&context)).await.unwrap();

    let start = Instant::now();
    let error = pool.submit(&context, hang(&context)).await.unwrap_err();
    assert!(error.is::<PoolSaturated>());
    assert!(start.elapsed() < Duration::from_secs(2));
    pool.stop(&context).await;
}

#[tokio::test]
async fn failed_task_does_not_stop_worker() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(1, 4));
    let failing = Task::new(&context, "fail", async move {
        Err(anyhow::anyhow!("test error"))
    });
    let counter = Arc::new(AtomicUsize::new(0));
    pool.submit(&context, failing).await.unwrap();
    pool.submit(&context, count(&context, &counter)).await.unwrap();

    assert_eq!(pool.stop(&context).await, StopOutcome::Drained);
    assert_eq!(counter.load(Ordering::Acquire), 1);
    assert_eq!(pool.stats().completed, 2);
}

#[tokio::test]
async fn panicking_task_does_not_stop_worker() {
    let context = Context::fixture();
    let pool = WorkerPool::start(&context, conf(1, 4));
    let panics = Task::new(&context, "panic", async move {
        if true {
            panic!("test panic isolation");
        }
        Ok(())
    });
    let counter = Arc::new(AtomicUsize::new(0));
    pool.submit(&context, panics).await.unwrap();
    pool.submit(&context, count(&context, &counter)).await.unwrap();

    assert_eq!(pool.stop(&context).await, StopOutcome::Drained);
    assert_eq!(counter.load(Ordering::Acquire), 1);
    assert_eq!(pool.stats().completed, 2);
}

#[tokio::test]
async fn slow_task_times_out() {
    let context = Context::fixture();
    let mut conf = conf(1, 4);
    conf.task_timeout_sec = 1;
    let pool = WorkerPool::start(&context, conf);
    let counter = Arc::new(AtomicUsize::new(0));
    pool.submit(&context, hang(&context)).await.unwrap();
    pool.submit(&context, count(&context, &counter)).await.unwrap();

    // The hanging task is cut off by the task timeout so stop can drain the pool.
    assert_eq!(pool.stop(&context).await, StopOutcome::Drained);
    assert_eq!(counter.load(Ordering::Acquire), 1);
    assert_eq!(pool.stats().completed, 2);
}

//! Timing tests for per-tier throttled queues.

use cascade_rate_limit::{BackendTier, ThrottledQueue};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn start_gaps_never_fall_below_interval() {
    let tier = BackendTier::new("gemini-2.5-flash", 60, 0);
    let queue = Arc::new(ThrottledQueue::for_tier(&tier, 1.1));
    assert_eq!(queue.min_interval(), Duration::from_millis(1_100));

    let starts = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for _ in 0..5 {
        let queue = Arc::clone(&queue);
        let starts = Arc::clone(&starts);
        handles.push(tokio::spawn(async move {
            queue
                .submit(async move {
                    starts.lock().unwrap().push(Instant::now());
                    tokio::time::sleep(Duration::from_millis(200)).await;
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 5);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(1_100));
    }
}

#[tokio::test(start_paused = true)]
async fn tasks_run_in_submission_order() {
    let queue = Arc::new(ThrottledQueue::new("t", Duration::from_millis(50)));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..4 {
        let queue = Arc::clone(&queue);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            queue.submit(async move { order.lock().unwrap().push(i) }).await;
        }));
        // Let each task reach the queue before spawning the next.
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn busy_queue_reports_not_ready() {
    let queue = Arc::new(ThrottledQueue::new("t", Duration::from_secs(60)));
    queue.submit(async {}).await;

    let waiting = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.submit(async {}).await })
    };
    tokio::task::yield_now().await;

    assert!(!queue.is_ready());
    assert_eq!(queue.pending(), 1);

    waiting.await.unwrap();
    assert_eq!(queue.dispatched(), 2);
}

#[tokio::test(start_paused = true)]
async fn dispatched_counts_the_running_task() {
    let queue = Arc::new(ThrottledQueue::new("t", Duration::from_millis(10)));
    queue.submit(async {}).await;
    queue.submit(async {}).await;

    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let running = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue
                .submit(async move {
                    let _ = started_tx.send(());
                    tokio::time::sleep(Duration::from_secs(5)).await;
                })
                .await
        })
    };
    started_rx.await.unwrap();

    assert_eq!(queue.dispatched(), 3);
    assert_eq!(queue.pending(), 1);

    running.await.unwrap();
    assert_eq!(queue.dispatched(), 3);
    assert_eq!(queue.pending(), 0);
}

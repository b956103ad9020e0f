//! Per-identity serialized execution.
//!
//! Every identity owns a lane: a chain of completion signals where each
//! submitted task waits for the one submitted before it. Lanes of different
//! identities never wait on each other. A lane slot is taken synchronously
//! when [`IdentityWorkerPool::run`] is called, not when the returned future
//! is first polled, so submission order is call order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Default)]
struct Lane {
    /// Completion signal of the most recently submitted task
    tail: Option<oneshot::Receiver<()>>,
    /// Submitted tasks that have not finished yet
    pending: usize,
}

/// Serializes tasks per identity id.
#[derive(Clone, Default)]
pub struct IdentityWorkerPool {
    lanes: Arc<Mutex<HashMap<String, Lane>>>,
}

impl IdentityWorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` on the lane of `identity_id`.
    ///
    /// The task starts once every task previously queued for the same
    /// identity has finished, failed, or been dropped.
    pub fn run<F, T>(&self, identity_id: &str, task: F) -> impl Future<Output = T>
    where
        F: Future<Output = T>,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = {
            let mut lanes = self.lanes.lock();
            let lane = lanes.entry(identity_id.to_string()).or_default();
            lane.pending += 1;
            lane.tail.replace(done_rx)
        };
        let guard = LaneGuard {
            lanes: Arc::clone(&self.lanes),
            identity_id: identity_id.to_string(),
            done: Some(done_tx),
        };

        async move {
            let _guard = guard;
            if let Some(previous) = previous {
                // Err means the previous task was dropped; the lane moves on.
                let _ = previous.await;
            }
            task.await
        }
    }

    /// Number of identities with queued or running tasks.
    pub fn active_lanes(&self) -> usize {
        self.lanes.lock().len()
    }

    /// Queued or running tasks for one identity.
    pub fn pending(&self, identity_id: &str) -> usize {
        self.lanes.lock().get(identity_id).map_or(0, |lane| lane.pending)
    }
}

/// Releases the lane slot when a task finishes or its future is dropped.
struct LaneGuard {
    lanes: Arc<Mutex<HashMap<String, Lane>>>,
    identity_id: String,
    done: Option<oneshot::Sender<()>>,
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        let mut lanes = self.lanes.lock();
        if let Some(lane) = lanes.get_mut(&self.identity_id) {
            lane.pending = lane.pending.saturating_sub(1);
            if lane.pending == 0 {
                lanes.remove(&self.identity_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_identity_runs_in_submission_order() {
        let pool = IdentityWorkerPool::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut futures = Vec::new();
        for i in 0..5u64 {
            let log = Arc::clone(&log);
            // later submissions sleep less, so any overlap would reorder them
            futures.push(pool.run("bot-main", async move {
                tokio::time::sleep(Duration::from_millis(25 - i * 5)).await;
                log.lock().push(i);
            }));
        }
        futures::future::join_all(futures).await;

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(pool.active_lanes(), 0);
    }

    #[tokio::test]
    async fn test_distinct_identities_run_concurrently() {
        let pool = IdentityWorkerPool::new();
        let (tx, rx) = oneshot::channel::<()>();

        // identity a waits for a signal only identity b can send
        let a = pool.run("a", async move {
            rx.await.is_ok()
        });
        let b = pool.run("b", async move {
            let _ = tx.send(());
        });

        let (a_ok, _) = tokio::time::timeout(Duration::from_secs(2), async { tokio::join!(a, b) })
            .await
            .expect("identities must not block each other");
        assert!(a_ok);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_lane() {
        let pool = IdentityWorkerPool::new();
        let first = pool.run("id", async { Err::<u32, String>("boom".into()) });
        let second = pool.run("id", async { Ok::<u32, String>(7) });

        let (r1, r2) = tokio::join!(first, second);
        assert!(r1.is_err());
        assert_eq!(r2, Ok(7));
    }

    #[tokio::test]
    async fn test_dropped_task_releases_lane() {
        let pool = IdentityWorkerPool::new();
        let abandoned = pool.run("id", async { 1 });
        let next = pool.run("id", async { 2 });
        assert_eq!(pool.pending("id"), 2);

        drop(abandoned);
        assert_eq!(next.await, 2);
        assert_eq!(pool.pending("id"), 0);
        assert_eq!(pool.active_lanes(), 0);
    }

    #[test]
    fn test_slot_taken_at_call_time() {
        let pool = IdentityWorkerPool::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = Arc::clone(&log);
        let l2 = Arc::clone(&log);
        let first = pool.run("id", async move { l1.lock().push("first") });
        let second = pool.run("id", async move { l2.lock().push("second") });

        // poll the later submission first; it still waits for the earlier one
        tokio_test::block_on(async {
            tokio::join!(second, first);
        });
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }
}

use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::FutureExt;
use log::*;
use thiserror::Error;
use tokio::{sync::Semaphore, time::Instant};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),
    #[error("The job panicked: {0}")]
    Panicked(String),
}

/// What became of a submitted unit of work. Delivered exactly once to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(JobError),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("The job pool is shutting down and no longer accepts work")]
    ShuttingDown,
}

/// A fixed-capacity runner for asynchronous units of work.
///
/// At most `capacity` units execute concurrently; excess submissions wait in FIFO order for a slot. A unit that
/// fails or panics reports through its completion callback and leaves the pool and its siblings untouched.
pub struct JobPool {
    name: String,
    capacity: usize,
    slots: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
}

impl JobPool {
    pub fn new<S: Into<String>>(name: S, capacity: usize) -> Self {
        assert!(capacity > 0, "a job pool needs at least one slot");
        Self {
            name: name.into(),
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submits `work` for execution, invoking `on_complete` exactly once when it resolves.
    ///
    /// Returns as soon as a slot is available; while the pool is saturated the caller waits here, which is the only
    /// backpressure the pool applies. Once the work is running, nothing the work does can fail this call.
    pub async fn spawn<W, C>(&self, work: W, on_complete: C) -> Result<(), PoolError>
    where
        W: Future<Output = Result<(), JobError>> + Send + 'static,
        C: FnOnce(JobOutcome) + Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            on_complete(JobOutcome::Cancelled);
            return Err(PoolError::ShuttingDown);
        }
        let permit = match Arc::clone(&self.slots).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore only closes at shutdown.
            Err(_) => {
                on_complete(JobOutcome::Cancelled);
                return Err(PoolError::ShuttingDown);
            },
        };
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = Arc::clone(&self.in_flight);
        let pool_name = self.name.clone();
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(())) => JobOutcome::Success,
                Ok(Err(e)) => JobOutcome::Failed(e),
                Err(panic) => {
                    let summary = panic_summary(panic);
                    error!("🛠️ [{pool_name}] a unit of work panicked: {summary}");
                    JobOutcome::Failed(JobError::Panicked(summary))
                },
            };
            on_complete(outcome);
            drop(permit);
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
        Ok(())
    }

    /// Stops accepting new work, then waits for in-flight units to finish or the grace period to lapse.
    ///
    /// Units still running when the grace period expires are not cancelled: an unacknowledged remote call must not
    /// be abandoned, and stale-state recovery will pick up anything that dies with the process.
    pub async fn shutdown(&self, grace: Duration) {
        self.accepting.store(false, Ordering::Release);
        self.slots.close();
        info!("🛠️ [{}] job pool shutting down; waiting up to {grace:?} for in-flight work", self.name);
        let deadline = Instant::now() + grace;
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                warn!(
                    "🛠️ [{}] shutdown grace period expired with {} unit(s) still running",
                    self.name,
                    self.in_flight.load(Ordering::SeqCst)
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        info!("🛠️ [{}] job pool drained", self.name);
    }
}

fn panic_summary(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use tokio::sync::watch;

    use super::*;

    fn record_into(sink: &Arc<Mutex<Vec<JobOutcome>>>) -> impl FnOnce(JobOutcome) + Send + 'static {
        let sink = Arc::clone(sink);
        move |outcome| sink.lock().unwrap().push(outcome)
    }

    #[tokio::test]
    async fn concurrency_ceiling_is_respected() {
        let _ = env_logger::try_init();
        const CAPACITY: usize = 3;
        const SUBMITTED: usize = 10;

        let pool = Arc::new(JobPool::new("test", CAPACITY));
        let (release_tx, release_rx) = watch::channel(false);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        for _ in 0..SUBMITTED {
            let pool = Arc::clone(&pool);
            let mut release = release_rx.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let completed = Arc::clone(&completed);
            tokio::spawn(async move {
                let done = Arc::clone(&completed);
                pool.spawn(
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        while !*release.borrow() {
                            release.changed().await.expect("release channel closed");
                        }
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    },
                    move |_| {
                        done.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .await
                .expect("spawn failed");
            });
        }

        // Let the pool fill up before opening the gate.
        for _ in 0..100 {
            if pool.in_flight() == CAPACITY {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pool.in_flight(), CAPACITY);
        release_tx.send(true).unwrap();

        for _ in 0..200 {
            if completed.load(Ordering::SeqCst) == SUBMITTED {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(completed.load(Ordering::SeqCst), SUBMITTED);
        assert_eq!(peak.load(Ordering::SeqCst), CAPACITY);
    }

    #[tokio::test]
    async fn failures_and_panics_reach_the_callback_without_poisoning_the_pool() {
        let _ = env_logger::try_init();
        let pool = JobPool::new("test", 2);
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        pool.spawn(async { Err(JobError::Failed("card store offline".to_string())) }, record_into(&outcomes))
            .await
            .unwrap();
        pool.spawn(async { panic!("boom") }, record_into(&outcomes)).await.unwrap();
        pool.spawn(async { Ok(()) }, record_into(&outcomes)).await.unwrap();

        for _ in 0..100 {
            if outcomes.lock().unwrap().len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.contains(&JobOutcome::Failed(JobError::Failed("card store offline".to_string()))));
        assert!(outcomes.iter().any(|o| matches!(o, JobOutcome::Failed(JobError::Panicked(msg)) if msg == "boom")));
        assert!(outcomes.contains(&JobOutcome::Success));
    }

    #[tokio::test]
    async fn shutdown_drains_and_rejects_new_work() {
        let _ = env_logger::try_init();
        let pool = JobPool::new("test", 2);
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        pool.spawn(
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            },
            record_into(&outcomes),
        )
        .await
        .unwrap();

        pool.shutdown(Duration::from_secs(1)).await;
        assert_eq!(pool.in_flight(), 0);

        let result = pool.spawn(async { Ok(()) }, record_into(&outcomes)).await;
        assert_eq!(result, Err(PoolError::ShuttingDown));

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(*outcomes, vec![JobOutcome::Success, JobOutcome::Cancelled]);
    }
}

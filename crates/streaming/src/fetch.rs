//! Asynchronous asset fetching.
//!
//! [`AssetFetcher`] is the seam to whatever transport serves tile assets.
//! [`FetchPool`] runs a fixed set of worker tasks that pull jobs from a shared
//! channel and post every outcome to a completion channel. The engine state
//! itself never leaves the caller's task: completions are drained and applied
//! there, one at a time.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AssetLoadError;
use crate::request::LoadJob;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Loads one tile asset.
///
/// Implementations own any format fallback and caching-header handling; the
/// engine only sees success or failure. Methods return boxed futures for
/// dyn-compatibility.
pub trait AssetFetcher: Send + Sync + 'static {
    /// Opaque handle handed to the renderer.
    type Asset: Clone + Send + 'static;

    fn fetch(&self, job: &LoadJob) -> BoxFuture<'_, Result<Self::Asset, AssetLoadError>>;
}

/// Outcome of one dispatched job.
#[derive(Debug, Clone)]
pub struct FetchCompletion<A> {
    pub job: LoadJob,
    pub result: Result<A, AssetLoadError>,
}

/// Bounded worker pool over an [`AssetFetcher`].
///
/// Workers never touch the cache or queue, so the pool can be sized to the
/// queue's in-flight cap without any locking around engine state. A fetch
/// that panics completes as failed and its worker keeps running. Dropping the
/// pool aborts every worker, cancelling fetches still in progress.
pub struct FetchPool<A> {
    jobs: mpsc::UnboundedSender<LoadJob>,
    completions: mpsc::UnboundedReceiver<FetchCompletion<A>>,
    workers: Vec<JoinHandle<()>>,
}

impl<A: Send + 'static> FetchPool<A> {
    /// Spawns `workers` tasks (at least one) on the current tokio runtime.
    pub fn spawn<F>(fetcher: Arc<F>, workers: usize) -> Self
    where
        F: AssetFetcher<Asset = A>,
    {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<LoadJob>();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..workers.max(1))
            .map(|worker| {
                let fetcher = Arc::clone(&fetcher);
                let job_rx = Arc::clone(&job_rx);
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while waiting for the next job.
                        let job = { job_rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        let result = AssertUnwindSafe(async { fetcher.fetch(&job).await })
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| {
                                let reason = panic_message(panic.as_ref());
                                warn!(worker, key = %job.cache_key, %reason, "fetch panicked");
                                Err(AssetLoadError::new(format!("fetch panicked: {reason}")))
                            });
                        debug!(worker, key = %job.cache_key, ok = result.is_ok(), "fetch finished");
                        if done_tx.send(FetchCompletion { job, result }).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            jobs: job_tx,
            completions: done_rx,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Hands a dispatched job to the workers.
    ///
    /// If the workers are gone the job completes immediately as failed, so
    /// its cache entry never stays pending.
    pub fn submit(&self, job: LoadJob) -> Option<FetchCompletion<A>> {
        match self.jobs.send(job) {
            Ok(()) => None,
            Err(mpsc::error::SendError(job)) => Some(FetchCompletion {
                job,
                result: Err(AssetLoadError::new("fetch workers stopped")),
            }),
        }
    }

    /// A completion that is already available, without waiting.
    pub fn try_completion(&mut self) -> Option<FetchCompletion<A>> {
        self.completions.try_recv().ok()
    }

    /// Waits for the next completion. `None` once every worker has exited.
    pub async fn next_completion(&mut self) -> Option<FetchCompletion<A>> {
        self.completions.recv().await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<A> Drop for FetchPool<A> {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetFetcher, BoxFuture, FetchPool};
    use crate::error::AssetLoadError;
    use crate::request::LoadJob;
    use layers::LayerId;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the asset key back, failing keys that start with `X`.
    #[derive(Default)]
    struct EchoFetcher {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl AssetFetcher for EchoFetcher {
        type Asset = String;

        fn fetch(&self, job: &LoadJob) -> BoxFuture<'_, Result<String, AssetLoadError>> {
            let key = job.asset_key.clone();
            Box::pin(async move {
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.running.fetch_sub(1, Ordering::SeqCst);
                if key.starts_with('X') {
                    Err(AssetLoadError::new(format!("{key} not found")))
                } else {
                    Ok(key)
                }
            })
        }
    }

    fn job(asset: &str) -> LoadJob {
        LoadJob::new(LayerId::new("c1"), asset)
    }

    #[tokio::test]
    async fn every_submitted_job_completes_once() {
        let mut pool = FetchPool::spawn(Arc::new(EchoFetcher::default()), 3);
        assert_eq!(pool.worker_count(), 3);
        for asset in ["A1", "A2", "X3", "B1"] {
            assert!(pool.submit(job(asset)).is_none());
        }

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let done = pool.next_completion().await.unwrap();
            match done.job.asset_key.as_str() {
                "X3" => assert!(done.result.is_err()),
                key => assert_eq!(done.result.as_deref(), Ok(key)),
            }
            assert!(seen.insert(done.job.asset_key));
        }
        assert!(pool.try_completion().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded_by_worker_count() {
        let fetcher = Arc::new(EchoFetcher::default());
        let mut pool = FetchPool::spawn(Arc::clone(&fetcher), 2);
        for i in 0..10 {
            pool.submit(job(&format!("A{i}")));
        }
        for _ in 0..10 {
            pool.next_completion().await.unwrap();
        }
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    }

    /// Panics on keys that start with `P`.
    struct PanickyFetcher;

    impl AssetFetcher for PanickyFetcher {
        type Asset = String;

        fn fetch(&self, job: &LoadJob) -> BoxFuture<'_, Result<String, AssetLoadError>> {
            let key = job.asset_key.clone();
            Box::pin(async move {
                if key.starts_with('P') {
                    panic!("decoder blew up on {key}");
                }
                Ok(key)
            })
        }
    }

    #[tokio::test]
    async fn panicking_fetch_fails_and_worker_survives() {
        let mut pool = FetchPool::spawn(Arc::new(PanickyFetcher), 1);
        pool.submit(job("P1"));
        pool.submit(job("A2"));

        let first = pool.next_completion().await.unwrap();
        assert_eq!(first.job.asset_key, "P1");
        let err = first.result.unwrap_err();
        assert!(err.to_string().contains("decoder blew up on P1"), "{err}");

        let second = pool.next_completion().await.unwrap();
        assert_eq!(second.result.as_deref(), Ok("A2"));
    }
}

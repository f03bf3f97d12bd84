//! Bounded blocking executor for Steam API requests

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::{FutureExt, Shared};
use tokio::runtime::{self, Handle, Runtime};
use tokio::sync::{oneshot, Semaphore};

use super::error::SteamApiError;

/// Runs blocking tasks on tokio's blocking threads, at most `size` at a time.
///
/// Uses the ambient runtime when constructed inside one, otherwise starts a
/// small runtime of its own.
pub struct WorkerPool {
    name: String,
    size: usize,
    permits: Arc<Semaphore>,
    runtime: Option<Handle>,
    owned_runtime: Option<Runtime>,
}

impl WorkerPool {
    pub fn new(name: &str, size: usize) -> Self {
        let (runtime, owned_runtime) = match Handle::try_current() {
            Ok(handle) => (Some(handle), None),
            Err(_) => match runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(size.max(1))
                .thread_name(name)
                .enable_all()
                .build()
            {
                Ok(rt) => (Some(rt.handle().clone()), Some(rt)),
                Err(e) => {
                    tracing::error!("Failed to start {} runtime: {}", name, e);
                    (None, None)
                }
            },
        };

        Self {
            name: name.to_string(),
            size,
            permits: Arc::new(Semaphore::new(size)),
            runtime,
            owned_runtime,
        }
    }

    pub fn worker_count(&self) -> usize {
        if self.runtime.is_some() {
            self.size
        } else {
            0
        }
    }

    /// Queue `task` and return a handle to its result immediately.
    ///
    /// The task runs even if the handle is dropped. A panicking task is
    /// reported as `SteamApiError::WorkerUnavailable`.
    pub fn submit<T, F>(&self, task: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SteamApiError> + Send + 'static,
    {
        let Some(runtime) = self.runtime.as_ref().filter(|_| self.size > 0) else {
            return Pending::ready(Err(SteamApiError::WorkerUnavailable));
        };

        let (tx, rx) = oneshot::channel();
        let permits = Arc::clone(&self.permits);
        let name = self.name.clone();

        runtime.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => tokio::task::spawn_blocking(task)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!("{} task failed: {}", name, e);
                        Err(SteamApiError::WorkerUnavailable)
                    }),
                Err(_) => Err(SteamApiError::WorkerUnavailable),
            };
            // Receiver may have been dropped; the result is simply discarded
            let _ = tx.send(result);
        });

        Pending {
            inner: PendingInner::Waiting(rx),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.permits.close();
        if let Some(rt) = self.owned_runtime.take() {
            rt.shutdown_background();
        }
    }
}

/// Result of a queued request. Await it, `wait()` on it, or `shared()` it.
pub struct Pending<T> {
    inner: PendingInner<T>,
}

enum PendingInner<T> {
    Ready(Option<Result<T, SteamApiError>>),
    Waiting(oneshot::Receiver<Result<T, SteamApiError>>),
}

// Never pinned structurally; the value is only moved out once ready
impl<T> Unpin for Pending<T> {}

impl<T> Pending<T> {
    pub fn ready(value: Result<T, SteamApiError>) -> Self {
        Self {
            inner: PendingInner::Ready(Some(value)),
        }
    }

    /// Block the current thread until the result is available.
    ///
    /// Panics if called from within an async runtime; `.await` there instead.
    pub fn wait(self) -> Result<T, SteamApiError> {
        match self.inner {
            PendingInner::Ready(value) => value.unwrap_or(Err(SteamApiError::EmptyState)),
            PendingInner::Waiting(rx) => rx
                .blocking_recv()
                .unwrap_or(Err(SteamApiError::WorkerUnavailable)),
        }
    }
}

impl<T: Clone> Pending<T> {
    /// Cloneable handle for several observers of the same result
    pub fn shared(self) -> Shared<Self> {
        FutureExt::shared(self)
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, SteamApiError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Ready(value) => {
                Poll::Ready(value.take().unwrap_or(Err(SteamApiError::EmptyState)))
            }
            PendingInner::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.unwrap_or(Err(SteamApiError::WorkerUnavailable))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_submit_and_wait() {
        let pool = WorkerPool::new("test-pool", 2);
        assert_eq!(pool.worker_count(), 2);

        let pending = pool.submit(|| Ok(21 * 2));
        assert_eq!(pending.wait(), Ok(42));
    }

    #[test]
    fn test_errors_propagate() {
        let pool = WorkerPool::new("test-pool", 2);
        let pending: Pending<()> = pool.submit(|| Err(SteamApiError::GameNotOwned));
        assert_eq!(pending.wait(), Err(SteamApiError::GameNotOwned));
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panicking_task_keeps_pool_alive() {
        let pool = WorkerPool::new("test-pool", 1);
        let pending: Pending<()> = pool.submit(|| panic!("boom"));
        assert_eq!(pending.wait(), Err(SteamApiError::WorkerUnavailable));

        assert_eq!(pool.submit(|| Ok("still here")).wait(), Ok("still here"));
    }

    #[test]
    fn test_at_most_size_tasks_run_at_once() {
        let pool = WorkerPool::new("test-pool", 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pending: Vec<Pending<()>> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for p in pending {
            assert_eq!(p.wait(), Ok(()));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_dropped_handle_still_runs() {
        let pool = WorkerPool::new("test-pool", 2);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        drop(pool.submit(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_pool_rejects_work() {
        let pool = WorkerPool::new("test-pool", 0);
        assert_eq!(pool.worker_count(), 0);
        assert_eq!(
            pool.submit(|| Ok(1)).wait(),
            Err(SteamApiError::WorkerUnavailable)
        );
    }

    #[tokio::test]
    async fn test_shared_handle() {
        let pool = WorkerPool::new("test-pool", 2);
        let shared = pool.submit(|| Ok(String::from("avatar"))).shared();
        let other = shared.clone();

        assert_eq!(shared.await, Ok("avatar".to_string()));
        assert_eq!(other.await, Ok("avatar".to_string()));
        assert_eq!(
            Pending::<u8>::ready(Err(SteamApiError::EmptyState)).await,
            Err(SteamApiError::EmptyState)
        );
    }
}

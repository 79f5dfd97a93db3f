//! Fixed-size worker pool with semaphore admission control.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{MatchError, MatchResult};

/// A dedicated runtime whose blocking pool executes comparison units, gated
/// by a semaphore holding one permit per thread.
///
/// A unit keeps its permit until it returns, so at most `capacity` units run
/// at once and a producer waiting in [`WorkerPool::acquire`] is throttled to
/// the pool's speed.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> MatchResult<Self> {
        if threads == 0 {
            return Err(MatchError::Config("worker pool needs at least one thread".into()));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("smatch-worker")
            .enable_time()
            .build()?;
        tracing::debug!(threads, "started worker pool");
        Ok(Self {
            runtime: Some(runtime),
            permits: Arc::new(Semaphore::new(threads)),
            capacity: threads,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not held by running units; equals `capacity` when idle
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn handle(&self) -> MatchResult<&Handle> {
        self.runtime
            .as_ref()
            .map(Runtime::handle)
            .ok_or_else(|| MatchError::Worker("worker pool is shut down".into()))
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> MatchResult<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| MatchError::Worker("worker pool semaphore closed".into()))
    }

    /// Run `work` on a pool thread; the permit is released when it returns
    /// or unwinds.
    pub fn dispatch<F>(&self, permit: OwnedSemaphorePermit, work: F) -> MatchResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle()?.spawn_blocking(move || {
            let _permit = permit;
            work();
        });
        Ok(())
    }

    /// Wait until every dispatched unit has returned its permit
    pub async fn drain(&self) -> MatchResult<()> {
        let all = self
            .permits
            .acquire_many(self.capacity as u32)
            .await
            .map_err(|_| MatchError::Worker("worker pool semaphore closed".into()))?;
        drop(all);
        Ok(())
    }

    /// Spawn an async task on the pool's runtime
    pub fn spawn<F>(&self, future: F) -> MatchResult<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        Ok(self.handle()?.spawn(future))
    }

    /// Drive `future` to completion on the calling thread.
    ///
    /// Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> MatchResult<F::Output> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| MatchError::Worker("worker pool is shut down".into()))?;
        Ok(runtime.block_on(future))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // non-blocking, so the pool may be dropped from async code
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{MatchError, MatchResult};
use crate::mapping::Mapping;
use crate::matcher::{NodeMatcher, NodeRef};
use crate::store::{RelationStore, StoreFactory};
use crate::task::MatchTask;
use crate::tree::{NodeId, Tree};
use crate::types::{MatchConfig, MatchEvent};

use super::pool::WorkerPool;
use super::{Run, TreeMatcher};

/// Single-assignment slot for the first fatal error of a run
#[derive(Default)]
struct FailureSlot {
    failed: AtomicBool,
    error: Mutex<Option<MatchError>>,
}

impl FailureSlot {
    fn record(&self, err: MatchError) {
        if self
            .failed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            *self.error.lock() = Some(err);
        } else {
            tracing::debug!(error = %err, "discarding secondary matching failure");
        }
    }

    fn is_set(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<MatchError> {
        self.error.lock().take()
    }
}

/// One node comparison dispatched to the pool
struct WorkUnit {
    matcher: Arc<dyn NodeMatcher>,
    source: Arc<Tree>,
    target: Arc<Tree>,
    store: Arc<dyn RelationStore>,
    task: Arc<MatchTask>,
    failure: Arc<FailureSlot>,
    row: usize,
    col: usize,
    s: NodeId,
    t: NodeId,
}

impl WorkUnit {
    fn execute(self) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.matcher.match_nodes(
                NodeRef::new(&self.source, self.s),
                NodeRef::new(&self.target, self.t),
            )
        }));
        match outcome {
            Ok(Ok(relation)) => {
                // cells are disjoint per unit, so no two units write the same slot
                self.store.set(self.row, self.col, relation);
                self.task.record_completion();
            }
            Ok(Err(e)) => self.failure.record(MatchError::matching(self.row, self.col, e)),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "node matcher panicked".into());
                self.failure.record(MatchError::matching(
                    self.row,
                    self.col,
                    MatchError::Worker(message),
                ));
            }
        }
    }
}

/// Bounded-concurrency orchestrator.
///
/// A single producer walks the pair space and takes a pool permit before
/// dispatching each pair, so it can never run ahead of the workers. A
/// failure or cancellation stops production; units already dispatched
/// finish, the pool is drained, and only then is the first captured error
/// returned. Runs on the same orchestrator are serialized.
pub struct ConcurrentTreeMatcher {
    node_matcher: Arc<dyn NodeMatcher>,
    store_factory: Arc<dyn StoreFactory>,
    config: MatchConfig,
    pool: WorkerPool,
    run_lock: tokio::sync::Mutex<()>,
}

impl ConcurrentTreeMatcher {
    pub fn new(node_matcher: Arc<dyn NodeMatcher>, config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.thread_count())?;
        Ok(Self {
            node_matcher,
            store_factory: config.store.factory(config.dense_cell_limit),
            config,
            pool,
            run_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_store_factory(mut self, store_factory: Arc<dyn StoreFactory>) -> Self {
        self.store_factory = store_factory;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Async match, usable from any runtime
    pub async fn run(
        &self,
        source: Tree,
        target: Tree,
        task: Arc<MatchTask>,
    ) -> MatchResult<Mapping> {
        let _lane = self.run_lock.lock().await;
        let run = Run::prepare(
            source,
            target,
            self.store_factory.as_ref(),
            &task,
            &self.config,
        )?;
        tracing::debug!(run_id = %task.id(), threads = self.pool.capacity(), "dispatching to worker pool");

        let failure = Arc::new(FailureSlot::default());
        let mut dispatch_error = None;

        'produce: for (row, &s) in run.source_order.iter().enumerate() {
            for (col, &t) in run.target_order.iter().enumerate() {
                let permit = match self.pool.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        dispatch_error = Some(e);
                        break 'produce;
                    }
                };
                if failure.is_set() || task.is_cancelled() {
                    break 'produce;
                }
                let unit = WorkUnit {
                    matcher: self.node_matcher.clone(),
                    source: run.source.clone(),
                    target: run.target.clone(),
                    store: run.store.clone(),
                    task: task.clone(),
                    failure: failure.clone(),
                    row,
                    col,
                    s,
                    t,
                };
                if let Err(e) = self.pool.dispatch(permit, move || unit.execute()) {
                    dispatch_error = Some(e);
                    break 'produce;
                }
            }
        }

        self.pool.drain().await?;

        if let Some(err) = failure.take().or(dispatch_error) {
            run.fail(&task, &err);
            return Err(err);
        }
        Ok(run.finish(&task))
    }

    /// Start a run in the background, returning a handle for cancellation,
    /// progress and the final result.
    pub fn spawn(self: &Arc<Self>, source: Tree, target: Tree) -> MatchResult<MatchHandle> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = Arc::new(MatchTask::new().with_events(event_tx));
        let matcher = Arc::clone(self);
        let run_task = task.clone();
        let join = self
            .pool
            .spawn(async move { matcher.run(source, target, run_task).await })?;
        Ok(MatchHandle {
            task,
            events: event_rx,
            join,
        })
    }
}

impl TreeMatcher for ConcurrentTreeMatcher {
    /// Must not be called from inside an async context; use
    /// [`ConcurrentTreeMatcher::run`] there.
    fn tree_match_with(
        &self,
        source: Tree,
        target: Tree,
        task: Arc<MatchTask>,
    ) -> MatchResult<Mapping> {
        self.pool.block_on(self.run(source, target, task))?
    }
}

/// Handle to a background matching run
pub struct MatchHandle {
    task: Arc<MatchTask>,
    events: mpsc::UnboundedReceiver<MatchEvent>,
    join: JoinHandle<MatchResult<Mapping>>,
}

impl MatchHandle {
    /// Stop dispatching new pairs; running comparisons still finish
    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn task(&self) -> &Arc<MatchTask> {
        &self.task
    }

    /// Last reported progress percentage
    pub fn progress(&self) -> u8 {
        self.task.percent()
    }

    /// Next run event, `None` once the run has ended and all events were read
    pub async fn next_event(&mut self) -> Option<MatchEvent> {
        self.events.recv().await
    }

    pub async fn join(self) -> MatchResult<Mapping> {
        self.join
            .await
            .map_err(|e| MatchError::Worker(format!("matching task failed: {e}")))?
    }
}

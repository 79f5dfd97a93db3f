//! Matching orchestrators that drive a [`NodeMatcher`] over every
//! (source node, target node) pair and collect the results into a
//! [`Mapping`].
//!
//! | Orchestrator | Execution |
//! |--------------|-----------|
//! | [`SequentialTreeMatcher`] | caller's thread, fails fast on the first error |
//! | [`ConcurrentTreeMatcher`] | bounded worker pool with semaphore backpressure, drains before reporting |
//!
//! [`NodeMatcher`]: crate::matcher::NodeMatcher

pub mod concurrent;
pub mod pool;
pub mod sequential;

pub use concurrent::{ConcurrentTreeMatcher, MatchHandle};
pub use pool::WorkerPool;
pub use sequential::SequentialTreeMatcher;

use std::sync::Arc;
use std::time::Instant;

use crate::error::{MatchError, MatchResult};
use crate::mapping::Mapping;
use crate::store::{RelationStore, StoreFactory};
use crate::task::MatchTask;
use crate::tree::{NodeId, Tree};
use crate::types::{MatchConfig, MatchEvent};

/// Computes the relation mapping between two trees
pub trait TreeMatcher: Send + Sync {
    /// Blocking match. Fails with the first node comparison error.
    fn tree_match(&self, source: Tree, target: Tree) -> MatchResult<Mapping> {
        self.tree_match_with(source, target, Arc::new(MatchTask::new()))
    }

    /// Blocking match observed and cancellable through `task`
    fn tree_match_with(
        &self,
        source: Tree,
        target: Tree,
        task: Arc<MatchTask>,
    ) -> MatchResult<Mapping>;
}

/// Per-run state shared by both orchestrators
pub(crate) struct Run {
    pub source: Arc<Tree>,
    pub target: Arc<Tree>,
    pub store: Arc<dyn RelationStore>,
    pub source_order: Vec<NodeId>,
    pub target_order: Vec<NodeId>,
    started: Instant,
}

impl Run {
    /// Index both trees and size a fresh store to them
    pub fn prepare(
        mut source: Tree,
        mut target: Tree,
        factory: &dyn StoreFactory,
        task: &MatchTask,
        config: &MatchConfig,
    ) -> MatchResult<Self> {
        let rows = source.assign_indices();
        let cols = target.assign_indices();
        let store = factory.create(rows, cols)?;
        tracing::debug!(run_id = %task.id(), kind = %store.kind(), rows, cols, "created relation store");

        let total = (rows as u64) * (cols as u64);
        task.begin(total, config);
        tracing::info!(
            run_id = %task.id(),
            rows,
            cols,
            total,
            "starting tree match"
        );

        let source_order = source.traversal();
        let target_order = target.traversal();
        Ok(Self {
            source: Arc::new(source),
            target: Arc::new(target),
            store,
            source_order,
            target_order,
            started: Instant::now(),
        })
    }

    pub fn finish(self, task: &MatchTask) -> Mapping {
        let completed = task.completed();
        let total = task.total();
        let mapping = Mapping::new(
            task.id().to_string(),
            self.source,
            self.target,
            self.store,
            completed,
        );
        if mapping.is_complete() {
            tracing::info!(
                run_id = %task.id(),
                entries = mapping.len(),
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "tree match finished"
            );
            task.emit(MatchEvent::Finished {
                entries: mapping.len(),
                total,
            });
        } else {
            tracing::warn!(
                run_id = %task.id(),
                completed,
                total,
                "tree match cancelled, mapping is incomplete"
            );
            task.emit(MatchEvent::Cancelled { completed, total });
        }
        mapping
    }

    pub fn fail(&self, task: &MatchTask, err: &MatchError) {
        tracing::error!(run_id = %task.id(), error = %err, "tree match failed");
        task.emit(MatchEvent::Failed {
            message: err.to_string(),
        });
    }
}

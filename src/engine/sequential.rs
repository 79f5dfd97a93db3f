use std::sync::Arc;

use crate::error::{MatchError, MatchResult};
use crate::mapping::Mapping;
use crate::matcher::{NodeMatcher, NodeRef};
use crate::store::StoreFactory;
use crate::task::MatchTask;
use crate::tree::Tree;
use crate::types::MatchConfig;

use super::{Run, TreeMatcher};

/// Compares every pair on the calling thread, in source then target
/// traversal order.
pub struct SequentialTreeMatcher {
    node_matcher: Arc<dyn NodeMatcher>,
    store_factory: Arc<dyn StoreFactory>,
    config: MatchConfig,
}

impl SequentialTreeMatcher {
    pub fn new(node_matcher: Arc<dyn NodeMatcher>, config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self {
            node_matcher,
            store_factory: config.store.factory(config.dense_cell_limit),
            config,
        })
    }

    pub fn with_store_factory(mut self, store_factory: Arc<dyn StoreFactory>) -> Self {
        self.store_factory = store_factory;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }
}

impl TreeMatcher for SequentialTreeMatcher {
    fn tree_match_with(
        &self,
        source: Tree,
        target: Tree,
        task: Arc<MatchTask>,
    ) -> MatchResult<Mapping> {
        let run = Run::prepare(
            source,
            target,
            self.store_factory.as_ref(),
            &task,
            &self.config,
        )?;

        'produce: for (row, &s) in run.source_order.iter().enumerate() {
            for (col, &t) in run.target_order.iter().enumerate() {
                if task.is_cancelled() {
                    break 'produce;
                }
                let outcome = self
                    .node_matcher
                    .match_nodes(NodeRef::new(&run.source, s), NodeRef::new(&run.target, t));
                match outcome {
                    Ok(relation) => {
                        run.store.set(row, col, relation);
                        task.record_completion();
                    }
                    Err(e) => {
                        let err = MatchError::matching(row, col, e);
                        run.fail(&task, &err);
                        return Err(err);
                    }
                }
            }
        }

        Ok(run.finish(&task))
    }
}

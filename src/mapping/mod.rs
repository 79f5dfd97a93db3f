//! The result of one matching run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};
use crate::store::RelationStore;
use crate::tree::{NodeId, Tree};
use crate::types::Relation;

/// One non-`Unknown` relation between a source and a target node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
}

/// Immutable relation mapping between two trees.
///
/// Entries are ordered by source then target traversal order, which is the
/// order a sequential run creates them in.
pub struct Mapping {
    run_id: String,
    source: Arc<Tree>,
    target: Arc<Tree>,
    store: Arc<dyn RelationStore>,
    entries: Vec<MappingEntry>,
    completed_pairs: u64,
    total_pairs: u64,
}

impl Mapping {
    pub(crate) fn new(
        run_id: String,
        source: Arc<Tree>,
        target: Arc<Tree>,
        store: Arc<dyn RelationStore>,
        completed_pairs: u64,
    ) -> Self {
        let total_pairs = (source.len() as u64) * (target.len() as u64);
        let entries = store
            .entries()
            .into_iter()
            .filter_map(|(row, col, relation)| {
                Some(MappingEntry {
                    source: source.node_at(row)?,
                    target: target.node_at(col)?,
                    relation,
                })
            })
            .collect();
        Self {
            run_id,
            source,
            target,
            store,
            entries,
            completed_pairs,
            total_pairs,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn source(&self) -> &Arc<Tree> {
        &self.source
    }

    pub fn target(&self) -> &Arc<Tree> {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Relation between two nodes, `Unknown` when no entry exists
    pub fn relation(&self, source: NodeId, target: NodeId) -> Relation {
        match (self.source.index_of(source), self.target.index_of(target)) {
            (Some(row), Some(col)) => self.store.get(row, col),
            _ => Relation::Unknown,
        }
    }

    pub fn completed_pairs(&self) -> u64 {
        self.completed_pairs
    }

    pub fn total_pairs(&self) -> u64 {
        self.total_pairs
    }

    /// False when the run was cancelled before every pair was compared
    pub fn is_complete(&self) -> bool {
        self.completed_pairs == self.total_pairs
    }

    pub fn require_complete(self) -> MatchResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(MatchError::Interrupted {
                completed: self.completed_pairs,
                total: self.total_pairs,
            })
        }
    }

    /// `(source path, relation, target path)` triples, for reports and logs
    pub fn describe(&self) -> Vec<(String, Relation, String)> {
        self.entries
            .iter()
            .map(|e| (self.source.path(e.source), e.relation, self.target.path(e.target)))
            .collect()
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("run_id", &self.run_id)
            .field("entries", &self.entries.len())
            .field("completed_pairs", &self.completed_pairs)
            .field("total_pairs", &self.total_pairs)
            .finish()
    }
}

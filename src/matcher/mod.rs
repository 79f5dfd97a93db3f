//! Node matchers that classify one (source node, target node) pair.
//!
//! A [`NodeMatcher`] must be a pure function of the two nodes plus shared
//! read-only collaborators. Per-call scratch state (lemma caches and the
//! like) lives in locals or thread-locals, never in ordering-sensitive
//! shared state, which is what lets the concurrent orchestrator run pairs in
//! any order.

pub mod sense;

pub use sense::SenseNodeMatcher;

use crate::error::MatchResult;
use crate::tree::{AtomicConcept, Node, NodeId, Tree};
use crate::types::Relation;

/// Borrowed view of one node together with the tree that owns it
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(tree: &'a Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn node(&self) -> Option<&'a Node> {
        self.tree.node(self.id)
    }

    pub fn name(&self) -> &'a str {
        self.node().map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn index(&self) -> Option<usize> {
        self.tree.index_of(self.id)
    }

    pub fn concepts(&self) -> &'a [AtomicConcept] {
        self.node().map(Node::concepts).unwrap_or(&[])
    }

    /// Concepts of every node from the root down to this one
    pub fn path_concepts(&self) -> Vec<&'a AtomicConcept> {
        self.tree
            .ancestry(self.id)
            .into_iter()
            .filter_map(|id| self.tree.node(id))
            .flat_map(|node| node.concepts().iter())
            .collect()
    }

    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }
}

/// Classifies the semantic relation between two nodes
pub trait NodeMatcher: Send + Sync {
    fn match_nodes(&self, source: NodeRef<'_>, target: NodeRef<'_>) -> MatchResult<Relation>;
}

/// Adapts a closure into a [`NodeMatcher`]
pub struct FnMatcher<F> {
    f: F,
}

impl<F> FnMatcher<F>
where
    F: Fn(NodeRef<'_>, NodeRef<'_>) -> MatchResult<Relation> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> NodeMatcher for FnMatcher<F>
where
    F: Fn(NodeRef<'_>, NodeRef<'_>) -> MatchResult<Relation> + Send + Sync,
{
    fn match_nodes(&self, source: NodeRef<'_>, target: NodeRef<'_>) -> MatchResult<Relation> {
        (self.f)(source, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    #[test]
    fn node_ref_accessors() {
        let mut tree = Tree::new("Course");
        let arts = tree.add_child(tree.root(), "Arts").unwrap();
        tree.annotate(tree.root(), vec![AtomicConcept::new("course")])
            .unwrap();
        tree.annotate(arts, vec![AtomicConcept::new("arts")]).unwrap();
        tree.assign_indices();

        let node = NodeRef::new(&tree, arts);
        assert_eq!(node.name(), "Arts");
        assert_eq!(node.index(), Some(1));
        assert_eq!(node.path(), "Course/Arts");
        let tokens: Vec<&str> = node
            .path_concepts()
            .iter()
            .map(|c| c.token.as_str())
            .collect();
        assert_eq!(tokens, vec!["course", "arts"]);
    }

    #[test]
    fn fn_matcher_delegates() {
        let source = Tree::new("a");
        let target = Tree::new("A");
        let matcher = FnMatcher::new(|s: NodeRef<'_>, t: NodeRef<'_>| {
            if s.name().eq_ignore_ascii_case(t.name()) {
                Ok(Relation::Equivalence)
            } else {
                Err(MatchError::Oracle("no sense".into()))
            }
        });
        let relation = matcher
            .match_nodes(
                NodeRef::new(&source, source.root()),
                NodeRef::new(&target, target.root()),
            )
            .unwrap();
        assert_eq!(relation, Relation::Equivalence);
    }
}

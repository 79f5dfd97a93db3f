//! Arena-backed label trees.
//!
//! All nodes of a [`Tree`] live in one contiguous `Vec` and refer to each
//! other through [`NodeId`]s. A node's parent is fixed when the node is
//! created by [`Tree::add_child`], so parent links can never form a cycle.
//!
//! Matching assigns every node a dense pre-order index exactly once
//! ([`Tree::assign_indices`]); the relation stores are addressed by those
//! indices.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};

/// Position of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Atomic concept of label: one token of a node label with its candidate senses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicConcept {
    pub token: String,
    #[serde(default)]
    pub senses: Vec<String>,
}

impl AtomicConcept {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            senses: Vec::new(),
        }
    }

    pub fn with_sense(mut self, sense: impl Into<String>) -> Self {
        self.senses.push(sense.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    index: Option<usize>,
    concepts: Vec<AtomicConcept>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            index: None,
            concepts: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Dense matching index, `None` until [`Tree::assign_indices`] runs
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn concepts(&self) -> &[AtomicConcept] {
        &self.concepts
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A rooted label tree
#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Pre-order node sequence, filled by `assign_indices`
    order: Vec<NodeId>,
}

impl Tree {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_name.into(), None)],
            order: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Create a node under `parent`. This is the only way to attach nodes.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> MatchResult<NodeId> {
        if self.is_indexed() {
            return Err(MatchError::Tree(
                "cannot add nodes after indices were assigned".into(),
            ));
        }
        if parent.as_usize() >= self.nodes.len() {
            return Err(MatchError::UnknownNode(parent.as_usize()));
        }
        let raw = u32::try_from(self.nodes.len())
            .map_err(|_| MatchError::Tree("node arena is full".into()))?;
        let id = NodeId(raw);
        self.nodes.push(Node::new(name.into(), Some(parent)));
        self.nodes[parent.as_usize()].children.push(id);
        Ok(id)
    }

    /// Attach atomic concepts of label to a node
    pub fn annotate(&mut self, id: NodeId, concepts: Vec<AtomicConcept>) -> MatchResult<()> {
        let node = self
            .nodes
            .get_mut(id.as_usize())
            .ok_or(MatchError::UnknownNode(id.as_usize()))?;
        node.concepts = concepts;
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Pre-order traversal from the root
    pub fn traversal(&self) -> Vec<NodeId> {
        if !self.order.is_empty() {
            return self.order.clone();
        }
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Ancestors of `id` from the root down to and including `id`
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.node(node_id).is_none() {
                break;
            }
            chain.push(node_id);
            current = self.parent(node_id);
        }
        chain.reverse();
        chain
    }

    /// Root-to-node label path joined by `/`
    pub fn path(&self, id: NodeId) -> String {
        self.ancestry(id)
            .into_iter()
            .filter_map(|n| self.node(n).map(|node| node.name.as_str()))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Assign dense pre-order indices. Runs once; later calls are no-ops.
    pub fn assign_indices(&mut self) -> usize {
        if self.is_indexed() {
            return self.order.len();
        }
        let order = self.traversal();
        for (index, id) in order.iter().enumerate() {
            self.nodes[id.as_usize()].index = Some(index);
        }
        self.order = order;
        self.order.len()
    }

    pub fn is_indexed(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node(id).and_then(Node::index)
    }

    /// Node holding dense index `index`
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.order.get(index).copied()
    }
}

//! # smatch-core
//!
//! Semantic matching engine for hierarchical label trees. Computes the
//! relation (equivalence, more/less general, disjoint, unknown) between every
//! pair of nodes drawn from two trees, for ontology and schema alignment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smatch_core::engine::{ConcurrentTreeMatcher, TreeMatcher};
//! use smatch_core::matcher::SenseNodeMatcher;
//! use smatch_core::oracle::StaticOracle;
//! use smatch_core::solver::{DpllSolver, SatDecisionCache};
//! use smatch_core::tree::{AtomicConcept, Tree};
//! use smatch_core::MatchConfig;
//!
//! let mut source = Tree::new("Courses");
//! source
//!     .annotate(source.root(), vec![AtomicConcept::new("course").with_sense("course#1")])
//!     .unwrap();
//!
//! let mut target = Tree::new("Course");
//! target
//!     .annotate(target.root(), vec![AtomicConcept::new("course").with_sense("course#1")])
//!     .unwrap();
//!
//! // The decision cache outlives any single run and can be shared
//! let cache = Arc::new(SatDecisionCache::new(Arc::new(DpllSolver::new())));
//! let node_matcher = Arc::new(SenseNodeMatcher::new(Arc::new(StaticOracle::new()), cache));
//!
//! let engine = ConcurrentTreeMatcher::new(node_matcher, MatchConfig::default()).unwrap();
//! let mapping = engine.tree_match(source, target).unwrap();
//! for (source_path, relation, target_path) in mapping.describe() {
//!     println!("{source_path} {relation} {target_path}");
//! }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Core types: `Relation`, `MatchConfig`, `MatchEvent` |
//! | [`tree`] | Arena-backed label trees with cycle-free parent links and dense indices |
//! | [`store`] | Relation mapping stores: dense (atomic cells) and sparse (per-row locked) |
//! | [`solver`] | `SatSolver` trait, memoizing `SatDecisionCache`, reference DPLL solver |
//! | [`oracle`] | `SenseOracle` trait for lexical relations between word senses |
//! | [`matcher`] | `NodeMatcher` trait and the concept-based `SenseNodeMatcher` |
//! | [`engine`] | Sequential and bounded-concurrency orchestrators, worker pool, async handle |
//! | [`mapping`] | Immutable result of a matching run |
//! | [`task`] | Cooperative cancellation and progress reporting |
//! | [`error`] | Error types with thiserror: Oracle, Solver, Matching, Interrupted, etc. |
//!
//! ## Concurrency
//!
//! The concurrent orchestrator walks the source × target pair space with a
//! single producer. Each pair needs a semaphore permit before it is
//! dispatched to the worker pool, which bounds the work in flight to the
//! number of pool threads. The first failure is captured, production stops,
//! outstanding units are drained, and only then is the error returned, so a
//! failed run never leaks permits into the next one.

pub mod engine;
pub mod error;
pub mod mapping;
pub mod matcher;
pub mod oracle;
pub mod solver;
pub mod store;
pub mod task;
pub mod tree;
pub mod types;

pub use error::{MatchError, MatchResult};
pub use types::*;

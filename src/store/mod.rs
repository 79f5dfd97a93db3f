//! Relation mapping stores: (source index, target index) → [`Relation`].
//!
//! Provides a [`RelationStore`] trait with two strategies: [`DenseStore`]
//! (one atomic slot per cell) and [`SparseStore`] (per-row sorted index
//! arrays behind a per-row lock). Both accept concurrent writes to distinct
//! cells, so the strategy choice only trades memory for lookup speed.
//! Orchestrators obtain stores through a [`StoreFactory`], never directly.

pub mod dense;
pub mod sparse;

pub use dense::DenseStore;
pub use sparse::SparseStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MatchResult;
use crate::types::Relation;

/// A `rows × cols` matrix of relations where every untouched cell is `Unknown`.
///
/// Indices are not bounds-checked against the logical dimensions; callers
/// guarantee `row < rows` and `col < cols`.
pub trait RelationStore: Send + Sync {
    fn dimensions(&self) -> (usize, usize);

    fn get(&self, row: usize, col: usize) -> Relation;

    /// Store `value`, returning whether the cell actually changed.
    ///
    /// Writing `Unknown` clears the cell.
    fn set(&self, row: usize, col: usize, value: Relation) -> bool;

    /// Non-`Unknown` cells in row-major order
    fn entries(&self) -> Vec<(usize, usize, Relation)>;

    /// Number of non-`Unknown` cells
    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> StoreKind;
}

/// Storage strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Dense,
    Sparse,
    /// Dense up to a cell limit, sparse above it
    #[default]
    Auto,
}

impl StoreKind {
    pub fn factory(self, dense_cell_limit: usize) -> Arc<dyn StoreFactory> {
        match self {
            StoreKind::Dense => Arc::new(DenseStoreFactory),
            StoreKind::Sparse => Arc::new(SparseStoreFactory),
            StoreKind::Auto => Arc::new(AutoStoreFactory::new(dense_cell_limit)),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Dense => write!(f, "dense"),
            StoreKind::Sparse => write!(f, "sparse"),
            StoreKind::Auto => write!(f, "auto"),
        }
    }
}

/// Creates empty stores sized for one matching run
pub trait StoreFactory: Send + Sync {
    fn create(&self, rows: usize, cols: usize) -> MatchResult<Arc<dyn RelationStore>>;
}

pub struct DenseStoreFactory;

impl StoreFactory for DenseStoreFactory {
    fn create(&self, rows: usize, cols: usize) -> MatchResult<Arc<dyn RelationStore>> {
        Ok(Arc::new(DenseStore::new(rows, cols)?))
    }
}

pub struct SparseStoreFactory;

impl StoreFactory for SparseStoreFactory {
    fn create(&self, rows: usize, cols: usize) -> MatchResult<Arc<dyn RelationStore>> {
        Ok(Arc::new(SparseStore::new(rows, cols)?))
    }
}

pub struct AutoStoreFactory {
    dense_cell_limit: usize,
}

impl AutoStoreFactory {
    pub fn new(dense_cell_limit: usize) -> Self {
        Self { dense_cell_limit }
    }

    pub fn choose(&self, rows: usize, cols: usize) -> StoreKind {
        match rows.checked_mul(cols) {
            Some(cells) if cells <= self.dense_cell_limit => StoreKind::Dense,
            _ => StoreKind::Sparse,
        }
    }
}

impl StoreFactory for AutoStoreFactory {
    fn create(&self, rows: usize, cols: usize) -> MatchResult<Arc<dyn RelationStore>> {
        match self.choose(rows, cols) {
            StoreKind::Dense => DenseStoreFactory.create(rows, cols),
            _ => SparseStoreFactory.create(rows, cols),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factories() -> Vec<Arc<dyn StoreFactory>> {
        vec![
            StoreKind::Dense.factory(0),
            StoreKind::Sparse.factory(0),
            StoreKind::Auto.factory(100),
        ]
    }

    #[test]
    fn fresh_store_is_unknown_everywhere() {
        for factory in factories() {
            let store = factory.create(3, 4).unwrap();
            assert_eq!(store.dimensions(), (3, 4));
            for row in 0..3 {
                for col in 0..4 {
                    assert_eq!(store.get(row, col), Relation::Unknown);
                }
            }
            assert!(store.is_empty());
        }
    }

    #[test]
    fn unknown_on_absent_cell_is_noop() {
        for factory in factories() {
            let store = factory.create(2, 2).unwrap();
            assert!(!store.set(1, 1, Relation::Unknown));
            assert_eq!(store.get(1, 1), Relation::Unknown);
        }
    }

    #[test]
    fn set_then_clear() {
        for factory in factories() {
            let store = factory.create(2, 2).unwrap();
            assert!(store.set(0, 1, Relation::Equivalence));
            assert!(store.set(0, 1, Relation::Unknown));
            assert_eq!(store.get(0, 1), Relation::Unknown);
            assert!(store.is_empty());
        }
    }

    #[test]
    fn same_value_twice_reports_no_change() {
        for factory in factories() {
            let store = factory.create(2, 2).unwrap();
            assert!(store.set(1, 0, Relation::Disjoint));
            assert!(!store.set(1, 0, Relation::Disjoint));
            assert!(store.set(1, 0, Relation::LessGeneral));
            assert_eq!(store.get(1, 0), Relation::LessGeneral);
        }
    }

    #[test]
    fn three_by_three_scenario() {
        for factory in factories() {
            let store = factory.create(3, 3).unwrap();
            store.set(1, 1, Relation::MoreGeneral);
            store.set(1, 2, Relation::Disjoint);
            store.set(0, 0, Relation::Equivalence);
            assert_eq!(store.get(1, 1), Relation::MoreGeneral);
            assert_eq!(store.get(2, 2), Relation::Unknown);
            assert_eq!(
                store.entries(),
                vec![
                    (0, 0, Relation::Equivalence),
                    (1, 1, Relation::MoreGeneral),
                    (1, 2, Relation::Disjoint),
                ]
            );
            assert_eq!(store.len(), 3);
        }
    }

    #[test]
    fn auto_factory_switches_on_cell_limit() {
        let factory = AutoStoreFactory::new(100);
        assert_eq!(factory.choose(10, 10), StoreKind::Dense);
        assert_eq!(factory.choose(10, 11), StoreKind::Sparse);
        assert_eq!(factory.choose(usize::MAX, 2), StoreKind::Sparse);
        assert_eq!(factory.create(10, 11).unwrap().kind(), StoreKind::Sparse);
        assert_eq!(factory.create(5, 5).unwrap().kind(), StoreKind::Dense);
    }

    #[test]
    fn store_kind_serde() {
        let kind: StoreKind = serde_json::from_str("\"dense\"").unwrap();
        assert_eq!(kind, StoreKind::Dense);
        assert_eq!(StoreKind::Sparse.to_string(), "sparse");
    }
}

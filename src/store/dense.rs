//! Dense relation store: one atomic byte per cell.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{MatchError, MatchResult};
use crate::types::Relation;

use super::{RelationStore, StoreKind};

/// Row-major grid of `rows * cols` cells.
///
/// Every cell is an independent atomic slot, so concurrent writers touching
/// different cells never contend and need no lock.
pub struct DenseStore {
    rows: usize,
    cols: usize,
    cells: Vec<AtomicU8>,
}

impl DenseStore {
    pub fn new(rows: usize, cols: usize) -> MatchResult<Self> {
        let size = rows.checked_mul(cols).ok_or_else(|| {
            MatchError::Config(format!("dense store of {rows}x{cols} cells overflows"))
        })?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(size).map_err(|e| {
            MatchError::Config(format!("dense store of {rows}x{cols} cells cannot be allocated: {e}"))
        })?;
        cells.resize_with(size, || AtomicU8::new(Relation::Unknown.code()));
        Ok(Self { rows, cols, cells })
    }

    fn slot(&self, row: usize, col: usize) -> &AtomicU8 {
        &self.cells[row * self.cols + col]
    }
}

impl RelationStore for DenseStore {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn get(&self, row: usize, col: usize) -> Relation {
        Relation::from_code(self.slot(row, col).load(Ordering::Acquire))
    }

    fn set(&self, row: usize, col: usize, value: Relation) -> bool {
        let previous = self.slot(row, col).swap(value.code(), Ordering::AcqRel);
        previous != value.code()
    }

    fn entries(&self) -> Vec<(usize, usize, Relation)> {
        if self.cols == 0 {
            return Vec::new();
        }
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                let relation = Relation::from_code(cell.load(Ordering::Acquire));
                relation
                    .is_known()
                    .then(|| (i / self.cols, i % self.cols, relation))
            })
            .collect()
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn dense_row_major_layout() {
        let store = DenseStore::new(2, 3).unwrap();
        store.set(1, 0, Relation::LessGeneral);
        assert_eq!(store.get(1, 0), Relation::LessGeneral);
        assert_eq!(store.get(0, 1), Relation::Unknown);
        assert_eq!(store.entries(), vec![(1, 0, Relation::LessGeneral)]);
    }

    #[test]
    fn dense_zero_sized() {
        let store = DenseStore::new(0, 5).unwrap();
        assert_eq!(store.dimensions(), (0, 5));
        assert!(store.entries().is_empty());
        let store = DenseStore::new(4, 0).unwrap();
        assert!(store.entries().is_empty());
    }

    #[test]
    fn dense_rejects_overflowing_size() {
        assert!(DenseStore::new(usize::MAX, 2).is_err());
    }

    #[test]
    fn dense_rejects_unallocatable_size() {
        use crate::store::StoreFactory;
        // the product fits in usize but exceeds the largest possible allocation
        let err = DenseStore::new(1, usize::MAX).err();
        assert!(matches!(err, Some(MatchError::Config(_))));
        let err = StoreKind::Dense.factory(0).create(2, usize::MAX / 2).err();
        assert!(matches!(err, Some(MatchError::Config(_))));
    }

    #[test]
    fn dense_concurrent_writes_to_distinct_cells() {
        let store = Arc::new(DenseStore::new(8, 64).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|row| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for col in 0..64 {
                        store.set(row, col, Relation::Disjoint);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8 * 64);
    }
}

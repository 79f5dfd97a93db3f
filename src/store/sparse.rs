//! Sparse relation store: per-row sorted column arrays.

use parking_lot::Mutex;

use crate::error::{MatchError, MatchResult};
use crate::types::Relation;

use super::{RelationStore, StoreKind};

/// Two parallel arrays per row: strictly increasing column indices and the
/// relation stored at each.
#[derive(Debug, Default)]
struct SparseRow {
    columns: Vec<u32>,
    values: Vec<Relation>,
}

impl SparseRow {
    fn get(&self, col: u32) -> Relation {
        match self.columns.binary_search(&col) {
            Ok(pos) => self.values[pos],
            Err(_) => Relation::Unknown,
        }
    }

    fn set(&mut self, col: u32, value: Relation) -> bool {
        match self.columns.binary_search(&col) {
            Ok(pos) if value == Relation::Unknown => {
                self.columns.remove(pos);
                self.values.remove(pos);
                true
            }
            Ok(pos) => {
                let changed = self.values[pos] != value;
                self.values[pos] = value;
                changed
            }
            Err(_) if value == Relation::Unknown => false,
            Err(pos) => {
                self.columns.insert(pos, col);
                self.values.insert(pos, value);
                true
            }
        }
    }
}

/// Sparse store with one lock per row.
///
/// A row may receive writes at different columns from different workers at
/// the same time, and an insert shifts the row's arrays, so each row is
/// guarded by its own mutex. Rows that were never written hold no heap
/// memory.
pub struct SparseStore {
    cols: usize,
    rows: Vec<Mutex<SparseRow>>,
}

impl SparseStore {
    pub fn new(rows: usize, cols: usize) -> MatchResult<Self> {
        if u32::try_from(cols).is_err() {
            return Err(MatchError::Config(format!(
                "sparse store supports at most {} columns, got {cols}",
                u32::MAX
            )));
        }
        let mut row_locks = Vec::with_capacity(rows);
        row_locks.resize_with(rows, Mutex::default);
        Ok(Self {
            cols,
            rows: row_locks,
        })
    }

    /// Column indices currently stored in `row`
    pub fn row_columns(&self, row: usize) -> Vec<usize> {
        self.rows
            .get(row)
            .map(|r| r.lock().columns.iter().map(|&c| c as usize).collect())
            .unwrap_or_default()
    }
}

impl RelationStore for SparseStore {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.cols)
    }

    fn get(&self, row: usize, col: usize) -> Relation {
        self.rows[row].lock().get(col as u32)
    }

    fn set(&self, row: usize, col: usize, value: Relation) -> bool {
        self.rows[row].lock().set(col as u32, value)
    }

    fn entries(&self) -> Vec<(usize, usize, Relation)> {
        let mut out = Vec::new();
        for (row, lock) in self.rows.iter().enumerate() {
            let guard = lock.lock();
            out.extend(
                guard
                    .columns
                    .iter()
                    .zip(&guard.values)
                    .map(|(&col, &value)| (row, col as usize, value)),
            );
        }
        out
    }

    fn len(&self) -> usize {
        self.rows.iter().map(|r| r.lock().columns.len()).sum()
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Sparse
    }
}

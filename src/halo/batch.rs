//! Remote-reference discovery.
//!
//! One scan over the local column indices finds, per remote owner, the sorted
//! and duplicate-free set of global columns this rank must fetch from it.

use crate::error::SpmvError;
use crate::matrix::{ColumnNumbering, DistributedMatrix};
use crate::partition::owner;
use std::collections::BTreeMap;

/// Global column indices this rank needs from one owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborBatch {
    /// Strictly ascending.
    pub needed_indices: Vec<usize>,
}

impl NeighborBatch {
    pub fn len(&self) -> usize {
        self.needed_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.needed_indices.is_empty()
    }
}

/// Owner rank → batch, holding only owners this rank actually depends on.
///
/// An absent owner means "no dependency"; lookups never insert, so iteration
/// (always in ascending rank order) only ever visits real dependencies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborBatches {
    batches: BTreeMap<usize, NeighborBatch>,
}

impl NeighborBatches {
    /// Scans `mat`'s global column indices and groups the remote ones by owner.
    ///
    /// Always produces a fresh map; nothing carries over from an earlier pass.
    pub fn discover<T>(
        mat: &DistributedMatrix<T>,
        rank: usize,
        size: usize,
    ) -> Result<Self, SpmvError> {
        if mat.numbering() != ColumnNumbering::Global {
            return Err(SpmvError::AlreadyRenumbered);
        }
        let n = mat.global_cols();
        let mut batches: BTreeMap<usize, NeighborBatch> = BTreeMap::new();
        for &col in mat.col_idx() {
            if col >= n {
                return Err(SpmvError::ColumnOutOfRange { col, global_cols: n });
            }
            let o = owner(col, n, size);
            if o == rank {
                continue;
            }
            batches.entry(o).or_default().needed_indices.push(col);
        }
        for batch in batches.values_mut() {
            batch.needed_indices.sort_unstable();
            batch.needed_indices.dedup();
        }
        log::debug!(
            "rank {rank}: {} remote owners, {} ghost columns",
            batches.len(),
            batches.values().map(NeighborBatch::len).sum::<usize>()
        );
        Ok(Self { batches })
    }

    pub fn contains(&self, owner: usize) -> bool {
        self.batches.contains_key(&owner)
    }

    pub fn get(&self, owner: usize) -> Option<&NeighborBatch> {
        self.batches.get(&owner)
    }

    /// Number of indices requested from `owner`, zero when there is no batch.
    pub fn request_count(&self, owner: usize) -> usize {
        self.batches.get(&owner).map_or(0, NeighborBatch::len)
    }

    /// Batches in ascending owner order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &NeighborBatch)> + '_ {
        self.batches.iter().map(|(&o, b)| (o, b))
    }

    pub fn owners(&self) -> impl Iterator<Item = usize> + '_ {
        self.batches.keys().copied()
    }

    /// Number of owners depended on.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of distinct ghost columns.
    pub fn ghost_count(&self) -> usize {
        self.batches.values().map(NeighborBatch::len).sum()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 6x6 with columns spread over 3 ranks (2 rows each); rank 1 owns rows 2,3
    fn rank1_slice() -> DistributedMatrix<f64> {
        let row_ptr = vec![0, 4, 8];
        let col_idx = vec![5, 0, 2, 5, 1, 3, 0, 4];
        let vals = vec![1.0; 8];
        DistributedMatrix::from_parts(6, 6, 1, 3, row_ptr, col_idx, vals).unwrap()
    }

    #[test]
    fn groups_sorts_and_dedups_by_owner() {
        let b = NeighborBatches::discover(&rank1_slice(), 1, 3).unwrap();
        assert_eq!(b.owners().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(b.get(0).unwrap().needed_indices, vec![0, 1]);
        assert_eq!(b.get(2).unwrap().needed_indices, vec![4, 5]);
        assert_eq!(b.ghost_count(), 4);
    }

    #[test]
    fn local_columns_are_skipped_and_absent_owners_stay_absent() {
        let b = NeighborBatches::discover(&rank1_slice(), 1, 3).unwrap();
        assert!(!b.contains(1));
        assert_eq!(b.request_count(1), 0);
        // the lookup above must not have created an entry
        assert_eq!(b.len(), 2);
        for (_, batch) in b.iter() {
            assert!(batch.needed_indices.windows(2).all(|w| w[0] < w[1]));
            assert!(batch.needed_indices.iter().all(|c| !(2..4).contains(c)));
        }
    }

    #[test]
    fn single_rank_has_no_batches() {
        let m = DistributedMatrix::from_parts(2, 2, 0, 1, vec![0, 2, 3], vec![0, 1, 1], vec![1.0; 3]).unwrap();
        let b = NeighborBatches::discover(&m, 0, 1).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.ghost_count(), 0);
    }
}

//! Global → local column renumbering.
//!
//! Ghost ids are handed out owner by owner in ascending rank order, and within
//! an owner in ascending global index. That is exactly the order in which the
//! executor's ghost buffer is filled (segment per peer at the plan's receive
//! displacement, values in requested order), so `local_rows + ghost_id` can be
//! used as a direct index. [`GhostLayout::check_against`] verifies the two
//! layouts agree.

use super::batch::NeighborBatches;
use super::plan::CommPlan;
use crate::error::SpmvError;
use crate::matrix::{ColumnNumbering, DistributedMatrix};
use std::collections::HashMap;
use std::ops::Range;

/// Ghost id assignment produced by [`renumber_columns`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostLayout {
    /// Ghost id → global column.
    pub globals: Vec<usize>,
    /// Owner rank and its ghost id range, ascending by owner.
    pub owners: Vec<(usize, Range<usize>)>,
}

impl GhostLayout {
    pub fn ghost_count(&self) -> usize {
        self.globals.len()
    }

    /// Checks that every owner's ghost ids sit exactly where the plan will
    /// deliver that owner's values.
    pub fn check_against(&self, plan: &CommPlan) -> Result<(), SpmvError> {
        let recv = &plan.recv;
        let mut seen = 0;
        for (owner, ids) in &self.owners {
            let expected = (recv.displs[*owner], recv.counts[*owner]);
            let found = (ids.start, ids.len());
            if expected != found {
                return Err(SpmvError::LayoutMismatch {
                    owner: *owner,
                    expected,
                    found,
                });
            }
            seen += 1;
        }
        if seen != recv.peer_count() || self.ghost_count() != recv.total {
            return Err(SpmvError::GhostCountMismatch {
                expected: recv.total,
                found: self.ghost_count(),
            });
        }
        Ok(())
    }
}

/// Rewrites `mat`'s column indices from global to local numbering.
///
/// Owned columns map to `col - rows_offset`; every other column must appear in
/// `batches` and maps to `local_rows + ghost_id`. Runs once per matrix.
pub fn renumber_columns<T>(
    mat: &mut DistributedMatrix<T>,
    batches: &NeighborBatches,
) -> Result<GhostLayout, SpmvError> {
    if mat.numbering() != ColumnNumbering::Global {
        return Err(SpmvError::AlreadyRenumbered);
    }

    let mut layout = GhostLayout::default();
    let mut ghost_ids: HashMap<usize, usize> = HashMap::with_capacity(batches.ghost_count());
    for (owner, batch) in batches.iter() {
        let start = layout.globals.len();
        for &g in &batch.needed_indices {
            ghost_ids.insert(g, layout.globals.len());
            layout.globals.push(g);
        }
        layout.owners.push((owner, start..layout.globals.len()));
    }

    let owned = mat.owned_rows();
    let local_rows = mat.local_rows();
    // validate everything before touching the matrix
    let mut renumbered = Vec::with_capacity(mat.nnz());
    for &col in mat.col_idx() {
        let local = if owned.contains(&col) {
            col - owned.start
        } else {
            match ghost_ids.get(&col) {
                Some(&id) => local_rows + id,
                None => return Err(SpmvError::UndiscoveredGhost(col)),
            }
        };
        renumbered.push(local);
    }
    mat.col_idx_mut().copy_from_slice(&renumbered);
    mat.set_numbering(ColumnNumbering::Local {
        ghost_count: layout.ghost_count(),
    });
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::BlockLayout;

    // rank 1 of 3 on a 6x6 matrix: owns rows 2,3
    fn rank1_slice() -> DistributedMatrix<f64> {
        let row_ptr = vec![0, 4, 8];
        let col_idx = vec![5, 0, 2, 5, 1, 3, 0, 4];
        DistributedMatrix::from_parts(6, 6, 1, 3, row_ptr, col_idx, vec![1.0; 8]).unwrap()
    }

    #[test]
    fn owned_then_ghosts_in_owner_order() {
        let mut m = rank1_slice();
        let b = NeighborBatches::discover(&m, 1, 3).unwrap();
        let layout = renumber_columns(&mut m, &b).unwrap();
        // ghosts: 0,1 from rank 0 then 4,5 from rank 2
        assert_eq!(layout.globals, vec![0, 1, 4, 5]);
        assert_eq!(layout.owners, vec![(0, 0..2), (2, 2..4)]);
        assert_eq!(m.col_idx(), &[5, 2, 0, 5, 3, 1, 2, 4]);
        assert_eq!(m.numbering(), ColumnNumbering::Local { ghost_count: 4 });
        assert!(m.validate().is_ok());
    }

    #[test]
    fn renumbering_is_a_bijection_on_distinct_columns() {
        let original = rank1_slice();
        let mut m = original.clone();
        let b = NeighborBatches::discover(&m, 1, 3).unwrap();
        let layout = renumber_columns(&mut m, &b).unwrap();
        let mut pairs: HashMap<usize, usize> = HashMap::new();
        for (&g, &l) in original.col_idx().iter().zip(m.col_idx()) {
            assert_eq!(*pairs.entry(g).or_insert(l), l);
            let back = if l < m.local_rows() { l + m.rows_offset() } else { layout.globals[l - m.local_rows()] };
            assert_eq!(back, g);
        }
        let mut locals: Vec<_> = pairs.values().copied().collect();
        locals.sort_unstable();
        locals.dedup();
        assert_eq!(locals.len(), pairs.len());
    }

    #[test]
    fn missing_ghost_is_rejected_and_matrix_untouched() {
        let mut m = rank1_slice();
        let err = renumber_columns(&mut m, &NeighborBatches::default());
        assert!(matches!(err, Err(SpmvError::UndiscoveredGhost(5))));
        assert_eq!(m.numbering(), ColumnNumbering::Global);
        assert_eq!(m.col_idx()[0], 5);
    }

    #[test]
    fn second_pass_is_rejected() {
        let mut m = rank1_slice();
        let b = NeighborBatches::discover(&m, 1, 3).unwrap();
        renumber_columns(&mut m, &b).unwrap();
        assert!(matches!(renumber_columns(&mut m, &b), Err(SpmvError::AlreadyRenumbered)));
    }

    #[test]
    fn layout_check_catches_disagreeing_plan() {
        let mut m = rank1_slice();
        let b = NeighborBatches::discover(&m, 1, 3).unwrap();
        let layout = renumber_columns(&mut m, &b).unwrap();
        let good = CommPlan {
            recv: BlockLayout::from_counts(vec![2, 0, 2]),
            ..CommPlan::default()
        };
        assert!(layout.check_against(&good).is_ok());
        // owner 2 placed first would put its values at offset 0
        let swapped = CommPlan {
            recv: BlockLayout {
                counts: vec![2, 0, 2],
                displs: vec![2, 4, 0],
                total: 4,
            },
            ..CommPlan::default()
        };
        assert!(matches!(
            layout.check_against(&swapped),
            Err(SpmvError::LayoutMismatch { owner: 0, .. })
        ));
    }
}

//! Inspector half of the inspector/executor halo exchange.
//!
//! Run once per (matrix, partition) pair:
//! 1. [`NeighborBatches::discover`] finds which remote columns are referenced.
//! 2. [`CommPlan::build`] agrees with every peer on who sends what.
//! 3. [`renumber_columns`] rewrites the matrix into the local address space.
//!
//! The resulting [`HaloSetup`] is an ordinary value owned by the caller;
//! re-partitioning means building a new one.

pub mod batch;
pub mod plan;
pub mod renumber;

pub use batch::{NeighborBatch, NeighborBatches};
pub use plan::CommPlan;
pub use renumber::{GhostLayout, renumber_columns};

use crate::error::SpmvError;
use crate::matrix::DistributedMatrix;
use crate::parallel::Comm;

/// Everything the inspector learned about one matrix slice.
#[derive(Clone, Debug)]
pub struct HaloSetup {
    pub batches: NeighborBatches,
    pub plan: CommPlan,
    pub ghosts: GhostLayout,
}

/// Discovers remote references, builds the communication plan and renumbers
/// `mat`'s columns in place.
///
/// Collective over `comm`. The matrix must be square: entries of x are
/// distributed with the same row partition as the matrix.
pub fn inspect<C: Comm, T>(comm: &C, mat: &mut DistributedMatrix<T>) -> Result<HaloSetup, SpmvError> {
    if mat.global_rows() != mat.global_cols() {
        return Err(SpmvError::NonSquare {
            rows: mat.global_rows(),
            cols: mat.global_cols(),
        });
    }
    let batches = NeighborBatches::discover(mat, comm.rank(), comm.size())?;
    let plan = CommPlan::build(comm, mat, &batches)?;
    let ghosts = renumber_columns(mat, &batches)?;
    ghosts.check_against(&plan)?;
    log::debug!(
        "rank {}: inspector done, {} ghosts from {} owners",
        comm.rank(),
        ghosts.ghost_count(),
        batches.len()
    );
    Ok(HaloSetup { batches, plan, ghosts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ColumnNumbering;
    use crate::parallel::LocalComm;

    #[test]
    fn rejects_rectangular_matrix() {
        let out = LocalComm::run(1, |comm| {
            let mut m = DistributedMatrix::from_parts(2, 3, 0, 1, vec![0, 1, 2], vec![0, 2], vec![1.0, 1.0]).unwrap();
            inspect(&comm, &mut m).map(|_| ())
        });
        assert!(matches!(out[0], Err(SpmvError::NonSquare { rows: 2, cols: 3 })));
    }

    #[test]
    fn ghost_layout_matches_plan_on_every_rank() {
        // dense 5x5: every rank needs every other rank's rows
        let n = 5;
        let t: Vec<_> = (0..n).flat_map(|i| (0..n).map(move |j| (i, j, 1.0))).collect();
        let out = LocalComm::run(3, |comm| {
            let mut m = DistributedMatrix::from_sorted_triplets(n, n, comm.rank(), 3, &t).unwrap();
            let setup = inspect(&comm, &mut m).unwrap();
            (m.local_rows(), m.numbering(), setup)
        });
        for (local_rows, numbering, setup) in out {
            assert_eq!(setup.ghosts.ghost_count(), n - local_rows);
            assert_eq!(
                numbering,
                ColumnNumbering::Local { ghost_count: n - local_rows }
            );
            assert!(setup.ghosts.check_against(&setup.plan).is_ok());
        }
    }
}

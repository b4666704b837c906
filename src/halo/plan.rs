//! Communication plan: who sends which x entries to whom on every multiply.
//!
//! Built once with one fixed-size all-to-all (request counts) and one
//! variable-count all-to-all (the requested global indices themselves).
//! Afterwards it is immutable and can be replayed any number of times.

use super::batch::NeighborBatches;
use crate::error::SpmvError;
use crate::matrix::DistributedMatrix;
use crate::parallel::{BlockLayout, Comm};

/// Static halo-exchange schedule for one (matrix, partition) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommPlan {
    /// What this rank receives: `counts[r]` values it requested from rank `r`,
    /// laid out in the ghost buffer at `displs[r]`.
    pub recv: BlockLayout,
    /// What this rank sends: `counts[r]` values rank `r` requested from it,
    /// laid out in the outgoing buffer at `displs[r]`.
    pub send: BlockLayout,
    /// For each outgoing slot, the local row whose x value fills it.
    pub pack_map: Vec<usize>,
}

impl CommPlan {
    /// Runs the count exchange and the index exchange across all ranks.
    ///
    /// Collective: every rank must call this with its own batches.
    pub fn build<C: Comm, T>(
        comm: &C,
        mat: &DistributedMatrix<T>,
        batches: &NeighborBatches,
    ) -> Result<Self, SpmvError> {
        let size = comm.size();
        let rank = comm.rank();

        // 1. how many indices I want from each rank; learn how many each wants from me
        let request_counts: Vec<usize> = (0..size).map(|r| batches.request_count(r)).collect();
        let incoming_counts = comm.all_to_all(&request_counts);

        // 2. offsets of every rank's segment on both sides
        let recv = BlockLayout::from_counts(request_counts);
        let send = BlockLayout::from_counts(incoming_counts);

        // 3. pack my sorted requests at their offsets and scatter them to the owners
        let mut requests = vec![0usize; recv.total];
        let mut packed = 0;
        for (owner, batch) in batches.iter() {
            if owner >= size || owner == rank {
                return Err(SpmvError::CountMismatch {
                    rank: owner,
                    declared: 0,
                    packed: batch.len(),
                });
            }
            let seg = recv.segment(owner);
            if seg.len() != batch.len() {
                return Err(SpmvError::CountMismatch {
                    rank: owner,
                    declared: seg.len(),
                    packed: batch.len(),
                });
            }
            requests[seg].copy_from_slice(&batch.needed_indices);
            packed += batch.len();
        }
        if packed != recv.total {
            return Err(SpmvError::CountMismatch {
                rank,
                declared: recv.total,
                packed,
            });
        }
        let mut wanted = vec![0usize; send.total];
        comm.all_to_all_varcount(&requests, &recv, &mut wanted, &send);

        // 4. global rows wanted from me -> local rows, slot by slot
        let owned = mat.owned_rows();
        let mut pack_map = Vec::with_capacity(send.total);
        for (from, range) in send.segments() {
            for &row in &wanted[range] {
                if !owned.contains(&row) {
                    return Err(SpmvError::ForeignRequest {
                        from,
                        row,
                        start: owned.start,
                        end: owned.end,
                    });
                }
                pack_map.push(row - owned.start);
            }
        }

        log::debug!(
            "rank {rank}: plan receives {} values from {} peers, sends {} values to {} peers",
            recv.total,
            recv.peer_count(),
            send.total,
            send.peer_count()
        );
        Ok(Self { recv, send, pack_map })
    }

    pub fn recv_counts(&self) -> &[usize] {
        &self.recv.counts
    }

    pub fn recv_displs(&self) -> &[usize] {
        &self.recv.displs
    }

    /// Size of the ghost buffer.
    pub fn total_recv(&self) -> usize {
        self.recv.total
    }

    pub fn send_counts(&self) -> &[usize] {
        &self.send.counts
    }

    pub fn send_displs(&self) -> &[usize] {
        &self.send.displs
    }

    /// Size of the outgoing buffer.
    pub fn total_send(&self) -> usize {
        self.send.total
    }
}

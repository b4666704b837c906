//! MPI-based messaging backend.
//!
//! This module implements the `Comm` trait on top of the `mpi` crate (rsmpi) for
//! distributed-memory runs: one process per rank, launched by `mpirun`/`srun`.
//! It is only available when the `mpi` feature is enabled.
//!
//! # Usage
//!
//! - `MpiComm::new()` initializes MPI and keeps the universe alive for the lifetime of
//!   the communicator; MPI is finalized when it is dropped.
//! - The halo exchange posts `immediate_receive_into`/`immediate_send` requests inside a
//!   request scope and waits for all of them before returning.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")] {
//! use halo_spmv::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI initialized twice");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use super::{BlockLayout, Comm, Element};
use crate::error::SpmvError;
use mpi::datatype::{Partition, PartitionMut};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::{Count, Rank};

/// MPI communicator wrapper for distributed runs.
///
/// Holds the MPI universe, the world communicator, and this process's place in it.
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    // dropped last: finalizes MPI
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// # Errors
    /// Fails if MPI has already been initialized in this process.
    pub fn new() -> Result<Self, SpmvError> {
        let universe = mpi::initialize().ok_or(SpmvError::Unsupported("MPI is already initialized"))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm {
            world,
            rank,
            size,
            _universe: universe,
        })
    }
}

// MPI counts and displacements are 32-bit.
fn to_counts(v: &[usize]) -> Vec<Count> {
    v.iter().map(|&c| c as Count).collect()
}

impl Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize {
        self.rank
    }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize {
        self.size
    }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) {
        self.world.barrier();
    }

    fn all_to_all<T: Element>(&self, send: &[T]) -> Vec<T> {
        assert_eq!(send.len(), self.size, "all_to_all needs one element per rank");
        let mut recv = vec![T::default(); self.size];
        self.world.all_to_all_into(send, &mut recv[..]);
        recv
    }

    fn all_to_all_varcount<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    ) {
        let (sc, sd) = (to_counts(&send_layout.counts), to_counts(&send_layout.displs));
        let (rc, rd) = (to_counts(&recv_layout.counts), to_counts(&recv_layout.displs));
        let outgoing = Partition::new(send, &sc[..], &sd[..]);
        let mut incoming = PartitionMut::new(recv, &rc[..], &rd[..]);
        self.world.all_to_all_varcount_into(&outgoing, &mut incoming);
    }

    fn exchange_halo<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    ) {
        let slots = recv_layout.split_mut(recv);
        let nreqs = slots.len() + send_layout.peer_count();
        if nreqs == 0 {
            return;
        }
        let world = &self.world;
        mpi::request::multiple_scope(nreqs, |scope, coll| {
            // receives land directly in the peer's ghost segment
            for (peer, slot) in slots {
                let req = world
                    .process_at_rank(peer as Rank)
                    .immediate_receive_into(scope, slot);
                coll.add(req);
            }
            for (peer, range) in send_layout.segments() {
                let req = world
                    .process_at_rank(peer as Rank)
                    .immediate_send(scope, &send[range]);
                coll.add(req);
            }
            let mut statuses = Vec::with_capacity(nreqs);
            coll.wait_all(&mut statuses);
        });
    }

    fn broadcast<T: Element>(&self, buf: &mut Vec<T>, root: usize) {
        let root = self.world.process_at_rank(root as Rank);
        let mut len = buf.len() as u64;
        root.broadcast_into(&mut len);
        buf.resize(len as usize, T::default());
        root.broadcast_into(&mut buf[..]);
    }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce_sum(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::sum());
        y
    }

    fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}

//! Messaging substrate for a fixed group of cooperating ranks.
//!
//! The halo engine needs four primitives: a fixed-size all-to-all, a
//! variable-count all-to-all, non-blocking point-to-point exchange with a
//! wait, and a barrier. [`Comm`] exposes exactly those, plus a broadcast and a
//! scalar all-reduce used by the matrix loader and the benchmark report.
//!
//! Every collective must be entered by all ranks in the same order with
//! consistent argument shapes (slices keyed by world size).

pub mod layout;
pub use layout::BlockLayout;

pub mod local_comm;
pub use local_comm::LocalComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

use crate::error::SpmvError;

/// Plain-data element that may cross the messaging substrate.
#[cfg(feature = "mpi")]
pub trait Element: Copy + Default + Send + 'static + mpi::datatype::Equivalence {}
#[cfg(feature = "mpi")]
impl<T: Copy + Default + Send + 'static + mpi::datatype::Equivalence> Element for T {}

/// Plain-data element that may cross the messaging substrate.
#[cfg(not(feature = "mpi"))]
pub trait Element: Copy + Default + Send + 'static {}
#[cfg(not(feature = "mpi"))]
impl<T: Copy + Default + Send + 'static> Element for T {}

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);

    /// Sends `send[r]` to every rank `r`; returns one element from every rank.
    fn all_to_all<T: Element>(&self, send: &[T]) -> Vec<T>;

    /// Sends segment `r` of `send` (per `send_layout`) to rank `r` and fills
    /// segment `r` of `recv` (per `recv_layout`) with what rank `r` sent here.
    fn all_to_all_varcount<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    );

    /// Posts a non-blocking receive for every non-empty segment of
    /// `recv_layout` and a non-blocking send for every non-empty segment of
    /// `send_layout`, then blocks until all of them have completed.
    fn exchange_halo<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    );

    /// Replaces `buf` on every rank with its contents on `root`.
    fn broadcast<T: Element>(&self, buf: &mut Vec<T>, root: usize);

    fn all_reduce_sum(&self, x: f64) -> f64;

    /// Tears down the whole run. Never returns.
    fn abort(&self, code: i32) -> !;
}

/// Unwraps `result`, or logs the error and aborts every rank.
///
/// Invariant violations leave the group out of lock-step, so no rank may
/// carry on alone after one.
pub fn or_abort<C: Comm, T>(comm: &C, result: Result<T, SpmvError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            log::error!("rank {}: fatal: {e}", comm.rank());
            comm.abort(1)
        }
    }
}

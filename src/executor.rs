//! Executor half of the inspector/executor halo exchange.
//!
//! Every call replays the same [`CommPlan`]: pack the requested entries of x,
//! exchange them with the peers, wait, then multiply row by row. The outgoing
//! and ghost buffers are allocated once and reused.
//!
//! The exchange completes before any row is computed. Overlapping purely local
//! rows with the exchange is a possible future optimization.

use crate::config::ExecutorOptions;
use crate::error::SpmvError;
use crate::halo::CommPlan;
use crate::matrix::{ColumnNumbering, DistributedMatrix};
use crate::parallel::{Comm, Element};
use num_traits::Float;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Repeated distributed y = A x over one renumbered matrix slice.
///
/// Not meant to be shared between concurrent callers; `spmv` takes `&mut self`.
pub struct Executor<'a, T = f64> {
    mat: &'a DistributedMatrix<T>,
    plan: &'a CommPlan,
    send_buf: Vec<T>,
    ghost_buf: Vec<T>,
    row_chunk: usize,
    #[cfg(feature = "rayon")]
    pool: rayon::ThreadPool,
}

impl<'a, T> Executor<'a, T>
where
    T: Element + Float + Send + Sync,
{
    /// Checks that `mat` has been renumbered against `plan` and allocates the buffers.
    pub fn new(
        mat: &'a DistributedMatrix<T>,
        plan: &'a CommPlan,
        opts: &ExecutorOptions,
    ) -> Result<Self, SpmvError> {
        let ghost_count = match mat.numbering() {
            ColumnNumbering::Global => return Err(SpmvError::NotRenumbered),
            ColumnNumbering::Local { ghost_count } => ghost_count,
        };
        if ghost_count != plan.total_recv() {
            return Err(SpmvError::GhostCountMismatch {
                expected: plan.total_recv(),
                found: ghost_count,
            });
        }
        if plan.recv.ranks() != plan.send.ranks() {
            return Err(SpmvError::InvalidPlan(format!(
                "receive side covers {} ranks, send side {}",
                plan.recv.ranks(),
                plan.send.ranks()
            )));
        }
        if plan.pack_map.len() != plan.total_send() {
            return Err(SpmvError::InvalidPlan(format!(
                "pack map has {} slots for {} outgoing values",
                plan.pack_map.len(),
                plan.total_send()
            )));
        }
        if let Some(&row) = plan.pack_map.iter().find(|&&r| r >= mat.local_rows()) {
            return Err(SpmvError::InvalidPlan(format!(
                "pack map names local row {row} of {}",
                mat.local_rows()
            )));
        }

        #[cfg(feature = "rayon")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.threads)
            .build()
            .map_err(|e| SpmvError::ThreadPool(e.to_string()))?;

        Ok(Self {
            mat,
            plan,
            send_buf: vec![T::zero(); plan.total_send()],
            ghost_buf: vec![T::zero(); plan.total_recv()],
            row_chunk: opts.row_chunk.max(1),
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Computes `y = A x` for this rank's rows. Collective over `comm`.
    ///
    /// `x` and `y` both hold this rank's `local_rows` entries.
    pub fn spmv<C: Comm>(&mut self, comm: &C, x: &[T], y: &mut [T]) -> Result<(), SpmvError> {
        let local_rows = self.mat.local_rows();
        if x.len() != local_rows {
            return Err(SpmvError::LengthMismatch {
                what: "x",
                expected: local_rows,
                got: x.len(),
            });
        }
        if y.len() != local_rows {
            return Err(SpmvError::LengthMismatch {
                what: "y",
                expected: local_rows,
                got: y.len(),
            });
        }
        if self.plan.recv.ranks() != comm.size() {
            return Err(SpmvError::InvalidPlan(format!(
                "plan built for {} ranks, communicator has {}",
                self.plan.recv.ranks(),
                comm.size()
            )));
        }

        let mat = self.mat;
        let plan = self.plan;
        let chunk = self.row_chunk;

        #[cfg(feature = "rayon")]
        {
            let send_buf = &mut self.send_buf;
            self.pool.install(|| pack(send_buf, x, &plan.pack_map));
        }
        #[cfg(not(feature = "rayon"))]
        pack(&mut self.send_buf, x, &plan.pack_map);

        comm.exchange_halo(&self.send_buf, &plan.send, &mut self.ghost_buf, &plan.recv);

        let ghosts = &self.ghost_buf;
        #[cfg(feature = "rayon")]
        self.pool.install(|| row_products(mat, x, ghosts, y, chunk));
        #[cfg(not(feature = "rayon"))]
        row_products(mat, x, ghosts, y, chunk);

        Ok(())
    }

    /// Ghost values received by the last `spmv`, in ghost id order.
    pub fn ghosts(&self) -> &[T] {
        &self.ghost_buf
    }

    /// Ghost values received by the last `spmv`, per owner batch.
    pub fn ghosts_by_owner(&self) -> impl Iterator<Item = (usize, &[T])> + '_ {
        self.plan
            .recv
            .segments()
            .map(move |(owner, range)| (owner, &self.ghost_buf[range]))
    }

    pub fn matrix(&self) -> &DistributedMatrix<T> {
        self.mat
    }

    pub fn plan(&self) -> &CommPlan {
        self.plan
    }
}

fn pack<T: Copy + Send + Sync>(send_buf: &mut [T], x: &[T], pack_map: &[usize]) {
    #[cfg(feature = "rayon")]
    send_buf
        .par_iter_mut()
        .zip(pack_map.par_iter())
        .for_each(|(slot, &row)| *slot = x[row]);
    #[cfg(not(feature = "rayon"))]
    for (slot, &row) in send_buf.iter_mut().zip(pack_map) {
        *slot = x[row];
    }
}

// col < local_rows reads x, anything above reads the ghost buffer
fn row_products<T: Float + Send + Sync>(
    mat: &DistributedMatrix<T>,
    x: &[T],
    ghosts: &[T],
    y: &mut [T],
    chunk: usize,
) {
    let local_rows = x.len();
    let row = |i: usize| {
        let (cols, vals) = mat.row(i);
        let mut sum = T::zero();
        for (&col, &v) in cols.iter().zip(vals) {
            let operand = if col < local_rows {
                x[col]
            } else {
                ghosts[col - local_rows]
            };
            sum = sum + v * operand;
        }
        sum
    };
    #[cfg(feature = "rayon")]
    y.par_iter_mut()
        .enumerate()
        .with_min_len(chunk)
        .for_each(|(i, yi)| *yi = row(i));
    #[cfg(not(feature = "rayon"))]
    {
        let _ = chunk;
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = row(i);
        }
    }
}

//! halo-spmv: distributed sparse matrix-vector multiplication
//!
//! Each rank owns a contiguous block of rows of a square sparse matrix (and the
//! matching entries of x). An inspector pass works out, once, exactly which
//! entries of x every rank must ship to which peers; an executor then replays
//! that plan on every multiply: pack, exchange, wait, compute.
//!
//! ```rust,ignore
//! use halo_spmv::{Executor, ExecutorOptions, LocalComm, DistributedMatrix, inspect};
//! LocalComm::run(2, |comm| {
//!     let mut a = DistributedMatrix::from_sorted_triplets(n, n, comm.rank(), 2, &triplets)?;
//!     let setup = inspect(&comm, &mut a)?;
//!     let mut ex = Executor::new(&a, &setup.plan, &ExecutorOptions::default())?;
//!     ex.spmv(&comm, &x, &mut y)
//! });
//! ```
//!
//! Messaging backends: [`parallel::LocalComm`] (ranks as threads in one
//! process) and, with the `mpi` feature, [`parallel::MpiComm`].

pub mod parallel;

pub mod config;
pub mod error;
pub mod executor;
pub mod halo;
pub mod io;
pub mod matrix;
pub mod partition;

// Re-exports for convenience
pub use config::*;
pub use error::*;
pub use executor::Executor;
pub use halo::{CommPlan, HaloSetup, NeighborBatch, NeighborBatches, inspect};
pub use matrix::*;
pub use parallel::{BlockLayout, Comm, LocalComm};

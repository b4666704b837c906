//! Configuration for the SpMV executor.

pub mod options;
pub use options::ExecutorOptions;

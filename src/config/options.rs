//! Tuning knobs for the SpMV executor.
//!
//! This module provides the `ExecutorOptions` struct, used to size the
//! executor's worker pool and the granularity of its row loop, either via the
//! benchmark's command-line flags or directly through the API.

/// Executor parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Worker threads for the pack and row loops.
    pub threads: usize,

    /// Minimum rows per work item in the row loop. Rows vary in length, so
    /// work is handed out in chunks of this size rather than split evenly.
    pub row_chunk: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            threads: num_cpus::get(),
            #[cfg(not(feature = "rayon"))]
            threads: 1,
            row_chunk: 64,
        }
    }
}

impl ExecutorOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_row_chunk(mut self, row_chunk: usize) -> Self {
        self.row_chunk = row_chunk.max(1);
        self
    }
}

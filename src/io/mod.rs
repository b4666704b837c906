//! Matrix input: the provider that turns a file into per-rank matrix slices.

pub mod matrix_market;
pub use matrix_market::{TripletMatrix, read_distributed};

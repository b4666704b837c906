//! Matrix module: the distributed row-block matrix and the serial reference CSR.

pub mod distributed;
pub use distributed::{ColumnNumbering, DistributedMatrix};
pub mod sparse;
pub use sparse::{CsrMatrix, SparseMatrix};

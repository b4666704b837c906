//! Row-block slice of a global sparse matrix in compressed-row form.
//!
//! Each rank holds the rows assigned to it by [`crate::partition::partition`].
//! Column indices start out global; the halo inspector rewrites them once into
//! the local numbering consumed by the executor:
//! `[0, local_rows)` for owned entries of x, `[local_rows, local_rows + ghosts)`
//! for ghost values received from peers.

use crate::error::SpmvError;
use crate::partition::{RowBlock, partition};
use std::ops::Range;

/// Which address space `col_idx` is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnNumbering {
    Global,
    /// Renumbered; ghost ids follow the owned rows.
    Local { ghost_count: usize },
}

#[derive(Clone, Debug)]
pub struct DistributedMatrix<T = f64> {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    vals: Vec<T>,
    global_rows: usize,
    global_cols: usize,
    local_rows: usize,
    rows_offset: usize,
    numbering: ColumnNumbering,
}

impl<T> DistributedMatrix<T> {
    /// Wraps this rank's CSR slice, with global column indices.
    ///
    /// The owned row block is derived from `(global_rows, rank, size)`; `row_ptr`
    /// must have one entry per owned row plus one.
    pub fn from_parts(
        global_rows: usize,
        global_cols: usize,
        rank: usize,
        size: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        vals: Vec<T>,
    ) -> Result<Self, SpmvError> {
        if size == 0 || rank >= size {
            return Err(SpmvError::InvalidMatrix(format!(
                "rank {rank} is outside a group of {size}"
            )));
        }
        let RowBlock { count, offset } = partition(global_rows, rank, size);
        let m = Self {
            row_ptr,
            col_idx,
            vals,
            global_rows,
            global_cols,
            local_rows: count,
            rows_offset: offset,
            numbering: ColumnNumbering::Global,
        };
        m.validate()?;
        Ok(m)
    }

    /// Checks the CSR invariants and that every column is a valid global index.
    pub fn validate(&self) -> Result<(), SpmvError> {
        let invalid = |msg: String| Err(SpmvError::InvalidMatrix(msg));
        if self.row_ptr.len() != self.local_rows + 1 {
            return invalid(format!(
                "row_ptr has {} entries for {} local rows",
                self.row_ptr.len(),
                self.local_rows
            ));
        }
        if self.row_ptr[0] != 0 {
            return invalid(format!("row_ptr starts at {}", self.row_ptr[0]));
        }
        if let Some(i) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return invalid(format!("row_ptr decreases at row {i}"));
        }
        let nnz = self.row_ptr[self.local_rows];
        if nnz != self.col_idx.len() || nnz != self.vals.len() {
            return invalid(format!(
                "row_ptr ends at {nnz} but there are {} columns and {} values",
                self.col_idx.len(),
                self.vals.len()
            ));
        }
        let bound = match self.numbering {
            ColumnNumbering::Global => self.global_cols,
            ColumnNumbering::Local { ghost_count } => self.local_rows + ghost_count,
        };
        if let Some(&col) = self.col_idx.iter().find(|&&c| c >= bound) {
            return Err(SpmvError::ColumnOutOfRange {
                col,
                global_cols: bound,
            });
        }
        Ok(())
    }

    pub fn global_rows(&self) -> usize {
        self.global_rows
    }

    pub fn global_cols(&self) -> usize {
        self.global_cols
    }

    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    /// First global row owned by this rank.
    pub fn rows_offset(&self) -> usize {
        self.rows_offset
    }

    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Global rows owned by this rank.
    pub fn owned_rows(&self) -> Range<usize> {
        self.rows_offset..self.rows_offset + self.local_rows
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn vals(&self) -> &[T] {
        &self.vals
    }

    pub fn numbering(&self) -> ColumnNumbering {
        self.numbering
    }

    /// Columns and values of local row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let r = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[r.clone()], &self.vals[r])
    }

    pub(crate) fn col_idx_mut(&mut self) -> &mut [usize] {
        &mut self.col_idx
    }

    pub(crate) fn set_numbering(&mut self, numbering: ColumnNumbering) {
        self.numbering = numbering;
    }

    pub fn log_summary(&self, rank: usize) {
        if self.local_rows == 0 {
            log::info!("[rank {rank}] owns no rows");
            return;
        }
        log::info!(
            "[rank {rank}] owns {} rows (global {} -> {}) | local nnz {}",
            self.local_rows,
            self.rows_offset,
            self.rows_offset + self.local_rows - 1,
            self.nnz()
        );
    }
}

impl<T: Copy> DistributedMatrix<T> {
    /// Builds this rank's slice from a global `(row, col, value)` stream sorted by row.
    ///
    /// Entries of rows outside the owned block are skipped.
    pub fn from_sorted_triplets(
        global_rows: usize,
        global_cols: usize,
        rank: usize,
        size: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, SpmvError> {
        if size == 0 || rank >= size {
            return Err(SpmvError::InvalidMatrix(format!(
                "rank {rank} is outside a group of {size}"
            )));
        }
        let block = partition(global_rows, rank, size);
        let end = block.offset + block.count;
        let mut row_ptr = Vec::with_capacity(block.count + 1);
        row_ptr.push(0);
        let mut col_idx = Vec::new();
        let mut vals = Vec::new();
        let mut current = block.offset;
        let mut last_row = 0;
        for &(r, c, v) in triplets {
            if r < last_row {
                return Err(SpmvError::InvalidMatrix(format!(
                    "triplets are not sorted by row ({r} after {last_row})"
                )));
            }
            last_row = r;
            if r >= end {
                break;
            }
            if r < block.offset {
                continue;
            }
            // close every row up to and including the gap before `r`
            while current < r {
                row_ptr.push(vals.len());
                current += 1;
            }
            col_idx.push(c);
            vals.push(v);
        }
        while current < end {
            row_ptr.push(vals.len());
            current += 1;
        }
        Self::from_parts(global_rows, global_cols, rank, size, row_ptr, col_idx, vals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag4() -> Vec<(usize, usize, f64)> {
        let mut t = Vec::new();
        for i in 0..4usize {
            if i > 0 {
                t.push((i, i - 1, -1.0));
            }
            t.push((i, i, 2.0));
            if i < 3 {
                t.push((i, i + 1, -1.0));
            }
        }
        t
    }

    #[test]
    fn slices_rows_by_partition() {
        let t = tridiag4();
        let m = DistributedMatrix::from_sorted_triplets(4, 4, 1, 2, &t).unwrap();
        assert_eq!(m.local_rows(), 2);
        assert_eq!(m.rows_offset(), 2);
        assert_eq!(m.row_ptr(), &[0, 3, 5]);
        assert_eq!(m.col_idx(), &[1, 2, 3, 2, 3]);
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.numbering(), ColumnNumbering::Global);
    }

    #[test]
    fn empty_rows_are_kept() {
        // row 1 has no entries
        let t = vec![(0, 0, 1.0), (2, 2, 3.0)];
        let m = DistributedMatrix::from_sorted_triplets(3, 3, 0, 1, &t).unwrap();
        assert_eq!(m.row_ptr(), &[0, 1, 1, 2]);
        let (cols, vals) = m.row(1);
        assert!(cols.is_empty() && vals.is_empty());
    }

    #[test]
    fn rank_without_rows() {
        let t = tridiag4();
        let m = DistributedMatrix::from_sorted_triplets(4, 4, 5, 6, &t).unwrap();
        assert_eq!(m.local_rows(), 0);
        assert_eq!(m.row_ptr(), &[0]);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn rejects_broken_row_ptr() {
        let err = DistributedMatrix::<f64>::from_parts(2, 2, 0, 1, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(err, Err(SpmvError::InvalidMatrix(_))));
        let err = DistributedMatrix::<f64>::from_parts(2, 2, 0, 1, vec![0, 1, 3], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(err, Err(SpmvError::InvalidMatrix(_))));
    }

    #[test]
    fn rejects_out_of_range_column() {
        let err = DistributedMatrix::<f64>::from_parts(2, 2, 0, 1, vec![0, 1, 2], vec![0, 2], vec![1.0, 1.0]);
        assert!(matches!(err, Err(SpmvError::ColumnOutOfRange { col: 2, .. })));
    }

    #[test]
    fn rejects_unsorted_triplets() {
        let t = vec![(1, 0, 1.0), (0, 0, 1.0)];
        assert!(DistributedMatrix::from_sorted_triplets(2, 2, 0, 1, &t).is_err());
    }
}

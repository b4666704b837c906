// Whole-matrix CSR on a single rank, used as the reference product.

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

use faer::sparse::{
    SymbolicSparseRowMat, // owning symbolic CSR alias
    SparseRowMat,         // owning numeric CSR alias
};
use faer::traits::ComplexField;

pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
}

impl<T: ComplexField + Copy> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Column indices must be sorted and unique within each row.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        let symbolic = SymbolicSparseRowMat::new_checked(
            nrows,
            ncols,
            row_ptr,
            None, // optional row_nnz
            col_idx,
        );
        let inner = SparseRowMat::new(symbolic, values);
        Self { inner }
    }
}

impl<T: ComplexField + Copy + num_traits::Zero> CsrMatrix<T> {
    /// Build from `(row, col, value)` triplets in any order; duplicates are summed.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Self {
        let mut sorted = triplets.to_vec();
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(acc) = values.last_mut() {
                    *acc = *acc + v;
                }
                continue;
            }
            last = Some((r, c));
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }
}

impl<T: ComplexField + Copy> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        let x_mat = faer::Mat::<T>::from_fn(self.ncols(), 1, |i, _| x[i]);
        let mut y_mat = faer::Mat::<T>::zeros(self.nrows(), 1);
        // Reference path: densify and let faer do the product.
        let dense = self.inner.to_dense();
        y_mat.copy_from(&dense * &x_mat);
        for i in 0..y.len() {
            y[i] = y_mat[(i, 0)];
        }
    }
}

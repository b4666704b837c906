//! Contiguous block partitioning of a global index range across ranks.
//!
//! `N` indices are split over `S` ranks in rank order. The first `N mod S`
//! ranks own `N / S + 1` indices, the rest own `N / S`. [`partition`] and
//! [`owner`] are exact inverses of each other, including the degenerate cases
//! `S = 1`, `N < S` (trailing ranks own nothing) and `N mod S = 0`.

use std::ops::Range;

/// The block of indices owned by one rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowBlock {
    /// Number of indices owned.
    pub count: usize,
    /// First global index owned.
    pub offset: usize,
}

impl RowBlock {
    /// Global index range `[offset, offset + count)`.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.offset && index < self.offset + self.count
    }
}

/// Rows owned by `rank` when `n` rows are split over `size` ranks.
pub fn partition(n: usize, rank: usize, size: usize) -> RowBlock {
    debug_assert!(size > 0 && rank < size);
    let base = n / size;
    let rem = n % size;
    let count = if rank < rem { base + 1 } else { base };
    let offset = rank * base + rank.min(rem);
    RowBlock { count, offset }
}

/// Rank owning global `index` when `n` indices are split over `size` ranks.
///
/// `index` must be below `n`.
pub fn owner(index: usize, n: usize, size: usize) -> usize {
    debug_assert!(index < n);
    let base = n / size;
    let rem = n % size;
    // the first `rem` ranks hold one extra index each
    let lucky = rem * (base + 1);
    if index < lucky {
        index / (base + 1)
    } else {
        rem + (index - lucky) / base
    }
}

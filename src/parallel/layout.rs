//! Per-peer segmentation of a contiguous buffer.

use std::ops::Range;

/// Describes a buffer split into one contiguous segment per rank, in rank order.
///
/// `displs` is the exclusive prefix sum of `counts`, so segment `r` occupies
/// `displs[r]..displs[r] + counts[r]` and `total` is the buffer length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockLayout {
    pub counts: Vec<usize>,
    pub displs: Vec<usize>,
    pub total: usize,
}

impl BlockLayout {
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let mut displs = Vec::with_capacity(counts.len());
        let mut total = 0;
        for &c in &counts {
            displs.push(total);
            total += c;
        }
        Self { counts, displs, total }
    }

    /// Number of ranks described.
    pub fn ranks(&self) -> usize {
        self.counts.len()
    }

    pub fn segment(&self, rank: usize) -> Range<usize> {
        self.displs[rank]..self.displs[rank] + self.counts[rank]
    }

    /// Non-empty segments in ascending rank order.
    pub fn segments(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..self.ranks())
            .filter(|&r| self.counts[r] > 0)
            .map(|r| (r, self.segment(r)))
    }

    /// Number of ranks with a non-empty segment.
    pub fn peer_count(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Splits `buf` into disjoint mutable slices, one per non-empty segment.
    ///
    /// `buf.len()` must equal `total`.
    pub fn split_mut<'b, T>(&self, buf: &'b mut [T]) -> Vec<(usize, &'b mut [T])> {
        assert_eq!(buf.len(), self.total, "buffer does not match layout");
        let mut out = Vec::with_capacity(self.peer_count());
        let mut rest = buf;
        for (r, &count) in self.counts.iter().enumerate() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(count);
            if count > 0 {
                out.push((r, head));
            }
            rest = tail;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacements_are_exclusive_prefix_sums() {
        let l = BlockLayout::from_counts(vec![2, 0, 3, 1]);
        assert_eq!(l.displs, vec![0, 2, 2, 5]);
        assert_eq!(l.total, 6);
        assert_eq!(l.segment(2), 2..5);
        assert_eq!(l.peer_count(), 3);
        let segs: Vec<_> = l.segments().collect();
        assert_eq!(segs, vec![(0, 0..2), (2, 2..5), (3, 5..6)]);
    }

    #[test]
    fn split_mut_skips_empty_segments() {
        let l = BlockLayout::from_counts(vec![1, 0, 2]);
        let mut buf = [0, 0, 0];
        for (r, s) in l.split_mut(&mut buf) {
            s.fill(r as i32 + 10);
        }
        assert_eq!(buf, [10, 12, 12]);
    }

    #[test]
    fn empty_layout() {
        let l = BlockLayout::from_counts(vec![0, 0]);
        assert_eq!(l.total, 0);
        assert!(l.split_mut::<f64>(&mut []).is_empty());
    }
}

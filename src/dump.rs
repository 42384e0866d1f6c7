//! Read-only snapshot of the free lists.

use crate::{config::size_for_order, unit::KIB};
use alloc::vec::Vec;
use core::fmt;

/// Number of free blocks per order, from the smallest to the largest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    min_order: usize,
    counts: Vec<usize>,
}

impl Dump {
    pub(crate) fn new(min_order: usize, counts: Vec<usize>) -> Self {
        Self { min_order, counts }
    }

    /// Returns an iterator over `(order, free block count)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let min = self.min_order;
        self.counts
            .iter()
            .enumerate()
            .map(move |(idx, &count)| (min + idx, count))
    }

    /// Returns the number of free blocks with the given order.
    ///
    /// Orders outside of the allocator's range have no free blocks.
    pub fn free_blocks(&self, order: usize) -> usize {
        order
            .checked_sub(self.min_order)
            .and_then(|idx| self.counts.get(idx))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the free block counts, starting at the smallest order.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Sum of the sizes of all free blocks.
    pub fn total_free_bytes(&self) -> usize {
        self.iter()
            .map(|(order, count)| count * size_for_order(order))
            .sum()
    }
}

/// Prints `count:sizeK` for every order, e.g. `0:4K 0:8K 1:16K`.
impl fmt::Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (order, count)) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}K", count, size_for_order(order) / KIB)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::ToString, vec};

    #[test]
    fn display_matches_order_sizes() {
        let dump = Dump::new(12, vec![0, 0, 1]);
        assert_eq!(dump.to_string(), "0:4K 0:8K 1:16K");
    }

    #[test]
    fn lookups() {
        let dump = Dump::new(12, vec![1, 2, 0]);
        assert_eq!(dump.free_blocks(11), 0);
        assert_eq!(dump.free_blocks(12), 1);
        assert_eq!(dump.free_blocks(13), 2);
        assert_eq!(dump.free_blocks(15), 0);
        assert_eq!(dump.total_free_bytes(), 4096 + 2 * 8192);
        assert_eq!(
            dump.iter().collect::<alloc::vec::Vec<_>>(),
            [(12, 1), (13, 2), (14, 0)]
        );
    }
}

//! Static configuration of an allocator: the smallest and the largest order.
//!
//! A block of order `k` is `2^k` bytes large. The smallest order
//! defines the page size, the largest order the size of the whole arena.

use crate::error::{Error, Result};
use core::cmp;

/// Default minimum order, `4 KiB` pages.
pub const MIN_ORDER: usize = 12;

/// Default maximum order (inclusive), a `1 MiB` arena.
pub const MAX_ORDER: usize = 20;

/// The largest maximum order that is accepted.
///
/// The arena size must still fit into an `isize`.
pub const MAX_SUPPORTED_ORDER: usize = usize::BITS as usize - 2;

/// Calculates the size in bytes for the given order.
pub const fn size_for_order(order: usize) -> usize {
    1 << order
}

/// The orders an allocator is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    min_order: usize,
    max_order: usize,
}

impl Config {
    /// A `1 MiB` arena split into pages of `4 KiB`.
    pub const DEFAULT: Config = Config {
        min_order: MIN_ORDER,
        max_order: MAX_ORDER,
    };

    /// Create a new configuration.
    ///
    /// Fails with [`Error::InvalidConfig`] if `min_order` is larger than `max_order`,
    /// or if `max_order` exceeds [`MAX_SUPPORTED_ORDER`].
    pub const fn new(min_order: usize, max_order: usize) -> Result<Self> {
        if min_order > max_order || max_order > MAX_SUPPORTED_ORDER {
            return Err(Error::InvalidConfig);
        }

        Ok(Self {
            min_order,
            max_order,
        })
    }

    /// The smallest order, every block has at least this order.
    pub const fn min_order(&self) -> usize {
        self.min_order
    }

    /// The largest order, which is the order of the whole arena.
    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    /// The number of orders between `min_order` and `max_order` (inclusive).
    pub const fn order_count(&self) -> usize {
        self.max_order - self.min_order + 1
    }

    /// Size of the smallest block.
    pub const fn page_size(&self) -> usize {
        size_for_order(self.min_order)
    }

    /// Size of the whole arena.
    pub const fn arena_size(&self) -> usize {
        size_for_order(self.max_order)
    }

    /// Number of pages inside the arena.
    pub const fn page_count(&self) -> usize {
        size_for_order(self.max_order - self.min_order)
    }

    /// Calculates the first order where the given `size` would fit in.
    ///
    /// The result is never below `min_order`, but may be larger than
    /// `max_order` if `size` exceeds the arena.
    pub fn order_for_size(&self, size: usize) -> usize {
        let order = match size.checked_next_power_of_two() {
            Some(pow) => pow.trailing_zeros() as usize,
            None => usize::BITS as usize,
        };
        cmp::max(order, self.min_order)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

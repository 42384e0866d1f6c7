//! Errors reported by the allocator.

use displaydoc_lite::displaydoc;

/// Result for every allocator operation.
pub type Result<T, E = Error> = core::result::Result<T, E>;

displaydoc! {
    /// Any error that can happen while allocating or releasing a block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Error {
        /// requested size is zero or larger than the whole arena.
        InvalidSize,
        /// tried to allocate, but no free block is large enough.
        OutOfMemory,
        /// address is not the head of a currently allocated block.
        DoubleFreeOrInvalidAddress,
        /// minimum order is above the maximum order, or the maximum order is too large.
        InvalidConfig,
    }
}

displaydoc! {
    /// Corruption of the allocator's bookkeeping.
    ///
    /// These can only happen if the allocator itself is buggy,
    /// never because of misuse by the caller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum InvariantViolation {
        /// a buddy was computed outside of the arena.
        BuddyOutOfBounds,
        /// a free list contains a block whose order disagrees with the list.
        OrderMismatch,
        /// a block is in a free list but not marked free, or the other way round.
        FreeFlagMismatch,
        /// a block is not aligned to its own size.
        Misaligned,
        /// a page is not covered by any block.
        Gap,
        /// a block head lies inside another block.
        Overlap,
        /// the free lists and the block index disagree on the number of free blocks.
        FreeCountMismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_uses_doc_comment() {
        assert!(Error::OutOfMemory
            .to_string()
            .contains("no free block is large enough"));
        assert!(InvariantViolation::Gap
            .to_string()
            .contains("not covered by any block"));
    }
}

//! The block index: one descriptor per page of the arena.

use bitflags::bitflags;

bitflags! {
    /// State bits of a [`Block`] descriptor.
    pub struct BlockFlags: u8 {
        /// The page is the lowest page of a block.
        const HEAD = 1 << 0;
        /// The block is inside a free list.
        const FREE = 1 << 1;
    }
}

/// Descriptor for a single page.
///
/// Only the descriptor of a block's first page carries the block's order.
/// All other pages of a block are "absorbed" and have no order.
/// `prev` and `next` link the descriptor into the free list of its order.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    order: usize,
    flags: BlockFlags,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl Block {
    /// A descriptor that is not the head of any block.
    pub const ABSORBED: Block = Block {
        order: 0,
        flags: BlockFlags::empty(),
        prev: None,
        next: None,
    };

    /// Returns the order of the block this page is the head of,
    /// or `None` if this page is not a block head.
    pub fn order(&self) -> Option<usize> {
        if self.is_head() {
            Some(self.order)
        } else {
            None
        }
    }

    /// Returns whether this page is the first page of a block.
    pub fn is_head(&self) -> bool {
        self.flags.contains(BlockFlags::HEAD)
    }

    /// Returns whether this page heads a block that is inside a free list.
    pub fn is_free(&self) -> bool {
        self.flags.contains(BlockFlags::FREE)
    }

    /// Returns whether this page heads a free block of exactly `order`.
    pub fn is_free_with_order(&self, order: usize) -> bool {
        self.is_head() && self.is_free() && self.order == order
    }

    /// Returns the raw flags of this descriptor.
    pub fn flags(&self) -> BlockFlags {
        self.flags
    }

    /// Turn this page into the head of a block with the given order.
    ///
    /// The free state is left untouched, it is owned by the free lists.
    pub(crate) fn make_head(&mut self, order: usize) {
        self.order = order;
        self.flags.insert(BlockFlags::HEAD);
    }

    /// This page became part of a bigger block.
    pub(crate) fn absorb(&mut self) {
        debug_assert!(!self.is_free(), "absorbed a block that is still linked");
        *self = Self::ABSORBED;
    }

    pub(crate) fn set_free(&mut self, free: bool) {
        self.flags.set(BlockFlags::FREE, free);
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::ABSORBED
    }
}

//! Intrusive free list, linked through the block index.
//!
//! Instead of storing pointers inside the free memory itself, every
//! [`Block`] descriptor carries a `prev` and `next` page index. This
//! makes removing an arbitrary block (the buddy during a merge) an `O(1)`
//! operation and keeps the arena untouched by the allocator.

use crate::block::Block;

/// Doubly linked list of free blocks with the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeList {
    head: Option<usize>,
    len: usize,
}

impl FreeList {
    /// An empty list.
    pub const EMPTY: FreeList = FreeList { head: None, len: 0 };

    /// Returns whether this list is empty.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the number of blocks in this list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Push the block with the given page index to the front of the list
    /// and mark it free.
    pub fn push(&mut self, blocks: &mut [Block], idx: usize) {
        debug_assert!(!blocks[idx].is_free(), "block {} is already linked", idx);

        if let Some(head) = self.head {
            blocks[head].prev = Some(idx);
        }

        let block = &mut blocks[idx];
        block.prev = None;
        block.next = self.head;
        block.set_free(true);

        self.head = Some(idx);
        self.len += 1;
    }

    /// Removes the first block from this list.
    pub fn pop(&mut self, blocks: &mut [Block]) -> Option<usize> {
        let head = self.head?;
        self.remove(blocks, head);
        Some(head)
    }

    /// Unlink the block with the given page index from this list.
    ///
    /// The block must be part of this list.
    pub fn remove(&mut self, blocks: &mut [Block], idx: usize) {
        debug_assert!(blocks[idx].is_free(), "block {} is not linked", idx);

        let (prev, next) = (blocks[idx].prev, blocks[idx].next);

        match prev {
            Some(prev) => blocks[prev].next = next,
            None => self.head = next,
        }

        if let Some(next) = next {
            blocks[next].prev = prev;
        }

        let block = &mut blocks[idx];
        block.prev = None;
        block.next = None;
        block.set_free(false);

        self.len -= 1;
    }

    /// Returns an iterator over the page indices inside this list.
    pub fn iter<'list>(&self, blocks: &'list [Block]) -> Iter<'list> {
        Iter {
            next: self.head,
            blocks,
        }
    }
}

/// Iterator over the page indices of a [`FreeList`], starting at the head.
pub struct Iter<'list> {
    next: Option<usize>,
    blocks: &'list [Block],
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        self.next = self.blocks[idx].next;
        Some(idx)
    }
}

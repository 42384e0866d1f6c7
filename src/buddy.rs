//! Implementation of a Buddy Allocator that manages a single, fixed
//! arena of `2^max_order` bytes.
//!
//! The arena is handed out in blocks whose size is a power of two. Every
//! block of order `k` starts at an offset that is a multiple of `2^k`,
//! so the two halves of a block (the buddies) only differ in bit `k - 1`
//! of their offset. This is what makes splitting and merging cheap.
//!
//! The bookkeeping lives completely outside of the arena: one [`Block`]
//! descriptor per page, and one [`FreeList`] per order that is linked
//! through those descriptors.

use crate::{
    block::Block,
    config::{size_for_order, Config},
    dump::Dump,
    error::{Error, InvariantViolation, Result},
    free_list::FreeList,
    unit,
};
use alloc::{
    alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout},
    vec,
    vec::Vec,
};
use core::{cmp, ptr::NonNull};

/// The central structure that is responsible for allocating
/// memory using the buddy allocation algorithm.
pub struct BuddyAllocator {
    config: Config,
    arena: NonNull<u8>,
    blocks: Vec<Block>,
    orders: Vec<FreeList>,
}

impl BuddyAllocator {
    /// Create a new allocator with its own arena, described by `config`.
    ///
    /// The arena is aligned to the page size, so every block is aligned to its
    /// own size in absolute terms too. The whole arena starts out as one free block.
    pub fn new(config: Config) -> Self {
        let layout = Self::arena_layout(&config);

        // SAFETY
        // The layout is never zero-sized, the smallest arena is a single byte.
        let arena = unsafe { alloc_zeroed(layout) };
        let arena = match NonNull::new(arena) {
            Some(arena) => arena,
            None => handle_alloc_error(layout),
        };

        log::debug!(
            "Created arena at {:p} with {} ({} pages of {})",
            arena,
            unit::bytes(config.arena_size()),
            config.page_count(),
            unit::bytes(config.page_size()),
        );

        let mut alloc = Self {
            config,
            arena,
            blocks: vec![Block::ABSORBED; config.page_count()],
            orders: vec![FreeList::EMPTY; config.order_count()],
        };
        alloc.init();
        alloc
    }

    fn arena_layout(config: &Config) -> Layout {
        // `Config` guarantees that the arena size fits into an `isize`
        // and the page size is a power of two no larger than it.
        match Layout::from_size_align(config.arena_size(), config.page_size()) {
            Ok(layout) => layout,
            Err(_) => unreachable!("arena size is validated by `Config`"),
        }
    }

    /// Reset this allocator so the whole arena is a single free block
    /// of the maximum order.
    ///
    /// Every outstanding allocation is forgotten.
    pub fn init(&mut self) {
        self.blocks.iter_mut().for_each(|block| *block = Block::ABSORBED);
        self.orders
            .iter_mut()
            .for_each(|list| *list = FreeList::EMPTY);

        let max = self.config.max_order();
        self.blocks[0].make_head(max);
        self.orders[max - self.config.min_order()].push(&mut self.blocks, 0);

        log::debug!("Initialized buddy allocator with a single order {} block", max);
    }

    /// Returns the configuration of this allocator.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Returns the whole arena that is managed by this allocator.
    pub fn arena(&self) -> NonNull<[u8]> {
        NonNull::slice_from_raw_parts(self.arena, self.config.arena_size())
    }

    /// Allocates a block that can hold at least `size` bytes.
    ///
    /// The block has the smallest order that fits `size`, but never less than
    /// the minimum order. The returned slice spans the whole block.
    ///
    /// On failure, the allocator is left untouched.
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<[u8]>> {
        if size == 0 || size > self.config.arena_size() {
            return Err(Error::InvalidSize);
        }

        let order = self.config.order_for_size(size);

        // find the smallest order that has a free block
        let found = (order..=self.config.max_order())
            .find(|&order| !self.free_list(order).is_empty())
            .ok_or_else(|| {
                log::trace!("No free block for order {}", order);
                Error::OutOfMemory
            })?;

        let min = self.config.min_order();
        let idx = match self.orders[found - min].pop(&mut self.blocks) {
            Some(idx) => idx,
            None => unreachable!("free list of order {} was checked to be non-empty", found),
        };

        // walk down from the found order and split the block until it has
        // the requested order. the lower half is always kept and the upper
        // half, the buddy, goes into the free list.
        for lower in (order..found).rev() {
            let buddy = self.buddy_of(idx, lower);
            debug_assert!(buddy < self.blocks.len(), "{}", InvariantViolation::BuddyOutOfBounds);

            log::trace!(
                "Splitting order {} block at page {} into pages {} and {}",
                lower + 1,
                idx,
                idx,
                buddy
            );

            self.blocks[buddy].make_head(lower);
            self.orders[lower - min].push(&mut self.blocks, buddy);
        }

        self.blocks[idx].make_head(order);
        Ok(NonNull::slice_from_raw_parts(
            self.page_ptr(idx),
            size_for_order(order),
        ))
    }

    /// Releases a block that was returned by [`allocate`](Self::allocate).
    ///
    /// `block` must point to the start of the block. Afterwards, the block is
    /// merged with its buddy for as long as the buddy is free too.
    ///
    /// Releasing an address that isn't the start of an allocated block, for example
    /// by releasing the same block twice, fails with
    /// [`Error::DoubleFreeOrInvalidAddress`] and leaves the allocator untouched.
    pub fn release(&mut self, block: NonNull<u8>) -> Result<()> {
        let (mut idx, mut order) = match self.allocated_head(block) {
            Some(head) => head,
            None => {
                log::warn!("Rejected release of {:p}, not an allocated block", block);
                return Err(Error::DoubleFreeOrInvalidAddress);
            }
        };

        let min = self.config.min_order();
        while order < self.config.max_order() {
            let buddy = self.buddy_of(idx, order);
            debug_assert!(buddy < self.blocks.len(), "{}", InvariantViolation::BuddyOutOfBounds);

            // the buddy may be allocated, or split into smaller blocks
            if !self.blocks[buddy].is_free_with_order(order) {
                break;
            }

            log::trace!(
                "Merging order {} blocks at pages {} and {}",
                order,
                idx,
                buddy
            );

            self.orders[order - min].remove(&mut self.blocks, buddy);

            let (lower, upper) = (cmp::min(idx, buddy), cmp::max(idx, buddy));
            self.blocks[upper].absorb();

            idx = lower;
            order += 1;
        }

        self.blocks[idx].make_head(order);
        self.orders[order - min].push(&mut self.blocks, idx);
        Ok(())
    }

    /// Returns the number of free blocks per order.
    ///
    /// The snapshot is also logged at the `info` level.
    pub fn dump(&self) -> Dump {
        let dump = Dump::new(
            self.config.min_order(),
            self.orders.iter().map(FreeList::len).collect(),
        );
        log::info!("{}", dump);
        dump
    }

    /// Returns the offset of `ptr` from the start of the arena,
    /// if `ptr` points to the start of a page inside the arena.
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.arena.as_ptr() as usize)?;
        if offset < self.config.arena_size() && offset % self.config.page_size() == 0 {
            Some(offset)
        } else {
            None
        }
    }

    /// Returns the order of the allocated block that starts at `ptr`.
    pub fn block_order(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.allocated_head(ptr).map(|(_, order)| order)
    }

    /// Verifies that the free lists and the block index describe an exact
    /// partition of the arena into properly aligned blocks.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let min = self.config.min_order();

        // every block inside a free list must be a free head with the list's order
        let mut linked = 0;
        for (offset, list) in self.orders.iter().enumerate() {
            for idx in list.iter(&self.blocks) {
                let block = &self.blocks[idx];
                if !block.is_free() {
                    return Err(InvariantViolation::FreeFlagMismatch);
                }
                if block.order() != Some(min + offset) {
                    return Err(InvariantViolation::OrderMismatch);
                }
                linked += 1;
            }
        }

        // walk the arena block by block
        let mut idx = 0;
        let mut free = 0;
        while idx < self.blocks.len() {
            let block = &self.blocks[idx];
            let order = block.order().ok_or(InvariantViolation::Gap)?;
            if order < min || order > self.config.max_order() {
                return Err(InvariantViolation::OrderMismatch);
            }

            let pages = 1 << (order - min);
            if idx % pages != 0 {
                return Err(InvariantViolation::Misaligned);
            }
            if idx + pages > self.blocks.len() {
                return Err(InvariantViolation::BuddyOutOfBounds);
            }
            if self.blocks[idx + 1..idx + pages].iter().any(|b| b.is_head() || b.is_free()) {
                return Err(InvariantViolation::Overlap);
            }

            if block.is_free() {
                free += 1;
            }
            idx += pages;
        }

        if free != linked {
            return Err(InvariantViolation::FreeCountMismatch);
        }
        Ok(())
    }

    fn free_list(&self, order: usize) -> &FreeList {
        &self.orders[order - self.config.min_order()]
    }

    /// Calculate the page index of the other buddy for the block at `idx`.
    ///
    /// The addresses of two buddies of order `k` only differ in bit `k`.
    fn buddy_of(&self, idx: usize, order: usize) -> usize {
        idx ^ (1 << (order - self.config.min_order()))
    }

    fn page_ptr(&self, idx: usize) -> NonNull<u8> {
        let offset = idx * self.config.page_size();
        // SAFETY
        // `idx` is a valid page index, so the offset stays inside the arena.
        unsafe { NonNull::new_unchecked(self.arena.as_ptr().add(offset)) }
    }

    /// Returns the page index and order of the allocated block at `ptr`.
    fn allocated_head(&self, ptr: NonNull<u8>) -> Option<(usize, usize)> {
        let idx = self.offset_of(ptr)? / self.config.page_size();
        let block = &self.blocks[idx];
        match block.order() {
            Some(order) if !block.is_free() => Some((idx, order)),
            _ => None,
        }
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new(Config::DEFAULT)
    }
}

impl Drop for BuddyAllocator {
    fn drop(&mut self) {
        // SAFETY
        // The arena was allocated in `new` with the very same layout.
        unsafe { dealloc(self.arena.as_ptr(), Self::arena_layout(&self.config)) }
    }
}

// SAFETY
// The allocator exclusively owns its arena, nothing else holds a reference to it.
unsafe impl Send for BuddyAllocator {}

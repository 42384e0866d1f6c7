//! A [`BuddyAllocator`] that can be shared between threads.

use crate::{
    buddy::BuddyAllocator,
    config::Config,
    dump::Dump,
    error::Result,
};
use core::ptr::NonNull;
use spin::{Mutex, MutexGuard};

/// Buddy allocator behind a spin lock.
///
/// Every operation holds the lock for its whole duration, so each call is
/// atomic with respect to all other calls on the same allocator.
pub struct LockedBuddyAllocator(Mutex<BuddyAllocator>);

impl LockedBuddyAllocator {
    /// Create a new allocator with its own arena, described by `config`.
    pub fn new(config: Config) -> Self {
        Self(Mutex::new(BuddyAllocator::new(config)))
    }

    /// Reset the allocator, see [`BuddyAllocator::init`].
    pub fn init(&self) {
        self.0.lock().init()
    }

    /// Allocate a block of at least `size` bytes.
    pub fn allocate(&self, size: usize) -> Result<NonNull<[u8]>> {
        self.0.lock().allocate(size)
    }

    /// Release a block that was returned by [`allocate`](Self::allocate).
    pub fn release(&self, block: NonNull<u8>) -> Result<()> {
        self.0.lock().release(block)
    }

    /// Return the number of free blocks per order.
    pub fn dump(&self) -> Dump {
        self.0.lock().dump()
    }

    /// Lock the allocator to run multiple operations without
    /// interruption.
    pub fn lock(&self) -> MutexGuard<'_, BuddyAllocator> {
        self.0.lock()
    }
}

impl Default for LockedBuddyAllocator {
    fn default() -> Self {
        Self::new(Config::DEFAULT)
    }
}

impl From<BuddyAllocator> for LockedBuddyAllocator {
    fn from(alloc: BuddyAllocator) -> Self {
        Self(Mutex::new(alloc))
    }
}

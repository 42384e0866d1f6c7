//! A binary buddy allocator that manages one fixed arena.
//!
//! The arena is `2^max_order` bytes large and handed out in blocks of
//! `2^order` bytes, where `order` is at least `min_order`. Freed blocks are
//! merged with their buddy, so the arena grows back into larger blocks.
//!
//! ```
//! use buddy_arena::{BuddyAllocator, Config};
//!
//! let mut alloc = BuddyAllocator::new(Config::new(12, 14).unwrap());
//!
//! let block = alloc.allocate(5000).unwrap();
//! assert_eq!(block.len(), 8192);
//!
//! alloc.release(block.cast()).unwrap();
//! assert_eq!(alloc.dump().to_string(), "0:4K 0:8K 1:16K");
//! ```
#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![no_std]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("buddy_arena can only be built for 64 bit targets");

extern crate alloc;

pub mod block;
pub mod buddy;
pub mod config;
pub mod dump;
pub mod error;
pub mod free_list;
pub mod locked;
pub mod unit;

pub use buddy::BuddyAllocator;
pub use config::{Config, MAX_ORDER, MIN_ORDER};
pub use dump::Dump;
pub use error::{Error, InvariantViolation, Result};
pub use locked::LockedBuddyAllocator;

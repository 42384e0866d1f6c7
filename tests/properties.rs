//! Integration tests for the allocate/release behavior of the buddy allocator.

use buddy_arena::{BuddyAllocator, Config, Error, LockedBuddyAllocator, MAX_ORDER, MIN_ORDER};
use std::{ptr::NonNull, sync::Arc, thread};

fn small() -> BuddyAllocator {
    BuddyAllocator::new(Config::new(12, 14).unwrap())
}

fn offset(alloc: &BuddyAllocator, block: NonNull<[u8]>) -> usize {
    alloc.offset_of(block.cast()).unwrap()
}

/// Small deterministic xorshift generator, so the tests don't need extra dependencies.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

#[test]
fn scenario_from_two_allocations() {
    let mut alloc = small();

    let a1 = alloc.allocate(5000).unwrap();
    assert_eq!(a1.len(), 8192);
    assert_eq!(offset(&alloc, a1), 0);
    assert_eq!(alloc.dump().counts(), [0, 1, 0]);

    let a2 = alloc.allocate(3000).unwrap();
    assert_eq!(a2.len(), 4096);
    assert_eq!(offset(&alloc, a2), 8192);
    assert_eq!(alloc.dump().counts(), [1, 0, 0]);

    alloc.release(a1.cast()).unwrap();
    assert_eq!(alloc.dump().counts(), [1, 1, 0]);

    alloc.release(a2.cast()).unwrap();
    let dump = alloc.dump();
    assert_eq!(dump.counts(), [0, 0, 1]);
    assert_eq!(dump.to_string(), "0:4K 0:8K 1:16K");
}

#[test]
fn minimum_order_floor() {
    let mut alloc = BuddyAllocator::default();
    for size in [1, 17, 4095, 4096].iter().copied() {
        let block = alloc.allocate(size).unwrap();
        assert_eq!(block.len(), 1 << MIN_ORDER);
        assert_eq!(alloc.block_order(block.cast()), Some(MIN_ORDER));
        alloc.release(block.cast()).unwrap();
    }
}

#[test]
fn first_split_leaves_one_block_per_order() {
    let mut alloc = BuddyAllocator::default();
    let block = alloc.allocate(1).unwrap();

    let dump = alloc.dump();
    for order in MIN_ORDER..MAX_ORDER {
        assert_eq!(dump.free_blocks(order), 1, "order {}", order);
    }
    assert_eq!(dump.free_blocks(MAX_ORDER), 0);
    assert_eq!(dump.total_free_bytes(), (1 << MAX_ORDER) - (1 << MIN_ORDER));
    assert_eq!(alloc.check_invariants(), Ok(()));

    alloc.release(block.cast()).unwrap();
    assert_eq!(alloc.dump().free_blocks(MAX_ORDER), 1);
}

#[test]
fn round_trip_restores_free_lists() {
    let mut alloc = BuddyAllocator::default();
    let _keep = alloc.allocate(3 * 4096).unwrap();
    let _other = alloc.allocate(70_000).unwrap();

    for size in [1, 4096, 5000, 65536, 100_000, 1 << 19].iter().copied() {
        let before = alloc.dump();
        let block = alloc.allocate(size).unwrap();
        alloc.release(block.cast()).unwrap();
        assert_eq!(alloc.dump(), before, "size {}", size);
    }
}

#[test]
fn exact_fit_reuse_is_stable() {
    let mut alloc = BuddyAllocator::default();
    let first = alloc.allocate(8192).unwrap();
    alloc.release(first.cast()).unwrap();
    let settled = alloc.dump();

    for _ in 0..100 {
        let block = alloc.allocate(8192).unwrap();
        assert_eq!(block.cast::<u8>(), first.cast::<u8>());
        alloc.release(block.cast()).unwrap();
        assert_eq!(alloc.dump(), settled);
    }
}

#[test]
fn releasing_every_page_in_any_order_merges_back() {
    let mut rng = XorShift(0x2545_f491_4f6c_dd1d);

    for round in 0..8 {
        let mut alloc = BuddyAllocator::new(Config::new(12, 17).unwrap());
        let mut blocks = (0..32)
            .map(|_| alloc.allocate(4096).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(alloc.allocate(1), Err(Error::OutOfMemory));
        assert_eq!(alloc.dump().total_free_bytes(), 0);

        // shuffle the release order
        for i in (1..blocks.len()).rev() {
            blocks.swap(i, rng.below(i + 1));
        }

        for block in blocks {
            alloc.release(block.cast()).unwrap();
            assert_eq!(alloc.check_invariants(), Ok(()), "round {}", round);
        }
        assert_eq!(alloc.dump().counts(), [0, 0, 0, 0, 0, 1]);
    }
}

#[test]
fn out_of_memory_leaves_state_unchanged() {
    let mut alloc = small();
    let whole = alloc.allocate(1 << 14).unwrap();
    let before = alloc.dump();

    for size in [1, 4096, 8192, 1 << 14].iter().copied() {
        assert_eq!(alloc.allocate(size), Err(Error::OutOfMemory));
        assert_eq!(alloc.dump(), before);
    }
    assert_eq!(alloc.allocate((1 << 14) + 1), Err(Error::InvalidSize));

    alloc.release(whole.cast()).unwrap();
    assert!(alloc.allocate(1 << 14).is_ok());
}

#[test]
fn double_release_does_not_corrupt() {
    let mut alloc = small();
    let a = alloc.allocate(4096).unwrap();
    alloc.release(a.cast()).unwrap();

    assert_eq!(alloc.release(a.cast()), Err(Error::DoubleFreeOrInvalidAddress));
    assert_eq!(alloc.dump().counts(), [0, 0, 1]);

    // the arena is still usable as a whole
    let whole = alloc.allocate(1 << 14).unwrap();
    assert_eq!(offset(&alloc, whole), 0);
}

#[test]
fn random_workload_keeps_partition() {
    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    let mut alloc = BuddyAllocator::default();
    let mut live: Vec<NonNull<[u8]>> = Vec::new();

    for _ in 0..2_000 {
        if live.is_empty() || rng.below(3) != 0 {
            let size = 1 + rng.below(1 << 17);
            match alloc.allocate(size) {
                Ok(block) => {
                    assert!(block.len() >= size);
                    let start = offset(&alloc, block);
                    assert_eq!(start % block.len(), 0, "block not aligned to its size");
                    live.push(block);
                }
                Err(err) => assert_eq!(err, Error::OutOfMemory),
            }
        } else {
            let block = live.swap_remove(rng.below(live.len()));
            alloc.release(block.cast()).unwrap();
        }

        assert_eq!(alloc.check_invariants(), Ok(()));
        let used = live.iter().map(|block| block.len()).sum::<usize>();
        assert_eq!(alloc.dump().total_free_bytes() + used, 1 << MAX_ORDER);
    }

    for block in live {
        alloc.release(block.cast()).unwrap();
    }
    assert_eq!(alloc.dump().free_blocks(MAX_ORDER), 1);
}

#[test]
fn blocks_are_writable_and_disjoint() {
    let mut alloc = small();
    let a = alloc.allocate(8192).unwrap();
    let b = alloc.allocate(4096).unwrap();
    let c = alloc.allocate(4096).unwrap();

    unsafe {
        (*a.as_ptr()).fill(0xaa);
        (*b.as_ptr()).fill(0xbb);
        (*c.as_ptr()).fill(0xcc);

        assert!((*a.as_ptr()).iter().all(|&byte| byte == 0xaa));
        assert!((*b.as_ptr()).iter().all(|&byte| byte == 0xbb));
        assert!((*c.as_ptr()).iter().all(|&byte| byte == 0xcc));
    }
}

#[test]
fn locked_allocator_across_threads() {
    let alloc = Arc::new(LockedBuddyAllocator::new(Config::new(12, 18).unwrap()));

    let handles = (0..4)
        .map(|_| {
            let alloc = Arc::clone(&alloc);
            thread::spawn(move || {
                for _ in 0..200 {
                    let block = alloc.allocate(4096).unwrap();
                    alloc.release(block.cast()).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(alloc.dump().free_blocks(18), 1);
    assert_eq!(alloc.lock().check_invariants(), Ok(()));
}

//! Buddy allocator: address-arithmetic coalescing of freed blocks.
//!
//! For a block of order `k` at pool-relative offset `o`, the buddy is the
//! block at `o ^ 2^k`. A freed block merges with its buddy whenever both
//! are free at equal order, and the merged block keeps cascading upward
//! until its buddy is live or the pool order is reached. Only the
//! arithmetic buddy ever merges; an unrelated adjacent free block of the
//! same order never does, which keeps the free lists consistent with a
//! binary buddy tree.

use alloc::vec::Vec;
use core::ptr::NonNull;

#[cfg(feature = "log")]
use log::{debug, error, info, warn};

use crate::free_list::FreeList;
use crate::order::{block_size, checked_round_up_pow2, order_of};
use crate::pool::RawPool;
use crate::{AllocError, AllocResult, ByteAllocator};

/// Coalescing power-of-two allocator.
///
/// Carries no per-byte metadata: block sizes are derived from the free
/// list a block occupies, and the caller supplies the original byte count
/// on deallocation.
#[derive(Debug)]
pub struct BuddyAllocator {
    pool: RawPool,
    /// Free lists for each order, index 0..=max_order.
    free_lists: Vec<FreeList>,
    max_order: usize,
    used_bytes: usize,
}

impl BuddyAllocator {
    /// Create an allocator whose pool is `byte_count` rounded up to the
    /// next power of two, zero-initialized, with the whole pool seeded as
    /// one maximal free block.
    pub fn new(byte_count: usize) -> AllocResult<Self> {
        if byte_count == 0 {
            return Err(AllocError::InvalidParam);
        }
        let pool_size = checked_round_up_pow2(byte_count).ok_or(AllocError::InvalidParam)?;
        let max_order = order_of(pool_size);
        let pool = RawPool::new(pool_size)?;

        let mut free_lists: Vec<FreeList> = (0..=max_order).map(|_| FreeList::new()).collect();
        free_lists[max_order].insert(0);

        Ok(Self {
            pool,
            free_lists,
            max_order,
            used_bytes: 0,
        })
    }

    /// Create an allocator sized for `block_count` blocks of `block_size`
    /// bytes each.
    pub fn with_block_size(block_count: usize, block_size: usize) -> AllocResult<Self> {
        let byte_count = block_count
            .checked_mul(block_size)
            .ok_or(AllocError::InvalidParam)?;
        Self::new(byte_count)
    }

    /// Order of the pool itself; the pool is `2^max_order` bytes.
    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    /// Allocate a block of at least `bytes_needed` bytes.
    ///
    /// The request is rounded up to a power of two. When no block of the
    /// required order is free, the smallest free larger block is split
    /// down: each halving pushes the right buddy onto the next-lower free
    /// list; the left half at the target order is returned directly and
    /// never re-inserted.
    pub fn allocate(&mut self, bytes_needed: usize) -> AllocResult<NonNull<u8>> {
        if bytes_needed == 0 {
            return Err(AllocError::InvalidParam);
        }
        let rounded = checked_round_up_pow2(bytes_needed).ok_or(AllocError::NoMemory)?;
        let order_needed = order_of(rounded);
        if order_needed > self.max_order {
            return Err(AllocError::NoMemory);
        }

        // Smallest non-empty order that can satisfy the request.
        let order = (order_needed..=self.max_order)
            .find(|&o| !self.free_lists[o].is_empty())
            .ok_or(AllocError::NoMemory)?;

        let offset = match self.free_lists[order].pop_front() {
            Some(offset) => offset,
            None => return Err(AllocError::NoMemory),
        };

        // Split down to the required order, releasing each right buddy at
        // its order.
        let mut current = order;
        while current > order_needed {
            current -= 1;
            self.free_lists[current].insert(offset + block_size(current));
        }

        self.used_bytes += rounded;
        Ok(self.pool.at(offset))
    }

    /// Free the block of `byte_count` bytes starting at `ptr`.
    ///
    /// `byte_count` is rounded up to the power of two the block was
    /// allocated with; supplying a different size corrupts no state but is
    /// rejected when it makes the offset misaligned for its order. Freed
    /// blocks cascade-merge with their buddies. Returns the rounded byte
    /// count freed.
    ///
    /// A `byte_count` whose order is not below the pool's own order is
    /// rejected: no buddy can exist at or above `max_order`.
    ///
    /// The guards only detect a repeated free at the same order. An
    /// aligned in-pool pointer that was never allocated, or whose block
    /// was freed and has since merged upward, passes them and breaks the
    /// free-list partition. Without per-block metadata the allocator
    /// cannot tell such a pointer from a live one; the caller must only
    /// free what [`allocate`](Self::allocate) returned, once.
    pub fn deallocate(&mut self, ptr: NonNull<u8>, byte_count: usize) -> AllocResult<usize> {
        if byte_count == 0 {
            return Err(AllocError::InvalidParam);
        }
        let rounded = checked_round_up_pow2(byte_count).ok_or(AllocError::InvalidParam)?;
        let order = order_of(rounded);
        if order >= self.max_order {
            error!(
                "buddy allocator: deallocate order {} not below max order {}",
                order, self.max_order
            );
            return Err(AllocError::InvalidParam);
        }

        let offset = self.pool.offset_of(ptr).ok_or(AllocError::NotAllocated)?;
        if offset & (rounded - 1) != 0 {
            error!(
                "buddy allocator: offset {:#x} is not aligned to its block size {:#x}",
                offset, rounded
            );
            return Err(AllocError::NotAllocated);
        }
        if self.free_lists[order].contains(offset) {
            warn!(
                "buddy allocator: double free at offset {:#x}, order {}",
                offset, order
            );
            return Err(AllocError::NotAllocated);
        }

        let (merged_offset, merged_order) = self.merge_from(offset, order);
        let inserted = self.free_lists[merged_order].insert(merged_offset);
        debug_assert!(inserted, "merged block was already free");

        self.used_bytes = self.used_bytes.saturating_sub(rounded);
        Ok(rounded)
    }

    /// Cascade-merge a just-freed block with its buddies.
    ///
    /// While the arithmetic buddy is free at the same order, remove it and
    /// promote the pair to the next order up, keeping the lower of the two
    /// offsets. Stops when the buddy is live or `max_order` is reached.
    /// Returns the offset and order of the block to insert.
    fn merge_from(&mut self, mut offset: usize, mut order: usize) -> (usize, usize) {
        while order < self.max_order {
            let buddy = offset ^ block_size(order);
            if !self.free_lists[order].remove(buddy) {
                break;
            }
            debug!(
                "buddy allocator: merged {:#x} and {:#x} at order {}",
                offset, buddy, order
            );
            // The merged block starts at the lower of the two offsets.
            offset &= buddy;
            order += 1;
        }
        (offset, order)
    }

    /// Number of free blocks currently held at `order`.
    pub fn free_block_count(&self, order: usize) -> usize {
        if order <= self.max_order {
            self.free_lists[order].len()
        } else {
            0
        }
    }

    /// Offsets of the free blocks at `order`, ascending by address.
    pub fn free_blocks(&self, order: usize) -> impl Iterator<Item = usize> + '_ {
        self.free_lists[order].iter()
    }

    /// Log a human-readable snapshot of the free lists per order.
    pub fn print_free_lists(&self) {
        info!("=========== BuddyAllocator Free Lists ===========");
        info!(
            "pool size: {:#x}, max order: {}, used: {} bytes",
            self.pool.size(),
            self.max_order,
            self.used_bytes
        );
        for (_order, _list) in self.free_lists.iter().enumerate() {
            if !_list.is_empty() {
                info!(
                    "  order {:2}: {} blocks ({} bytes each)",
                    _order,
                    _list.len(),
                    block_size(_order)
                );
            }
        }
        info!("=================================================");
    }

    /// Get a point-in-time usage snapshot.
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> crate::stats::AllocStats {
        crate::stats::AllocStats::collect(self.pool.size(), self.used_bytes, &self.free_lists)
    }
}

impl ByteAllocator for BuddyAllocator {
    fn alloc(&mut self, bytes_needed: usize) -> AllocResult<NonNull<u8>> {
        self.allocate(bytes_needed)
    }

    fn dealloc(&mut self, ptr: NonNull<u8>, bytes: usize) -> AllocResult<usize> {
        self.deallocate(ptr, bytes)
    }

    fn total_bytes(&self) -> usize {
        self.pool.size()
    }

    fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn available_bytes(&self) -> usize {
        self.pool.size() - self.used_bytes
    }
}

//! Order-indexed allocator: per-slot taken sizes, no coalescing.
//!
//! Splitting halves oversized blocks down to the requested order, the same
//! way the buddy variant does. Freeing only pushes the block back onto its
//! order's free list: buddy-adjacent freed blocks stay separate until they
//! are independently reused.

use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;

#[cfg(feature = "log")]
use log::{info, warn};

use crate::free_list::FreeList;
use crate::order::{block_size, checked_round_up_pow2, order_of};
use crate::pool::RawPool;
use crate::{AllocError, AllocResult, ByteAllocator};

/// Order-indexed power-of-two allocator.
///
/// Keeps one metadata slot per byte offset of the pool; the slot at a
/// block's starting offset holds the block's rounded size while the block
/// is live. That lets deallocation recover the block size from the pointer
/// alone, at the cost of one `usize` per pool byte.
#[derive(Debug)]
pub struct BinaryAllocator {
    pool: RawPool,
    /// Rounded size of the live allocation starting at each byte offset,
    /// 0 everywhere else.
    taken: Vec<usize>,
    /// Free lists for each order, index 0..=max_order.
    free_lists: Vec<FreeList>,
    max_order: usize,
    used_bytes: usize,
}

impl BinaryAllocator {
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
            taken: vec![0; pool_size],
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
    /// down: each halving pushes the right half onto the next-lower free
    /// list and keeps the left half.
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

        // Split down to the required order, releasing the right half of
        // each halving at its order.
        let mut current = order;
        while current > order_needed {
            current -= 1;
            self.free_lists[current].insert(offset + block_size(current));
        }

        self.taken[offset] = rounded;
        self.used_bytes += rounded;
        Ok(self.pool.at(offset))
    }

    /// Free the allocation starting at `ptr`.
    ///
    /// Returns the rounded byte count freed. The block goes back onto the
    /// free list of its own order; no merging ever happens. Pointers that
    /// do not mark the start of a live allocation are rejected with
    /// [`AllocError::NotAllocated`] and mutate nothing.
    pub fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<usize> {
        let offset = self.pool.offset_of(ptr).ok_or(AllocError::NotAllocated)?;
        let taken = self.taken[offset];
        if taken == 0 {
            warn!(
                "binary allocator: deallocate of non-live pointer at offset {:#x}",
                offset
            );
            return Err(AllocError::NotAllocated);
        }

        self.taken[offset] = 0;
        self.free_lists[order_of(taken)].insert(offset);
        self.used_bytes -= taken;
        Ok(taken)
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
        info!("========== BinaryAllocator Free Lists ==========");
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
        info!("================================================");
    }

    /// Get a point-in-time usage snapshot.
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> crate::stats::AllocStats {
        crate::stats::AllocStats::collect(self.pool.size(), self.used_bytes, &self.free_lists)
    }
}

impl ByteAllocator for BinaryAllocator {
    fn alloc(&mut self, bytes_needed: usize) -> AllocResult<NonNull<u8>> {
        self.allocate(bytes_needed)
    }

    fn dealloc(&mut self, ptr: NonNull<u8>, _bytes: usize) -> AllocResult<usize> {
        // The per-slot metadata recovers the size; the caller-supplied
        // byte count is not needed.
        self.deallocate(ptr)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rounds_up() {
        let ba = BinaryAllocator::new(1000).unwrap();
        assert_eq!(ba.total_bytes(), 1024);
        assert_eq!(ba.max_order(), 10);
        assert_eq!(ba.free_block_count(10), 1);
        assert_eq!(ba.used_bytes(), 0);
    }

    #[test]
    fn test_with_block_size() {
        let ba = BinaryAllocator::with_block_size(4, 256).unwrap();
        assert_eq!(ba.total_bytes(), 1024);

        assert_eq!(
            BinaryAllocator::with_block_size(usize::MAX, 2).unwrap_err(),
            AllocError::InvalidParam
        );
    }

    #[test]
    fn test_zero_size_rejected() {
        assert_eq!(
            BinaryAllocator::new(0).unwrap_err(),
            AllocError::InvalidParam
        );
        let mut ba = BinaryAllocator::new(64).unwrap();
        assert_eq!(ba.allocate(0).unwrap_err(), AllocError::InvalidParam);
    }

    #[test]
    fn test_split_releases_right_halves() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        let ptr = ba.allocate(50).unwrap();

        // 50 rounds to 64 (order 6); splitting the maximal block leaves
        // one free right half at each order 6..=9.
        assert_eq!(ba.used_bytes(), 64);
        assert_eq!(ptr, ba_base(&ba));
        for order in 6..=9 {
            assert_eq!(ba.free_block_count(order), 1);
            assert_eq!(ba.free_blocks(order).next(), Some(block_size(order)));
        }
        assert_eq!(ba.free_block_count(10), 0);
    }

    #[test]
    fn test_no_coalescing_on_free() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        let a = ba.allocate(64).unwrap();
        let b = ba.allocate(64).unwrap();

        // a and b are buddies at order 6.
        assert_eq!(ba.deallocate(a).unwrap(), 64);
        assert_eq!(ba.deallocate(b).unwrap(), 64);

        // Two separate order-6 entries, never merged into an order-7 block.
        assert_eq!(ba.free_block_count(6), 2);
        assert_eq!(ba.free_block_count(7), 1);
        assert_eq!(ba.used_bytes(), 0);
    }

    #[test]
    fn test_deallocate_returns_rounded_size() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        let ptr = ba.allocate(100).unwrap();
        assert_eq!(ba.deallocate(ptr).unwrap(), 128);
    }

    #[test]
    fn test_double_free_rejected() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        let ptr = ba.allocate(64).unwrap();
        assert_eq!(ba.deallocate(ptr).unwrap(), 64);
        assert_eq!(ba.deallocate(ptr).unwrap_err(), AllocError::NotAllocated);
        assert_eq!(ba.used_bytes(), 0);
    }

    #[test]
    fn test_foreign_and_interior_pointers_rejected() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        let ptr = ba.allocate(64).unwrap();

        let mut local = 0u8;
        let foreign = NonNull::from(&mut local);
        assert_eq!(ba.deallocate(foreign).unwrap_err(), AllocError::NotAllocated);

        let interior = unsafe { NonNull::new_unchecked(ptr.as_ptr().add(1)) };
        assert_eq!(
            ba.deallocate(interior).unwrap_err(),
            AllocError::NotAllocated
        );

        // The live allocation is untouched by the rejected calls.
        assert_eq!(ba.used_bytes(), 64);
        assert_eq!(ba.deallocate(ptr).unwrap(), 64);
    }

    #[test]
    fn test_exhaustion_is_clean() {
        let mut ba = BinaryAllocator::new(64).unwrap();
        let ptr = ba.allocate(64).unwrap();
        assert_eq!(ba.allocate(64).unwrap_err(), AllocError::NoMemory);
        assert_eq!(ba.allocate(1).unwrap_err(), AllocError::NoMemory);

        assert_eq!(ba.deallocate(ptr).unwrap(), 64);
        assert!(ba.allocate(64).is_ok());
    }

    #[test]
    fn test_oversized_request_fails() {
        let mut ba = BinaryAllocator::new(1024).unwrap();
        assert_eq!(ba.allocate(2048).unwrap_err(), AllocError::NoMemory);
        assert_eq!(ba.allocate(usize::MAX).unwrap_err(), AllocError::NoMemory);
    }

    #[test]
    fn test_freed_block_is_reused() {
        let mut ba = BinaryAllocator::new(256).unwrap();
        let a = ba.allocate(64).unwrap();
        let _b = ba.allocate(64).unwrap();
        ba.deallocate(a).unwrap();

        // Lowest-addressed free block of the order is handed out first.
        let c = ba.allocate(64).unwrap();
        assert_eq!(c, a);
    }

    fn ba_base(ba: &BinaryAllocator) -> NonNull<u8> {
        ba.pool.base()
    }
}

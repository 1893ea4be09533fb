//! Usage statistics, gated behind the `tracking` feature.

use alloc::vec::Vec;

use crate::free_list::FreeList;
use crate::order::block_size;

/// Point-in-time usage snapshot of one allocator instance.
#[derive(Debug, Clone, Default)]
pub struct AllocStats {
    pub total_bytes: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    /// Free block count per order, index 0..=max_order.
    pub free_blocks_by_order: Vec<usize>,
}

impl AllocStats {
    pub(crate) fn collect(total_bytes: usize, used_bytes: usize, free_lists: &[FreeList]) -> Self {
        let free_blocks_by_order: Vec<usize> = free_lists.iter().map(FreeList::len).collect();
        let free_bytes = free_blocks_by_order
            .iter()
            .enumerate()
            .map(|(order, &count)| count * block_size(order))
            .sum();
        Self {
            total_bytes,
            used_bytes,
            free_bytes,
            free_blocks_by_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinaryAllocator, BuddyAllocator, ByteAllocator};

    #[test]
    fn test_stats_track_partition() {
        let mut ba = BuddyAllocator::new(1024).unwrap();
        let ptr = ba.allocate(100).unwrap();

        let stats = ba.stats();
        assert_eq!(stats.total_bytes, 1024);
        assert_eq!(stats.used_bytes, 128);
        assert_eq!(stats.free_bytes, 1024 - 128);
        assert_eq!(stats.free_blocks_by_order.len(), 11);

        ba.deallocate(ptr, 100).unwrap();
        let stats = ba.stats();
        assert_eq!(stats.used_bytes, 0);
        assert_eq!(stats.free_bytes, 1024);
        assert_eq!(stats.free_blocks_by_order[10], 1);
    }

    #[test]
    fn test_stats_binary_variant() {
        let mut ba = BinaryAllocator::new(256).unwrap();
        let _ptr = ba.allocate(32).unwrap();

        let stats = ba.stats();
        assert_eq!(stats.used_bytes, 32);
        assert_eq!(stats.used_bytes + stats.free_bytes, ba.total_bytes());
    }
}

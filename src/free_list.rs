//! Per-order collections of free-block offsets.

use alloc::vec::Vec;

/// Free blocks of a single order, stored as pool-relative offsets kept
/// sorted ascending by address.
///
/// Sorted storage makes buddy lookup a binary search and makes allocation
/// prefer the lowest-addressed free block, the same discipline a sorted
/// linked free list gives but with no node allocation on split or merge.
/// An offset appears in at most one list across all orders at any time.
#[derive(Debug, Default)]
pub struct FreeList {
    offsets: Vec<usize>,
}

impl FreeList {
    /// Create a new empty free list.
    pub const fn new() -> Self {
        Self {
            offsets: Vec::new(),
        }
    }

    /// Insert an offset, keeping sort order.
    ///
    /// Returns `false` if the offset is already present, which means the
    /// caller tried to free a block that is already free.
    pub fn insert(&mut self, offset: usize) -> bool {
        match self.offsets.binary_search(&offset) {
            Ok(_) => false,
            Err(pos) => {
                self.offsets.insert(pos, offset);
                true
            }
        }
    }

    /// Remove and return the lowest offset.
    pub fn pop_front(&mut self) -> Option<usize> {
        if self.offsets.is_empty() {
            None
        } else {
            Some(self.offsets.remove(0))
        }
    }

    /// Whether `offset` is currently free at this order.
    pub fn contains(&self, offset: usize) -> bool {
        self.offsets.binary_search(&offset).is_ok()
    }

    /// Remove a specific offset. Returns `false` if it was not present.
    pub fn remove(&mut self, offset: usize) -> bool {
        match self.offsets.binary_search(&offset) {
            Ok(pos) => {
                self.offsets.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Number of free blocks at this order.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offsets in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.offsets.iter().copied()
    }
}

//! Owned backing storage for an allocator instance.

use alloc::alloc::{alloc_zeroed, dealloc};
use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{AllocError, AllocResult};

/// A contiguous, zero-initialized byte buffer owned by one allocator.
///
/// The buffer is allocated once at construction and released exactly once
/// when the pool is dropped. All block bookkeeping works in pool-relative
/// offsets; this type is the only place that touches raw pointers.
#[derive(Debug)]
pub struct RawPool {
    base: NonNull<u8>,
    layout: Layout,
}

impl RawPool {
    /// Allocate a zeroed pool of `size` bytes.
    ///
    /// Failure of the backing allocation is a construction failure, not a
    /// recoverable per-call error: there is no allocator to operate on.
    pub fn new(size: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::InvalidParam);
        }
        let layout = Layout::from_size_align(size, core::mem::align_of::<usize>())
            .map_err(|_| AllocError::InvalidParam)?;
        let ptr = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(AllocError::NoMemory)?;
        Ok(Self { base, layout })
    }

    /// Pool size in bytes.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Base address of the pool.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Pointer to the byte at `offset`.
    ///
    /// `offset` must lie within the pool.
    pub fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.size());
        // SAFETY: base is a live allocation of self.size() bytes and the
        // caller keeps offset in bounds.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    /// Pool-relative offset of `ptr`, or `None` if it lies outside the pool.
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let base = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        if addr < base || addr >= base + self.size() {
            None
        } else {
            Some(addr - base)
        }
    }
}

impl Drop for RawPool {
    fn drop(&mut self) {
        // SAFETY: base was allocated with exactly this layout in new().
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_zero_initialized() {
        let pool = RawPool::new(64).unwrap();
        for offset in 0..64 {
            assert_eq!(unsafe { pool.at(offset).as_ptr().read() }, 0);
        }
    }

    #[test]
    fn test_pool_zero_size_rejected() {
        assert_eq!(RawPool::new(0).unwrap_err(), AllocError::InvalidParam);
    }

    #[test]
    fn test_offset_round_trip() {
        let pool = RawPool::new(128).unwrap();
        for offset in [0usize, 1, 63, 127] {
            assert_eq!(pool.offset_of(pool.at(offset)), Some(offset));
        }
    }

    #[test]
    fn test_foreign_pointer_has_no_offset() {
        let pool = RawPool::new(64).unwrap();
        let mut local = 0u8;
        let foreign = NonNull::from(&mut local);
        assert_eq!(pool.offset_of(foreign), None);
    }
}

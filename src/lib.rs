//! Power-of-two block memory allocators.
//!
//! Two engines share one model -- a pool of `2^max_order` bytes and one
//! free list per order -- but differ in coalescing policy:
//! - [`BinaryAllocator`]: order-indexed; tracks the taken size of every
//!   allocation in per-slot metadata and never merges freed blocks.
//! - [`BuddyAllocator`]: locates a freed block's buddy by address
//!   arithmetic and recursively merges free buddy pairs back into
//!   larger blocks.
//!
//! Both variants round every request up to the next power of two and are
//! designed for single-threaded use: free-list mutation has no internal
//! synchronization and assumes exclusive access.

#![no_std]

extern crate alloc;

use core::ptr::NonNull;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid `size` parameter (zero, overflowing, or an order the pool
    /// cannot represent).
    InvalidParam,
    /// No free block of sufficient order exists.
    NoMemory,
    /// The pointer does not refer to a live allocation of this pool.
    NotAllocated,
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Byte-granularity allocator over a fixed power-of-two pool.
///
/// Both allocator variants implement this trait. Exhaustion is a normal
/// outcome signalled through [`AllocError::NoMemory`], never a fault.
pub trait ByteAllocator {
    /// Allocate a block of at least `bytes_needed` bytes.
    ///
    /// The request is rounded up to the next power of two internally.
    fn alloc(&mut self, bytes_needed: usize) -> AllocResult<NonNull<u8>>;

    /// Deallocate the block starting at `ptr`.
    ///
    /// `bytes` is the size originally requested. Variants that keep their
    /// own per-slot metadata ignore it. Returns the rounded byte count
    /// actually freed.
    fn dealloc(&mut self, ptr: NonNull<u8>, bytes: usize) -> AllocResult<usize>;

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes.
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

// Export our allocator implementations
pub mod binary;
pub mod buddy;
pub mod free_list;
pub mod order;
pub mod pool;
#[cfg(feature = "tracking")]
pub mod stats;

pub use binary::BinaryAllocator;
pub use buddy::BuddyAllocator;
pub use free_list::FreeList;
pub use order::{block_size, checked_round_up_pow2, order_of, round_up_pow2};
pub use pool::RawPool;
#[cfg(feature = "tracking")]
pub use stats::AllocStats;

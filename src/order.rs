//! Power-of-two arithmetic shared by both allocator variants.
//!
//! An *order* is the exponent `k` such that a block's size is `2^k` bytes.

/// Smallest power of two that is `>= n`.
///
/// `round_up_pow2(0)` is 1: the smallest representable block still holds
/// one byte. For all `n >= 1` the result is a power of two, at least `n`,
/// and less than `2 * n`.
#[inline]
pub const fn round_up_pow2(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// Overflow-checked [`round_up_pow2`].
///
/// Returns `None` when the next power of two does not fit in `usize`.
#[inline]
pub const fn checked_round_up_pow2(n: usize) -> Option<usize> {
    if n == 0 {
        Some(1)
    } else {
        n.checked_next_power_of_two()
    }
}

/// Order of the smallest power-of-two block that can hold `n` bytes.
#[inline]
pub const fn order_of(n: usize) -> usize {
    round_up_pow2(n).trailing_zeros() as usize
}

/// Size in bytes of a block of the given order.
#[inline]
pub const fn block_size(order: usize) -> usize {
    1 << order
}

//! Constant-time comparisons for secret-derived bytes
//!
//! The PRR noise decision compares bytes of `HMAC(secret, value)` against a
//! threshold, and the mask sources compare fresh entropy bytes the same way. Both
//! outcomes are part of what the report hides, so the comparisons avoid branching
//! on the byte values.
//!
//! These primitives protect against timing side-channels but NOT cache side-channels.

/// Returns 1 if a < b, 0 otherwise (constant-time)
#[inline]
pub fn ct_lt_u64(a: u64, b: u64) -> u64 {
    // Compute borrow bit of a - b
    let borrow = ((!a) & b) | (((!a) ^ b) & a.wrapping_sub(b));
    borrow >> 63
}

/// Returns 1 if `byte < threshold`, 0 otherwise.
///
/// `threshold` may exceed `u8::MAX` (a probability of 1.0 maps to 256), in which
/// case every byte is below it.
#[inline]
pub fn ct_byte_below(byte: u8, threshold: u64) -> u64 {
    ct_lt_u64(u64::from(byte), threshold)
}

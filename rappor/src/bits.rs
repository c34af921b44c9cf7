//! Fixed-width bit-vector used for every stage of a report.
//!
//! A `Bits` value carries its width alongside the raw `u64`. Every constructor and
//! every operator (`&`, `|`, `!`) re-applies the width mask, so bits at positions
//! `>= width` are always zero. This matters for `!`, which would otherwise flip the unused high
//! bits of the backing integer.

use std::fmt::{self, Binary, Display, Formatter};
use std::ops::{BitAnd, BitOr, Not};

/// Capacity of the backing integer.
pub const MAX_BITS: u32 = u64::BITS;

/// Mask with the low `width` bits set. Widths above `MAX_BITS` saturate.
#[inline]
pub fn width_mask(width: u32) -> u64 {
    if width >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bits {
    raw: u64,
    width: u32,
}

impl Bits {
    /// Build a bit-vector of `width` bits, dropping anything above the width.
    pub fn new(raw: u64, width: u32) -> Self {
        let width = width.min(MAX_BITS);
        Self {
            raw: raw & width_mask(width),
            width,
        }
    }

    pub fn zero(width: u32) -> Self {
        Self::new(0, width)
    }

    pub fn ones(width: u32) -> Self {
        Self::new(u64::MAX, width)
    }

    /// Returns a copy with bit `index` set. Indices outside the width are ignored.
    #[inline]
    pub fn with_bit(self, index: u32) -> Self {
        if index >= self.width {
            return self;
        }
        Self {
            raw: self.raw | (1u64 << index),
            width: self.width,
        }
    }

    #[inline]
    pub fn get(&self, index: u32) -> bool {
        index < self.width && (self.raw >> index) & 1 == 1
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.raw
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn count_ones(&self) -> u32 {
        self.raw.count_ones()
    }

    /// Reinterpret at a different width, truncating if it shrinks.
    pub fn resize(self, width: u32) -> Self {
        Self::new(self.raw, width)
    }

    /// Bitwise choice: positions set in `mask` come from `if_set`, the rest from
    /// `if_clear`. Both the PRR and IRR steps are instances of this.
    #[inline]
    pub fn select(mask: Bits, if_set: Bits, if_clear: Bits) -> Bits {
        (if_set & mask) | (if_clear & !mask)
    }
}

impl BitAnd for Bits {
    type Output = Bits;

    fn bitand(self, rhs: Bits) -> Bits {
        debug_assert_eq!(self.width, rhs.width, "bit-vector width mismatch");
        Bits::new(self.raw & rhs.raw, self.width)
    }
}

impl BitOr for Bits {
    type Output = Bits;

    fn bitor(self, rhs: Bits) -> Bits {
        debug_assert_eq!(self.width, rhs.width, "bit-vector width mismatch");
        Bits::new(self.raw | rhs.raw, self.width)
    }
}

impl Not for Bits {
    type Output = Bits;

    fn not(self) -> Bits {
        Bits::new(!self.raw, self.width)
    }
}

/// Most significant bit first, zero-padded to the width.
impl Display for Bits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let width = self.width as usize;
        write!(f, "{:0width$b}", self.raw)
    }
}

impl Binary for Bits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Binary::fmt(&self.raw, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_masks_high_bits() {
        let b = Bits::new(0xFFFF, 8);
        assert_eq!(b.raw(), 0xFF);
        assert_eq!(b.width(), 8);
    }

    #[test]
    fn test_not_stays_in_width() {
        let b = Bits::new(0b0010_1000, 8);
        assert_eq!((!b).raw(), 0b1101_0111);
        assert_eq!((!Bits::zero(12)).raw(), 0x0FFF);
    }

    #[test]
    fn test_full_width() {
        assert_eq!(Bits::ones(64).raw(), u64::MAX);
        assert_eq!((!Bits::zero(64)).raw(), u64::MAX);
        assert_eq!(Bits::new(7, 200).width(), MAX_BITS);
    }

    #[test]
    fn test_with_bit_ignores_out_of_range() {
        let b = Bits::zero(8).with_bit(3).with_bit(5).with_bit(8).with_bit(63);
        assert_eq!(b.raw(), 0b0010_1000);
        assert!(b.get(3));
        assert!(!b.get(4));
        assert!(!b.get(8));
        assert_eq!(b.count_ones(), 2);
    }

    #[test]
    fn test_display_pads_to_width() {
        assert_eq!(Bits::new(0b101, 8).to_string(), "00000101");
        assert_eq!(Bits::zero(16).to_string(), "0000000000000000");
        assert_eq!(format!("{:#b}", Bits::new(5, 8)), "0b101");
    }

    #[test]
    fn test_select() {
        let mask = Bits::new(0b1111_0000, 8);
        let a = Bits::new(0b1010_1010, 8);
        let b = Bits::new(0b0101_0101, 8);
        assert_eq!(Bits::select(mask, a, b).raw(), 0b1010_0101);
    }

    proptest! {
        #[test]
        fn prop_ops_never_exceed_width(a: u64, b: u64, width in 0u32..=64) {
            let x = Bits::new(a, width);
            let y = Bits::new(b, width);
            let limit = width_mask(width);
            prop_assert_eq!((x & y).raw() & !limit, 0);
            prop_assert_eq!((x | y).raw() & !limit, 0);
            prop_assert_eq!((!x).raw() & !limit, 0);
        }

        #[test]
        fn prop_select_matches_per_bit(m: u64, a: u64, b: u64, width in 1u32..=64) {
            let mask = Bits::new(m, width);
            let out = Bits::select(mask, Bits::new(a, width), Bits::new(b, width));
            for i in 0..width {
                let expected = if mask.get(i) { (a >> i) & 1 == 1 } else { (b >> i) & 1 == 1 };
                prop_assert_eq!(out.get(i), expected);
            }
        }
    }
}

//! Kani proofs and proptest harnesses for the encoder's bit-level invariants.
//!
//! - Bits masking and select (Kani - pure integer arithmetic)
//! - Bloom range, PRR determinism and identity (proptest - MD5/HMAC make Kani infeasible)
//!
//! Run with: `cargo kani --tests`

#[cfg(kani)]
mod kani_harnesses {
    use crate::bits::{width_mask, Bits};

    /// Proof: no operator can set a bit at or above the width
    #[kani::proof]
    fn proof_bits_stay_in_width() {
        let a: u64 = kani::any();
        let b: u64 = kani::any();
        let width: u32 = kani::any();
        kani::assume(width <= 64);

        let x = Bits::new(a, width);
        let y = Bits::new(b, width);
        let outside = !width_mask(width);
        kani::assert((!x).raw() & outside == 0, "not leaks above width");
        kani::assert((x | y).raw() & outside == 0, "or leaks above width");
        kani::assert(
            Bits::select(x, y, !y).raw() & outside == 0,
            "select leaks above width",
        );
    }

    /// Proof: select with an empty mask returns the clear branch unchanged
    #[kani::proof]
    fn proof_select_empty_mask() {
        let a: u64 = kani::any();
        let b: u64 = kani::any();
        let width: u32 = kani::any();
        kani::assume(width <= 64);

        let out = Bits::select(Bits::zero(width), Bits::new(a, width), Bits::new(b, width));
        kani::assert(out == Bits::new(b, width), "empty mask must pass through");
    }
}

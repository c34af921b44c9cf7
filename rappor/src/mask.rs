//! Random mask sources for the instantaneous randomized response.
//!
//! Each mask has its low `num_bits` bits drawn independently: bit `i` is set
//! when the `i`-th random byte is below `floor(prob * 256)`.

use crate::bits::Bits;
use crate::constant_time::ct_byte_below;
use crate::error::{EncoderError, MaskKind};
use crate::params::Params;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex};
use tracing::warn;

const MAX_MASK_BYTES: usize = crate::bits::MAX_BITS as usize;

pub trait MaskSource {
    fn p_mask(&self) -> Result<Bits, EncoderError>;
    fn q_mask(&self) -> Result<Bits, EncoderError>;
}

impl<T: MaskSource + ?Sized> MaskSource for &T {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        (**self).p_mask()
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        (**self).q_mask()
    }
}

impl<T: MaskSource + ?Sized> MaskSource for Box<T> {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        (**self).p_mask()
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        (**self).q_mask()
    }
}

impl<T: MaskSource + ?Sized> MaskSource for Arc<T> {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        (**self).p_mask()
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        (**self).q_mask()
    }
}

/// Byte threshold for a probability: `floor(prob * 256)`, in `[0, 256]`.
pub fn threshold256(prob: f64) -> u64 {
    (prob.clamp(0.0, 1.0) * 256.0) as u64
}

/// Build a mask from one random byte per bit.
pub fn mask_from_bytes(bytes: &[u8], threshold: u64, num_bits: u32) -> Bits {
    let mut raw = 0u64;
    for (i, &byte) in bytes.iter().take(num_bits as usize).enumerate() {
        raw |= ct_byte_below(byte, threshold) << i;
    }
    Bits::new(raw, num_bits)
}

/// Per-mask configuration shared by the concrete sources.
#[derive(Clone, Copy, Debug)]
struct MaskShape {
    num_bits: u32,
    p_threshold: u64,
    q_threshold: u64,
}

impl MaskShape {
    fn from_params(params: &Params) -> Self {
        Self {
            num_bits: params.num_bits.min(crate::bits::MAX_BITS),
            p_threshold: threshold256(params.prob_p),
            q_threshold: threshold256(params.prob_q),
        }
    }

    fn threshold(&self, kind: MaskKind) -> u64 {
        match kind {
            MaskKind::P => self.p_threshold,
            MaskKind::Q => self.q_threshold,
        }
    }
}

/// Masks backed by operating system entropy.
#[derive(Clone, Debug)]
pub struct OsMaskSource {
    shape: MaskShape,
}

impl OsMaskSource {
    pub fn new(params: &Params) -> Self {
        Self {
            shape: MaskShape::from_params(params),
        }
    }

    fn draw(&self, kind: MaskKind) -> Result<Bits, EncoderError> {
        let mut buf = [0u8; MAX_MASK_BYTES];
        let bytes = &mut buf[..self.shape.num_bits as usize];
        OsRng.try_fill_bytes(bytes).map_err(|e| {
            warn!(mask = %kind, error = %e, "entropy read failed");
            EncoderError::RandomnessUnavailable {
                mask: kind,
                reason: e.to_string(),
            }
        })?;
        Ok(mask_from_bytes(
            bytes,
            self.shape.threshold(kind),
            self.shape.num_bits,
        ))
    }
}

impl MaskSource for OsMaskSource {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        self.draw(MaskKind::P)
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        self.draw(MaskKind::Q)
    }
}

/// Reproducible masks from a seeded ChaCha20 stream.
///
/// Two sources built from the same seed and params emit the same mask sequence.
/// Only for replayable runs and tests; a report built from a known seed carries no
/// instantaneous privacy.
pub struct SeededMaskSource {
    shape: MaskShape,
    rng: Mutex<ChaCha20Rng>,
}

impl SeededMaskSource {
    pub fn new(params: &Params, seed: [u8; 32]) -> Self {
        Self {
            shape: MaskShape::from_params(params),
            rng: Mutex::new(ChaCha20Rng::from_seed(seed)),
        }
    }

    fn draw(&self, kind: MaskKind) -> Result<Bits, EncoderError> {
        let mut buf = [0u8; MAX_MASK_BYTES];
        let bytes = &mut buf[..self.shape.num_bits as usize];
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| EncoderError::RandomnessUnavailable {
                mask: kind,
                reason: "mask rng lock poisoned".into(),
            })?;
        rng.fill_bytes(bytes);
        Ok(mask_from_bytes(
            bytes,
            self.shape.threshold(kind),
            self.shape.num_bits,
        ))
    }
}

impl MaskSource for SeededMaskSource {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        self.draw(MaskKind::P)
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        self.draw(MaskKind::Q)
    }
}

/// Always returns the same pair of masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedMaskSource {
    pub p: Bits,
    pub q: Bits,
}

impl FixedMaskSource {
    pub fn new(p: Bits, q: Bits) -> Self {
        Self { p, q }
    }
}

impl MaskSource for FixedMaskSource {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        Ok(self.p)
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        Ok(self.q)
    }
}

//! RAPPOR encoder: Bloom filter, PRR and IRR.
//!
//! ```text
//! value ──MD5(cohort || value)──▶ bloom
//! bloom ──HMAC(secret, value)───▶ prr = (bloom & !f_mask) | (uniform & f_mask)
//! prr   ──p/q masks (fresh)─────▶ irr = (p_bits & !prr) | (q_bits & prr)
//! ```
//!
//! The PRR depends only on `(secret, value)`, so repeated reports of one value
//! share it. It is recomputed on every call rather than cached; callers that need a
//! single draw per value across restarts must persist it themselves.

use crate::bits::Bits;
use crate::constant_time::ct_byte_below;
use crate::digest::{DeterministicDigest, KeyedDigest};
use crate::error::{ConfigError, EncoderError};
use crate::mask::MaskSource;
use crate::params::{Params, MAX_COHORT};
use tracing::{debug, trace};

/// Collaborators injected into an encoder.
pub struct Deps<D, K, M> {
    pub cohort: u32,
    pub digest: D,
    pub secret: Vec<u8>,
    pub keyed_digest: K,
    pub mask_source: M,
}

/// The two PRR masks derived from `HMAC(secret, value)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrrMasks {
    /// Per-bit coin toss used where the true bit is replaced.
    pub uniform: Bits,
    /// Positions whose Bloom bit is replaced.
    pub f_mask: Bits,
}

impl PrrMasks {
    pub fn apply(&self, bloom: Bits) -> Bits {
        Bits::select(self.f_mask, self.uniform, bloom)
    }
}

/// All three stages of one encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Report {
    pub bloom: Bits,
    pub prr: Bits,
    pub irr: Bits,
}

pub struct Encoder<D, K, M> {
    num_bits: u32,
    num_hashes: u32,
    prob_f: f64,
    deps: Deps<D, K, M>,
}

impl<D, K, M> Encoder<D, K, M>
where
    D: DeterministicDigest,
    K: KeyedDigest,
    M: MaskSource,
{
    /// Validate `params` against the bit-vector and digest sizes and bind the
    /// collaborators. An encoder that exists is always valid.
    pub fn new(params: &Params, deps: Deps<D, K, M>) -> Result<Self, EncoderError> {
        params.validate()?;
        if deps.cohort >= params.num_cohorts {
            return Err(ConfigError::CohortOutOfRange {
                cohort: deps.cohort,
                num_cohorts: params.num_cohorts,
            }
            .into());
        }

        debug!(
            num_bits = params.num_bits,
            num_hashes = params.num_hashes,
            prob_f = params.prob_f,
            cohort = deps.cohort,
            "encoder ready"
        );

        Ok(Self {
            num_bits: params.num_bits,
            num_hashes: params.num_hashes,
            prob_f: params.prob_f,
            deps,
        })
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn cohort(&self) -> u32 {
        self.deps.cohort
    }

    /// Deterministic fingerprint of `value` for this cohort.
    ///
    /// Digest input is the cohort as 4 big-endian bytes followed by the value.
    /// Digest byte `i` (for `i < num_hashes`) selects bit `byte % num_bits`;
    /// colliding hashes simply set the same bit.
    pub fn make_bloom_filter(&self, value: impl AsRef<[u8]>) -> Bits {
        let value = value.as_ref();
        let mut input = Vec::with_capacity(4 + value.len());
        input.extend_from_slice(&(self.deps.cohort & MAX_COHORT).to_be_bytes());
        input.extend_from_slice(value);

        let digest = self.deps.digest.digest(&input);

        digest
            .iter()
            .take(self.num_hashes as usize)
            .fold(Bits::zero(self.num_bits), |bloom, &byte| {
                bloom.with_bit(u32::from(byte) % self.num_bits)
            })
    }

    /// Derive the PRR masks from `HMAC(secret, value)`.
    ///
    /// Keyed digest byte `i` drives bit `i`: its low bit is the coin toss, and its
    /// upper 7 bits select noise when below `floor(prob_f * 128)`.
    pub fn get_prr_masks(&self, value: impl AsRef<[u8]>) -> PrrMasks {
        let digest = self
            .deps
            .keyed_digest
            .keyed_digest(&self.deps.secret, value.as_ref());
        let threshold128 = (self.prob_f * 128.0) as u64;

        let mut uniform = 0u64;
        let mut f_mask = 0u64;
        for (i, &byte) in digest.iter().take(self.num_bits as usize).enumerate() {
            uniform |= u64::from(byte & 0x01) << i;
            f_mask |= ct_byte_below(byte >> 1, threshold128) << i;
        }

        PrrMasks {
            uniform: Bits::new(uniform, self.num_bits),
            f_mask: Bits::new(f_mask, self.num_bits),
        }
    }

    pub fn permanent_response(&self, value: impl AsRef<[u8]>) -> Bits {
        let value = value.as_ref();
        self.get_prr_masks(value)
            .apply(self.make_bloom_filter(value))
    }

    /// Apply fresh p/q masks to a PRR. Masks are redrawn on every call.
    pub fn instantaneous_response(&self, prr: Bits) -> Result<Bits, EncoderError> {
        let p_bits = self.deps.mask_source.p_mask()?.resize(self.num_bits);
        let q_bits = self.deps.mask_source.q_mask()?.resize(self.num_bits);
        Ok(Bits::select(prr, q_bits, p_bits))
    }

    /// Run all three stages and keep the intermediates.
    pub fn encode_with_intermediates(
        &self,
        value: impl AsRef<[u8]>,
    ) -> Result<Report, EncoderError> {
        let value = value.as_ref();
        debug!(cohort = self.deps.cohort, value_len = value.len(), "encode");

        let bloom = self.make_bloom_filter(value);
        let prr = self.get_prr_masks(value).apply(bloom);
        trace!(%bloom, %prr, "permanent response");

        let irr = self.instantaneous_response(prr)?;
        trace!(%irr, "instantaneous response");

        Ok(Report { bloom, prr, irr })
    }

    /// Encode `value` into the report sent to the collector.
    pub fn encode(&self, value: impl AsRef<[u8]>) -> Result<Bits, EncoderError> {
        self.encode_with_intermediates(value).map(|report| report.irr)
    }
}

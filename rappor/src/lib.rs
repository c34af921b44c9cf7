//! RAPPOR client-side encoder
//!
//! This crate turns a sensitive string into a randomized bit-vector report:
//! - `bits`: fixed-width bit-vector that never carries bits above its width
//! - `params`: RAPPOR parameters (k, h, m, p, q, f) and their validation
//! - `digest`: injected digest seams plus MD5 / HMAC-SHA256 adapters
//! - `mask`: p/q-biased random mask sources for the instantaneous response
//! - `encoder`: Bloom filter, permanent (PRR) and instantaneous (IRR) responses
//! - `constant_time`: branchless comparisons used on secret-derived bytes

pub mod bits;
pub mod constant_time;
pub mod digest;
pub mod encoder;
pub mod error;
pub mod mask;
pub mod params;

pub use bits::{Bits, MAX_BITS};
pub use digest::{DeterministicDigest, HmacSha256, KeyedDigest, Md5Digest};
pub use encoder::{Deps, Encoder, PrrMasks, Report};
pub use error::{ConfigError, EncoderError, MaskKind};
pub use mask::{FixedMaskSource, MaskSource, OsMaskSource, SeededMaskSource};
pub use params::{Params, MAX_COHORT};

#[cfg(any(kani, test))]
#[path = "kani_proofs.rs"]
mod kani_proofs;

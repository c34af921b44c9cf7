//! Digest seams consumed by the encoder.
//!
//! The Bloom filter needs a public deterministic digest of `cohort || value` and
//! the PRR needs a keyed PRF of `value` under the client secret. Both are injected.
//! Closures with the right signature implement the traits directly, which is how
//! tests supply stub digests.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha2::{Digest, Sha256};

/// Output length of the deterministic digest (MD5).
pub const DIGEST_LEN: usize = 16;
/// Output length of the keyed digest (HMAC-SHA256).
pub const KEYED_DIGEST_LEN: usize = 32;

pub trait DeterministicDigest {
    fn digest(&self, input: &[u8]) -> [u8; DIGEST_LEN];
}

pub trait KeyedDigest {
    fn keyed_digest(&self, key: &[u8], message: &[u8]) -> [u8; KEYED_DIGEST_LEN];
}

impl<F> DeterministicDigest for F
where
    F: Fn(&[u8]) -> [u8; DIGEST_LEN],
{
    fn digest(&self, input: &[u8]) -> [u8; DIGEST_LEN] {
        self(input)
    }
}

impl<F> KeyedDigest for F
where
    F: Fn(&[u8], &[u8]) -> [u8; KEYED_DIGEST_LEN],
{
    fn keyed_digest(&self, key: &[u8], message: &[u8]) -> [u8; KEYED_DIGEST_LEN] {
        self(key, message)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Digest;

impl DeterministicDigest for Md5Digest {
    fn digest(&self, input: &[u8]) -> [u8; DIGEST_LEN] {
        Md5::digest(input).into()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha256;

impl KeyedDigest for HmacSha256 {
    fn keyed_digest(&self, key: &[u8], message: &[u8]) -> [u8; KEYED_DIGEST_LEN] {
        // HMAC hashes or pads the key, so every length is accepted.
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
            .expect("HMAC accepts keys of any length");
        mac.update(message);
        mac.finalize().into_bytes().into()
    }
}

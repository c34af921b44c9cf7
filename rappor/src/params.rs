//! RAPPOR parameters.
//!
//! The canonical parameter file is a two-line CSV:
//!
//! ```text
//! k,h,m,p,q,f
//! 16,2,64,0.5,0.75,0.5
//! ```
//!
//! `k` bloom bits, `h` hash functions, `m` cohorts, `p`/`q` IRR probabilities and `f`
//! the PRR noise probability. JSON with either the long or the one-letter names is
//! accepted as well.

use crate::bits::MAX_BITS;
use crate::digest::{DIGEST_LEN, KEYED_DIGEST_LEN};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Largest cohort that fits the single byte reserved for it in the digest input.
pub const MAX_COHORT: u32 = u8::MAX as u32;

const CSV_HEADER: [&str; 6] = ["k", "h", "m", "p", "q", "f"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(alias = "k")]
    pub num_bits: u32,
    #[serde(alias = "h")]
    pub num_hashes: u32,
    #[serde(alias = "m")]
    pub num_cohorts: u32,
    #[serde(alias = "p")]
    pub prob_p: f64,
    #[serde(alias = "q")]
    pub prob_q: f64,
    #[serde(alias = "f")]
    pub prob_f: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_bits: 16,
            num_hashes: 2,
            num_cohorts: 64,
            prob_p: 0.5,
            prob_q: 0.75,
            prob_f: 0.5,
        }
    }
}

impl Params {
    /// Check every constraint the encoder and mask sources rely on.
    ///
    /// The width checks come first so the capacity and alignment errors are the
    /// ones reported for a bad `num_bits`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_bits == 0 {
            return Err(ConfigError::ZeroBits);
        }
        if self.num_bits > MAX_BITS {
            return Err(ConfigError::TooManyBits {
                num_bits: self.num_bits,
                max: MAX_BITS,
            });
        }
        if self.num_bits % 8 != 0 {
            return Err(ConfigError::NotByteAligned {
                num_bits: self.num_bits,
            });
        }
        if self.num_bits as usize > KEYED_DIGEST_LEN {
            return Err(ConfigError::KeyedDigestTooShort {
                num_bits: self.num_bits,
                digest_len: KEYED_DIGEST_LEN,
            });
        }
        if self.num_hashes == 0 || self.num_hashes as usize > DIGEST_LEN {
            return Err(ConfigError::InvalidHashCount {
                num_hashes: self.num_hashes,
                max: DIGEST_LEN,
            });
        }
        if self.num_cohorts == 0 {
            return Err(ConfigError::NoCohorts);
        }
        if self.num_cohorts > MAX_COHORT + 1 {
            return Err(ConfigError::TooManyCohorts {
                num_cohorts: self.num_cohorts,
                max: MAX_COHORT + 1,
            });
        }
        check_probability("prob_p", self.prob_p)?;
        check_probability("prob_q", self.prob_q)?;
        check_probability("prob_f", self.prob_f)?;
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let params: Params =
            serde_json::from_str(s).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Parse the `k,h,m,p,q,f` CSV form. Blank lines are skipped; exactly one data
    /// row must follow the header.
    pub fn from_csv_str(s: &str) -> Result<Self, ConfigError> {
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| ConfigError::Malformed("empty params file".into()))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        if columns != CSV_HEADER {
            return Err(ConfigError::Malformed(format!(
                "expected header {}, got {header}",
                CSV_HEADER.join(",")
            )));
        }

        let row = lines
            .next()
            .ok_or_else(|| ConfigError::Malformed("missing params row".into()))?;
        if lines.next().is_some() {
            return Err(ConfigError::Malformed("expected a single params row".into()));
        }

        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() != CSV_HEADER.len() {
            return Err(ConfigError::Malformed(format!(
                "expected {} fields, got {}",
                CSV_HEADER.len(),
                fields.len()
            )));
        }

        let params = Params {
            num_bits: parse_field("k", fields[0])?,
            num_hashes: parse_field("h", fields[1])?,
            num_cohorts: parse_field("m", fields[2])?,
            prob_p: parse_field("p", fields[3])?,
            prob_q: parse_field("q", fields[4])?,
            prob_f: parse_field("f", fields[5])?,
        };
        params.validate()?;
        Ok(params)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ConfigError::Malformed(format!("field {name} ({raw}): {e}")))
}

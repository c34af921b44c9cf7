use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which of the two IRR masks a randomness failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskKind {
    P,
    Q,
}

impl Display for MaskKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P => write!(f, "p"),
            Self::Q => write!(f, "q"),
        }
    }
}

/// Reasons a parameter set or encoder configuration is rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    ZeroBits,
    TooManyBits { num_bits: u32, max: u32 },
    NotByteAligned { num_bits: u32 },
    /// PRR consumes one keyed-digest byte per bit.
    KeyedDigestTooShort { num_bits: u32, digest_len: usize },
    InvalidHashCount { num_hashes: u32, max: usize },
    InvalidProbability { name: &'static str, value: f64 },
    NoCohorts,
    TooManyCohorts { num_cohorts: u32, max: u32 },
    CohortOutOfRange { cohort: u32, num_cohorts: u32 },
    Malformed(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBits => write!(f, "num_bits must be > 0"),
            Self::TooManyBits { num_bits, max } => {
                write!(f, "num_bits ({num_bits}) can't be bigger than the bit-vector ({max})")
            }
            Self::NotByteAligned { num_bits } => {
                write!(f, "num_bits ({num_bits}) must be a multiple of 8")
            }
            Self::KeyedDigestTooShort {
                num_bits,
                digest_len,
            } => write!(
                f,
                "num_bits ({num_bits}) exceeds the {digest_len} keyed digest bytes available for PRR"
            ),
            Self::InvalidHashCount { num_hashes, max } => {
                write!(f, "num_hashes ({num_hashes}) must be in [1, {max}]")
            }
            Self::InvalidProbability { name, value } => {
                write!(f, "{name} ({value}) must be in [0, 1]")
            }
            Self::NoCohorts => write!(f, "num_cohorts must be > 0"),
            Self::TooManyCohorts { num_cohorts, max } => {
                write!(f, "num_cohorts ({num_cohorts}) can't be bigger than {max}")
            }
            Self::CohortOutOfRange {
                cohort,
                num_cohorts,
            } => write!(f, "cohort {cohort} out of range [0, {num_cohorts})"),
            Self::Malformed(msg) => write!(f, "malformed params: {msg}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Clone, Debug, PartialEq)]
pub enum EncoderError {
    /// Rejected once, at construction.
    InvalidConfig(ConfigError),
    /// A mask draw failed; the report was not produced.
    RandomnessUnavailable { mask: MaskKind, reason: String },
}

impl EncoderError {
    /// Randomness failures may succeed on retry; configuration errors never will.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RandomnessUnavailable { .. })
    }
}

impl Display for EncoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(_) => write!(f, "invalid encoder configuration"),
            Self::RandomnessUnavailable { mask, reason } => {
                write!(f, "randomness unavailable for {mask} mask: {reason}")
            }
        }
    }
}

impl Error for EncoderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            Self::RandomnessUnavailable { .. } => None,
        }
    }
}

impl From<ConfigError> for EncoderError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}

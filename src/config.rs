use clap::{Parser, ValueEnum};
use eyre::{ensure, Result, WrapErr};
use rappor::Params;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Encode values into RAPPOR reports", long_about = None)]
pub struct Config {
    /// Params file (`k,h,m,p,q,f` CSV, or JSON when the extension is .json)
    #[arg(long, env = "RAPPOR_PARAMS")]
    pub params: Option<PathBuf>,

    /// Bloom filter bits (k), used when no params file is given
    #[arg(long, default_value_t = 16)]
    pub num_bits: u32,

    /// Hash functions per value (h)
    #[arg(long, default_value_t = 2)]
    pub num_hashes: u32,

    /// Number of cohorts (m)
    #[arg(long, default_value_t = 64)]
    pub num_cohorts: u32,

    /// IRR probability for PRR bits that are 0 (p)
    #[arg(long, default_value_t = 0.5)]
    pub prob_p: f64,

    /// IRR probability for PRR bits that are 1 (q)
    #[arg(long, default_value_t = 0.75)]
    pub prob_q: f64,

    /// PRR noise probability (f)
    #[arg(long, default_value_t = 0.5)]
    pub prob_f: f64,

    /// Cohort of this client; drawn uniformly from [0, m) if omitted
    #[arg(long, env = "RAPPOR_COHORT")]
    pub cohort: Option<u32>,

    /// Client secret as hex; a fresh 32-byte secret is generated if omitted
    #[arg(long, env = "RAPPOR_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Print a generated secret to stderr so it can be reused
    #[arg(long)]
    pub print_secret: bool,

    /// Deterministic 64-char hex seed for the IRR masks (testing only)
    #[arg(long, env = "RAPPOR_MASK_SEED")]
    pub mask_seed: Option<String>,

    /// Read values from this file instead of stdin, one per line
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Also output the bloom filter and PRR for each value
    #[arg(long)]
    pub verbose_vectors: bool,

    /// Attempts per value when the entropy source fails
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,
}

impl Config {
    /// Params from the file if one is configured, otherwise from the inline flags.
    pub fn load_params(&self) -> Result<Params> {
        let params = match &self.params {
            Some(path) => read_params_file(path)?,
            None => Params {
                num_bits: self.num_bits,
                num_hashes: self.num_hashes,
                num_cohorts: self.num_cohorts,
                prob_p: self.prob_p,
                prob_q: self.prob_q,
                prob_f: self.prob_f,
            },
        };
        params.validate().wrap_err("invalid RAPPOR params")?;
        Ok(params)
    }

    pub fn secret_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.secret
            .as_deref()
            .map(|s| hex::decode(s.trim()).wrap_err("secret must be hex"))
            .transpose()
    }

    pub fn mask_seed_bytes(&self) -> Result<Option<[u8; 32]>> {
        let Some(raw) = self.mask_seed.as_deref() else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim()).wrap_err("mask seed must be hex")?;
        ensure!(
            bytes.len() == 32,
            "mask seed must be 32 bytes, got {}",
            bytes.len()
        );
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        Ok(Some(seed))
    }
}

fn read_params_file(path: &Path) -> Result<Params> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading params file {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        Params::from_json_str(&text)
    } else {
        Params::from_csv_str(&text)
    };
    parsed.wrap_err_with(|| format!("parsing params file {}", path.display()))
}

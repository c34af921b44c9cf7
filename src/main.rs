mod config;

use clap::Parser;
use config::{Config, OutputFormat};
use eyre::{bail, Result, WrapErr};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use rappor::{
    Deps, Encoder, EncoderError, HmacSha256, MaskSource, Md5Digest, OsMaskSource, Params, Report,
    SeededMaskSource,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type DynMaskSource = Box<dyn MaskSource + Send + Sync>;
type ClientEncoder = Encoder<Md5Digest, HmacSha256, DynMaskSource>;

#[derive(Serialize)]
struct ReportLine {
    cohort: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bloom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prr: Option<String>,
    irr: String,
}

impl ReportLine {
    fn new(cohort: u32, report: &Report, verbose: bool) -> Self {
        Self {
            cohort,
            bloom: verbose.then(|| report.bloom.to_string()),
            prr: verbose.then(|| report.prr.to_string()),
            irr: report.irr.to_string(),
        }
    }

    fn csv_header(verbose: bool) -> &'static str {
        if verbose {
            "cohort,bloom,prr,irr"
        } else {
            "cohort,irr"
        }
    }

    fn to_csv(&self) -> String {
        match (&self.bloom, &self.prr) {
            (Some(bloom), Some(prr)) => format!("{},{},{},{}", self.cohort, bloom, prr, self.irr),
            _ => format!("{},{}", self.cohort, self.irr),
        }
    }
}

fn resolve_cohort(cfg: &Config, params: &Params) -> u32 {
    match cfg.cohort {
        Some(cohort) => cohort,
        None => {
            let cohort = OsRng.gen_range(0..params.num_cohorts);
            info!(cohort, "assigned random cohort");
            cohort
        }
    }
}

fn resolve_secret(cfg: &Config) -> Result<Vec<u8>> {
    if let Some(secret) = cfg.secret_bytes()? {
        return Ok(secret);
    }
    let mut secret = vec![0u8; 32];
    OsRng
        .try_fill_bytes(&mut secret)
        .wrap_err("generating client secret")?;
    info!("generated fresh client secret");
    if cfg.print_secret {
        eprintln!("client secret: {}", hex::encode(&secret));
    }
    Ok(secret)
}

fn build_encoder(cfg: &Config, params: &Params) -> Result<ClientEncoder> {
    let mask_source: DynMaskSource = match cfg.mask_seed_bytes()? {
        Some(seed) => {
            warn!("using seeded IRR masks; reports are reproducible and not private");
            Box::new(SeededMaskSource::new(params, seed))
        }
        None => Box::new(OsMaskSource::new(params)),
    };

    let deps = Deps {
        cohort: resolve_cohort(cfg, params),
        digest: Md5Digest,
        secret: resolve_secret(cfg)?,
        keyed_digest: HmacSha256,
        mask_source,
    };
    Ok(Encoder::new(params, deps)?)
}

/// Encode with retries on entropy failure. Configuration errors are not retried.
fn encode_value(encoder: &ClientEncoder, value: &str, max_attempts: u32) -> Result<Report> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match encoder.encode_with_intermediates(value) {
            Ok(report) => return Ok(report),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(attempt, error = %err, "mask draw failed, retrying");
            }
            Err(err @ EncoderError::RandomnessUnavailable { .. }) => {
                bail!("giving up after {attempt} attempts: {err}")
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cfg = Config::parse();

    let params = cfg.load_params()?;
    let encoder = build_encoder(&cfg, &params)?;
    info!(
        num_bits = encoder.num_bits(),
        num_hashes = params.num_hashes,
        cohort = encoder.cohort(),
        "RAPPOR encoder starting"
    );

    let input: Box<dyn BufRead> = match &cfg.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut out = BufWriter::new(io::stdout().lock());
    if cfg.format == OutputFormat::Csv {
        writeln!(out, "{}", ReportLine::csv_header(cfg.verbose_vectors))?;
    }

    let mut encoded = 0usize;
    for line in input.lines() {
        let line = line.wrap_err("reading input")?;
        let value = line.trim_end_matches('\r');
        let report = encode_value(&encoder, value, cfg.max_attempts.max(1))?;
        let row = ReportLine::new(encoder.cohort(), &report, cfg.verbose_vectors);
        match cfg.format {
            OutputFormat::Csv => writeln!(out, "{}", row.to_csv())?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&row)?)?,
        }
        encoded += 1;
    }
    out.flush()?;

    info!(encoded, "done");
    Ok(())
}

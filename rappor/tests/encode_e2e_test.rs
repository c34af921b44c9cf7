use rappor::{
    Bits, ConfigError, Deps, Encoder, EncoderError, FixedMaskSource, HmacSha256, MaskKind,
    MaskSource, Md5Digest, OsMaskSource, Params, SeededMaskSource,
};
use std::sync::Arc;
use std::thread;

fn params(prob_f: f64) -> Params {
    Params {
        num_bits: 16,
        num_hashes: 2,
        num_cohorts: 64,
        prob_p: 0.5,
        prob_q: 0.75,
        prob_f,
    }
}

fn production_encoder<M: MaskSource>(
    params: &Params,
    cohort: u32,
    secret: &[u8],
    mask_source: M,
) -> Encoder<Md5Digest, HmacSha256, M> {
    Encoder::new(
        params,
        Deps {
            cohort,
            digest: Md5Digest,
            secret: secret.to_vec(),
            keyed_digest: HmacSha256,
            mask_source,
        },
    )
    .expect("valid encoder")
}

#[test]
fn prr_is_permanent_irr_is_fresh() {
    let params = params(0.5);
    let masks = SeededMaskSource::new(&params, [0x11u8; 32]);
    let encoder = production_encoder(&params, 5, b"client-secret", masks);

    let first = encoder.encode_with_intermediates("google.com").expect("encode");
    let mut irrs = vec![first.irr];
    for _ in 0..20 {
        let report = encoder.encode_with_intermediates("google.com").expect("encode");
        assert_eq!(report.bloom, first.bloom);
        assert_eq!(report.prr, first.prr, "PRR must be stable per value");
        irrs.push(report.irr);
    }
    irrs.sort_by_key(|b| b.raw());
    irrs.dedup();
    assert!(irrs.len() > 1, "IRR should vary across reports");
}

#[test]
fn cohorts_and_secrets_separate_stages() {
    let params = params(0.5);
    let fixed = FixedMaskSource::new(Bits::zero(16), Bits::ones(16));

    let a = production_encoder(&params, 1, b"alice", fixed);
    let b = production_encoder(&params, 1, b"bob", fixed);
    let c = production_encoder(&params, 2, b"alice", fixed);

    let values = ["a", "b", "c", "d", "e", "f", "g", "h"];

    // same cohort: identical bloom regardless of secret
    for v in values {
        assert_eq!(a.make_bloom_filter(v), b.make_bloom_filter(v));
    }
    // different cohorts hash differently for at least one value
    assert!(values
        .iter()
        .any(|v| a.make_bloom_filter(v) != c.make_bloom_filter(v)));
    // different secrets give different PRR masks
    assert!(values
        .iter()
        .any(|v| a.get_prr_masks(v) != b.get_prr_masks(v)));
    // same secret: masks do not depend on cohort
    for v in values {
        assert_eq!(a.get_prr_masks(v), c.get_prr_masks(v));
    }
}

#[test]
fn zero_noise_reports_bloom_through_identity_masks() {
    let params = params(0.0);
    let fixed = FixedMaskSource::new(Bits::zero(16), Bits::ones(16));
    let encoder = production_encoder(&params, 0, b"s", fixed);

    for v in ["x", "y", "z"] {
        let report = encoder.encode_with_intermediates(v).unwrap();
        assert_eq!(report.prr, report.bloom);
        assert_eq!(report.irr, report.bloom);
    }
}

#[test]
fn inverted_masks_report_complement() {
    let params = Params {
        num_bits: 8,
        ..params(0.0)
    };
    let fixed = FixedMaskSource::new(Bits::ones(8), Bits::zero(8));
    let encoder = production_encoder(&params, 0, b"s", fixed);

    let report = encoder.encode_with_intermediates("x").unwrap();
    assert_eq!(report.irr, !report.prr);
    assert_eq!(report.irr.raw() & report.prr.raw(), 0);
    assert_eq!(report.irr.raw() | report.prr.raw(), 0xFF);
}

struct Exhausted;

impl MaskSource for Exhausted {
    fn p_mask(&self) -> Result<Bits, EncoderError> {
        Err(EncoderError::RandomnessUnavailable {
            mask: MaskKind::P,
            reason: "entropy pool exhausted".into(),
        })
    }

    fn q_mask(&self) -> Result<Bits, EncoderError> {
        Ok(Bits::zero(16))
    }
}

#[test]
fn randomness_failure_is_reported_not_masked() {
    let params = params(0.5);
    let encoder = production_encoder(&params, 0, b"s", Exhausted);

    let err = encoder.encode("v").unwrap_err();
    assert!(err.is_transient());
    assert_eq!(
        err.to_string(),
        "randomness unavailable for p mask: entropy pool exhausted"
    );
}

#[test]
fn invalid_config_is_distinguishable() {
    let bad = Params {
        num_bits: 20,
        ..params(0.5)
    };
    let err = Encoder::new(
        &bad,
        Deps {
            cohort: 0,
            digest: Md5Digest,
            secret: Vec::new(),
            keyed_digest: HmacSha256,
            mask_source: OsMaskSource::new(&bad),
        },
    )
    .err()
    .expect("must reject");

    assert!(!err.is_transient());
    assert!(matches!(
        err,
        EncoderError::InvalidConfig(ConfigError::NotByteAligned { num_bits: 20 })
    ));
}

#[test]
fn shared_encoder_across_threads() {
    let params = params(0.25);
    let encoder = Arc::new(production_encoder(
        &params,
        3,
        b"shared",
        OsMaskSource::new(&params),
    ));
    let expected_prr = encoder.permanent_response("value");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let encoder = Arc::clone(&encoder);
            thread::spawn(move || {
                let report = encoder.encode_with_intermediates("value").expect("encode");
                (report.prr, report.irr)
            })
        })
        .collect();

    for handle in handles {
        let (prr, irr) = handle.join().expect("thread");
        assert_eq!(prr, expected_prr);
        assert_eq!(irr.raw() >> 16, 0);
    }
}

#[test]
fn irr_bit_rates_follow_p_and_q() {
    // With prob_f = 0 the PRR is the bloom; set bits report at q, clear bits at p.
    let params = Params {
        num_bits: 32,
        num_hashes: 4,
        num_cohorts: 1,
        prob_p: 0.25,
        prob_q: 0.75,
        prob_f: 0.0,
    };
    let encoder = production_encoder(
        &params,
        0,
        b"s",
        SeededMaskSource::new(&params, [7u8; 32]),
    );

    let prr = encoder.permanent_response("rates");
    let trials = 4_000u32;
    let mut set_hits = 0u32;
    let mut clear_hits = 0u32;
    for _ in 0..trials {
        let irr = encoder.encode("rates").unwrap();
        set_hits += (irr & prr).count_ones();
        clear_hits += (irr & !prr).count_ones();
    }

    let set_rate = f64::from(set_hits) / f64::from(trials * prr.count_ones());
    let clear_rate = f64::from(clear_hits) / f64::from(trials * (32 - prr.count_ones()));
    assert!((set_rate - 0.75).abs() < 0.03, "q rate {set_rate}");
    assert!((clear_rate - 0.25).abs() < 0.03, "p rate {clear_rate}");
}

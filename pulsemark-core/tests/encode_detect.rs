use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use pulsemark_core::{
    DetectConfig, PcmBuffer, ScanConfig, ToneSpec, WatermarkSpec, analyze, analyze_with_config,
    encode, encode_wav, wav,
};

const SAMPLE_RATE: u32 = 4000;

/// Host with broadband content well above the watermark band plus a steady
/// 42 Hz hum inside it.
fn make_music_host(duration_s: f64, sample_rate: u32) -> PcmBuffer {
    let len = (duration_s * sample_rate as f64).round() as usize;
    let samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let s = 0.25 * (2.0 * std::f64::consts::PI * 220.0 * t).sin()
                + 0.15 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()
                + 0.1 * (2.0 * std::f64::consts::PI * 42.0 * t).sin();
            s as f32
        })
        .collect();
    PcmBuffer::new(sample_rate, vec![samples.clone(), samples]).unwrap()
}

fn two_tone_spec() -> WatermarkSpec {
    WatermarkSpec::new(vec![ToneSpec::new(37, 0.25), ToneSpec::new(52, 0.5)]).unwrap()
}

fn frequency_set(freqs: Vec<u32>) -> BTreeSet<u32> {
    freqs.into_iter().collect()
}

fn uncapped() -> DetectConfig {
    DetectConfig {
        max_results: None,
        ..DetectConfig::default()
    }
}

#[test]
fn detects_two_tone_watermark_in_silence() {
    let host = PcmBuffer::silence(SAMPLE_RATE, 2, 20.0).unwrap();
    let bytes = encode_wav(&host, &two_tone_spec()).unwrap();
    let received = wav::decode(&bytes).unwrap();

    let analysis = analyze(&received).unwrap();
    assert!(analysis.is_watermarked());
    assert_eq!(
        frequency_set(analysis.frequencies()),
        BTreeSet::from([37, 52])
    );

    // No other frequency clears the thresholds either
    let all = analyze_with_config(&received, &ScanConfig::default(), &uncapped()).unwrap();
    assert_eq!(frequency_set(all.frequencies()), BTreeSet::from([37, 52]));
}

#[test]
fn pulse_rate_estimates_are_close() {
    let host = PcmBuffer::silence(SAMPLE_RATE, 2, 20.0).unwrap();
    let watermarked = encode(&host, &two_tone_spec()).unwrap();
    let analysis = analyze(&watermarked).unwrap();

    for result in &analysis.results {
        let expected = match result.frequency_hz {
            37 => 0.25,
            52 => 0.5,
            other => panic!("unexpected frequency {other}"),
        };
        let ratio = result.pulse_rate_estimate / expected;
        assert!(
            (0.5..=1.5).contains(&ratio),
            "{} Hz: estimated {} vs {expected}",
            result.frequency_hz,
            result.pulse_rate_estimate
        );
        assert!(result.variance > 1e-4);
        assert!(result.avg_magnitude > 1e-3);
        assert_eq!(result.trace.len(), 400);
    }
}

#[test]
fn results_are_ordered_by_variance() {
    let host = PcmBuffer::silence(SAMPLE_RATE, 2, 20.0).unwrap();
    let watermarked = encode(&host, &two_tone_spec()).unwrap();
    let analysis = analyze(&watermarked).unwrap();
    assert_eq!(analysis.results.len(), 2);
    assert!(analysis.results[0].variance >= analysis.results[1].variance);
}

#[test]
fn white_noise_has_no_watermark() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let len = 20 * SAMPLE_RATE as usize;
    let noise: Vec<f32> = (0..len).map(|_| rng.gen_range(-0.02f32..0.02)).collect();
    let buf = PcmBuffer::new(SAMPLE_RATE, vec![noise]).unwrap();

    let analysis = analyze(&buf).unwrap();
    assert!(!analysis.is_watermarked());
    assert!(analysis.results.is_empty());
    assert_eq!(analysis.grid.num_frequencies(), 31);
}

#[test]
fn steady_hum_is_not_a_watermark() {
    let host = make_music_host(20.0, SAMPLE_RATE);
    let plain = analyze(&host).unwrap();
    assert!(plain.results.is_empty(), "host alone: {:?}", plain.frequencies());

    let watermarked = encode(&host, &two_tone_spec()).unwrap();
    let analysis = analyze_with_config(&watermarked, &ScanConfig::default(), &uncapped()).unwrap();
    assert_eq!(
        frequency_set(analysis.frequencies()),
        BTreeSet::from([37, 52])
    );
    // The hum is loud at 42 Hz but flat over time
    let hum = analysis.grid.trace(42).unwrap();
    let mean = hum.magnitudes.iter().sum::<f64>() / hum.len() as f64;
    assert!(mean > 1e-2);
}

#[test]
fn three_tones_are_capped_at_two_by_default() {
    let spec = WatermarkSpec::new(vec![
        ToneSpec::new(33, 0.125),
        ToneSpec::new(45, 0.25),
        ToneSpec::new(57, 0.5),
    ])
    .unwrap();
    let host = PcmBuffer::silence(SAMPLE_RATE, 2, 20.0).unwrap();
    let watermarked = encode(&host, &spec).unwrap();

    let capped = analyze(&watermarked).unwrap();
    assert_eq!(capped.results.len(), 2);

    let all = analyze_with_config(&watermarked, &ScanConfig::default(), &uncapped()).unwrap();
    assert_eq!(
        frequency_set(all.frequencies()),
        BTreeSet::from([33, 45, 57])
    );
}

#[test]
fn generated_spec_is_recovered() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let generated = WatermarkSpec::generate(&mut rng, 2).unwrap();
    assert!(!generated.exhausted);

    let host = PcmBuffer::silence(SAMPLE_RATE, 1, 20.0).unwrap();
    let watermarked = encode(&host, &generated.spec).unwrap();
    let analysis = analyze_with_config(&watermarked, &ScanConfig::default(), &uncapped()).unwrap();
    assert_eq!(
        frequency_set(analysis.frequencies()),
        frequency_set(generated.spec.frequencies())
    );
}

#[test]
fn mono_host_is_upmixed_and_preserved() {
    let host = make_music_host(1.0, SAMPLE_RATE);
    let mono = PcmBuffer::new(SAMPLE_RATE, vec![host.channel(0).unwrap().to_vec()]).unwrap();
    let before = mono.clone();

    let out = encode(&mono, &two_tone_spec()).unwrap();
    assert_eq!(out.num_channels(), 2);
    assert_eq!(out.len(), mono.len());
    assert_eq!(out.channel(0), out.channel(1));
    assert_eq!(mono, before);
    assert_ne!(out.channel(0), mono.channel(0));
}

#[test]
fn empty_input_is_an_error_not_a_miss() {
    let empty = PcmBuffer::new(SAMPLE_RATE, vec![vec![]]).unwrap();
    assert!(matches!(
        analyze(&empty),
        Err(pulsemark_core::Error::EmptyBuffer)
    ));
    assert!(encode(&empty, &two_tone_spec()).is_err());
}

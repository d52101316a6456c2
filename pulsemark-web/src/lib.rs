use pulsemark_core::{
    Analysis, DetectConfig, PcmBuffer, ScanConfig, ToneSpec, WatermarkSpec, export,
};
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use wasm_bindgen::prelude::*;

fn js_err(e: pulsemark_core::Error) -> JsError {
    JsError::new(&format!("{e}"))
}

fn build_spec(
    frequencies: &[u32],
    pulse_rates: &[f64],
) -> pulsemark_core::error::Result<WatermarkSpec> {
    if frequencies.len() != pulse_rates.len() {
        return Err(pulsemark_core::Error::ToneArrayMismatch {
            frequencies: frequencies.len(),
            pulse_rates: pulse_rates.len(),
        });
    }
    let tones = frequencies
        .iter()
        .zip(pulse_rates)
        .map(|(&f, &r)| ToneSpec::new(f, r))
        .collect();
    WatermarkSpec::new(tones)
}

fn encode_planar(
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
    frequencies: &[u32],
    pulse_rates: &[f64],
) -> pulsemark_core::error::Result<Vec<u8>> {
    let spec = build_spec(frequencies, pulse_rates)?;
    let channels = if right.is_empty() {
        vec![left.to_vec()]
    } else {
        vec![left.to_vec(), right.to_vec()]
    };
    let host = PcmBuffer::new(sample_rate, channels)?;
    pulsemark_core::encode_wav(&host, &spec)
}

fn analyze_mono(
    samples: &[f32],
    sample_rate: u32,
    all: bool,
) -> pulsemark_core::error::Result<Analysis> {
    let buf = PcmBuffer::new(sample_rate, vec![samples.to_vec()])?;
    let detect_config = DetectConfig {
        max_results: if all { None } else { DetectConfig::default().max_results },
        ..DetectConfig::default()
    };
    pulsemark_core::analyze_with_config(&buf, &ScanConfig::default(), &detect_config)
}

/// Watermark planar audio and return a 16-bit stereo WAV file.
///
/// Pass an empty `right` for mono input. `frequencies` and `pulse_rates`
/// are parallel arrays describing two or three tones.
#[wasm_bindgen]
pub fn encode_wav(
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
    frequencies: &[u32],
    pulse_rates: &[f64],
) -> Result<Vec<u8>, JsError> {
    encode_planar(left, right, sample_rate, frequencies, pulse_rates).map_err(js_err)
}

/// Decode a WAV file produced by [`encode_wav`] (or any 16-bit PCM WAV).
///
/// Returns the first channel, ready for [`detect`].
#[wasm_bindgen]
pub fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>, JsError> {
    let buf = pulsemark_core::wav::decode(bytes).map_err(js_err)?;
    Ok(buf.channel(0).map(<[f32]>::to_vec).unwrap_or_default())
}

/// Scan a mono signal for a pulsing watermark.
///
/// With `all` unset, at most the two strongest frequencies are reported.
#[wasm_bindgen]
pub fn detect(samples: &[f32], sample_rate: u32, all: bool) -> Result<WasmAnalysis, JsError> {
    analyze_mono(samples, sample_rate, all)
        .map(|analysis| WasmAnalysis { analysis })
        .map_err(js_err)
}

/// Draw a random watermark from a seed.
///
/// Returns interleaved `[frequency, pulse_rate, ...]` pairs.
#[wasm_bindgen]
pub fn random_spec(seed: u64, count: usize) -> Result<Vec<f64>, JsError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let generated = WatermarkSpec::generate(&mut rng, count).map_err(js_err)?;
    Ok(generated
        .spec
        .tones()
        .iter()
        .flat_map(|t| [t.frequency_hz as f64, t.pulse_rate_hz])
        .collect())
}

/// Detection outcome exposed to JavaScript.
#[wasm_bindgen]
pub struct WasmAnalysis {
    analysis: Analysis,
}

#[wasm_bindgen]
impl WasmAnalysis {
    pub fn is_watermarked(&self) -> bool {
        self.analysis.is_watermarked()
    }

    /// Detected frequencies in Hz, highest variance first.
    pub fn frequencies(&self) -> Vec<u32> {
        self.analysis.frequencies()
    }

    pub fn variances(&self) -> Vec<f64> {
        self.analysis.results.iter().map(|r| r.variance).collect()
    }

    pub fn pulse_rates(&self) -> Vec<f64> {
        self.analysis
            .results
            .iter()
            .map(|r| r.pulse_rate_estimate)
            .collect()
    }

    /// Magnitude trace of the `index`-th result, one value per hop.
    pub fn trace(&self, index: usize) -> Option<Vec<f64>> {
        self.analysis
            .results
            .get(index)
            .map(|r| r.trace.magnitudes.clone())
    }

    pub fn grid_csv(&self) -> String {
        export::grid_to_csv(&self.analysis.grid)
    }

    pub fn grid_json(&self) -> Result<String, JsError> {
        export::grid_to_json(&self.analysis.grid).map_err(js_err)
    }

    pub fn summary_json(&self) -> Result<String, JsError> {
        export::analysis_to_json(&self.analysis, false).map_err(js_err)
    }
}

pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod frame;
pub mod goertzel;
pub mod mix;
pub mod pcm;
pub mod retry;
pub mod scan;
pub mod tone;
pub mod watermark;
pub mod wav;

#[cfg(feature = "parallel")]
pub mod parallel;

use serde::{Deserialize, Serialize};

// Re-export primary API types
pub use config::{DetectConfig, ScanConfig};
pub use detect::DetectionResult;
pub use error::Error;
pub use pcm::PcmBuffer;
pub use scan::{FrequencyTrace, SpectrogramGrid};
pub use watermark::{GeneratedSpec, ToneSpec, WatermarkSpec};

#[cfg(feature = "parallel")]
pub use parallel::scan_parallel;

/// Output of one detection run.
///
/// An empty `results` list is a valid outcome meaning no watermark was
/// found; analysis failures are reported as errors instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Detected frequencies, highest variance first.
    pub results: Vec<DetectionResult>,
    /// The full magnitude grid the results were drawn from.
    pub grid: SpectrogramGrid,
}

impl Analysis {
    pub fn is_watermarked(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn frequencies(&self) -> Vec<u32> {
        self.results.iter().map(|r| r.frequency_hz).collect()
    }
}

/// Mix a watermark into a host recording.
///
/// Each tone spans the host's full duration. A mono host is upmixed to
/// stereo first, so the output is always stereo.
pub fn encode(host: &PcmBuffer, spec: &WatermarkSpec) -> error::Result<PcmBuffer> {
    if host.is_empty() {
        return Err(Error::EmptyBuffer);
    }
    let host = host.to_stereo();
    let tones = tone::generate_spec(spec, host.duration_seconds(), host.sample_rate())?;
    mix::mix(&host, &tones)
}

/// [`encode`] followed by 16-bit WAV serialization.
pub fn encode_wav(host: &PcmBuffer, spec: &WatermarkSpec) -> error::Result<Vec<u8>> {
    wav::encode(&encode(host, spec)?)
}

/// Scan and discriminate with default parameters.
pub fn analyze(buf: &PcmBuffer) -> error::Result<Analysis> {
    analyze_with_config(buf, &ScanConfig::default(), &DetectConfig::default())
}

/// Scan and discriminate with explicit parameters.
pub fn analyze_with_config(
    buf: &PcmBuffer,
    scan_config: &ScanConfig,
    detect_config: &DetectConfig,
) -> error::Result<Analysis> {
    let grid = scan::scan(buf, scan_config)?;
    let results = detect::detect(&grid, detect_config);
    Ok(Analysis { results, grid })
}

/// [`analyze_with_config`] with the scan spread over the rayon pool.
#[cfg(feature = "parallel")]
pub fn analyze_parallel(
    buf: &PcmBuffer,
    scan_config: &ScanConfig,
    detect_config: &DetectConfig,
) -> error::Result<Analysis> {
    let grid = parallel::scan_parallel(buf, scan_config)?;
    let results = detect::detect(&grid, detect_config);
    Ok(Analysis { results, grid })
}

use serde::{Deserialize, Serialize};

/// Configuration for the spectral scan.
///
/// The defaults are part of the detection contract: a 1 s window gives
/// exactly 1 Hz bin spacing, so every integer frequency lands on a bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Analysis window length in seconds. Default: 1.0.
    pub window_seconds: f64,
    /// Distance between consecutive window centers in seconds. Default: 0.05.
    pub hop_seconds: f64,
    /// Total analysed span in seconds. Default: 20.0 (400 hops).
    pub span_seconds: f64,
    /// Lowest scanned frequency in Hz (inclusive). Default: 30.
    pub freq_low: u32,
    /// Highest scanned frequency in Hz (inclusive). Default: 60.
    pub freq_high: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_seconds: 1.0,
            hop_seconds: 0.05,
            span_seconds: 20.0,
            freq_low: 30,
            freq_high: 60,
        }
    }
}

impl ScanConfig {
    /// Number of hops covering `span_seconds`.
    pub fn num_hops(&self) -> usize {
        (self.span_seconds / self.hop_seconds).round() as usize
    }

    /// Nominal window length in samples at the given sample rate.
    pub fn window_samples(&self, sample_rate: u32) -> usize {
        (self.window_seconds * sample_rate as f64).round() as usize
    }
}

/// Thresholds for the watermark discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// A trace must vary more than this over time. Default: 1e-4.
    pub min_variance: f64,
    /// A trace's mean magnitude must exceed this. Default: 1e-3.
    pub min_magnitude: f64,
    /// Cap on reported frequencies; `None` reports every survivor. Default: 2.
    pub max_results: Option<usize>,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            min_variance: 1e-4,
            min_magnitude: 1e-3,
            max_results: Some(2),
        }
    }
}

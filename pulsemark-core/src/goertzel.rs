//! Single-bin DFT magnitude via the Goertzel recurrence.
//!
//! Evaluating ~31 discrete frequencies per window this way is O(N) each and
//! needs no complex scratch buffers. Windowing is the caller's job.

use std::f64::consts::PI;

/// Goertzel filter for one target frequency and a fixed block length.
///
/// The target is snapped to the nearest DFT bin `k = round(N·f / sr)`.
#[derive(Debug, Clone)]
pub struct Goertzel {
    block_len: usize,
    bin: usize,
    cos_w: f64,
    sin_w: f64,
    coeff: f64,
}

impl Goertzel {
    pub fn new(target_freq_hz: f64, sample_rate: u32, block_len: usize) -> Self {
        let bin = if block_len == 0 {
            0
        } else {
            (block_len as f64 * target_freq_hz / sample_rate as f64).round() as usize
        };
        let w = if block_len == 0 {
            0.0
        } else {
            2.0 * PI * bin as f64 / block_len as f64
        };
        Self {
            block_len,
            bin,
            cos_w: w.cos(),
            sin_w: w.sin(),
            coeff: 2.0 * w.cos(),
        }
    }

    /// DFT bin index the target frequency snapped to.
    pub fn bin(&self) -> usize {
        self.bin
    }

    /// Normalized magnitude `|X[k]| / N` of one block.
    ///
    /// `samples` must be `block_len` long. An empty block has magnitude 0.
    pub fn magnitude(&self, samples: &[f32]) -> f64 {
        debug_assert_eq!(samples.len(), self.block_len);
        if samples.is_empty() {
            return 0.0;
        }
        let mut q1 = 0.0f64;
        let mut q2 = 0.0f64;
        for &s in samples {
            let q0 = self.coeff * q1 - q2 + s as f64;
            q2 = q1;
            q1 = q0;
        }
        let real = q1 - q2 * self.cos_w;
        let imag = q2 * self.sin_w;
        (real * real + imag * imag).sqrt() / samples.len() as f64
    }
}

/// Magnitude of `target_freq_hz` within one pre-windowed, single-channel block.
pub fn magnitude(samples: &[f32], target_freq_hz: f64, sample_rate: u32) -> f64 {
    Goertzel::new(target_freq_hz, sample_rate, samples.len()).magnitude(samples)
}

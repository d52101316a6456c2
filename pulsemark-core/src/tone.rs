//! Pulsing sine tone synthesis.
//!
//! A watermark tone is a low-frequency carrier whose amplitude follows a
//! slow raised sine. The smooth envelope avoids clicks and makes the tone's
//! energy rise and fall periodically, which is what the detector keys on.

use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::pcm::PcmBuffer;
use crate::watermark::WatermarkSpec;

/// Lowest allowed carrier frequency in Hz.
pub const MIN_FREQUENCY_HZ: f64 = 30.0;

/// Highest allowed carrier frequency in Hz.
pub const MAX_FREQUENCY_HZ: f64 = 60.0;

/// Fixed attenuation applied to every tone (about -14 dBFS peak).
pub const TONE_GAIN: f64 = 0.2;

/// Synthesize a stereo pulsing tone.
///
/// Both channels carry identical samples:
/// `sin(2π·f·t) · (sin(2π·p·t) + 1) / 2 · 0.2`.
pub fn generate(
    frequency_hz: f64,
    pulse_rate_hz: f64,
    duration_s: f64,
    sample_rate: u32,
) -> Result<PcmBuffer> {
    if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz) {
        return Err(Error::FrequencyOutOfRange(frequency_hz));
    }
    if !(pulse_rate_hz.is_finite() && pulse_rate_hz > 0.0) {
        return Err(Error::InvalidPulseRate(pulse_rate_hz));
    }
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Err(Error::InvalidDuration(duration_s));
    }
    if sample_rate == 0 {
        return Err(Error::InvalidSampleRate);
    }

    let len = (duration_s * sample_rate as f64).round() as usize;
    let sr = sample_rate as f64;
    let samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f64 / sr;
            let carrier = (2.0 * PI * frequency_hz * t).sin();
            let envelope = ((2.0 * PI * pulse_rate_hz * t).sin() + 1.0) / 2.0;
            (carrier * envelope * TONE_GAIN) as f32
        })
        .collect();

    PcmBuffer::new(sample_rate, vec![samples.clone(), samples])
}

/// Synthesize one tone per entry of a watermark spec.
pub fn generate_spec(
    spec: &WatermarkSpec,
    duration_s: f64,
    sample_rate: u32,
) -> Result<Vec<PcmBuffer>> {
    spec.tones()
        .iter()
        .map(|tone| {
            generate(
                tone.frequency_hz as f64,
                tone.pulse_rate_hz,
                duration_s,
                sample_rate,
            )
        })
        .collect()
}

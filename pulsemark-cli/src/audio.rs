//! Decoding of arbitrary WAV input into a [`PcmBuffer`].
//!
//! The core only parses its own 16-bit container; everything else (8/24/32-bit
//! integer, float) goes through hound here.

use std::path::Path;

use pulsemark_core::PcmBuffer;
use tracing::warn;

/// Full-scale value of a signed integer sample of `bits` width.
fn int_full_scale(bits: u16) -> Result<f32, Box<dyn std::error::Error>> {
    if !(1..=32).contains(&bits) {
        return Err(format!("unsupported integer sample width: {bits} bits").into());
    }
    Ok((1i64 << (bits - 1)) as f32)
}

pub fn read_wav(path: &Path) -> Result<PcmBuffer, Box<dyn std::error::Error>> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let max = int_full_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .collect::<Result<Vec<i32>, _>>()?
                .into_iter()
                .map(|s| s as f32 / max)
                .collect()
        }
    };

    let channels = spec.channels as usize;
    if channels == 0 {
        return Err("WAV header declares zero channels".into());
    }
    let kept = channels.min(2);
    if channels > 2 {
        warn!(
            channels,
            "input has more than two channels, only the first two will be used"
        );
    }
    let frames: Vec<f32> = if channels == kept {
        samples
    } else {
        samples
            .chunks_exact(channels)
            .flat_map(|frame| frame[..kept].iter().copied())
            .collect()
    };

    Ok(PcmBuffer::from_interleaved(
        spec.sample_rate,
        kept as u8,
        &frames,
    )?)
}

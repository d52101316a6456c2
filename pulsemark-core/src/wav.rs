//! Canonical 16-bit linear PCM WAV container.
//!
//! `encode` always writes the 44-byte header layout (RIFF, `fmt `, `data`).
//! `decode` accepts any 16-bit PCM file with one or two channels and skips
//! chunks it does not know.

use crate::error::{Error, Result};
use crate::pcm::PcmBuffer;

const WAVE_FORMAT_PCM: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: usize = 2;
const HEADER_LEN: usize = 44;

/// Convert a float sample to 16-bit.
///
/// Negative values scale by 32768 and positive values by 32767, so both -1.0
/// and 1.0 map to the extremes of the `i16` range.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scale = if s < 0.0 { 32768.0 } else { 32767.0 };
    (s * scale).round() as i16
}

/// Inverse of [`quantize`] for every `i16` value.
pub fn dequantize(value: i16) -> f32 {
    let scale = if value < 0 { 32768.0 } else { 32767.0 };
    value as f32 / scale
}

/// Serialize a buffer as a 16-bit PCM WAV byte stream.
pub fn encode(buf: &PcmBuffer) -> Result<Vec<u8>> {
    let channels = buf.num_channels() as u16;
    let block_align = channels * BYTES_PER_SAMPLE as u16;
    let data_size = buf.len() as u64 * block_align as u64;
    if data_size + 36 > u32::MAX as u64 {
        return Err(Error::WavEncode(format!(
            "{data_size} bytes of sample data do not fit a RIFF container"
        )));
    }
    let data_size = data_size as u32;
    let byte_rate = buf.sample_rate() * block_align as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&buf.sample_rate().to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for i in 0..buf.len() {
        for ch in buf.channels() {
            out.extend_from_slice(&quantize(ch[i]).to_le_bytes());
        }
    }

    Ok(out)
}

/// Format fields read from the `fmt ` chunk.
#[derive(Debug, Clone, Copy)]
struct Format {
    channels: u16,
    sample_rate: u32,
    block_align: u16,
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn parse_format(body: &[u8]) -> Result<Format> {
    if body.len() < 16 {
        return Err(Error::WavDecode(format!(
            "fmt chunk is {} bytes, need at least 16",
            body.len()
        )));
    }
    let audio_format = read_u16(body, 0);
    let channels = read_u16(body, 2);
    let sample_rate = read_u32(body, 4);
    let block_align = read_u16(body, 12);
    let bits = read_u16(body, 14);

    if audio_format != WAVE_FORMAT_PCM {
        return Err(Error::WavDecode(format!(
            "unsupported audio format {audio_format:#06x}, only PCM is supported"
        )));
    }
    if bits != BITS_PER_SAMPLE {
        return Err(Error::WavDecode(format!(
            "unsupported bit depth {bits}, only 16-bit is supported"
        )));
    }
    if channels == 0 || channels > 2 {
        return Err(Error::WavDecode(format!(
            "unsupported channel count {channels}"
        )));
    }
    if sample_rate == 0 {
        return Err(Error::WavDecode("sample rate is zero".into()));
    }
    if block_align as usize != channels as usize * BYTES_PER_SAMPLE {
        return Err(Error::WavDecode(format!(
            "block align {block_align} does not match {channels} channels of 16-bit samples"
        )));
    }
    Ok(Format {
        channels,
        sample_rate,
        block_align,
    })
}

/// Parse a 16-bit PCM WAV byte stream.
pub fn decode(bytes: &[u8]) -> Result<PcmBuffer> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(Error::WavDecode("missing RIFF/WAVE header".into()));
    }

    let mut format: Option<Format> = None;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4) as usize;
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                Error::WavDecode(format!(
                    "chunk {:?} claims {size} bytes but only {} remain",
                    String::from_utf8_lossy(id),
                    bytes.len() - body_start
                ))
            })?;
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => format = Some(parse_format(body)?),
            b"data" => {
                let fmt = format
                    .ok_or_else(|| Error::WavDecode("data chunk before fmt chunk".into()))?;
                return decode_samples(body, fmt);
            }
            _ => {}
        }

        pos = body_end + (size & 1);
    }

    Err(Error::WavDecode(match format {
        Some(_) => "missing data chunk".into(),
        None => "missing fmt chunk".into(),
    }))
}

fn decode_samples(data: &[u8], fmt: Format) -> Result<PcmBuffer> {
    let block_align = fmt.block_align as usize;
    if data.len() % block_align != 0 {
        return Err(Error::WavDecode(format!(
            "data length {} is not a multiple of block align {block_align}",
            data.len()
        )));
    }
    let frames = data.len() / block_align;
    let mut channels = vec![Vec::with_capacity(frames); fmt.channels as usize];
    for frame in data.chunks_exact(block_align) {
        for (ch, sample) in channels
            .iter_mut()
            .zip(frame.chunks_exact(BYTES_PER_SAMPLE))
        {
            ch.push(dequantize(i16::from_le_bytes([sample[0], sample[1]])));
        }
    }
    PcmBuffer::new(fmt.sample_rate, channels)
}

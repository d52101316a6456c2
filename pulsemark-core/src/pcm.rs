use crate::error::{Error, Result};

/// Decoded audio held fully in memory.
///
/// Samples are stored per channel (planar) as `f32`, nominally in [-1, 1].
/// Every channel has the same length. Buffers are never modified after they
/// are handed to another stage; transforms allocate a new buffer instead.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Create a buffer from planar channel data.
    ///
    /// Fails if the sample rate is zero, the channel count is not 1 or 2, or
    /// the channels differ in length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate);
        }
        if channels.is_empty() || channels.len() > 2 {
            return Err(Error::InvalidChannels(channels.len()));
        }
        let expected = channels[0].len();
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(Error::RaggedChannels {
                channel,
                expected,
                got: ch.len(),
            });
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// A silent buffer of `duration_s` seconds.
    pub fn silence(sample_rate: u32, num_channels: u8, duration_s: f64) -> Result<Self> {
        if !(duration_s.is_finite() && duration_s > 0.0) {
            return Err(Error::InvalidDuration(duration_s));
        }
        let len = (duration_s * sample_rate as f64).round() as usize;
        Self::new(sample_rate, vec![vec![0.0; len]; num_channels as usize])
    }

    /// Split channel-interleaved samples into a planar buffer.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, num_channels: u8, samples: &[f32]) -> Result<Self> {
        let n = num_channels as usize;
        if n == 0 || n > 2 {
            return Err(Error::InvalidChannels(n));
        }
        let frames = samples.len() / n;
        let mut channels = vec![Vec::with_capacity(frames); n];
        for frame in samples.chunks_exact(n) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> u8 {
        self.channels.len() as u8
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples of channel `index`, or `None` if it does not exist.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Samples interleaved frame by frame (L R L R ...).
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.channels.len());
        for i in 0..self.len() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    /// A stereo copy of this buffer; a mono channel is duplicated.
    pub fn to_stereo(&self) -> PcmBuffer {
        match self.channels.len() {
            1 => PcmBuffer {
                sample_rate: self.sample_rate,
                channels: vec![self.channels[0].clone(), self.channels[0].clone()],
            },
            _ => self.clone(),
        }
    }
}

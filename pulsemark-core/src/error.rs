use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tone frequency {0} Hz outside the watermark band [30, 60] Hz")]
    FrequencyOutOfRange(f64),

    #[error("pulse rate must be positive and finite, got {0} Hz")]
    InvalidPulseRate(f64),

    #[error("duration must be positive and finite, got {0} s")]
    InvalidDuration(f64),

    #[error("sample rate must be non-zero")]
    InvalidSampleRate,

    #[error("expected 1 or 2 channels, got {0}")]
    InvalidChannels(usize),

    #[error("channel {channel} has {got} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        got: usize,
    },

    #[error(
        "mix input {index} is {got_rate} Hz / {got_channels} ch, host is {expected_rate} Hz / {expected_channels} ch"
    )]
    FormatMismatch {
        index: usize,
        expected_rate: u32,
        expected_channels: u8,
        got_rate: u32,
        got_channels: u8,
    },

    #[error("tones at {a} Hz and {b} Hz are closer than {min_gap} Hz")]
    ToneSeparation { a: u32, b: u32, min_gap: u32 },

    #[error("watermark needs {min} to {max} tones, got {got}")]
    ToneCount { min: usize, max: usize, got: usize },

    #[error("{frequencies} frequencies given with {pulse_rates} pulse rates")]
    ToneArrayMismatch {
        frequencies: usize,
        pulse_rates: usize,
    },

    #[error("invalid scan range {low}..={high} Hz at sample rate {sample_rate} Hz")]
    InvalidScanRange { low: u32, high: u32, sample_rate: u32 },

    #[error("invalid scan timing: {0}")]
    InvalidScanTiming(String),

    #[error("malformed spectrogram grid: {0}")]
    InvalidGrid(String),

    #[error("audio buffer is empty")]
    EmptyBuffer,

    #[error("WAV encode failed: {0}")]
    WavEncode(String),

    #[error("WAV decode failed: {0}")]
    WavDecode(String),

    #[error("JSON export failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by caller-supplied parameters, raised before any
    /// computation starts.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Error::FrequencyOutOfRange(_)
                | Error::InvalidPulseRate(_)
                | Error::InvalidDuration(_)
                | Error::InvalidSampleRate
                | Error::InvalidChannels(_)
                | Error::RaggedChannels { .. }
                | Error::FormatMismatch { .. }
                | Error::ToneSeparation { .. }
                | Error::ToneCount { .. }
                | Error::ToneArrayMismatch { .. }
                | Error::InvalidScanRange { .. }
                | Error::InvalidScanTiming(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

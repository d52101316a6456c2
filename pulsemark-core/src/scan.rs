//! Sliding-window Goertzel scan over the watermark band.
//!
//! For each hop a one-second block of channel 0 is Hann-windowed once and
//! then evaluated at every integer frequency of the scan range, producing a
//! time × frequency magnitude grid.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::frame::{extract_windowed, hann_window};
use crate::goertzel::Goertzel;
use crate::pcm::PcmBuffer;

/// Magnitude-over-time at one frequency.
///
/// Sample `i` belongs to time offset `i · hop_seconds`; every trace of a
/// grid shares the same hop and length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTrace {
    pub frequency_hz: u32,
    pub hop_seconds: f64,
    pub magnitudes: Vec<f64>,
}

impl FrequencyTrace {
    /// `(time_offset_s, magnitude)` pairs in time order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| (i as f64 * self.hop_seconds, m))
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

/// Per-frequency traces in ascending frequency order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramGrid {
    traces: Vec<FrequencyTrace>,
}

impl SpectrogramGrid {
    /// Build a grid from traces.
    ///
    /// Fails unless frequencies strictly ascend and all traces share one
    /// time grid.
    pub fn from_traces(traces: Vec<FrequencyTrace>) -> Result<Self> {
        if let Some(first) = traces.first() {
            for pair in traces.windows(2) {
                if pair[1].frequency_hz <= pair[0].frequency_hz {
                    return Err(Error::InvalidGrid(format!(
                        "{} Hz follows {} Hz",
                        pair[1].frequency_hz, pair[0].frequency_hz
                    )));
                }
            }
            if traces
                .iter()
                .any(|t| t.len() != first.len() || t.hop_seconds != first.hop_seconds)
            {
                return Err(Error::InvalidGrid(
                    "traces do not share one time grid".into(),
                ));
            }
        }
        Ok(Self { traces })
    }

    pub fn traces(&self) -> &[FrequencyTrace] {
        &self.traces
    }

    pub fn trace(&self, frequency_hz: u32) -> Option<&FrequencyTrace> {
        self.traces.iter().find(|t| t.frequency_hz == frequency_hz)
    }

    pub fn frequencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.traces.iter().map(|t| t.frequency_hz)
    }

    pub fn num_frequencies(&self) -> usize {
        self.traces.len()
    }

    pub fn num_hops(&self) -> usize {
        self.traces.first().map_or(0, FrequencyTrace::len)
    }

    /// Hop duration shared by all traces (0 for an empty grid).
    pub fn hop_seconds(&self) -> f64 {
        self.traces.first().map_or(0.0, |t| t.hop_seconds)
    }

    /// Time offsets of the hops.
    pub fn time_offsets(&self) -> Vec<f64> {
        let hop = self.hop_seconds();
        (0..self.num_hops()).map(|i| i as f64 * hop).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// Precomputed geometry of one scan over one buffer.
#[derive(Debug, Clone)]
pub(crate) struct ScanPlan {
    pub(crate) window: Vec<f32>,
    pub(crate) filters: Vec<Goertzel>,
    pub(crate) frequencies: Vec<u32>,
    pub(crate) num_hops: usize,
    hop_seconds: f64,
    half_window_seconds: f64,
    sample_rate: u32,
    max_start: usize,
}

impl ScanPlan {
    pub(crate) fn new(buf: &PcmBuffer, config: &ScanConfig) -> Result<Self> {
        validate(buf, config)?;

        let sample_rate = buf.sample_rate();
        let nominal = config.window_samples(sample_rate);
        let window_len = nominal.min(buf.len());
        if window_len < nominal {
            warn!(
                available = buf.len(),
                nominal, "buffer shorter than analysis window, scanning whole buffer"
            );
        }

        let frequencies: Vec<u32> = (config.freq_low..=config.freq_high).collect();
        let filters = frequencies
            .iter()
            .map(|&f| Goertzel::new(f as f64, sample_rate, window_len))
            .collect();

        let plan = Self {
            window: hann_window(window_len),
            filters,
            frequencies,
            num_hops: config.num_hops(),
            hop_seconds: config.hop_seconds,
            half_window_seconds: config.window_seconds / 2.0,
            sample_rate,
            max_start: buf.len() - window_len,
        };
        debug!(
            sample_rate,
            window_len,
            hops = plan.num_hops,
            frequencies = plan.frequencies.len(),
            "scan plan"
        );
        Ok(plan)
    }

    /// First sample of the window centered on hop `index`.
    pub(crate) fn window_start(&self, index: usize) -> usize {
        let start_s = (index as f64 * self.hop_seconds - self.half_window_seconds).max(0.0);
        ((start_s * self.sample_rate as f64).round() as usize).min(self.max_start)
    }

    /// Magnitudes of every scanned frequency for hop `index`.
    pub(crate) fn analyze_hop(&self, samples: &[f32], index: usize) -> Vec<f64> {
        let block = extract_windowed(samples, self.window_start(index), &self.window);
        self.filters.iter().map(|g| g.magnitude(&block)).collect()
    }

    /// Assemble per-hop columns into a grid of per-frequency rows.
    pub(crate) fn into_grid(self, columns: Vec<Vec<f64>>) -> SpectrogramGrid {
        let traces = self
            .frequencies
            .iter()
            .enumerate()
            .map(|(fi, &frequency_hz)| FrequencyTrace {
                frequency_hz,
                hop_seconds: self.hop_seconds,
                magnitudes: columns.iter().map(|col| col[fi]).collect(),
            })
            .collect();
        SpectrogramGrid { traces }
    }
}

fn validate(buf: &PcmBuffer, config: &ScanConfig) -> Result<()> {
    let timing_ok = |v: f64| v.is_finite() && v > 0.0;
    if !timing_ok(config.window_seconds) {
        return Err(Error::InvalidScanTiming(format!(
            "window of {} s",
            config.window_seconds
        )));
    }
    if !timing_ok(config.hop_seconds) {
        return Err(Error::InvalidScanTiming(format!(
            "hop of {} s",
            config.hop_seconds
        )));
    }
    if !timing_ok(config.span_seconds) {
        return Err(Error::InvalidScanTiming(format!(
            "span of {} s",
            config.span_seconds
        )));
    }
    let sample_rate = buf.sample_rate();
    if config.freq_low == 0
        || config.freq_low > config.freq_high
        || config.freq_high as f64 >= sample_rate as f64 / 2.0
    {
        return Err(Error::InvalidScanRange {
            low: config.freq_low,
            high: config.freq_high,
            sample_rate,
        });
    }
    if buf.is_empty() {
        return Err(Error::EmptyBuffer);
    }
    Ok(())
}

/// Scan channel 0 of `buf` into a spectrogram grid.
///
/// Other channels are ignored; there is no downmix.
pub fn scan(buf: &PcmBuffer, config: &ScanConfig) -> Result<SpectrogramGrid> {
    let plan = ScanPlan::new(buf, config)?;
    let samples = buf.channels()[0].as_slice();
    let columns = (0..plan.num_hops)
        .map(|i| plan.analyze_hop(samples, i))
        .collect();
    Ok(plan.into_grid(columns))
}

/// Scan with default timing over `freq_low..=freq_high`.
pub fn scan_range(buf: &PcmBuffer, freq_low: u32, freq_high: u32) -> Result<SpectrogramGrid> {
    scan(
        buf,
        &ScanConfig {
            freq_low,
            freq_high,
            ..ScanConfig::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone;

    #[test]
    fn default_grid_shape() {
        let buf = PcmBuffer::silence(1000, 1, 20.0).unwrap();
        let grid = scan(&buf, &ScanConfig::default()).unwrap();
        assert_eq!(grid.num_frequencies(), 31);
        assert_eq!(grid.num_hops(), 400);
        assert_eq!(grid.frequencies().next(), Some(30));
        assert_eq!(grid.frequencies().last(), Some(60));
        let times = grid.time_offsets();
        assert_eq!(times[0], 0.0);
        assert!((times[399] - 19.95).abs() < 1e-9);
    }

    #[test]
    fn trace_points_pair_time_with_magnitude() {
        let trace = FrequencyTrace {
            frequency_hz: 40,
            hop_seconds: 0.05,
            magnitudes: vec![0.1, 0.2, 0.3],
        };
        let points: Vec<(f64, f64)> = trace.points().collect();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], (0.0, 0.1));
        assert!((points[2].0 - 0.1).abs() < 1e-12);
        assert_eq!(points[2].1, 0.3);

        let buf = tone::generate(40.0, 0.5, 2.0, 1000).unwrap();
        let grid = scan(&buf, &ScanConfig::default()).unwrap();
        let times: Vec<f64> = grid.trace(40).unwrap().points().map(|(t, _)| t).collect();
        assert_eq!(times, grid.time_offsets());
    }

    #[test]
    fn window_start_is_centered_and_clamped() {
        let buf = PcmBuffer::silence(1000, 1, 20.0).unwrap();
        let plan = ScanPlan::new(&buf, &ScanConfig::default()).unwrap();
        // First ten hops are clamped to the buffer start
        assert_eq!(plan.window_start(0), 0);
        assert_eq!(plan.window_start(10), 0);
        assert_eq!(plan.window_start(11), 50);
        assert_eq!(plan.window_start(100), 4500);
        // Last valid start is len - window
        assert_eq!(plan.window_start(399), 19000);
    }

    #[test]
    fn only_first_channel_is_analyzed() {
        let tone = tone::generate(45.0, 0.5, 4.0, 1000).unwrap();
        let silent = vec![0.0f32; tone.len()];
        let left_only =
            PcmBuffer::new(1000, vec![tone.channel(0).unwrap().to_vec(), silent.clone()]).unwrap();
        let right_only =
            PcmBuffer::new(1000, vec![silent, tone.channel(0).unwrap().to_vec()]).unwrap();

        let config = ScanConfig::default();
        let left = scan(&left_only, &config).unwrap();
        let right = scan(&right_only, &config).unwrap();

        let peak = |g: &SpectrogramGrid| {
            g.trace(45)
                .unwrap()
                .magnitudes
                .iter()
                .fold(0.0f64, |m, &v| m.max(v))
        };
        assert!(peak(&left) > 0.01);
        assert_eq!(peak(&right), 0.0);
    }

    #[test]
    fn short_buffer_is_scanned_whole() {
        let buf = tone::generate(40.0, 0.5, 0.5, 1000).unwrap();
        let grid = scan(&buf, &ScanConfig::default()).unwrap();
        assert_eq!(grid.num_hops(), 400);
        // Every hop sees the same clamped block
        let trace = grid.trace(40).unwrap();
        assert!(trace.magnitudes.iter().all(|&m| m == trace.magnitudes[0]));
        assert!(trace.magnitudes[0] > 0.0);
    }

    #[test]
    fn rejects_empty_buffer_and_bad_ranges() {
        let empty = PcmBuffer::new(1000, vec![vec![]]).unwrap();
        assert!(matches!(
            scan(&empty, &ScanConfig::default()),
            Err(Error::EmptyBuffer)
        ));

        let buf = PcmBuffer::silence(1000, 1, 1.0).unwrap();
        assert!(scan_range(&buf, 60, 30).is_err());
        assert!(scan_range(&buf, 0, 30).is_err());
        assert!(scan_range(&buf, 30, 500).is_err());

        let bad_hop = ScanConfig {
            hop_seconds: 0.0,
            ..ScanConfig::default()
        };
        let err = scan(&buf, &bad_hop).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn grid_rejects_mismatched_traces() {
        let trace = |f, n| FrequencyTrace {
            frequency_hz: f,
            hop_seconds: 0.05,
            magnitudes: vec![0.0; n],
        };
        assert!(SpectrogramGrid::from_traces(vec![trace(30, 4), trace(31, 4)]).is_ok());
        assert!(SpectrogramGrid::from_traces(vec![trace(30, 4), trace(31, 5)]).is_err());
        assert!(SpectrogramGrid::from_traces(vec![trace(31, 4), trace(30, 4)]).is_err());
        assert!(SpectrogramGrid::from_traces(vec![]).unwrap().is_empty());
    }
}

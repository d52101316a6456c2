//! Variance-based watermark discrimination.
//!
//! A pulsing watermark tone makes its frequency's magnitude rise and fall
//! over time, while stationary content at the same frequency stays flat.
//! Traces are ranked by temporal variance and thresholded.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DetectConfig;
use crate::scan::{FrequencyTrace, SpectrogramGrid};

/// A frequency judged to carry a pulsing watermark tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub frequency_hz: u32,
    /// Population variance of the magnitude trace.
    pub variance: f64,
    /// Mean of the magnitude trace.
    pub avg_magnitude: f64,
    /// Peaks per second, rounded to one decimal.
    pub pulse_rate_estimate: f64,
    pub trace: FrequencyTrace,
}

/// Mean and population variance of a trace's magnitudes.
pub fn trace_stats(magnitudes: &[f64]) -> (f64, f64) {
    if magnitudes.is_empty() {
        return (0.0, 0.0);
    }
    let n = magnitudes.len() as f64;
    let mean = magnitudes.iter().sum::<f64>() / n;
    let variance = magnitudes.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// Number of strict local maxima (`m[i-1] < m[i] > m[i+1]`).
pub fn count_peaks(magnitudes: &[f64]) -> usize {
    magnitudes
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2])
        .count()
}

/// Estimate the pulse rate from peak count over the trace's elapsed time.
///
/// Coarse by construction: noise ripple adds spurious peaks. The result is
/// rounded to one decimal place.
pub fn estimate_pulse_rate(magnitudes: &[f64], hop_seconds: f64) -> f64 {
    let elapsed = magnitudes.len() as f64 * hop_seconds;
    if elapsed <= 0.0 {
        return 0.0;
    }
    let rate = count_peaks(magnitudes) as f64 / elapsed;
    (rate * 10.0).round() / 10.0
}

/// Rank and filter the grid's frequencies.
///
/// Returns survivors in descending variance order, capped at
/// `config.max_results`. An empty vector means no watermark was found.
pub fn detect(grid: &SpectrogramGrid, config: &DetectConfig) -> Vec<DetectionResult> {
    let mut ranked: Vec<(&FrequencyTrace, f64, f64)> = grid
        .traces()
        .iter()
        .map(|t| {
            let (mean, variance) = trace_stats(&t.magnitudes);
            trace!(
                frequency_hz = t.frequency_hz,
                mean,
                variance,
                "trace statistics"
            );
            (t, mean, variance)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

    let limit = config.max_results.unwrap_or(usize::MAX);
    let results: Vec<DetectionResult> = ranked
        .into_iter()
        .filter(|&(_, mean, variance)| {
            variance > config.min_variance && mean > config.min_magnitude
        })
        .take(limit)
        .map(|(t, mean, variance)| DetectionResult {
            frequency_hz: t.frequency_hz,
            variance,
            avg_magnitude: mean,
            pulse_rate_estimate: estimate_pulse_rate(&t.magnitudes, t.hop_seconds),
            trace: t.clone(),
        })
        .collect();

    debug!(
        scanned = grid.num_frequencies(),
        detected = results.len(),
        frequencies = ?results.iter().map(|r| r.frequency_hz).collect::<Vec<_>>(),
        "watermark discrimination"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(frequency_hz: u32, magnitudes: Vec<f64>) -> FrequencyTrace {
        FrequencyTrace {
            frequency_hz,
            hop_seconds: 0.05,
            magnitudes,
        }
    }

    /// Sinusoidal magnitude curve `mean + swing·sin(2π·rate·t)`.
    fn pulsing(mean: f64, swing: f64, rate_hz: f64, hops: usize) -> Vec<f64> {
        (0..hops)
            .map(|i| {
                let t = i as f64 * 0.05;
                mean + swing * (2.0 * std::f64::consts::PI * rate_hz * t).sin()
            })
            .collect()
    }

    #[test]
    fn stats_of_constant_trace() {
        let (mean, variance) = trace_stats(&[0.5; 10]);
        assert!((mean - 0.5).abs() < 1e-12);
        assert!(variance.abs() < 1e-12);
        assert_eq!(trace_stats(&[]), (0.0, 0.0));
    }

    #[test]
    fn stats_are_population_variance() {
        let (mean, variance) = trace_stats(&[1.0, 3.0]);
        assert_eq!(mean, 2.0);
        assert_eq!(variance, 1.0);
    }

    #[test]
    fn peaks_are_strict() {
        assert_eq!(count_peaks(&[0.0, 1.0, 0.0, 1.0, 0.0]), 2);
        // Plateaus are not peaks
        assert_eq!(count_peaks(&[0.0, 1.0, 1.0, 0.0]), 0);
        assert_eq!(count_peaks(&[1.0, 0.0]), 0);
    }

    #[test]
    fn pulse_rate_from_clean_curve() {
        // 0.5 Hz over 20 s: 10 peaks -> 0.5 peaks/s
        let m = pulsing(0.02, 0.01, 0.5, 400);
        assert_eq!(estimate_pulse_rate(&m, 0.05), 0.5);
        let m = pulsing(0.02, 0.01, 0.25, 400);
        assert_eq!(estimate_pulse_rate(&m, 0.05), 0.3);
        assert_eq!(estimate_pulse_rate(&[], 0.05), 0.0);
    }

    #[test]
    fn ranks_by_variance_and_caps_at_two() {
        let grid = SpectrogramGrid::from_traces(vec![
            trace(30, pulsing(0.02, 0.015, 0.5, 400)),
            trace(31, pulsing(0.02, 0.030, 0.25, 400)),
            trace(32, pulsing(0.02, 0.020, 0.125, 400)),
            trace(33, vec![0.5; 400]),
        ])
        .unwrap();

        let results = detect(&grid, &DetectConfig::default());
        let freqs: Vec<u32> = results.iter().map(|r| r.frequency_hz).collect();
        assert_eq!(freqs, vec![31, 32]);
        assert!(results[0].variance > results[1].variance);

        let all = detect(
            &grid,
            &DetectConfig {
                max_results: None,
                ..DetectConfig::default()
            },
        );
        let freqs: Vec<u32> = all.iter().map(|r| r.frequency_hz).collect();
        assert_eq!(freqs, vec![31, 32, 30]);
    }

    #[test]
    fn thresholds_filter_quiet_or_flat_traces() {
        let grid = SpectrogramGrid::from_traces(vec![
            // Loud but steady
            trace(40, vec![0.3; 400]),
            // Varies, but the swing is too small to clear the variance floor
            trace(41, pulsing(0.02, 0.005, 0.5, 400)),
            // Large relative swing at a magnitude below the floor
            trace(42, pulsing(0.0005, 0.0004, 0.5, 400)),
        ])
        .unwrap();
        assert!(detect(&grid, &DetectConfig::default()).is_empty());
    }

    #[test]
    fn empty_grid_yields_no_results() {
        let grid = SpectrogramGrid::default();
        assert!(detect(&grid, &DetectConfig::default()).is_empty());
    }

    #[test]
    fn result_carries_its_trace() {
        let m = pulsing(0.02, 0.02, 0.5, 400);
        let grid = SpectrogramGrid::from_traces(vec![trace(50, m.clone())]).unwrap();
        let results = detect(&grid, &DetectConfig::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].trace.magnitudes, m);
        assert_eq!(results[0].pulse_rate_estimate, 0.5);
    }
}

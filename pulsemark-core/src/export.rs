//! Serialization of a spectrogram grid for visualization or offline
//! analysis. These formats are a view of the grid, not part of detection.

use std::fmt::Write;

use serde::Serialize;

use crate::Analysis;
use crate::detect::DetectionResult;
use crate::error::Result;
use crate::scan::SpectrogramGrid;

/// CSV with one row per frequency and one column per hop.
///
/// The header row is `hz` followed by the hop time offsets in seconds.
pub fn grid_to_csv(grid: &SpectrogramGrid) -> String {
    let mut out = String::from("hz");
    for t in grid.time_offsets() {
        let _ = write!(out, ",{t:.2}");
    }
    out.push('\n');
    for trace in grid.traces() {
        let _ = write!(out, "{}", trace.frequency_hz);
        for m in &trace.magnitudes {
            let _ = write!(out, ",{m:.6e}");
        }
        out.push('\n');
    }
    out
}

/// JSON array of `{ frequency_hz, hop_seconds, magnitudes }` objects.
pub fn grid_to_json(grid: &SpectrogramGrid) -> Result<String> {
    Ok(serde_json::to_string(grid.traces())?)
}

#[derive(Serialize)]
struct ResultSummary<'a> {
    frequency_hz: u32,
    variance: f64,
    avg_magnitude: f64,
    pulse_rate_estimate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    magnitudes: Option<&'a [f64]>,
}

impl<'a> ResultSummary<'a> {
    fn new(r: &'a DetectionResult, with_trace: bool) -> Self {
        Self {
            frequency_hz: r.frequency_hz,
            variance: r.variance,
            avg_magnitude: r.avg_magnitude,
            pulse_rate_estimate: r.pulse_rate_estimate,
            magnitudes: with_trace.then_some(r.trace.magnitudes.as_slice()),
        }
    }
}

#[derive(Serialize)]
struct AnalysisSummary<'a> {
    watermarked: bool,
    hop_seconds: f64,
    num_hops: usize,
    results: Vec<ResultSummary<'a>>,
}

/// Pretty JSON report of an analysis: detection results, optionally with
/// their magnitude traces.
pub fn analysis_to_json(analysis: &Analysis, with_traces: bool) -> Result<String> {
    let summary = AnalysisSummary {
        watermarked: analysis.is_watermarked(),
        hop_seconds: analysis.grid.hop_seconds(),
        num_hops: analysis.grid.num_hops(),
        results: analysis
            .results
            .iter()
            .map(|r| ResultSummary::new(r, with_traces))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

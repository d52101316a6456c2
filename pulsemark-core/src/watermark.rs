use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::retry::{Attempt, RetryBudget};
use crate::tone::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};

/// Minimum spacing between any two watermark frequencies in Hz.
pub const MIN_SEPARATION_HZ: u32 = 5;

/// Fewest tones a watermark may carry.
pub const MIN_TONES: usize = 2;

/// Most tones a watermark may carry.
pub const MAX_TONES: usize = 3;

/// Pulse rates drawn by [`WatermarkSpec::generate`], in Hz.
pub const CANDIDATE_PULSE_RATES: [f64; 3] = [0.125, 0.25, 0.5];

/// One pulsing tone of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub frequency_hz: u32,
    pub pulse_rate_hz: f64,
}

impl ToneSpec {
    pub fn new(frequency_hz: u32, pulse_rate_hz: f64) -> Self {
        Self {
            frequency_hz,
            pulse_rate_hz,
        }
    }
}

/// The set of tones making up one watermark.
///
/// Frequencies lie in [30, 60] Hz and are pairwise at least
/// [`MIN_SEPARATION_HZ`] apart. Deserialization validates like
/// [`WatermarkSpec::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWatermarkSpec")]
pub struct WatermarkSpec {
    tones: Vec<ToneSpec>,
}

#[derive(Deserialize)]
struct RawWatermarkSpec {
    tones: Vec<ToneSpec>,
}

impl TryFrom<RawWatermarkSpec> for WatermarkSpec {
    type Error = Error;

    fn try_from(raw: RawWatermarkSpec) -> Result<Self> {
        Self::new(raw.tones)
    }
}

/// A generated spec plus how the search went.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSpec {
    pub spec: WatermarkSpec,
    pub attempts: usize,
    /// True if the retry budget ran out and the tones were taken from the best
    /// draw, possibly with fewer tones than requested.
    pub exhausted: bool,
}

fn min_separation(tones: &[ToneSpec]) -> u32 {
    let mut min = u32::MAX;
    for (i, a) in tones.iter().enumerate() {
        for b in &tones[i + 1..] {
            min = min.min(a.frequency_hz.abs_diff(b.frequency_hz));
        }
    }
    min
}

/// Keep tones greedily, dropping any closer than the minimum to one kept.
fn drop_crowded(tones: Vec<ToneSpec>) -> Vec<ToneSpec> {
    let mut kept: Vec<ToneSpec> = Vec::with_capacity(tones.len());
    for tone in tones {
        if kept
            .iter()
            .all(|k| k.frequency_hz.abs_diff(tone.frequency_hz) >= MIN_SEPARATION_HZ)
        {
            kept.push(tone);
        }
    }
    kept
}

impl WatermarkSpec {
    /// Validate and build a spec from caller-chosen tones.
    pub fn new(tones: Vec<ToneSpec>) -> Result<Self> {
        if !(MIN_TONES..=MAX_TONES).contains(&tones.len()) {
            return Err(Error::ToneCount {
                min: MIN_TONES,
                max: MAX_TONES,
                got: tones.len(),
            });
        }
        for tone in &tones {
            let f = tone.frequency_hz as f64;
            if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&f) {
                return Err(Error::FrequencyOutOfRange(f));
            }
            if !(tone.pulse_rate_hz.is_finite() && tone.pulse_rate_hz > 0.0) {
                return Err(Error::InvalidPulseRate(tone.pulse_rate_hz));
            }
        }
        for (i, a) in tones.iter().enumerate() {
            for b in &tones[i + 1..] {
                if a.frequency_hz.abs_diff(b.frequency_hz) < MIN_SEPARATION_HZ {
                    return Err(Error::ToneSeparation {
                        a: a.frequency_hz,
                        b: b.frequency_hz,
                        min_gap: MIN_SEPARATION_HZ,
                    });
                }
            }
        }
        Ok(Self { tones })
    }

    pub fn tones(&self) -> &[ToneSpec] {
        &self.tones
    }

    pub fn frequencies(&self) -> Vec<u32> {
        self.tones.iter().map(|t| t.frequency_hz).collect()
    }

    /// Smallest pairwise frequency gap in Hz (`u32::MAX` for a single tone).
    pub fn min_separation(&self) -> u32 {
        min_separation(&self.tones)
    }

    /// Draw a random spec of `count` tones with the default retry budget.
    pub fn generate<R: Rng>(rng: &mut R, count: usize) -> Result<GeneratedSpec> {
        Self::generate_with_budget(rng, count, RetryBudget::default())
    }

    /// Draw random frequencies until they are pairwise separated.
    ///
    /// If the budget runs out, the best draw (widest minimum gap) is kept
    /// with crowded tones removed, so the result never violates the
    /// separation invariant but may hold fewer than `count` tones.
    pub fn generate_with_budget<R: Rng>(
        rng: &mut R,
        count: usize,
        budget: RetryBudget,
    ) -> Result<GeneratedSpec> {
        if !(MIN_TONES..=MAX_TONES).contains(&count) {
            return Err(Error::ToneCount {
                min: MIN_TONES,
                max: MAX_TONES,
                got: count,
            });
        }

        let low = MIN_FREQUENCY_HZ as u32;
        let high = MAX_FREQUENCY_HZ as u32;
        let outcome = budget.run(
            || {
                (0..count)
                    .map(|_| {
                        let rate =
                            CANDIDATE_PULSE_RATES[rng.gen_range(0..CANDIDATE_PULSE_RATES.len())];
                        ToneSpec::new(rng.gen_range(low..=high), rate)
                    })
                    .collect::<Vec<_>>()
            },
            |tones| min_separation(tones) >= MIN_SEPARATION_HZ,
            |tones| min_separation(tones),
        );

        let attempts = outcome.attempts();
        let exhausted = outcome.is_exhausted();
        let tones = match outcome {
            Attempt::Accepted { value, .. } => value,
            Attempt::Exhausted { best, .. } => drop_crowded(best),
        };
        debug!(
            attempts,
            exhausted,
            frequencies = ?tones.iter().map(|t| t.frequency_hz).collect::<Vec<_>>(),
            "generated watermark spec"
        );

        // Bypasses the count check: an exhausted search may keep a single tone.
        Ok(GeneratedSpec {
            spec: Self { tones },
            attempts,
            exhausted,
        })
    }
}

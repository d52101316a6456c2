//! Optional parallel scanning using rayon.
//!
//! Enable with the `parallel` feature flag. Hops are independent: each rayon
//! task windows its own block and evaluates every frequency, producing one
//! grid column. Output is identical to [`crate::scan::scan`].

use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::error::Result;
use crate::pcm::PcmBuffer;
use crate::scan::{ScanPlan, SpectrogramGrid};

/// Scan channel 0 of `buf` with hops distributed across the rayon pool.
pub fn scan_parallel(buf: &PcmBuffer, config: &ScanConfig) -> Result<SpectrogramGrid> {
    let plan = ScanPlan::new(buf, config)?;
    let samples = buf.channels()[0].as_slice();
    let columns: Vec<Vec<f64>> = (0..plan.num_hops)
        .into_par_iter()
        .map(|i| plan.analyze_hop(samples, i))
        .collect();
    Ok(plan.into_grid(columns))
}

use std::f64::consts::PI;

/// Generate a symmetric Hann window of the given size.
///
/// `w[i] = 0.5 · (1 - cos(2π·i / (size - 1)))`, zero at both ends.
/// A window of one sample is `[1.0]`.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| (0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos())) as f32)
        .collect()
}

/// Apply a Hann window to a block of samples in place.
pub fn apply_hann_window(samples: &mut [f32]) {
    let window = hann_window(samples.len());
    for (s, w) in samples.iter_mut().zip(window) {
        *s *= w;
    }
}

/// Copy `window.len()` samples starting at `offset`, multiplied by `window`.
///
/// The caller guarantees the range lies inside `input`.
pub fn extract_windowed(input: &[f32], offset: usize, window: &[f32]) -> Vec<f32> {
    input[offset..offset + window.len()]
        .iter()
        .zip(window)
        .map(|(&s, &w)| s * w)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_endpoints() {
        let w = hann_window(1025);
        assert_eq!(w.len(), 1025);
        // Symmetric Hann is zero at both endpoints
        assert!(w[0].abs() < 1e-6);
        assert!(w[1024].abs() < 1e-6);
        // And exactly one at the center of an odd-length window
        assert!((w[512] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hann_window_is_symmetric() {
        let w = hann_window(100);
        for i in 0..50 {
            assert!((w[i] - w[99 - i]).abs() < 1e-6, "asymmetry at {i}");
        }
    }

    #[test]
    fn degenerate_sizes() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn apply_matches_extract() {
        let input: Vec<f32> = (0..300).map(|i| (i as f32 * 0.1).sin()).collect();
        let window = hann_window(128);
        let extracted = extract_windowed(&input, 40, &window);

        let mut applied = input[40..168].to_vec();
        apply_hann_window(&mut applied);
        assert_eq!(extracted, applied);
    }
}

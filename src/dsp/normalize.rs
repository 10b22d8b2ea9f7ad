//! Peak normalization.

/// Rescale the signal so its peak absolute amplitude is exactly 1.0.
///
/// An all-zero signal is returned unchanged; there is no peak to scale by.
pub fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|s| s / peak).collect()
}

//! Leading/trailing silence removal.

/// Default absolute-amplitude threshold below which a sample counts as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Strip leading and trailing samples whose absolute value is below
/// `threshold`.
///
/// Returns the shortest contiguous run containing every sample at or above
/// the threshold; samples exactly at the threshold are kept. An
/// entirely-silent signal trims to empty. The returned buffer starts a new
/// origin: offsets into the original signal are not preserved.
pub fn trim_silence(samples: &[f32], threshold: f32) -> Vec<f32> {
    let Some(start) = samples.iter().position(|s| s.abs() >= threshold) else {
        return Vec::new();
    };
    let end = samples
        .iter()
        .rposition(|s| s.abs() >= threshold)
        .unwrap_or(start);
    samples[start..=end].to_vec()
}

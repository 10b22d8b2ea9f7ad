//! Overlap-add reconstruction with per-sample averaging.

/// Merge transformed frames back into one signal of `output_len` samples.
///
/// Each frame is summed into an accumulator at its start offset while a
/// coverage counter tracks how many frames touched each index; covered
/// samples end up as the mean of all contributions. Adjacent frames disagree
/// slightly at their seams, and averaging smooths that without a window
/// function.
///
/// Writes past `output_len` are clipped. Samples no frame covers stay at 0.0
/// — the trailing gap left by the framer's drop-partial-window policy comes
/// back as silence.
pub fn overlap_add(frames: &[(usize, Vec<f32>)], output_len: usize) -> Vec<f32> {
    let mut acc = vec![0.0f32; output_len];
    let mut coverage = vec![0u32; output_len];

    for (start, frame) in frames {
        for (j, sample) in frame.iter().enumerate() {
            let Some(slot) = acc.get_mut(start + j) else {
                break;
            };
            *slot += *sample;
            coverage[start + j] += 1;
        }
    }

    for (slot, count) in acc.iter_mut().zip(&coverage) {
        if *count > 0 {
            *slot /= *count as f32;
        }
    }

    acc
}

//! Fixed-length, fixed-hop framing.

/// One model input window plus its position in the parent signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Offset of the first sample within the signal that was framed.
    pub start: usize,
    pub samples: Vec<f32>,
}

/// Start offsets of every full window: `0, hop, 2*hop, ..` while
/// `start + frame_length` still fits inside `len`.
///
/// The trailing partial window is dropped, never zero-padded. Calling this
/// again with the same arguments yields the identical sequence.
pub fn frame_starts(
    len: usize,
    frame_length: usize,
    hop_length: usize,
) -> impl Iterator<Item = usize> {
    (0..)
        .map(move |k| k * hop_length)
        .take_while(move |start| start + frame_length <= len)
}

/// Slice the signal into overlapping frames.
///
/// Empty when the signal is shorter than `frame_length`. Both lengths must be
/// positive; the pipeline validates them before calling in here.
pub fn split_into_frames(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<Frame> {
    frame_starts(samples.len(), frame_length, hop_length)
        .map(|start| Frame {
            start,
            samples: samples[start..start + frame_length].to_vec(),
        })
        .collect()
}

//! Frame transform capability and built-in offline engines.
//!
//! The model behind the pipeline is opaque: one frame of samples in, one
//! frame of the same length out. Any inference backend (native, remote, or
//! another ML runtime) can sit behind this trait without the pipeline
//! noticing.

use anyhow::Result;

/// One-frame-in, one-frame-out model capability.
///
/// # Frame Size Contract
/// `frame` always holds exactly `ModelConfig::frame_length` samples and the
/// returned buffer must have the same length; the pipeline rejects anything
/// else. Calls may be slow and may fail; a single failure aborts the whole
/// invocation. Frames are dispatched from a worker pool, so implementations
/// must be `Send + Sync` and must not keep state across frames.
pub trait FrameTransform: Send + Sync {
    fn transform(&self, frame: &[f32]) -> Result<Vec<f32>>;

    fn name(&self) -> &'static str {
        "unknown_transform"
    }
}

/// Identity engine: returns every frame unchanged.
///
/// Used for offline runs and benchmarks where only the framing and
/// reconstruction paths are under test.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransform;

impl FrameTransform for PassthroughTransform {
    fn transform(&self, frame: &[f32]) -> Result<Vec<f32>> {
        Ok(frame.to_vec())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Constant-gain engine, mostly useful for exercising the pipeline with a
/// transform whose output is distinguishable from its input.
#[derive(Debug, Clone, Copy)]
pub struct GainTransform {
    gain: f32,
}

impl GainTransform {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl FrameTransform for GainTransform {
    fn transform(&self, frame: &[f32]) -> Result<Vec<f32>> {
        Ok(frame.iter().map(|sample| sample * self.gain).collect())
    }

    fn name(&self) -> &'static str {
        "gain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_input_unchanged() {
        let frame = vec![0.5, -0.25, 0.0, 1.0];
        let out = PassthroughTransform.transform(&frame).expect("transform");
        assert_eq!(out, frame);
    }

    #[test]
    fn gain_scales_every_sample() {
        let out = GainTransform::new(0.5)
            .transform(&[1.0, -1.0, 0.5])
            .expect("transform");
        assert_eq!(out, vec![0.5, -0.5, 0.25]);
    }
}

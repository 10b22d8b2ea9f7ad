//! Canonical in-memory representation of a decoded audio signal.

/// Mono PCM samples plus the rate they were captured at.
///
/// Samples are nominally in `[-1.0, 1.0]`; the WAV encoder clamps anything
/// outside that range. The channel count is fixed at one for the whole
/// pipeline, so it is not carried per buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBuffer {
    pub samples: Vec<f32>,
    /// Sample rate in Hz. Must be positive; the pipeline rejects zero.
    pub sample_rate: u32,
}

impl SignalBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Signal duration in seconds, for logging.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

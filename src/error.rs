//! Error types shared across the pipeline stages.
//!
//! Every error is terminal for the enclosing invocation: no stage retries and
//! no partial output is ever returned. Retries, if wanted, belong to whatever
//! orchestrates the transform capability.

use thiserror::Error;

/// Failure modes of a single pipeline invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input signal has zero samples.
    #[error("input signal has no samples")]
    EmptySignal,

    /// Frame geometry or sample rate outside the valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transform capability failed for one frame; the invocation aborts.
    #[error("inference failed on frame {frame}: {message}")]
    Inference { frame: usize, message: String },

    /// The transform returned a frame of the wrong length.
    #[error("transform returned {got} samples for frame {frame}, expected {expected}")]
    LengthMismatch {
        frame: usize,
        expected: usize,
        got: usize,
    },

    /// The stop flag was observed before the invocation finished.
    #[error("processing cancelled")]
    Cancelled,

    /// Input bytes are not the canonical PCM16 mono WAV layout.
    #[error("malformed WAV data: {0}")]
    MalformedWav(String),
}

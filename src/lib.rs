//! Batch restoration pipeline for mono audio.
//!
//! A signal is optionally normalized and trimmed, sliced into fixed-length
//! overlapping frames, run frame-by-frame through a pluggable
//! [`FrameTransform`], and rebuilt by averaging overlap-add. The crate also
//! carries the canonical PCM16 WAV codec the CLI persists results with.

pub mod config;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod signal;
mod telemetry;
pub mod transform;
pub mod wav;

pub use config::ModelConfig;
pub use error::PipelineError;
pub use pipeline::{
    start_pipeline_job, Pipeline, PipelineJob, PipelineJobMessage, PipelineMetrics,
    PipelineOutput, ProcessingOptions,
};
pub use signal::SignalBuffer;
pub use telemetry::{init_tracing, trace_log_path};
pub use transform::{FrameTransform, GainTransform, PassthroughTransform};

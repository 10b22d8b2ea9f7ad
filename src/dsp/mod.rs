//! Batch DSP stages: normalization, silence trimming, framing, overlap-add.
//!
//! Every stage is a pure function over sample slices and produces a fresh
//! buffer; nothing here mutates its input or keeps state between calls. The
//! pipeline wires the stages together and owns error handling.

mod frame;
mod normalize;
mod reconstruct;
mod trim;

pub use frame::{frame_starts, split_into_frames, Frame};
pub use normalize::normalize_peak;
pub use reconstruct::overlap_add;
pub use trim::{trim_silence, DEFAULT_SILENCE_THRESHOLD};

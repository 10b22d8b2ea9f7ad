//! Frame geometry shared by the framer and the reconstructor.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Frame length the bundled model was trained with (samples).
pub const DEFAULT_FRAME_LENGTH: usize = 512;

/// Hop between consecutive frame starts (samples). 128 gives 75% overlap.
pub const DEFAULT_HOP_LENGTH: usize = 128;

/// Sample rate the model expects (Hz).
pub const DEFAULT_SAMPLING_RATE: u32 = 16_000;

/// Fixed configuration for one pipeline lifetime.
///
/// Reconstruction is only defined for frames produced with the *same*
/// `frame_length`/`hop_length` pair, so both sides read from one shared copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub frame_length: usize,
    pub hop_length: usize,
    pub sampling_rate: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            hop_length: DEFAULT_HOP_LENGTH,
            sampling_rate: DEFAULT_SAMPLING_RATE,
        }
    }
}

impl ModelConfig {
    /// Check the geometry before any frames are cut.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_length == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame_length must be positive".to_string(),
            ));
        }
        if self.hop_length == 0 {
            return Err(PipelineError::InvalidConfig(
                "hop_length must be positive".to_string(),
            ));
        }
        if self.sampling_rate == 0 {
            return Err(PipelineError::InvalidConfig(
                "sampling_rate must be positive".to_string(),
            ));
        }
        if self.hop_length > self.frame_length {
            // Legal, but frames no longer overlap and the gaps between them
            // come back as silence after reconstruction.
            warn!(
                frame_length = self.frame_length,
                hop_length = self.hop_length,
                "hop_length exceeds frame_length; output will contain uncovered gaps"
            );
        }
        Ok(())
    }
}

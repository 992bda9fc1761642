//! Tunable policy for layered composition.

use serde::{Deserialize, Serialize};

use crate::constants::{LAYER_CHUNK_FRAMES, LAYER_MAX_CHANNELS};
use crate::error::{LayeredError, Result};

/// Serialized configuration for building and rendering layered streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeredSettings {
    /// Maximum channels accepted per layer.
    #[serde(alias = "max_channels", alias = "layer_max_channels")]
    pub channel_cap: usize,
    /// Frames decoded per layer in one render pass.
    #[serde(alias = "chunk_size", alias = "buffer_frames")]
    pub chunk_frames: usize,
}

impl LayeredSettings {
    /// Create settings with explicit limits.
    pub fn new(channel_cap: usize, chunk_frames: usize) -> Self {
        Self {
            channel_cap,
            chunk_frames,
        }
        .sanitized()
    }

    /// Return a copy with a different per-layer channel cap.
    pub fn with_channel_cap(self, channel_cap: usize) -> Self {
        Self::new(channel_cap, self.chunk_frames)
    }

    /// Return a copy with a different render chunk size.
    pub fn with_chunk_frames(self, chunk_frames: usize) -> Self {
        Self::new(self.channel_cap, chunk_frames)
    }

    /// Parse settings from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    /// Returns [`LayeredError::Decode`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|err| LayeredError::Decode(format!("layered settings: {}", err)))?;
        Ok(settings.sanitized())
    }

    /// Scratch samples needed to render one chunk of the widest layer.
    pub fn scratch_len(&self) -> usize {
        self.chunk_frames.saturating_mul(self.channel_cap)
    }

    fn sanitized(self) -> Self {
        Self {
            channel_cap: self.channel_cap.max(1),
            chunk_frames: self.chunk_frames.max(1),
        }
    }
}

impl Default for LayeredSettings {
    fn default() -> Self {
        Self {
            channel_cap: LAYER_MAX_CHANNELS,
            chunk_frames: LAYER_CHUNK_FRAMES,
        }
    }
}

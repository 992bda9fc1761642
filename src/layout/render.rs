//! Chunked rendering of layers into one interleaved buffer.

use crate::error::{LayeredError, Result};
use crate::settings::LayeredSettings;
use crate::stream::Sample;

use super::state::LayeredState;

/// Drives every layer of a [`LayeredState`] in lockstep and packs their
/// channels side by side.
///
/// Layers are decoded `chunk_frames` at a time into a scratch buffer of
/// `chunk_frames * channel_cap` samples, so scratch size does not depend on
/// how many frames a caller asks for.
#[derive(Debug, Clone)]
pub struct LayerRenderer {
    layer_channels: Vec<usize>,
    total_channels: usize,
    chunk_frames: usize,
    channel_cap: usize,
    scratch: Vec<Sample>,
}

impl LayerRenderer {
    /// Create a renderer for layers with the given channel counts, in slot order.
    pub fn new(layer_channels: Vec<usize>, settings: &LayeredSettings) -> Self {
        let total_channels = layer_channels.iter().sum();
        Self {
            layer_channels,
            total_channels,
            chunk_frames: settings.chunk_frames.max(1),
            channel_cap: settings.channel_cap.max(1),
            scratch: Vec::new(),
        }
    }

    /// Create a renderer matching the layers attached to `state`.
    ///
    /// # Errors
    /// [`LayeredError::MissingChild`] if any slot is empty.
    pub fn for_state(state: &LayeredState, settings: &LayeredSettings) -> Result<Self> {
        let layer_channels = (0..state.layer_count())
            .map(|index| {
                state
                    .layer(index)
                    .map(|layer| layer.info().channels)
                    .ok_or(LayeredError::MissingChild { layer: index })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(layer_channels, settings))
    }

    /// Sum of all layer channel counts.
    pub fn total_channels(&self) -> usize {
        self.total_channels
    }

    /// Frames decoded per layer in one pass.
    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    /// Fill `buffer` with `frames` interleaved frames from every layer.
    ///
    /// Output channel order is each layer's channels in slot order. Only the
    /// first `frames * total_channels` samples of `buffer` are written.
    ///
    /// # Returns
    /// The first layer's sample position after the last pass.
    ///
    /// # Errors
    /// [`LayeredError::BufferTooSmall`] before any layer is touched,
    /// [`LayeredError::ShortDecode`] if a layer writes fewer frames than asked,
    /// or the layer's own decode error.
    pub fn render(
        &mut self,
        buffer: &mut [Sample],
        frames: usize,
        state: &mut LayeredState,
    ) -> Result<u64> {
        if frames > 0 {
            self.render_chunks(buffer, frames, state)?;
        }
        Ok(state.layer(0).map(|layer| layer.current_sample()).unwrap_or(0))
    }

    fn render_chunks(
        &mut self,
        buffer: &mut [Sample],
        frames: usize,
        state: &mut LayeredState,
    ) -> Result<()> {
        let total_channels = self.total_channels;
        let required = frames.saturating_mul(total_channels);
        if buffer.len() < required {
            return Err(LayeredError::BufferTooSmall {
                required,
                actual: buffer.len(),
            });
        }

        if let Some((layer, &channels)) = self
            .layer_channels
            .iter()
            .enumerate()
            .find(|(_, channels)| **channels > self.channel_cap)
        {
            return Err(LayeredError::TooManyChannels {
                layer,
                channels,
                max: self.channel_cap,
            });
        }

        self.scratch.clear();
        self.scratch
            .resize(self.chunk_frames.saturating_mul(self.channel_cap), 0.0);

        let mut frames_written = 0usize;
        while frames_written < frames {
            let chunk = self.chunk_frames.min(frames - frames_written);
            let mut channel_offset = 0usize;

            for (index, &layer_channels) in self.layer_channels.iter().enumerate() {
                let layer = state
                    .layer_mut(index)
                    .ok_or(LayeredError::MissingChild { layer: index })?;

                // each layer loops on its own
                let scratch = &mut self.scratch[..chunk * layer_channels];
                let decoded = layer.decode(scratch, chunk)?;
                if decoded != chunk {
                    return Err(LayeredError::ShortDecode {
                        layer: index,
                        requested: chunk,
                        decoded,
                    });
                }

                for layer_channel in 0..layer_channels {
                    for frame in 0..chunk {
                        let layer_sample = frame * layer_channels + layer_channel;
                        let buffer_sample = (frames_written + frame) * total_channels
                            + channel_offset
                            + layer_channel;
                        buffer[buffer_sample] = scratch[layer_sample];
                    }
                }
                channel_offset += layer_channels;
            }

            frames_written += chunk;
        }

        Ok(())
    }
}

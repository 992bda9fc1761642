//! Ownership and lifecycle of the layers in a layered stream.

use log::{debug, warn};

use crate::constants::MAX_LAYERS;
use crate::error::{LayeredError, Result};
use crate::stream::DecodableStream;

use super::diagnostics::LayerWarning;

/// Ordered layer slots of a layered stream.
///
/// Slot order is channel-packing order and is fixed at construction. Every
/// attached layer is closed exactly once, either by [`LayeredState::close`] or
/// when the state is dropped, regardless of how many slots were filled.
pub struct LayeredState {
    layers: Vec<Option<Box<dyn DecodableStream>>>,
}

impl LayeredState {
    /// Create a state with `layer_count` empty slots.
    ///
    /// # Errors
    /// [`LayeredError::InvalidLayerCount`] if `layer_count` is zero or above
    /// [`MAX_LAYERS`], [`LayeredError::OutOfMemory`] if the slots cannot be
    /// allocated.
    pub fn new(layer_count: usize) -> Result<Self> {
        if layer_count == 0 || layer_count > MAX_LAYERS {
            return Err(LayeredError::InvalidLayerCount(layer_count));
        }

        let mut layers = Vec::new();
        layers.try_reserve_exact(layer_count)?;
        layers.resize_with(layer_count, || None);

        debug!("layered state: {} slots", layer_count);
        Ok(Self { layers })
    }

    /// Number of slots, attached or not.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of slots holding a layer.
    pub fn attached_count(&self) -> usize {
        self.layers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Place `layer` in slot `index`, returning whatever was there before.
    ///
    /// The layer is not validated until [`LayeredState::setup`].
    pub fn attach(
        &mut self,
        index: usize,
        layer: Box<dyn DecodableStream>,
    ) -> Result<Option<Box<dyn DecodableStream>>> {
        let layer_count = self.layers.len();
        let slot = self
            .layers
            .get_mut(index)
            .ok_or(LayeredError::LayerIndexOutOfRange {
                layer: index,
                layer_count,
            })?;
        Ok(slot.replace(layer))
    }

    /// Borrow the layer in slot `index`, if attached.
    pub fn layer(&self, index: usize) -> Option<&dyn DecodableStream> {
        self.layers.get(index).and_then(|slot| slot.as_deref())
    }

    pub(crate) fn layer_mut(&mut self, index: usize) -> Option<&mut (dyn DecodableStream + 'static)> {
        self.layers.get_mut(index).and_then(|slot| slot.as_deref_mut())
    }

    /// Validate and finalize every layer in order.
    ///
    /// Sample rate, coding and loop differences between neighbouring layers are
    /// logged and returned as warnings; they do not fail setup.
    ///
    /// # Errors
    /// [`LayeredError::MissingChild`] for an empty slot,
    /// [`LayeredError::EmptyChild`] for a layer without samples,
    /// [`LayeredError::TooManyChannels`] for a layer wider than `channel_cap`, or
    /// the error returned by a layer's own `setup`. The caller should drop or
    /// close the state afterwards.
    pub fn setup(&mut self, channel_cap: usize) -> Result<Vec<LayerWarning>> {
        let mut warnings = Vec::new();
        let mut previous = None;

        for (index, slot) in self.layers.iter_mut().enumerate() {
            let layer = slot
                .as_deref_mut()
                .ok_or(LayeredError::MissingChild { layer: index })?;
            let info = layer.info();

            if info.total_samples == 0 {
                return Err(LayeredError::EmptyChild { layer: index });
            }

            if info.channels > channel_cap {
                return Err(LayeredError::TooManyChannels {
                    layer: index,
                    channels: info.channels,
                    max: channel_cap,
                });
            }

            if let Some(previous) = previous.as_ref() {
                for warning in LayerWarning::compare(index, previous, &info) {
                    warn!("layered layout: {}", warning);
                    warnings.push(warning);
                }
            }

            layer.setup()?;
            previous = Some(info);
        }

        debug!(
            "layered state: {} layers ready, {} warnings",
            self.layers.len(),
            warnings.len()
        );
        Ok(warnings)
    }

    /// Rewind every attached layer, in order.
    pub fn reset(&mut self) {
        for layer in self.layers.iter_mut().flatten() {
            layer.reset();
        }
    }

    /// Close every attached layer and release the slots.
    pub fn close(mut self) {
        self.close_layers();
    }

    pub(crate) fn close_layers(&mut self) {
        for slot in self.layers.iter_mut() {
            if let Some(mut layer) = slot.take() {
                layer.close();
            }
        }
    }
}

impl Drop for LayeredState {
    fn drop(&mut self) {
        self.close_layers();
    }
}

impl std::fmt::Debug for LayeredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredState")
            .field("layer_count", &self.layer_count())
            .field("attached", &self.attached_count())
            .finish()
    }
}

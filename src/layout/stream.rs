//! The layered stream handle and its construction entry point.

use log::debug;

use crate::error::{LayeredError, Result};
use crate::settings::LayeredSettings;
use crate::stream::{DecodableStream, Sample, StreamInfo};

use super::diagnostics::LayerWarning;
use super::render::LayerRenderer;
use super::state::LayeredState;

/// A decodable stream made of several layers rendered side by side.
///
/// Channel count is the sum of all layers; it loops only if every layer loops.
/// Sample rate, coding, length and loop points are taken from the first layer,
/// even when later layers disagree.
pub struct LayeredStream {
    state: LayeredState,
    renderer: LayerRenderer,
    info: StreamInfo,
    settings: LayeredSettings,
    warnings: Vec<LayerWarning>,
    current_sample: u64,
}

impl LayeredStream {
    /// Wrap a fully attached state.
    ///
    /// Does not run setup; see [`build_layered`] for the full sequence.
    ///
    /// # Errors
    /// [`LayeredError::EmptyComposite`] if the state has no layers and
    /// [`LayeredError::MissingChild`] if a slot is empty. The state is dropped on
    /// failure, closing whatever layers it held.
    pub fn new(state: LayeredState, settings: LayeredSettings) -> Result<Self> {
        let first = state.layer(0).ok_or(if state.layer_count() == 0 {
            LayeredError::EmptyComposite
        } else {
            LayeredError::MissingChild { layer: 0 }
        })?;
        let first_info = first.info();
        let current_sample = first.current_sample();

        let renderer = LayerRenderer::for_state(&state, &settings)?;
        let loop_enabled = (0..state.layer_count())
            .filter_map(|index| state.layer(index))
            .all(|layer| layer.info().loop_enabled);

        let info = StreamInfo {
            channels: renderer.total_channels(),
            loop_enabled,
            ..first_info
        };

        debug!(
            "layered stream: {} layers, {} channels, {} Hz, loop={}",
            state.layer_count(),
            info.channels,
            info.sample_rate,
            info.loop_enabled
        );

        Ok(Self {
            state,
            renderer,
            info,
            settings,
            warnings: Vec::new(),
            current_sample,
        })
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.state.layer_count()
    }

    /// Borrow a layer by slot index.
    pub fn layer(&self, index: usize) -> Option<&dyn DecodableStream> {
        self.state.layer(index)
    }

    /// Non-fatal findings from the most recent setup.
    pub fn warnings(&self) -> &[LayerWarning] {
        &self.warnings
    }

    /// Settings this stream renders with.
    pub fn settings(&self) -> &LayeredSettings {
        &self.settings
    }
}

impl DecodableStream for LayeredStream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn current_sample(&self) -> u64 {
        self.current_sample
    }

    fn setup(&mut self) -> Result<()> {
        self.warnings = self.state.setup(self.settings.channel_cap)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.state.reset();
        self.current_sample = self
            .state
            .layer(0)
            .map(|layer| layer.current_sample())
            .unwrap_or(0);
    }

    fn decode(&mut self, buffer: &mut [Sample], frames: usize) -> Result<usize> {
        self.current_sample = self.renderer.render(buffer, frames, &mut self.state)?;
        Ok(frames)
    }

    fn close(&mut self) {
        self.state.close_layers();
    }
}

impl std::fmt::Debug for LayeredStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredStream")
            .field("state", &self.state)
            .field("info", &self.info)
            .field("settings", &self.settings)
            .field("warnings", &self.warnings)
            .field("current_sample", &self.current_sample)
            .finish()
    }
}

/// Build a layered stream from `layers`, in channel order.
///
/// Runs construct, attach, setup and build in sequence. On any failure every
/// layer is closed before the error is returned; no partial stream escapes.
///
/// # Errors
/// [`LayeredError::EmptyComposite`] for an empty list,
/// [`LayeredError::InvalidLayerCount`] above the layer limit, and any setup
/// error (see [`LayeredState::setup`]).
pub fn build_layered(
    layers: Vec<Box<dyn DecodableStream>>,
    settings: &LayeredSettings,
) -> Result<LayeredStream> {
    if layers.is_empty() {
        return Err(LayeredError::EmptyComposite);
    }

    let mut state = match LayeredState::new(layers.len()) {
        Ok(state) => state,
        Err(err) => {
            for mut layer in layers {
                layer.close();
            }
            return Err(err);
        }
    };

    for (index, layer) in layers.into_iter().enumerate() {
        state.attach(index, layer)?;
    }

    let warnings = state.setup(settings.channel_cap)?;
    let mut stream = LayeredStream::new(state, *settings)?;
    stream.warnings = warnings;
    Ok(stream)
}

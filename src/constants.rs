//! Policy limits and defaults for layered composition.

/// Maximum number of layers a single composite may hold.
///
/// This is an implementation limit, not a format limit.
pub const MAX_LAYERS: usize = 255;

/// Default maximum channel count accepted for a single layer.
///
/// Bounds the renderer scratch buffer at `LAYER_CHUNK_FRAMES * LAYER_MAX_CHANNELS`.
pub const LAYER_MAX_CHANNELS: usize = 6;

/// Default number of frames decoded per layer in one render pass.
pub const LAYER_CHUNK_FRAMES: usize = 512;

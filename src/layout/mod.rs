//! Layered layout: several complete streams rendered side by side into one
//! interleaved stream, each layer contributing its own channel range.

mod diagnostics;
mod render;
mod state;
mod stream;

pub use diagnostics::LayerWarning;
pub use render::LayerRenderer;
pub use state::LayeredState;
pub use stream::{build_layered, LayeredStream};

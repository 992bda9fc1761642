//! # Layered Audio
//!
//! Composes several independently decodable audio streams into a single
//! synchronized, interleaved multi-channel stream.
//!
//! Leaves are anything implementing [`DecodableStream`]. A composite built with
//! [`build_layered`] implements the same trait, so composites nest and can be
//! consumed uniformly, e.g. by the [`playback::LayeredSource`] rodio adapter.

pub mod constants;
pub mod error;
pub mod layout;
pub mod playback;
pub mod settings;
pub mod source;
pub mod stream;
#[cfg(test)]
mod test_support;

pub use error::{LayeredError, Result};
pub use layout::{build_layered, LayerRenderer, LayerWarning, LayeredState, LayeredStream};
pub use settings::LayeredSettings;
pub use stream::{CodingTag, DecodableStream, Sample, StreamInfo};

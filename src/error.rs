use std::collections::TryReserveError;
use std::fmt::{Display, Formatter};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayeredError>;

/// Error type for layered composition and the bundled leaf streams.
#[derive(Debug)]
pub enum LayeredError {
    /// Requested layer count is zero or above [`crate::constants::MAX_LAYERS`].
    InvalidLayerCount(usize),
    /// Slot storage could not be allocated.
    OutOfMemory,
    /// A layer slot was never attached.
    MissingChild { layer: usize },
    /// A layer reports zero total samples.
    EmptyChild { layer: usize },
    /// A layer has more channels than the per-layer cap.
    TooManyChannels {
        layer: usize,
        channels: usize,
        max: usize,
    },
    /// A composite was built with no layers.
    EmptyComposite,
    /// Attach targeted a slot past the layer count.
    LayerIndexOutOfRange { layer: usize, layer_count: usize },
    /// The output buffer cannot hold the requested frames.
    BufferTooSmall { required: usize, actual: usize },
    /// A layer wrote fewer frames than requested.
    ShortDecode {
        layer: usize,
        requested: usize,
        decoded: usize,
    },
    /// Loop points are outside the stream or inverted.
    InvalidLoop { start: u64, end: u64, total: u64 },
    Io(std::io::Error),
    Decode(String),
    Unsupported(String),
}

impl Display for LayeredError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLayerCount(count) => write!(f, "invalid layer count: {}", count),
            Self::OutOfMemory => write!(f, "out of memory allocating layers"),
            Self::MissingChild { layer } => write!(f, "layer {} is not attached", layer),
            Self::EmptyChild { layer } => write!(f, "layer {} has no samples", layer),
            Self::TooManyChannels {
                layer,
                channels,
                max,
            } => write!(
                f,
                "layer {} has {} channels (max {})",
                layer, channels, max
            ),
            Self::EmptyComposite => write!(f, "layered stream has no layers"),
            Self::LayerIndexOutOfRange { layer, layer_count } => write!(
                f,
                "layer index {} out of range for {} layers",
                layer, layer_count
            ),
            Self::BufferTooSmall { required, actual } => write!(
                f,
                "output buffer too small: need {} samples, got {}",
                required, actual
            ),
            Self::ShortDecode {
                layer,
                requested,
                decoded,
            } => write!(
                f,
                "layer {} decoded {} of {} requested frames",
                layer, decoded, requested
            ),
            Self::InvalidLoop { start, end, total } => write!(
                f,
                "invalid loop {}..{} for {} samples",
                start, end, total
            ),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::Unsupported(err) => write!(f, "unsupported: {}", err),
        }
    }
}

impl std::error::Error for LayeredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LayeredError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<TryReserveError> for LayeredError {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl From<symphonia::core::errors::Error> for LayeredError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error;

        match value {
            Error::IoError(err) => Self::Io(err),
            Error::Unsupported(what) => Self::Unsupported(what.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

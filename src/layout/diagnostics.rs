//! Non-fatal findings reported while setting up layers.

use std::fmt::{Display, Formatter};

use crate::stream::{CodingTag, StreamInfo};

/// A difference between a layer and the layer before it.
///
/// Layers may legitimately differ, so these never abort setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerWarning {
    SampleRateMismatch {
        layer: usize,
        previous: u32,
        found: u32,
    },
    CodingMismatch {
        layer: usize,
        previous: CodingTag,
        found: CodingTag,
    },
    LoopMismatch {
        layer: usize,
        previous: (bool, u64, u64),
        found: (bool, u64, u64),
    },
}

impl LayerWarning {
    /// Index of the layer the warning is about.
    pub fn layer(&self) -> usize {
        match self {
            Self::SampleRateMismatch { layer, .. }
            | Self::CodingMismatch { layer, .. }
            | Self::LoopMismatch { layer, .. } => *layer,
        }
    }

    /// Compare `current` with the layer before it.
    pub(crate) fn compare(layer: usize, previous: &StreamInfo, current: &StreamInfo) -> Vec<Self> {
        let mut warnings = Vec::new();

        if current.sample_rate != previous.sample_rate {
            warnings.push(Self::SampleRateMismatch {
                layer,
                previous: previous.sample_rate,
                found: current.sample_rate,
            });
        }

        if current.coding != previous.coding {
            warnings.push(Self::CodingMismatch {
                layer,
                previous: previous.coding.clone(),
                found: current.coding.clone(),
            });
        }

        let previous_loop = loop_region(previous);
        let current_loop = loop_region(current);
        if previous_loop != current_loop {
            warnings.push(Self::LoopMismatch {
                layer,
                previous: previous_loop,
                found: current_loop,
            });
        }

        warnings
    }
}

fn loop_region(info: &StreamInfo) -> (bool, u64, u64) {
    if info.loop_enabled {
        (true, info.loop_start, info.loop_end)
    } else {
        (false, 0, 0)
    }
}

impl Display for LayerWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SampleRateMismatch {
                layer,
                previous,
                found,
            } => write!(
                f,
                "layer {} has different sample rate ({} vs {})",
                layer, found, previous
            ),
            Self::CodingMismatch {
                layer,
                previous,
                found,
            } => write!(
                f,
                "layer {} has different coding ({} vs {})",
                layer, found, previous
            ),
            Self::LoopMismatch {
                layer,
                previous,
                found,
            } => write!(
                f,
                "layer {} has different loop {:?} vs {:?}",
                layer, found, previous
            ),
        }
    }
}

//! The decodable-stream contract shared by leaves and composites.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::error::Result;

/// Decoded PCM sample.
pub type Sample = f32;

/// Opaque, comparable identifier for the coding a stream decodes from.
///
/// Layers compare tags only for equality; the text is informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodingTag(Cow<'static, str>);

impl CodingTag {
    /// Tag for raw interleaved `f32` PCM.
    pub const PCM_F32: CodingTag = CodingTag(Cow::Borrowed("pcm_f32"));

    /// Create a tag from a codec name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Codec name backing this tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CodingTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static description of a decodable stream.
///
/// Sample positions (`total_samples`, `loop_start`, `loop_end`) count frames,
/// i.e. one position spans every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub channels: usize,
    pub sample_rate: u32,
    pub coding: CodingTag,
    pub total_samples: u64,
    pub loop_start: u64,
    pub loop_end: u64,
    pub loop_enabled: bool,
}

impl StreamInfo {
    /// Build info for a non-looping stream.
    pub fn new(channels: usize, sample_rate: u32, coding: CodingTag, total_samples: u64) -> Self {
        Self {
            channels,
            sample_rate,
            coding,
            total_samples,
            loop_start: 0,
            loop_end: 0,
            loop_enabled: false,
        }
    }

    /// Return a copy with loop points set and looping enabled.
    pub fn with_loop(mut self, loop_start: u64, loop_end: u64) -> Self {
        self.loop_start = loop_start;
        self.loop_end = loop_end;
        self.loop_enabled = true;
        self
    }
}

/// A stream that decodes interleaved PCM on demand.
///
/// Implementations own their decode state, looping and end-of-stream handling.
/// Callers drive a stream from one thread at a time.
pub trait DecodableStream: Send {
    /// Describe channel layout, rate, coding and loop region.
    fn info(&self) -> StreamInfo;

    /// Current decode position in frames.
    fn current_sample(&self) -> u64;

    /// Finalize the stream before the first decode.
    ///
    /// Must be idempotent.
    fn setup(&mut self) -> Result<()>;

    /// Rewind decode state to the start of the stream.
    fn reset(&mut self);

    /// Decode `frames` frames into `buffer` as interleaved samples.
    ///
    /// `buffer` holds at least `frames * channels` samples. Returns the number of
    /// frames written, which must equal `frames`; streams past their end pad with
    /// silence rather than writing less.
    fn decode(&mut self, buffer: &mut [Sample], frames: usize) -> Result<usize>;

    /// Release decoder resources. Must tolerate repeated calls.
    fn close(&mut self);
}

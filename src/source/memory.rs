//! In-memory PCM stream.

use log::info;

use crate::error::{LayeredError, Result};
use crate::stream::{CodingTag, DecodableStream, Sample, StreamInfo};

/// Decodable stream over pre-decoded interleaved samples.
///
/// Wraps from the loop end back to the loop start while looping; past the end
/// of a non-looping stream it writes silence.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    samples: Vec<Sample>,
    info: StreamInfo,
    position: u64,
}

impl MemoryStream {
    /// Wrap interleaved `samples` with `channels` channels.
    ///
    /// Trailing samples that do not form a whole frame are dropped.
    pub fn new(samples: Vec<Sample>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let mut samples = samples;
        samples.truncate(samples.len() - samples.len() % channels);
        let total_samples = (samples.len() / channels) as u64;

        Self {
            samples,
            info: StreamInfo::new(channels, sample_rate, CodingTag::PCM_F32, total_samples),
            position: 0,
        }
    }

    /// Enable looping between `loop_start` (inclusive) and `loop_end` (exclusive).
    pub fn with_loop(mut self, loop_start: u64, loop_end: u64) -> Self {
        self.info = self.info.with_loop(loop_start, loop_end);
        self
    }

    /// Override the advertised coding tag.
    pub fn with_coding(mut self, coding: CodingTag) -> Self {
        self.info.coding = coding;
        self
    }

    fn frame(&self, position: u64) -> Option<&[Sample]> {
        let channels = self.info.channels;
        let start = usize::try_from(position).ok()?.checked_mul(channels)?;
        self.samples.get(start..start + channels)
    }
}

impl DecodableStream for MemoryStream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn current_sample(&self) -> u64 {
        self.position
    }

    fn setup(&mut self) -> Result<()> {
        let StreamInfo {
            total_samples,
            loop_start,
            loop_end,
            loop_enabled,
            ..
        } = self.info;
        if loop_enabled && (loop_start >= loop_end || loop_end > total_samples) {
            return Err(LayeredError::InvalidLoop {
                start: loop_start,
                end: loop_end,
                total: total_samples,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn decode(&mut self, buffer: &mut [Sample], frames: usize) -> Result<usize> {
        let channels = self.info.channels;
        let required = frames * channels;
        if buffer.len() < required {
            return Err(LayeredError::BufferTooSmall {
                required,
                actual: buffer.len(),
            });
        }

        let start = self.position;
        for out in buffer[..required].chunks_exact_mut(channels) {
            if self.info.loop_enabled && self.position >= self.info.loop_end {
                self.position = self.info.loop_start;
            }
            match self.frame(self.position) {
                Some(frame) => {
                    out.copy_from_slice(frame);
                    self.position += 1;
                }
                None => out.fill(0.0),
            }
        }

        if !self.info.loop_enabled
            && start < self.info.total_samples
            && self.position == self.info.total_samples
        {
            info!("memory stream reached end ({} frames)", self.position);
        }

        Ok(frames)
    }

    fn close(&mut self) {
        self.samples = Vec::new();
    }
}

//! `rodio` adapter for layered streams.

use std::time::Duration;

use dasp_ring_buffer::Bounded;
use log::{error, info};
use rodio::source::SeekError;
use rodio::Source;

use crate::layout::LayeredStream;
use crate::stream::{DecodableStream, Sample};

/// Plays a [`LayeredStream`] through `rodio`.
///
/// The stream is rendered one chunk at a time into a bounded staging ring. A
/// looping stream plays forever; otherwise the source ends after the stream's
/// total samples. A render error is logged and ends the source.
pub struct LayeredSource {
    stream: LayeredStream,
    staging: Bounded<Vec<Sample>>,
    chunk: Vec<Sample>,
    chunk_frames: usize,
    channels: u16,
    sample_rate: u32,
    remaining_frames: Option<u64>,
    finished: bool,
}

impl LayeredSource {
    /// Wrap a built stream, starting from its current position.
    pub fn new(stream: LayeredStream) -> Self {
        let info = stream.info();
        let chunk_frames = stream.settings().chunk_frames;
        let chunk_len = chunk_frames * info.channels;
        let remaining_frames = if info.loop_enabled {
            None
        } else {
            Some(info.total_samples.saturating_sub(stream.current_sample()))
        };

        Self {
            stream,
            staging: Bounded::from(vec![0.0; chunk_len]),
            chunk: vec![0.0; chunk_len],
            chunk_frames,
            channels: u16::try_from(info.channels).unwrap_or(u16::MAX),
            sample_rate: info.sample_rate,
            remaining_frames,
            finished: false,
        }
    }

    /// Give back the wrapped stream.
    pub fn into_inner(self) -> LayeredStream {
        self.stream
    }

    fn render_next_chunk(&mut self) -> bool {
        let frames = match self.remaining_frames {
            Some(remaining) => self
                .chunk_frames
                .min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            None => self.chunk_frames,
        };
        if frames == 0 {
            info!("layered source finished");
            return false;
        }

        if let Err(err) = self.stream.decode(&mut self.chunk, frames) {
            error!("layered source render failed: {}", err);
            return false;
        }

        let channels = usize::from(self.channels);
        for sample in self.chunk[..frames * channels].iter().copied() {
            self.staging.push(sample);
        }
        if let Some(remaining) = self.remaining_frames.as_mut() {
            *remaining -= frames as u64;
        }
        true
    }
}

impl Iterator for LayeredSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.staging.is_empty() {
            if self.finished {
                return None;
            }
            if !self.render_next_chunk() {
                self.finished = true;
                return None;
            }
        }
        self.staging.pop()
    }
}

impl Source for LayeredSource {
    fn current_span_len(&self) -> Option<usize> {
        if self.staging.is_empty() {
            None
        } else {
            Some(self.staging.len())
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        if self.stream.info().loop_enabled || self.sample_rate == 0 {
            return None;
        }
        let total_samples = self.stream.info().total_samples;
        Some(Duration::from_secs_f64(
            total_samples as f64 / self.sample_rate as f64,
        ))
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        if !pos.is_zero() {
            return Err(SeekError::NotSupported {
                underlying_source: "LayeredSource",
            });
        }

        self.stream.reset();
        while self.staging.pop().is_some() {}
        let info = self.stream.info();
        self.remaining_frames = if info.loop_enabled {
            None
        } else {
            Some(info.total_samples)
        };
        self.finished = false;
        Ok(())
    }
}

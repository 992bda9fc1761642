//! Deterministic fake layers for unit tests.

use std::sync::{Arc, Mutex};

use crate::error::{LayeredError, Result};
use crate::stream::{CodingTag, DecodableStream, Sample, StreamInfo};

/// Shared record of calls made on fake layers, in call order.
pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

type Generator = Box<dyn Fn(u64, usize) -> Sample + Send>;

/// Fake layer whose sample at (frame, channel) comes from a generator.
pub(crate) struct FakeStream {
    name: &'static str,
    info: StreamInfo,
    generator: Generator,
    position: u64,
    log: CallLog,
    fail_setup: bool,
    short_by: usize,
}

impl FakeStream {
    pub(crate) fn new(
        name: &'static str,
        channels: usize,
        generator: impl Fn(u64, usize) -> Sample + Send + 'static,
    ) -> Self {
        Self {
            name,
            info: StreamInfo::new(channels, 44_100, CodingTag::PCM_F32, 1_000),
            generator: Box::new(generator),
            position: 0,
            log: call_log(),
            fail_setup: false,
            short_by: 0,
        }
    }

    /// Every sample on every channel is `value`.
    pub(crate) fn constant(name: &'static str, channels: usize, value: Sample) -> Self {
        Self::new(name, channels, move |_, _| value)
    }

    /// Sample encodes its own position: `frame * 10 + channel`.
    pub(crate) fn ramp(name: &'static str, channels: usize) -> Self {
        Self::new(name, channels, |frame, channel| {
            (frame * 10) as Sample + channel as Sample
        })
    }

    pub(crate) fn with_info(mut self, edit: impl FnOnce(&mut StreamInfo)) -> Self {
        edit(&mut self.info);
        self
    }

    pub(crate) fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub(crate) fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub(crate) fn short_by(mut self, frames: usize) -> Self {
        self.short_by = frames;
        self
    }

    pub(crate) fn boxed(self) -> Box<dyn DecodableStream> {
        Box::new(self)
    }

    fn record(&self, call: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, call));
    }
}

impl DecodableStream for FakeStream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn current_sample(&self) -> u64 {
        self.position
    }

    fn setup(&mut self) -> Result<()> {
        self.record("setup");
        if self.fail_setup {
            return Err(LayeredError::Decode(format!("{} refused setup", self.name)));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.record("reset");
        self.position = 0;
    }

    fn decode(&mut self, buffer: &mut [Sample], frames: usize) -> Result<usize> {
        self.record(&format!("decode {}", frames));
        let channels = self.info.channels;
        let written = frames.saturating_sub(self.short_by);
        for frame in 0..written {
            for channel in 0..channels {
                buffer[frame * channels + channel] =
                    (self.generator)(self.position + frame as u64, channel);
            }
        }
        self.position += written as u64;
        Ok(written)
    }

    fn close(&mut self) {
        self.record("close");
    }
}

//! Decodable stream backed by a Symphonia format reader and decoder.

use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{LayeredError, Result};
use crate::stream::{CodingTag, DecodableStream, Sample, StreamInfo};

/// One audio track of a media file, decoded on demand.
///
/// Sample positions are track timestamps, which Symphonia expresses in frames
/// for PCM-style codecs. Loop points are supplied by the caller; when the loop
/// end is reached the reader seeks back to the loop start. Past the end of a
/// non-looping track the stream writes silence.
pub struct SymphoniaStream {
    reader: Option<Box<dyn FormatReader>>,
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    info: StreamInfo,
    sample_buffer: Option<SampleBuffer<Sample>>,
    pending: Vec<Sample>,
    pending_offset: usize,
    skip_frames: u64,
    position: u64,
    finished: bool,
}

impl SymphoniaStream {
    /// Open the first decodable track of a media file.
    ///
    /// The file extension is used as a probe hint.
    pub fn open(file_path: impl AsRef<Path>) -> Result<Self> {
        let path = file_path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        let source = Box::new(File::open(path)?) as Box<dyn MediaSource>;
        Self::from_source(source, extension.as_deref(), None)
    }

    /// Probe `source` and open `track_id`, or the first decodable track.
    pub fn from_source(
        source: Box<dyn MediaSource>,
        extension_hint: Option<&str>,
        track_id: Option<u32>,
    ) -> Result<Self> {
        let mut hint = Hint::new();
        if let Some(extension) = extension_hint {
            hint.with_extension(extension);
        }

        let mss = MediaSourceStream::new(source, Default::default());
        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let probed =
            symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)?;
        let reader = probed.format;

        let track = match track_id {
            Some(requested_id) => reader.tracks().iter().find(|t| t.id == requested_id),
            None => reader
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL),
        }
        .ok_or_else(|| LayeredError::Unsupported("no decodable audio track".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let info = stream_info(&codec_params)?;

        let dec_opts: DecoderOptions = Default::default();
        let decoder = symphonia::default::get_codecs().make(&codec_params, &dec_opts)?;

        debug!(
            "symphonia stream: track {} {} ch {} Hz {} frames ({})",
            track_id, info.channels, info.sample_rate, info.total_samples, info.coding
        );

        Ok(Self {
            reader: Some(reader),
            decoder: Some(decoder),
            track_id,
            info,
            sample_buffer: None,
            pending: Vec::new(),
            pending_offset: 0,
            skip_frames: 0,
            position: 0,
            finished: false,
        })
    }

    /// Enable looping between `loop_start` (inclusive) and `loop_end` (exclusive).
    pub fn with_loop(mut self, loop_start: u64, loop_end: u64) -> Self {
        self.info = self.info.with_loop(loop_start, loop_end);
        self
    }

    /// Symphonia id of the track being decoded.
    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    fn seek_to(&mut self, ts: u64) -> Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| LayeredError::Unsupported("stream is closed".to_string()))?;
        let seeked = reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts,
                track_id: self.track_id,
            },
        )?;
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }

        self.pending.clear();
        self.pending_offset = 0;
        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.position = ts;
        self.finished = false;
        Ok(())
    }

    /// Decode packets until new frames are pending or the track ends.
    ///
    /// Returns `false` at end of stream.
    fn refill(&mut self) -> Result<bool> {
        let channels = self.info.channels;
        let (Some(reader), Some(decoder)) = (self.reader.as_mut(), self.decoder.as_mut()) else {
            return Ok(false);
        };

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    info!("symphonia stream: track {} finished", self.track_id);
                    return Ok(false);
                }
                Err(Error::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::DecodeError(err)) => {
                    warn!("decode error: {}", err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != channels {
                return Err(LayeredError::Decode(format!(
                    "track {} changed from {} to {} channels",
                    self.track_id,
                    channels,
                    spec.channels.count()
                )));
            }

            let capacity = decoded.capacity();
            if self
                .sample_buffer
                .as_ref()
                .map_or(false, |buffer| buffer.capacity() < capacity * channels)
            {
                self.sample_buffer = None;
            }
            let sample_buffer = self
                .sample_buffer
                .get_or_insert_with(|| SampleBuffer::new(capacity as u64, spec));
            sample_buffer.copy_interleaved_ref(decoded);

            let frames = (sample_buffer.len() / channels) as u64;
            let skip = self.skip_frames.min(frames);
            self.skip_frames -= skip;
            if skip == frames {
                continue;
            }

            self.pending.clear();
            self.pending.extend_from_slice(sample_buffer.samples());
            self.pending_offset = skip as usize * channels;
            return Ok(true);
        }
    }

    /// Frames that may still be handed out before looping or stopping.
    fn frames_until_boundary(&self) -> Option<u64> {
        if self.info.loop_enabled {
            Some(self.info.loop_end.saturating_sub(self.position))
        } else if self.info.total_samples > 0 {
            Some(self.info.total_samples.saturating_sub(self.position))
        } else {
            None
        }
    }
}

fn stream_info(codec_params: &CodecParameters) -> Result<StreamInfo> {
    let channels = codec_params
        .channels
        .map(|channels| channels.count())
        .ok_or_else(|| LayeredError::Unsupported("unknown channel count".to_string()))?;
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| LayeredError::Unsupported("unknown sample rate".to_string()))?;
    let coding = symphonia::default::get_codecs()
        .get_codec(codec_params.codec)
        .map(|descriptor| CodingTag::new(descriptor.short_name))
        .unwrap_or_else(|| CodingTag::new(format!("{:?}", codec_params.codec)));
    let total_samples = codec_params.n_frames.unwrap_or(0);

    Ok(StreamInfo::new(channels, sample_rate, coding, total_samples))
}

impl DecodableStream for SymphoniaStream {
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
        if let Err(err) = self.seek_to(0) {
            warn!(
                "symphonia stream: track {} failed to rewind: {}",
                self.track_id, err
            );
            self.finished = true;
        }
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

        let mut written = 0usize;
        while written < frames {
            if self.info.loop_enabled && self.position >= self.info.loop_end {
                debug!(
                    "symphonia stream: track {} looping to {}",
                    self.track_id, self.info.loop_start
                );
                self.seek_to(self.info.loop_start)?;
            }

            if self.frames_until_boundary() == Some(0) {
                self.finished = true;
            }

            if self.pending_offset >= self.pending.len() && !self.finished && !self.refill()? {
                if self.info.loop_enabled && self.position > self.info.loop_start {
                    warn!(
                        "symphonia stream: track {} ended at {} before loop end {}",
                        self.track_id, self.position, self.info.loop_end
                    );
                    self.seek_to(self.info.loop_start)?;
                    continue;
                }
                self.finished = true;
            }

            if self.finished {
                buffer[written * channels..required].fill(0.0);
                break;
            }

            let available = (self.pending.len() - self.pending_offset) / channels;
            let mut take = available.min(frames - written);
            if let Some(boundary) = self.frames_until_boundary() {
                take = take.min(usize::try_from(boundary).unwrap_or(usize::MAX));
            }

            let source = &self.pending[self.pending_offset..self.pending_offset + take * channels];
            buffer[written * channels..(written + take) * channels].copy_from_slice(source);
            self.pending_offset += take * channels;
            self.position += take as u64;
            written += take;
        }

        Ok(frames)
    }

    fn close(&mut self) {
        self.reader = None;
        self.decoder = None;
        self.sample_buffer = None;
        self.pending = Vec::new();
        self.pending_offset = 0;
        self.finished = true;
    }
}

impl std::fmt::Debug for SymphoniaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymphoniaStream")
            .field("track_id", &self.track_id)
            .field("info", &self.info)
            .field("position", &self.position)
            .field("finished", &self.finished)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use layered_audio::source::{MemoryStream, SymphoniaStream};
use layered_audio::{
    build_layered, DecodableStream, LayerWarning, LayeredError, LayeredSettings,
};

fn write_wav(dir: &Path, name: &str, channels: u16, sample_rate: u32, samples: &[f32]) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec).expect("create wav");
    for &sample in samples {
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

fn ramp(frames: usize, channels: usize, scale: f32) -> Vec<f32> {
    (0..frames * channels)
        .map(|index| ((index / channels) as f32 + (index % channels) as f32 * 0.5) * scale)
        .collect()
}

fn decode(stream: &mut dyn DecodableStream, frames: usize) -> Vec<f32> {
    let mut out = vec![f32::NAN; frames * stream.info().channels];
    let written = stream.decode(&mut out, frames).expect("decode");
    assert_eq!(written, frames);
    out
}

#[test]
fn wav_layers_render_side_by_side() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stereo = write_wav(dir.path(), "stereo.wav", 2, 44_100, &ramp(64, 2, 0.01));
    let mono = write_wav(dir.path(), "mono.wav", 1, 44_100, &vec![0.25; 64]);

    let layers: Vec<Box<dyn DecodableStream>> = vec![
        Box::new(SymphoniaStream::open(&stereo).expect("open stereo")),
        Box::new(SymphoniaStream::open(&mono).expect("open mono")),
    ];
    let mut stream = build_layered(layers, &LayeredSettings::default().with_chunk_frames(16))
        .expect("build");

    let info = stream.info();
    assert_eq!(info.channels, 3);
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.total_samples, 64);
    assert!(!info.loop_enabled);
    assert!(stream.warnings().is_empty());

    let out = decode(&mut stream, 64);
    let expected_stereo = ramp(64, 2, 0.01);
    for frame in 0..64 {
        assert_eq!(out[frame * 3], expected_stereo[frame * 2]);
        assert_eq!(out[frame * 3 + 1], expected_stereo[frame * 2 + 1]);
        assert_eq!(out[frame * 3 + 2], 0.25);
    }
    assert_eq!(stream.current_sample(), 64);
}

#[test]
fn wav_layer_pads_silence_after_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_wav(dir.path(), "short.wav", 1, 8_000, &[0.5, 0.5, 0.5]);
    let mut stream = SymphoniaStream::open(&path).expect("open");
    stream.setup().expect("setup");
    assert_eq!(decode(&mut stream, 5), vec![0.5, 0.5, 0.5, 0.0, 0.0]);
}

#[test]
fn wav_layer_loops_and_resets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let samples: Vec<f32> = (0..8).map(|frame| frame as f32 / 8.0).collect();
    let path = write_wav(dir.path(), "loop.wav", 1, 22_050, &samples);

    let mut stream = SymphoniaStream::open(&path)
        .expect("open")
        .with_loop(2, 6);
    stream.setup().expect("setup");

    let looped = decode(&mut stream, 12);
    let expected: Vec<f32> = [0, 1, 2, 3, 4, 5, 2, 3, 4, 5, 2, 3]
        .iter()
        .map(|&frame| samples[frame])
        .collect();
    assert_eq!(looped, expected);
    assert_eq!(stream.current_sample(), 4);

    stream.reset();
    assert_eq!(stream.current_sample(), 0);
    assert_eq!(decode(&mut stream, 12), expected);
}

#[test]
fn wav_layer_keeps_looping_when_data_ends_early() {
    let dir = tempfile::tempdir().expect("tempdir");
    let samples: Vec<f32> = (0..24_000).map(|frame| 1.0 + frame as f32 / 24_000.0).collect();
    let path = write_wav(dir.path(), "truncated.wav", 1, 8_000, &samples);

    // header still advertises 24000 frames
    let file = OpenOptions::new().write(true).open(&path).expect("reopen wav");
    let len = file.metadata().expect("metadata").len();
    file.set_len(len - 12_000 * 4).expect("truncate wav");
    drop(file);

    let mut stream = SymphoniaStream::open(&path)
        .expect("open")
        .with_loop(0, 24_000);
    stream.setup().expect("setup");
    assert_eq!(stream.info().total_samples, 24_000);

    let out = decode(&mut stream, 30_000);
    assert!(out.iter().all(|&sample| sample != 0.0));
    assert_eq!(out[0], samples[0]);
    assert!(out[1..].iter().any(|&sample| sample == samples[0]));
    assert!(stream.current_sample() < 24_000);
}

#[test]
fn mismatched_layers_warn_but_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fast = write_wav(dir.path(), "fast.wav", 1, 48_000, &vec![0.1; 32]);

    let layers: Vec<Box<dyn DecodableStream>> = vec![
        Box::new(SymphoniaStream::open(&fast).expect("open")),
        Box::new(MemoryStream::new(vec![0.2; 32], 1, 44_100)),
    ];
    let stream = build_layered(layers, &LayeredSettings::default()).expect("build");

    assert_eq!(stream.info().sample_rate, 48_000);
    let warnings = stream.warnings();
    assert!(warnings.iter().any(|warning| matches!(
        warning,
        LayerWarning::SampleRateMismatch {
            layer: 1,
            previous: 48_000,
            found: 44_100
        }
    )));
    assert!(warnings
        .iter()
        .any(|warning| matches!(warning, LayerWarning::CodingMismatch { layer: 1, .. })));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = SymphoniaStream::open(dir.path().join("absent.wav")).expect_err("missing");
    assert!(matches!(err, LayeredError::Io(_)));
}

#[test]
fn reset_reproduces_layered_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_wav(dir.path(), "a.wav", 1, 44_100, &ramp(40, 1, 0.02));
    let b = write_wav(dir.path(), "b.wav", 2, 44_100, &ramp(40, 2, -0.01));

    let layers: Vec<Box<dyn DecodableStream>> = vec![
        Box::new(SymphoniaStream::open(&a).expect("open a")),
        Box::new(SymphoniaStream::open(&b).expect("open b")),
    ];
    let mut stream = build_layered(layers, &LayeredSettings::default().with_chunk_frames(7))
        .expect("build");

    let first = decode(&mut stream, 40);
    stream.reset();
    let second = decode(&mut stream, 40);
    assert_eq!(first, second);
}

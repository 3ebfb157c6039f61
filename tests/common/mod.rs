//! Shared test helpers
//!
//! A scripted decoder that fails or stalls on demand, plus WAV fixture
//! writers backed by hound.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gamewav::audio::{AudioBuffer, AudioDecoder};
use gamewav::{GameWavError, Result};

/// Start and end of one decode call
#[derive(Debug, Clone)]
pub struct DecodeSpan {
    pub name: String,
    pub start: Instant,
    pub end: Instant,
}

/// Decoder driven by the input bytes:
/// - bytes starting with `b"bad"` fail to decode immediately
/// - otherwise the first byte is a delay in milliseconds
/// - the byte count is the number of mono frames produced
#[derive(Default)]
pub struct ScriptedDecoder {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    spans: Mutex<Vec<DecodeSpan>>,
}

impl ScriptedDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<DecodeSpan> {
        self.spans.lock().unwrap().clone()
    }
}

impl AudioDecoder for ScriptedDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<AudioBuffer> {
        let start = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let failing = bytes.starts_with(b"bad");
        let delay = if failing { 0 } else { bytes.first().copied().unwrap_or(0) };
        thread::sleep(Duration::from_millis(u64::from(delay)));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push(DecodeSpan {
            name: name.to_string(),
            start,
            end: Instant::now(),
        });

        if failing {
            return Err(GameWavError::Decode {
                name: name.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        AudioBuffer::new(22050, vec![vec![0.5; bytes.len()]])
    }
}

/// Bytes that decode after `delay_ms` into `frames` mono frames
pub fn scripted_bytes(delay_ms: u8, frames: usize) -> Vec<u8> {
    vec![delay_ms; frames.max(1)]
}

/// Write a 16-bit integer WAV file
pub fn write_wav_i16(path: &Path, channels: u16, sample_rate: u32, interleaved: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in interleaved {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Write a 32-bit float WAV file
pub fn write_wav_f32(path: &Path, channels: u16, sample_rate: u32, interleaved: &[f32]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in interleaved {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Read an encoded container back with hound
pub fn read_container(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let reader = hound::WavReader::new(Cursor::new(bytes.to_vec())).unwrap();
    let spec = reader.spec();
    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap();
    (spec, samples)
}

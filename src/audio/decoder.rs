//! Audio decoding
//!
//! The converter treats decoding as a black box behind [`AudioDecoder`]:
//! bytes in, [`AudioBuffer`] out, or a decode error. The default
//! implementation uses symphonia for MP3, WAV and AIFF input.
//!
//! A single decoder is created lazily by [`DecoderContext`] and shared by
//! every job instead of building one per file.

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::buffer::AudioBuffer;
use crate::error::{GameWavError, Result};

/// Turns raw file bytes into decoded floating point audio.
///
/// `name` is the source file name; implementations may use its extension as
/// a format hint and must include it in errors.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<AudioBuffer>;
}

/// Decoder backed by symphonia's default codec and format registries
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        SymphoniaDecoder
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<AudioBuffer> {
        let fail = |reason: String| GameWavError::Decode {
            name: name.to_string(),
            reason,
        };

        let source = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| fail(format!("failed to probe format: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| fail("no audio track found".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| fail(format!("failed to create decoder: {}", e)))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channel_count = codec_params.channels.map(|c| c.count());
        let mut interleaved: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(fail(format!("packet read error: {}", e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let packet_channels = spec.channels.count();
                    match channel_count {
                        Some(expected) if expected != packet_channels => {
                            return Err(fail(format!(
                                "channel count changed mid-stream ({} -> {})",
                                expected, packet_channels
                            )));
                        }
                        _ => channel_count = Some(packet_channels),
                    }
                    sample_rate.get_or_insert(spec.rate);

                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(samples.samples());
                }
                Err(SymphoniaError::DecodeError(reason)) => {
                    // Corrupt packets are skipped, the rest of the stream is kept
                    debug!("skipping undecodable packet in {}: {}", name, reason);
                }
                Err(e) => return Err(fail(format!("decode error: {}", e))),
            }
        }

        let channel_count =
            channel_count.ok_or_else(|| fail("stream has no channel layout".to_string()))?;
        let sample_rate =
            sample_rate.ok_or_else(|| fail("stream has no sample rate".to_string()))?;

        AudioBuffer::from_interleaved(&interleaved, channel_count, sample_rate)
            .map_err(|e| fail(e.to_string()))
    }
}

type DecoderFactory = Box<dyn Fn() -> Arc<dyn AudioDecoder> + Send + Sync>;

/// Lazily created decoder shared across all conversions
pub struct DecoderContext {
    factory: DecoderFactory,
    decoder: OnceLock<Arc<dyn AudioDecoder>>,
}

impl DecoderContext {
    /// Context that builds a decoder with `factory` on first use
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn AudioDecoder> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            decoder: OnceLock::new(),
        }
    }

    /// Context backed by [`SymphoniaDecoder`]
    pub fn symphonia() -> Self {
        Self::lazy(|| {
            debug!("creating shared symphonia decoder");
            Arc::new(SymphoniaDecoder::new())
        })
    }

    /// Context that hands out an existing decoder
    pub fn with_decoder(decoder: Arc<dyn AudioDecoder>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Arc::clone(&decoder));
        Self {
            factory: Box::new(move || Arc::clone(&decoder)),
            decoder: cell,
        }
    }

    /// Get the shared decoder, creating it on first call
    pub fn get(&self) -> Arc<dyn AudioDecoder> {
        Arc::clone(self.decoder.get_or_init(|| (self.factory)()))
    }

    pub fn is_initialized(&self) -> bool {
        self.decoder.get().is_some()
    }
}

impl Default for DecoderContext {
    fn default() -> Self {
        Self::symphonia()
    }
}

impl std::fmt::Debug for DecoderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderContext")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

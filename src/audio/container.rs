//! 16-bit PCM WAV container encoder
//!
//! Turns an [`AudioBuffer`] into a byte-exact RIFF/WAVE file: a fixed 44-byte
//! header followed by interleaved little-endian `i16` samples.
//!
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    total length - 8
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (fmt chunk length)
//! [20-21]  1 (integer PCM)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * 2
//! [32-33]  block_align = channels * 2
//! [34-35]  16 (bits per sample)
//! [36-39]  "data"
//! [40-43]  data length = frames * channels * 2
//! [44-..]  interleaved samples
//! ```

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::audio::buffer::AudioBuffer;

/// Size of the fixed WAV header in bytes
pub const HEADER_SIZE: usize = 44;

/// Bytes per encoded sample
pub const BYTES_PER_SAMPLE: usize = 2;

pub const BITS_PER_SAMPLE: u16 = 16;

pub const FORMAT_PCM: u16 = 1;

const FMT_CHUNK_LEN: u32 = 16;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";
const DATA_TAG: &[u8; 4] = b"data";

/// Scale applied to clamped samples below -0.5
const NEGATIVE_SCALE: f64 = 32768.0;

/// Scale applied to every other clamped sample
const POSITIVE_SCALE: f64 = 32767.0;

/// Quantize one floating point sample to signed 16-bit PCM.
///
/// The sample is clamped to [-1, 1]. Values with `0.5 + s < 0` are scaled by
/// 32768, all others by 32767, and the product is truncated toward zero.
/// Rounding would change existing exports. NaN encodes as 0.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    let clamped = f64::from(sample).clamp(-1.0, 1.0);
    let scaled = if 0.5 + clamped < 0.0 {
        clamped * NEGATIVE_SCALE
    } else {
        clamped * POSITIVE_SCALE
    };
    // `as` truncates toward zero
    scaled as i16
}

/// Immutable encoded WAV bytes
///
/// Cloning shares the underlying allocation, so the same container can sit
/// in a job result, a batch report and a category without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContainer {
    bytes: Arc<[u8]>,
}

impl EncodedContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Interleaved sample region after the header
    pub fn sample_bytes(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    /// Parse the header back out of the encoded bytes
    pub fn header(&self) -> Option<ContainerHeader> {
        ContainerHeader::parse(&self.bytes)
    }

    /// Hex SHA-256 digest of the full container
    pub fn sha256(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

impl AsRef<[u8]> for EncodedContainer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode a buffer as a 16-bit PCM WAV container.
///
/// Never fails: out-of-range samples are clamped rather than rejected.
/// Size fields are 32-bit as in the RIFF format; buffers whose data exceeds
/// 4 GiB wrap those fields.
pub fn encode(buffer: &AudioBuffer) -> EncodedContainer {
    let channel_count = buffer.channel_count();
    let frame_count = buffer.frame_count();
    let data_len = frame_count * channel_count * BYTES_PER_SAMPLE;
    let total_len = data_len + HEADER_SIZE;

    let mut bytes = Vec::with_capacity(total_len);
    bytes.extend_from_slice(&header_bytes(
        channel_count as u16,
        buffer.sample_rate(),
        data_len as u32,
    ));

    let channels = buffer.channels();
    for frame in 0..frame_count {
        for channel in channels {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    debug_assert_eq!(bytes.len(), total_len);

    EncodedContainer {
        bytes: Arc::from(bytes),
    }
}

fn header_bytes(channels: u16, sample_rate: u32, data_len: u32) -> [u8; HEADER_SIZE] {
    let block_align = channels.wrapping_mul(BYTES_PER_SAMPLE as u16);
    let byte_rate = sample_rate
        .wrapping_mul(u32::from(channels))
        .wrapping_mul(BYTES_PER_SAMPLE as u32);
    let riff_len = data_len.wrapping_add(HEADER_SIZE as u32 - 8);

    let mut header = [0u8; HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(RIFF_TAG);
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..12].copy_from_slice(WAVE_TAG);

    // fmt sub-chunk
    header[12..16].copy_from_slice(FMT_TAG);
    header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(DATA_TAG);
    header[40..44].copy_from_slice(&data_len.to_le_bytes());

    header
}

/// Fields read back from a 44-byte container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub riff_len: u32,
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl ContainerHeader {
    /// Parse a canonical header. Returns `None` if the bytes are too short or
    /// any of the four chunk tags is wrong.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE
            || &bytes[0..4] != RIFF_TAG
            || &bytes[8..12] != WAVE_TAG
            || &bytes[12..16] != FMT_TAG
            || &bytes[36..40] != DATA_TAG
        {
            return None;
        }

        let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        let u32_at = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Some(Self {
            riff_len: u32_at(4),
            format_code: u16_at(20),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_len: u32_at(40),
        })
    }

    /// Number of frames described by the data length
    pub fn frame_count(&self) -> usize {
        if self.block_align == 0 {
            return 0;
        }
        self.data_len as usize / self.block_align as usize
    }
}

//! Audio Module
//!
//! Decoded audio buffers, the decoder seam and the 16-bit PCM WAV
//! container encoder.

pub mod buffer;
pub mod container;
pub mod decoder;

pub use buffer::AudioBuffer;
pub use container::{encode, quantize, ContainerHeader, EncodedContainer, HEADER_SIZE};
pub use decoder::{AudioDecoder, DecoderContext, SymphoniaDecoder};

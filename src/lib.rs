//! GameWav - Batch Audio Converter
//!
//! Converts decoded audio into canonical 16-bit PCM WAV containers and
//! manages many conversions at once, grouped into user-defined categories
//! and packaged as a single archive.
//!
//! # Architecture
//!
//! ```text
//! file bytes -> AudioDecoder -> AudioBuffer -> container::encode -> EncodedContainer
//!            -> CategoryStore (per category) -> ArchivePackager -> archive blob
//! ```
//!
//! - [`audio`]: buffers, the decoder seam and the WAV encoder
//! - [`scheduler`]: bounded-concurrency, group-paced job runner
//! - [`category`]: named buckets of converted files
//! - [`archive`]: export assembly and zip packaging
//! - [`workflow`]: a conversion session tying them together

pub mod archive;
pub mod audio;
pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod scheduler;
pub mod workflow;

pub use error::{GameWavError, Result};

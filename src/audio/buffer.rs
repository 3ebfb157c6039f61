//! Decoded audio buffer
//!
//! Non-interleaved floating point samples as handed over by the decoder.
//! Samples are not required to lie in [-1, 1]; clamping happens in the
//! container encoder.

use crate::error::{GameWavError, Result};

/// Decoded multi-channel audio
///
/// # Invariant
/// Every channel holds exactly `frame_count()` samples and there is at least
/// one channel.
///
/// # Example
/// ```
/// use gamewav::audio::AudioBuffer;
///
/// let buffer = AudioBuffer::new(44100, vec![vec![0.0; 4], vec![0.5; 4]]).unwrap();
/// assert_eq!(buffer.channel_count(), 2);
/// assert_eq!(buffer.frame_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample sequences
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if channels.is_empty() {
            return Err(GameWavError::InvalidBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }
        if channels.len() > u16::MAX as usize {
            return Err(GameWavError::InvalidBuffer {
                reason: format!("{} channels exceed the container limit", channels.len()),
            });
        }

        let frame_count = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frame_count)
        {
            return Err(GameWavError::InvalidBuffer {
                reason: format!(
                    "channel {} has {} frames, expected {}",
                    index,
                    channel.len(),
                    frame_count
                ),
            });
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Create a buffer from interleaved sample data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if channel_count == 0 {
            return Err(GameWavError::InvalidBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }
        if interleaved.len() % channel_count != 0 {
            return Err(GameWavError::InvalidBuffer {
                reason: format!(
                    "{} interleaved samples do not divide into {} channels",
                    interleaved.len(),
                    channel_count
                ),
            });
        }

        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    /// Create a silent buffer
    pub fn silence(channel_count: usize, frame_count: usize, sample_rate: u32) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frame_count]; channel_count])
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index >= channel_count()`.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

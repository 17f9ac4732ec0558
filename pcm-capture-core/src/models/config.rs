use serde::{Deserialize, Serialize};

use super::audio_models::{ChannelLayout, SampleFormat};
use super::error::ConfigError;

/// Configuration for a capture session.
///
/// Immutable once handed to the pipeline. The output file carries no header,
/// so these values are the only description of the recorded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate_hz: u32,

    /// Channel layout (default: mono).
    pub channel_layout: ChannelLayout,

    /// PCM sample encoding (default: 16-bit signed little-endian).
    pub sample_format: SampleFormat,

    /// Multiplier applied to the device minimum buffer size (default: 2).
    ///
    /// A bigger factor makes dropped samples less likely at the cost of memory
    /// and per-cycle latency.
    pub safety_factor: u32,
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.safety_factor == 0 {
            return Err(ConfigError::InvalidSafetyFactor);
        }
        Ok(())
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_layout.channel_count()
    }

    /// Bytes in one interleaved frame (one sample per channel).
    pub fn frame_bytes(&self) -> usize {
        self.sample_format.bytes_per_sample() * self.channel_count() as usize
    }

    /// Bytes of PCM produced per second of audio.
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate_hz as u64 * self.frame_bytes() as u64
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            channel_layout: ChannelLayout::Mono,
            sample_format: SampleFormat::S16Le,
            safety_factor: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(RecordingConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_rate() {
        let config = RecordingConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleRate));
    }

    #[test]
    fn rejects_zero_safety_factor() {
        let config = RecordingConfig {
            safety_factor: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSafetyFactor));
    }

    #[test]
    fn stereo_24bit_frame_layout() {
        let config = RecordingConfig {
            sample_rate_hz: 48000,
            channel_layout: ChannelLayout::Stereo,
            sample_format: SampleFormat::S24Le,
            safety_factor: 1,
        };
        assert_eq!(config.frame_bytes(), 6);
        assert_eq!(config.byte_rate(), 288_000);
    }
}

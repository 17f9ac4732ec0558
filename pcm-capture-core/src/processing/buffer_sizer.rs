//! Transfer chunk sizing.
//!
//! The driver reports a minimum buffer size for a format; the session scales
//! it by the configured safety factor once and uses the result for every
//! read/write cycle. Larger chunks mean fewer, larger I/O operations and less
//! risk of the driver ring overflowing while the consumer is writing.

use crate::models::audio_models::{ChannelLayout, SampleFormat};
use crate::models::config::RecordingConfig;
use crate::models::error::ConfigError;
use crate::traits::capture_device::CaptureBackend;

pub const MIN_SAMPLE_RATE_HZ: u32 = 4_000;
pub const MAX_SAMPLE_RATE_HZ: u32 = 192_000;

/// Period assumed by the nominal estimate.
pub const NOMINAL_PERIOD_MS: usize = 20;

/// Upper bound on one transfer chunk. The buffer is allocated up front on the
/// capture thread, so anything larger is rejected at sizing time.
pub const MAX_CHUNK_BYTES: usize = 16 * 1024 * 1024;

/// Software estimate of a driver minimum buffer: one 20 ms period rounded up
/// to whole frames.
///
/// Used by backends that cannot query their driver.
pub fn nominal_minimum_buffer_size(
    sample_rate_hz: u32,
    channel_layout: ChannelLayout,
    sample_format: SampleFormat,
) -> Result<usize, ConfigError> {
    if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
        return Err(ConfigError::Unsupported {
            sample_rate_hz,
            channel_layout,
            sample_format,
        });
    }
    let frames = (sample_rate_hz as usize * NOMINAL_PERIOD_MS).div_ceil(1000);
    let frame_bytes = sample_format.bytes_per_sample() * channel_layout.channel_count() as usize;
    Ok(frames * frame_bytes)
}

/// Fixed byte count moved from device to file in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferChunkSize {
    minimum: usize,
    factor: u32,
    bytes: usize,
}

impl TransferChunkSize {
    /// Validate `config`, ask `backend` for its minimum and scale it.
    pub fn compute<B: CaptureBackend + ?Sized>(
        backend: &B,
        config: &RecordingConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let reported = backend.minimum_buffer_size(
            config.sample_rate_hz,
            config.channel_layout,
            config.sample_format,
        )?;
        Self::from_minimum(reported, config)
    }

    /// Scale an already-known driver minimum.
    ///
    /// The minimum is aligned up to a whole frame first so every chunk holds
    /// complete frames.
    pub fn from_minimum(reported: usize, config: &RecordingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if reported == 0 {
            return Err(ConfigError::Unsupported {
                sample_rate_hz: config.sample_rate_hz,
                channel_layout: config.channel_layout,
                sample_format: config.sample_format,
            });
        }

        let factor = config.safety_factor;
        let overflow = ConfigError::ChunkOverflow {
            minimum: reported,
            factor,
        };
        let frame = config.frame_bytes();
        let minimum = reported
            .div_ceil(frame)
            .checked_mul(frame)
            .ok_or_else(|| overflow.clone())?;
        let bytes = minimum.checked_mul(factor as usize).ok_or(overflow)?;
        if bytes > MAX_CHUNK_BYTES {
            return Err(ConfigError::ChunkTooLarge {
                bytes,
                max: MAX_CHUNK_BYTES,
            });
        }

        Ok(Self {
            minimum,
            factor,
            bytes,
        })
    }

    /// Bytes per transfer cycle.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Frame-aligned driver minimum before scaling.
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::AcquireError;
    use crate::traits::capture_device::CaptureDevice;

    struct NoDevice;

    impl CaptureDevice for NoDevice {
        fn begin_capture(&mut self) -> Result<(), AcquireError> {
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, i32> {
            Ok(0)
        }

        fn end_capture(&mut self) {}

        fn release(self) {}
    }

    /// Backend with the nominal sizer, or a fixed reported size.
    struct SizingBackend(Option<usize>);

    impl CaptureBackend for SizingBackend {
        type Device = NoDevice;

        fn minimum_buffer_size(
            &self,
            sample_rate_hz: u32,
            channel_layout: ChannelLayout,
            sample_format: SampleFormat,
        ) -> Result<usize, ConfigError> {
            match self.0 {
                Some(size) => Ok(size),
                None => nominal_minimum_buffer_size(sample_rate_hz, channel_layout, sample_format),
            }
        }

        fn acquire(
            &self,
            _config: &RecordingConfig,
            _chunk: usize,
        ) -> Result<NoDevice, AcquireError> {
            Ok(NoDevice)
        }
    }

    fn config(safety_factor: u32) -> RecordingConfig {
        RecordingConfig {
            safety_factor,
            ..Default::default()
        }
    }

    #[test]
    fn nominal_44k_mono_16bit() {
        // 882 frames x 2 bytes
        let size =
            nominal_minimum_buffer_size(44100, ChannelLayout::Mono, SampleFormat::S16Le).unwrap();
        assert_eq!(size, 1764);
    }

    #[test]
    fn nominal_rounds_frames_up() {
        // 11025 Hz x 20 ms = 220.5 frames -> 221
        let size =
            nominal_minimum_buffer_size(11025, ChannelLayout::Stereo, SampleFormat::S24Le).unwrap();
        assert_eq!(size, 221 * 6);
    }

    #[test]
    fn nominal_rejects_out_of_range_rates() {
        for rate in [1, 3_999, 192_001] {
            let err = nominal_minimum_buffer_size(rate, ChannelLayout::Mono, SampleFormat::S16Le)
                .unwrap_err();
            assert!(matches!(err, ConfigError::Unsupported { .. }), "rate {rate}");
        }
    }

    #[test]
    fn positive_for_every_supported_combination() {
        let backend = SizingBackend(None);
        for rate in [8_000, 16_000, 22_050, 44_100, 48_000, 96_000, 192_000] {
            for layout in [ChannelLayout::Mono, ChannelLayout::Stereo] {
                for format in [SampleFormat::S16Le, SampleFormat::S24Le, SampleFormat::S32Le] {
                    let config = RecordingConfig {
                        sample_rate_hz: rate,
                        channel_layout: layout,
                        sample_format: format,
                        safety_factor: 1,
                    };
                    let chunk = TransferChunkSize::compute(&backend, &config).unwrap();
                    assert!(chunk.bytes() > 0);
                    assert_eq!(chunk.bytes() % config.frame_bytes(), 0);
                }
            }
        }
    }

    #[test]
    fn scales_linearly_with_factor() {
        let backend = SizingBackend(None);
        let single = TransferChunkSize::compute(&backend, &config(1)).unwrap();
        let double = TransferChunkSize::compute(&backend, &config(2)).unwrap();
        assert_eq!(double.bytes(), single.bytes() * 2);
        assert_eq!(double.bytes(), 3528);
        assert_eq!(double.minimum(), single.minimum());
        assert_eq!(double.factor(), 2);
    }

    #[test]
    fn aligns_driver_minimum_to_frames() {
        let stereo = RecordingConfig {
            channel_layout: ChannelLayout::Stereo,
            safety_factor: 3,
            ..Default::default()
        };
        let chunk = TransferChunkSize::from_minimum(1001, &stereo).unwrap();
        assert_eq!(chunk.minimum(), 1004);
        assert_eq!(chunk.bytes(), 3012);
    }

    #[test]
    fn zero_driver_minimum_is_unsupported() {
        let err = TransferChunkSize::compute(&SizingBackend(Some(0)), &config(2)).unwrap_err();
        assert!(matches!(err, ConfigError::Unsupported { sample_rate_hz: 44100, .. }));
    }

    #[test]
    fn invalid_config_rejected_before_sizing() {
        let err = TransferChunkSize::compute(&SizingBackend(None), &config(0)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidSafetyFactor);
    }

    #[test]
    fn overflow_is_reported() {
        let err = TransferChunkSize::from_minimum(usize::MAX / 2, &config(4)).unwrap_err();
        assert!(matches!(err, ConfigError::ChunkOverflow { factor: 4, .. }));
    }

    #[test]
    fn huge_safety_factor_is_rejected() {
        let config = RecordingConfig {
            sample_rate_hz: 192_000,
            channel_layout: ChannelLayout::Stereo,
            sample_format: SampleFormat::S32Le,
            safety_factor: u32::MAX,
        };
        let err = TransferChunkSize::compute(&SizingBackend(None), &config).unwrap_err();
        assert!(matches!(err, ConfigError::ChunkTooLarge { max: MAX_CHUNK_BYTES, .. }));
    }

    #[test]
    fn chunk_at_the_limit_is_accepted() {
        let chunk = TransferChunkSize::from_minimum(MAX_CHUNK_BYTES / 2, &config(2)).unwrap();
        assert_eq!(chunk.bytes(), MAX_CHUNK_BYTES);

        let err = TransferChunkSize::from_minimum(MAX_CHUNK_BYTES / 2 + 2, &config(2)).unwrap_err();
        assert!(matches!(err, ConfigError::ChunkTooLarge { .. }));
    }
}

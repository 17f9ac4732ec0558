use crate::models::audio_models::{ChannelLayout, SampleFormat};
use crate::models::config::RecordingConfig;
use crate::models::error::{AcquireError, ConfigError};
use crate::processing::buffer_sizer;

/// Factory for capture devices on a given platform or driver.
///
/// Implemented by:
/// - `CpalBackend` (pcm-capture-cpal)
/// - scripted mocks in the pipeline tests
pub trait CaptureBackend {
    type Device: CaptureDevice;

    /// Smallest buffer in bytes the driver accepts for this format.
    ///
    /// Must fail with [`ConfigError::Unsupported`] instead of returning zero
    /// when the combination cannot be captured. The default is the nominal
    /// software estimate from [`buffer_sizer::nominal_minimum_buffer_size`].
    fn minimum_buffer_size(
        &self,
        sample_rate_hz: u32,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    ) -> Result<usize, ConfigError> {
        buffer_sizer::nominal_minimum_buffer_size(sample_rate_hz, channel_layout, sample_format)
    }

    /// Open the device for continuous streaming with `config`.
    ///
    /// `chunk_bytes` is the transfer chunk size the pipeline will request on
    /// every read, so backends can size their internal buffering.
    fn acquire(
        &self,
        config: &RecordingConfig,
        chunk_bytes: usize,
    ) -> Result<Self::Device, AcquireError>;
}

/// An acquired capture device, used as a blocking byte source.
///
/// Owned exclusively by one session. It is moved onto the capture thread,
/// hence `Send`.
pub trait CaptureDevice: Send + 'static {
    /// Begin hardware capture.
    fn begin_capture(&mut self) -> Result<(), AcquireError>;

    /// Block until up to `buf.len()` bytes of interleaved PCM are available
    /// and copy them into `buf`.
    ///
    /// Returns the number of bytes written into `buf`, or a raw negative
    /// status code (see `read_codes`) on failure.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32>;

    /// Halt hardware capture. Blocked readers must be woken.
    fn end_capture(&mut self);

    /// Release the device. Consumes the handle so it runs at most once.
    fn release(self);
}

//! cpal microphone capture backend.
//!
//! Opens an input stream in the session's exact format and exposes it as a
//! blocking byte source. Samples are converted to little-endian bytes in the
//! audio callback and queued in a frame-aligned ring sized to a few transfer
//! chunks.

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BuildStreamError, SupportedBufferSize};

use pcm_capture_core::models::audio_models::{ChannelLayout, SampleFormat};
use pcm_capture_core::models::config::RecordingConfig;
use pcm_capture_core::models::error::{AcquireError, ConfigError};
use pcm_capture_core::processing::buffer_sizer;
use pcm_capture_core::traits::capture_device::{CaptureBackend, CaptureDevice};

use crate::capture_queue::CaptureQueue;
use crate::device_enumerator::DeviceEnumerator;

/// Ring capacity in transfer chunks.
const RING_CHUNKS: usize = 4;

/// How long `read` waits without any new data before giving up.
const READ_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Capture backend for the default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    /// Capture from the system default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from a specific input device by name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn resolve_device(&self) -> Result<cpal::Device, AcquireError> {
        let enumerator = DeviceEnumerator::new();
        match &self.device_name {
            Some(name) => enumerator.find_input_device(name),
            None => enumerator.default_input_device(),
        }
    }
}

/// cpal sample type carrying each supported sample format.
fn cpal_format(format: SampleFormat) -> Option<cpal::SampleFormat> {
    match format {
        SampleFormat::S16Le => Some(cpal::SampleFormat::I16),
        SampleFormat::S32Le => Some(cpal::SampleFormat::I32),
        // cpal has no packed 24-bit input
        SampleFormat::S24Le => None,
    }
}

impl CaptureBackend for CpalBackend {
    type Device = CpalCaptureDevice;

    /// Larger of the driver's minimum buffer and the nominal 20 ms period,
    /// provided some supported input config matches exactly.
    fn minimum_buffer_size(
        &self,
        sample_rate_hz: u32,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    ) -> Result<usize, ConfigError> {
        let unsupported = || ConfigError::Unsupported {
            sample_rate_hz,
            channel_layout,
            sample_format,
        };

        let nominal = buffer_sizer::nominal_minimum_buffer_size(
            sample_rate_hz,
            channel_layout,
            sample_format,
        )?;
        let wanted = cpal_format(sample_format).ok_or_else(unsupported)?;

        let device = self.resolve_device().map_err(|e| {
            log::warn!("Cannot query buffer size: {}", e);
            unsupported()
        })?;
        let mut ranges = device.supported_input_configs().map_err(|e| {
            log::warn!("Cannot query supported input configs: {}", e);
            unsupported()
        })?;

        let channels = channel_layout.channel_count();
        let range = ranges
            .find(|r| {
                r.channels() == channels
                    && r.sample_format() == wanted
                    && r.min_sample_rate().0 <= sample_rate_hz
                    && sample_rate_hz <= r.max_sample_rate().0
            })
            .ok_or_else(unsupported)?;

        let frame_bytes = sample_format.bytes_per_sample() * channels as usize;
        let driver_minimum = match range.buffer_size() {
            SupportedBufferSize::Range { min, .. } => *min as usize * frame_bytes,
            SupportedBufferSize::Unknown => 0,
        };
        Ok(nominal.max(driver_minimum))
    }

    /// Open the input stream on a dedicated owner thread.
    ///
    /// cpal streams must be driven and dropped on the thread that built them,
    /// so the stream never leaves that thread; the returned device talks to it
    /// over a command channel.
    fn acquire(
        &self,
        config: &RecordingConfig,
        chunk_bytes: usize,
    ) -> Result<CpalCaptureDevice, AcquireError> {
        let ring_bytes = chunk_bytes.checked_mul(RING_CHUNKS).ok_or_else(|| {
            AcquireError::InvalidConfig(format!("ring of {} chunks overflows", RING_CHUNKS))
        })?;
        let queue = Arc::new(CaptureQueue::new(ring_bytes, config.frame_bytes()));

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let backend = self.clone();
        let config = *config;
        let owner_queue = Arc::clone(&queue);

        let owner = thread::Builder::new()
            .name("pcm-cpal-stream".into())
            .spawn(move || run_stream_owner(&backend, &config, owner_queue, ready_tx, command_rx))
            .map_err(|e| AcquireError::Backend(format!("failed to spawn stream thread: {}", e)))?;

        let device_name = match ready_rx.recv() {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = owner.join();
                return Err(e);
            }
            Err(_) => {
                let _ = owner.join();
                return Err(AcquireError::Backend(
                    "stream thread exited before opening the device".into(),
                ));
            }
        };

        log::info!(
            "Acquired input device '{}' ({} Hz, {} ch)",
            device_name,
            config.sample_rate_hz,
            config.channel_count()
        );

        Ok(CpalCaptureDevice {
            device_name,
            queue,
            commands: command_tx,
            owner: Some(owner),
        })
    }
}

/// Requests handled by the stream owner thread.
enum StreamCommand {
    Play(mpsc::Sender<Result<(), AcquireError>>),
    Pause,
    Release,
}

/// Build the stream, report readiness, then serve commands until released.
///
/// The stream is dropped here when the device is released or dropped.
fn run_stream_owner(
    backend: &CpalBackend,
    config: &RecordingConfig,
    queue: Arc<CaptureQueue>,
    ready: mpsc::Sender<Result<String, AcquireError>>,
    commands: mpsc::Receiver<StreamCommand>,
) {
    let (stream, device_name) = match open_stream(backend, config, &queue) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(device_name)).is_err() {
        return;
    }

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play(reply) => {
                let played = stream
                    .play()
                    .map_err(|e| AcquireError::Backend(format!("failed to start stream: {}", e)));
                let _ = reply.send(played);
            }
            StreamCommand::Pause => {
                if let Err(e) = stream.pause() {
                    log::warn!("Failed to pause input stream: {}", e);
                }
            }
            StreamCommand::Release => break,
        }
    }
    drop(stream);
}

fn open_stream(
    backend: &CpalBackend,
    config: &RecordingConfig,
    queue: &Arc<CaptureQueue>,
) -> Result<(cpal::Stream, String), AcquireError> {
    let device = backend.resolve_device()?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".into());

    let stream_config = cpal::StreamConfig {
        channels: config.channel_count(),
        sample_rate: cpal::SampleRate(config.sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match cpal_format(config.sample_format) {
        Some(cpal::SampleFormat::I16) => build_stream::<i16>(&device, &stream_config, queue)?,
        Some(cpal::SampleFormat::I32) => build_stream::<i32>(&device, &stream_config, queue)?,
        _ => {
            return Err(AcquireError::InvalidConfig(format!(
                "sample format {} not available",
                config.sample_format
            )))
        }
    };
    Ok((stream, device_name))
}

/// Samples cpal delivers that we write as little-endian PCM.
trait LePcm: cpal::SizedSample + Send + 'static {
    fn extend_le(samples: &[Self], out: &mut Vec<u8>);
}

impl LePcm for i16 {
    fn extend_le(samples: &[Self], out: &mut Vec<u8>) {
        out.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
    }
}

impl LePcm for i32 {
    fn extend_le(samples: &[Self], out: &mut Vec<u8>) {
        out.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
    }
}

fn build_stream<T: LePcm>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<CaptureQueue>,
) -> Result<cpal::Stream, AcquireError> {
    let data_queue = Arc::clone(queue);
    let error_queue = Arc::clone(queue);
    let mut scratch: Vec<u8> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                T::extend_le(data, &mut scratch);
                data_queue.push(&scratch);
            },
            move |e| {
                log::error!("Input stream error: {}", e);
                error_queue.fail(e.to_string());
            },
            None,
        )
        .map_err(classify_build_error)
}

fn classify_build_error(e: BuildStreamError) -> AcquireError {
    match e {
        BuildStreamError::DeviceNotAvailable => AcquireError::NotFound(e.to_string()),
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            AcquireError::InvalidConfig(e.to_string())
        }
        other => AcquireError::Backend(other.to_string()),
    }
}

/// An open cpal input stream used as a blocking byte source.
///
/// The stream itself stays on its owner thread; this handle only holds the
/// sample queue and the command channel, so it can move to the capture thread.
pub struct CpalCaptureDevice {
    device_name: String,
    queue: Arc<CaptureQueue>,
    commands: mpsc::Sender<StreamCommand>,
    owner: Option<JoinHandle<()>>,
}

impl CaptureDevice for CpalCaptureDevice {
    fn begin_capture(&mut self) -> Result<(), AcquireError> {
        let gone = || AcquireError::Backend("stream thread has exited".into());

        self.queue.open();
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands.send(StreamCommand::Play(reply_tx)).map_err(|_| gone())?;
        reply_rx.recv().map_err(|_| gone())?
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        self.queue.read(buf, READ_STALL_TIMEOUT)
    }

    fn end_capture(&mut self) {
        if self.commands.send(StreamCommand::Pause).is_err() {
            log::warn!("Stream thread for '{}' already exited", self.device_name);
        }
        self.queue.close();
    }

    fn release(mut self) {
        let overrun = self.queue.overrun_bytes();
        if overrun > 0 {
            log::warn!(
                "Input device '{}' dropped {} bytes during capture",
                self.device_name,
                overrun
            );
        }
        let _ = self.commands.send(StreamCommand::Release);
        if let Some(owner) = self.owner.take() {
            if owner.join().is_err() {
                log::error!("Stream thread for '{}' panicked", self.device_name);
            }
        }
        log::debug!("Released input device '{}'", self.device_name);
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::RecordingConfig;
use crate::models::error::{read_codes, AcquireError, CaptureError, ConfigError, ReadFailure};
use crate::models::recording_result::CaptureSummary;
use crate::models::state::PipelineState;
use crate::processing::buffer_sizer::{TransferChunkSize, MAX_CHUNK_BYTES};
use crate::storage::pcm_writer::PcmFileWriter;
use crate::traits::capture_device::{CaptureBackend, CaptureDevice};
use crate::traits::session_observer::SessionObserver;

type CaptureResult = Result<CaptureSummary, CaptureError>;

/// Control-side state, shared between the pipeline and its `StopHandle`s.
///
/// The capture thread never touches this; it only sees the stop flag.
struct Control {
    state: Mutex<PipelineState>,
    observer: Mutex<Option<Arc<dyn SessionObserver>>>,
}

impl Control {
    fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    fn set_state(&self, new_state: PipelineState) {
        *self.state.lock() = new_state;
        self.notify_state(new_state);
    }

    fn notify_state(&self, state: PipelineState) {
        if let Some(observer) = self.observer() {
            observer.on_state_changed(state);
        }
    }

    fn observer(&self) -> Option<Arc<dyn SessionObserver>> {
        self.observer.lock().clone()
    }
}

/// Cloneable handle that requests a cooperative stop from any thread.
#[derive(Clone)]
pub struct StopHandle {
    stop_flag: Arc<AtomicBool>,
    control: Arc<Control>,
}

impl StopHandle {
    /// Set the stop flag if the pipeline is recording; otherwise a no-op.
    ///
    /// Never blocks on the capture thread. The cycle in flight completes
    /// before the flag is observed.
    pub fn request_stop(&self) {
        {
            let mut state = self.control.state.lock();
            if !state.is_recording() {
                return;
            }
            self.stop_flag.store(true, Ordering::Release);
            *state = PipelineState::Stopping;
        }
        log::info!("Capture stop requested");
        self.control.notify_state(PipelineState::Stopping);
    }

    pub fn state(&self) -> PipelineState {
        self.control.state()
    }
}

/// Single-shot capture session: device → transfer loop → raw PCM file.
///
/// Generic over the device collaborator via `CaptureBackend`.
///
/// ```text
/// [CaptureDevice] --read(chunk)--> [reusable buffer] --write--> [PcmFileWriter]
///        ^                                 |
///        +-------- stop flag (AtomicBool) --+  checked between cycles
/// ```
pub struct CapturePipeline<B: CaptureBackend> {
    backend: B,
    control: Arc<Control>,
    // Only state shared with the capture thread.
    stop_flag: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<CaptureResult>>,
}

impl<B: CaptureBackend> CapturePipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            control: Arc::new(Control {
                state: Mutex::new(PipelineState::Idle),
                observer: Mutex::new(None),
            }),
            stop_flag: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        *self.control.observer.lock() = Some(observer);
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> PipelineState {
        self.control.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop_flag: Arc::clone(&self.stop_flag),
            control: Arc::clone(&self.control),
        }
    }

    /// Whether the capture thread exists and is still running.
    pub fn capture_thread_active(&self) -> bool {
        self.capture_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start capture. Transitions: idle → starting → recording.
    ///
    /// Sizing and acquisition failures leave no file and no thread behind;
    /// the pipeline returns to idle.
    pub fn start(
        &mut self,
        config: RecordingConfig,
        output_path: impl Into<PathBuf>,
    ) -> Result<(), CaptureError> {
        {
            let mut state = self.control.state.lock();
            if !state.is_idle() {
                return Err(CaptureError::InvalidState {
                    operation: "start",
                    state: *state,
                });
            }
            *state = PipelineState::Starting;
        }
        self.control.notify_state(PipelineState::Starting);

        match self.launch(config, output_path.into()) {
            Ok(handle) => {
                self.capture_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start capture: {}", e);
                self.control.set_state(PipelineState::Idle);
                Err(e)
            }
        }
    }

    /// Request a cooperative stop. No-op unless recording.
    pub fn request_stop(&self) {
        self.stop_handle().request_stop();
    }

    /// Block until the capture thread exits, without requesting a stop.
    ///
    /// Returns the session summary, or the fatal error that ended the loop.
    /// Transitions: recording/stopping → stopped.
    pub fn join(&mut self) -> CaptureResult {
        let state = self.control.state();
        let handle = match self.capture_handle.take() {
            Some(handle) if state.has_capture_thread() => handle,
            other => {
                self.capture_handle = other;
                return Err(CaptureError::InvalidState {
                    operation: "join",
                    state,
                });
            }
        };

        let result = handle
            .join()
            .unwrap_or(Err(CaptureError::CaptureThreadPanicked));
        self.control.set_state(PipelineState::Stopped);

        if let Some(observer) = self.control.observer() {
            match &result {
                Ok(summary) => observer.on_capture_finished(summary),
                Err(e) => observer.on_error(e),
            }
        }
        result
    }

    /// Request a stop and wait for the file to be closed and the device
    /// released.
    pub fn stop_and_wait(&mut self) -> CaptureResult {
        let state = self.control.state();
        if !state.has_capture_thread() {
            return Err(CaptureError::InvalidState {
                operation: "stop",
                state,
            });
        }
        self.request_stop();
        self.join()
    }

    // --- Internal helpers ---

    fn launch(
        &self,
        config: RecordingConfig,
        output_path: PathBuf,
    ) -> Result<thread::JoinHandle<CaptureResult>, CaptureError> {
        let chunk = TransferChunkSize::compute(&self.backend, &config)?;
        let buffer = allocate_chunk(chunk.bytes())?;

        let mut device = DeviceGuard::new(self.backend.acquire(&config, chunk.bytes())?);
        device.begin_capture()?;
        let writer = PcmFileWriter::create(&output_path)?;

        log::info!(
            "Capture started: {} ({} Hz, {}, {}, chunk {} bytes = {} x {})",
            output_path.display(),
            config.sample_rate_hz,
            config.channel_layout,
            config.sample_format,
            chunk.bytes(),
            chunk.minimum(),
            chunk.factor(),
        );

        self.stop_flag.store(false, Ordering::Release);
        self.control.set_state(PipelineState::Recording);

        let session = TransferSession {
            device,
            writer,
            buffer,
            chunk,
            config,
            stop_flag: Arc::clone(&self.stop_flag),
        };
        thread::Builder::new()
            .name("pcm-capture".into())
            .spawn(move || session.run())
            .map_err(|e| CaptureError::Io(format!("failed to spawn capture thread: {}", e)))
    }
}

impl<B: CaptureBackend> Drop for CapturePipeline<B> {
    fn drop(&mut self) {
        if self.capture_handle.is_some() {
            log::warn!("Capture pipeline dropped while recording; stopping");
            self.request_stop();
            if let Err(e) = self.join() {
                log::error!("Capture ended with error during drop: {}", e);
            }
        }
    }
}

/// Ends capture and releases the device exactly once, on every exit path
/// (including unwinding and a failed thread spawn).
struct DeviceGuard<D: CaptureDevice> {
    device: Option<D>,
    capturing: bool,
}

impl<D: CaptureDevice> DeviceGuard<D> {
    fn new(device: D) -> Self {
        Self {
            device: Some(device),
            capturing: false,
        }
    }

    fn begin_capture(&mut self) -> Result<(), AcquireError> {
        if let Some(device) = self.device.as_mut() {
            device.begin_capture()?;
            self.capturing = true;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        match self.device.as_mut() {
            Some(device) => device.read(buf),
            None => Err(read_codes::DEAD_OBJECT),
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut device) = self.device.take() {
            if self.capturing {
                device.end_capture();
                self.capturing = false;
            }
            device.release();
            log::debug!("Capture device released");
        }
    }
}

impl<D: CaptureDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Default)]
struct TransferStats {
    cycles: u64,
    short_reads: u64,
}

/// Everything the capture thread owns for one session.
struct TransferSession<D: CaptureDevice> {
    device: DeviceGuard<D>,
    writer: PcmFileWriter,
    // Allocated once in `launch`, reused every cycle.
    buffer: Vec<u8>,
    chunk: TransferChunkSize,
    config: RecordingConfig,
    stop_flag: Arc<AtomicBool>,
}

impl<D: CaptureDevice> TransferSession<D> {
    fn run(self) -> CaptureResult {
        let Self {
            mut device,
            mut writer,
            mut buffer,
            chunk,
            config,
            stop_flag,
        } = self;

        let mut stats = TransferStats::default();

        let outcome = transfer(&mut device, &mut writer, &mut buffer, &stop_flag, &mut stats);

        // Release order: file, then hardware capture, then the handle. Frames
        // the device still buffers at this point are discarded.
        let closed = writer.close();
        device.shutdown();

        match &outcome {
            Ok(()) => log::info!(
                "Capture finished: {} bytes in {} cycles ({} short)",
                writer.bytes_written(),
                stats.cycles,
                stats.short_reads
            ),
            Err(e) => log::error!(
                "Capture loop terminated after {} bytes: {}",
                writer.bytes_written(),
                e
            ),
        }

        outcome?;
        let checksum = closed?;

        Ok(CaptureSummary {
            file_path: writer.file_path().to_path_buf(),
            config,
            chunk_bytes: chunk.bytes(),
            cycles: stats.cycles,
            short_reads: stats.short_reads,
            bytes_written: writer.bytes_written(),
            checksum,
        })
    }
}

/// The transfer loop: read a chunk, append exactly what was read, repeat
/// until the stop flag is observed between cycles.
fn transfer<D: CaptureDevice>(
    device: &mut DeviceGuard<D>,
    writer: &mut PcmFileWriter,
    buffer: &mut [u8],
    stop_flag: &AtomicBool,
    stats: &mut TransferStats,
) -> Result<(), CaptureError> {
    while !stop_flag.load(Ordering::Acquire) {
        let read = device.read(buffer).map_err(|code| CaptureError::DeviceReadFailed {
            reason: ReadFailure::from_code(code),
        })?;
        let read = read.min(buffer.len());

        if read > 0 {
            writer.write(&buffer[..read])?;
        }
        stats.cycles += 1;
        if read < buffer.len() {
            stats.short_reads += 1;
        }
    }
    Ok(())
}

/// Reserve the transfer buffer without aborting on allocation failure.
fn allocate_chunk(bytes: usize) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|_| ConfigError::ChunkTooLarge {
            bytes,
            max: MAX_CHUNK_BYTES,
        })?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

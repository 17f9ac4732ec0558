//! Scripted mock backend shared by the session tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{ChannelLayout, SampleFormat};
use crate::models::config::RecordingConfig;
use crate::models::error::{AcquireError, CaptureError, ConfigError};
use crate::models::recording_result::CaptureSummary;
use crate::models::state::PipelineState;
use crate::session::pipeline::StopHandle;
use crate::traits::capture_device::{CaptureBackend, CaptureDevice};
use crate::traits::session_observer::SessionObserver;

/// Minimum reported by the mock; with the default factor of 2 and 16-bit mono
/// every chunk is 16 bytes.
pub const MOCK_MINIMUM: usize = 8;
pub const MOCK_CHUNK: usize = 16;

/// One scripted `read` result.
pub enum Step {
    /// Deliver these bytes.
    Data(Vec<u8>),
    /// Request a stop from inside the read, then deliver these bytes.
    StopThenData(Vec<u8>),
    /// Fail with a raw status code.
    Code(i32),
    Panic,
}

#[derive(Default)]
pub struct Counters {
    pub acquires: AtomicUsize,
    pub begins: AtomicUsize,
    pub reads: AtomicUsize,
    /// Reads issued after `end_capture`; the pipeline never makes any.
    pub reads_after_end: AtomicUsize,
    pub ends: AtomicUsize,
    pub releases: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    pub counters: Arc<Counters>,
    script: Mutex<VecDeque<Step>>,
    leftover: Mutex<Option<Vec<u8>>>,
    stop: Mutex<Option<StopHandle>>,
    fail_acquire: Option<AcquireError>,
    fail_begin: Option<AcquireError>,
}

impl MockBackend {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            script: Mutex::new(script.into()),
            leftover: Mutex::new(None),
            stop: Mutex::new(None),
            fail_acquire: None,
            fail_begin: None,
        }
    }

    /// Script plus bytes still buffered in the device once capture ends.
    pub fn with_leftover(script: Vec<Step>, leftover: Vec<u8>) -> Self {
        Self {
            leftover: Mutex::new(Some(leftover)),
            ..Self::new(script)
        }
    }

    pub fn failing_acquire(error: AcquireError) -> Self {
        Self {
            fail_acquire: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_begin(error: AcquireError) -> Self {
        Self {
            fail_begin: Some(error),
            ..Self::new(Vec::new())
        }
    }

    /// Give the next acquired device a way to stop its own pipeline.
    pub fn arm_stop(&self, handle: StopHandle) {
        *self.stop.lock() = Some(handle);
    }
}

impl CaptureBackend for MockBackend {
    type Device = MockDevice;

    fn minimum_buffer_size(
        &self,
        sample_rate_hz: u32,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    ) -> Result<usize, ConfigError> {
        if sample_rate_hz == 12_345 {
            return Err(ConfigError::Unsupported {
                sample_rate_hz,
                channel_layout,
                sample_format,
            });
        }
        Ok(MOCK_MINIMUM)
    }

    fn acquire(
        &self,
        _config: &RecordingConfig,
        _chunk_bytes: usize,
    ) -> Result<MockDevice, AcquireError> {
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.fail_acquire {
            return Err(error.clone());
        }
        Ok(MockDevice {
            counters: Arc::clone(&self.counters),
            script: std::mem::take(&mut *self.script.lock()),
            leftover: self.leftover.lock().take(),
            ended: false,
            stop: self.stop.lock().take(),
            fail_begin: self.fail_begin.clone(),
        })
    }
}

pub struct MockDevice {
    counters: Arc<Counters>,
    script: VecDeque<Step>,
    leftover: Option<Vec<u8>>,
    ended: bool,
    stop: Option<StopHandle>,
    fail_begin: Option<AcquireError>,
}

impl CaptureDevice for MockDevice {
    fn begin_capture(&mut self) -> Result<(), AcquireError> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        match self.fail_begin.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        if self.ended {
            self.counters.reads_after_end.fetch_add(1, Ordering::SeqCst);
            let data = self.leftover.take().unwrap_or_default();
            buf[..data.len()].copy_from_slice(&data);
            return Ok(data.len());
        }
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let data = match self.script.pop_front() {
            Some(Step::Data(data)) => data,
            Some(Step::StopThenData(data)) => {
                if let Some(stop) = &self.stop {
                    stop.request_stop();
                }
                data
            }
            Some(Step::Code(code)) => return Err(code),
            Some(Step::Panic) => panic!("scripted device panic"),
            None => {
                // idle device: nothing captured yet
                thread::sleep(Duration::from_millis(1));
                return Ok(0);
            }
        };
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn end_capture(&mut self) {
        self.ended = true;
        self.counters.ends.fetch_add(1, Ordering::SeqCst);
    }

    fn release(self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer that records every notification.
#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<PipelineState>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub finished: Mutex<Vec<CaptureSummary>>,
}

impl SessionObserver for RecordingObserver {
    fn on_state_changed(&self, state: PipelineState) {
        self.states.lock().push(state);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_capture_finished(&self, summary: &CaptureSummary) {
        self.finished.lock().push(summary.clone());
    }
}

/// Distinct, recognizable chunk contents.
pub fn chunk(fill: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| fill.wrapping_add(i as u8)).collect()
}

pub fn temp_output(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pcm_capture_test_{}_{}", uuid::Uuid::new_v4(), name))
}

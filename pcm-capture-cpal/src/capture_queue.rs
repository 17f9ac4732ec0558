//! Blocking byte queue between the cpal audio callback and the capture thread.
//!
//! The callback pushes interleaved little-endian frames; `read` blocks until a
//! full transfer chunk is buffered, the stream is closed, it fails, or it
//! stalls.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use pcm_capture_core::models::error::read_codes;
use pcm_capture_core::processing::ring_buffer::RingBuffer;

struct QueueState {
    ring: RingBuffer,
    accepting: bool,
    closed: bool,
    failure: Option<String>,
    reported_overrun: u64,
}

pub struct CaptureQueue {
    state: Mutex<QueueState>,
    data_ready: Condvar,
    frame_bytes: usize,
}

impl CaptureQueue {
    pub fn new(capacity: usize, frame_bytes: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                ring: RingBuffer::new(capacity, frame_bytes),
                accepting: false,
                closed: false,
                failure: None,
                reported_overrun: 0,
            }),
            data_ready: Condvar::new(),
            frame_bytes: frame_bytes.max(1),
        }
    }

    /// Start accepting frames. Anything the callback delivered before this is
    /// dropped.
    pub fn open(&self) {
        let mut state = self.state.lock();
        state.ring.reset();
        state.accepting = true;
        state.closed = false;
    }

    /// Producer side, called from the audio callback.
    pub fn push(&self, data: &[u8]) {
        let mut state = self.state.lock();
        if !state.accepting {
            return;
        }
        state.ring.write(data);

        let overrun = state.ring.overrun_bytes();
        if overrun > state.reported_overrun {
            log::warn!(
                "Capture ring overrun: {} bytes dropped so far",
                overrun
            );
            state.reported_overrun = overrun;
        }
        drop(state);
        self.data_ready.notify_one();
    }

    /// Record a stream error. Buffered bytes are still delivered first.
    pub fn fail(&self, reason: String) {
        self.state.lock().failure = Some(reason);
        self.data_ready.notify_all();
    }

    /// Stop accepting frames and wake any blocked reader.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.accepting = false;
        state.closed = true;
        drop(state);
        self.data_ready.notify_all();
    }

    /// Block until `buf` can be filled with whole frames.
    ///
    /// Returns fewer bytes when the queue is closed, has failed with data
    /// still buffered, or nothing new arrived for `stall_timeout`. Fails with
    /// `DEAD_OBJECT` after a stream error, `ERROR` on a stall with nothing
    /// buffered and `INVALID_OPERATION` if capture was never started.
    pub fn read(&self, buf: &mut [u8], stall_timeout: Duration) -> Result<usize, i32> {
        let wanted = buf.len() - buf.len() % self.frame_bytes;
        let mut state = self.state.lock();

        loop {
            let available = state.ring.count();
            if available >= wanted {
                return Ok(state.ring.read_into(buf));
            }
            if let Some(reason) = &state.failure {
                if available == 0 {
                    log::error!("Capture stream failed: {}", reason);
                    return Err(read_codes::DEAD_OBJECT);
                }
                return Ok(state.ring.read_into(buf));
            }
            if state.closed {
                return Ok(state.ring.read_into(buf));
            }
            if !state.accepting {
                return Err(read_codes::INVALID_OPERATION);
            }

            let stalled = self.data_ready.wait_for(&mut state, stall_timeout).timed_out()
                && state.ring.count() == available;
            if stalled {
                log::warn!("Capture stream stalled for {:?}", stall_timeout);
                if available == 0 {
                    return Err(read_codes::ERROR);
                }
                return Ok(state.ring.read_into(buf));
            }
        }
    }

    pub fn overrun_bytes(&self) -> u64 {
        self.state.lock().ring.overrun_bytes()
    }
}

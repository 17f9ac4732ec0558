use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::error::CaptureError;
use crate::session::pipeline::StopHandle;

/// Caller-side timer that requests a stop after a delay.
///
/// Runs on its own thread and touches the pipeline only through a
/// `StopHandle`. Dropping it before the delay elapses cancels it.
pub struct DeferredStop {
    cancelled: Arc<AtomicBool>,
    timer_handle: Option<thread::JoinHandle<bool>>,
}

impl DeferredStop {
    pub fn schedule(stop: StopHandle, delay: Duration) -> Result<Self, CaptureError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let timer_cancelled = Arc::clone(&cancelled);
        let deadline = Instant::now() + delay;

        let handle = thread::Builder::new()
            .name("pcm-deferred-stop".into())
            .spawn(move || {
                loop {
                    if timer_cancelled.load(Ordering::Acquire) {
                        return false;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
                log::debug!("Deferred stop fired after {:?}", delay);
                stop.request_stop();
                true
            })
            .map_err(|e| CaptureError::Io(format!("failed to spawn timer thread: {}", e)))?;

        Ok(Self {
            cancelled,
            timer_handle: Some(handle),
        })
    }

    /// Whether the timer thread has exited (fired or cancelled).
    pub fn is_finished(&self) -> bool {
        self.timer_handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Cancel the timer and wait for its thread.
    ///
    /// Returns `true` if the stop had already been requested.
    pub fn cancel(mut self) -> bool {
        self.shutdown()
    }

    fn shutdown(&mut self) -> bool {
        self.cancelled.store(true, Ordering::Release);
        match self.timer_handle.take() {
            Some(handle) => {
                handle.thread().unpark();
                handle.join().unwrap_or(false)
            }
            None => false,
        }
    }
}

impl Drop for DeferredStop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

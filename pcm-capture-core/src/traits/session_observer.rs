use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureSummary;
use crate::models::state::PipelineState;

/// Event observer for capture pipeline notifications.
///
/// Methods run on whichever control thread drives the transition (the caller
/// of `start`/`join`, or a thread holding a `StopHandle`), never on the
/// capture thread. Loop errors are reported only once the capture thread has
/// been joined.
pub trait SessionObserver: Send + Sync {
    /// Called when the pipeline state changes.
    fn on_state_changed(&self, state: PipelineState);

    /// Called when a session ends with an error.
    fn on_error(&self, error: &CaptureError);

    /// Called when capture completes and the file is closed.
    fn on_capture_finished(&self, summary: &CaptureSummary);
}

use std::fmt;

/// Capture pipeline state machine.
///
/// State transitions:
/// ```text
/// idle → starting → recording → stopping → stopped
///           ↓
///         idle (start failed, nothing held)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Stopped,
}

impl PipelineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Whether a capture thread exists that has not been joined yet.
    pub fn has_capture_thread(&self) -> bool {
        matches!(self, Self::Recording | Self::Stopping)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

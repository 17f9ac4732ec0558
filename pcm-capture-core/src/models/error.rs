use std::fmt;

use thiserror::Error;

use super::audio_models::{ChannelLayout, SampleFormat};
use super::state::PipelineState;

/// Raw status codes a device may return from `read`.
///
/// Values follow the conventional `AudioRecord` status codes, so backends
/// bridging such an API can pass them through untouched.
pub mod read_codes {
    pub const ERROR: i32 = -1;
    pub const BAD_VALUE: i32 = -2;
    pub const INVALID_OPERATION: i32 = -3;
    pub const DEAD_OBJECT: i32 = -6;
}

/// Rejected recording configuration, detected before any device is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported format: {sample_rate_hz} Hz {channel_layout} {sample_format}")]
    Unsupported {
        sample_rate_hz: u32,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    },

    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("safety factor must be at least 1")]
    InvalidSafetyFactor,

    #[error("transfer chunk size overflows: {minimum} bytes x {factor}")]
    ChunkOverflow { minimum: usize, factor: u32 },

    #[error("transfer chunk too large: {bytes} bytes (limit {max})")]
    ChunkTooLarge { bytes: usize, max: usize },
}

/// Failure to open or start the capture device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquireError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("device busy")]
    Busy,

    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Classified device read failure.
///
/// Closed over the codes in [`read_codes`]; anything else keeps its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadFailure {
    InvalidOperation,
    BadValue,
    DeadObject,
    Error,
    Unknown(i32),
}

impl ReadFailure {
    pub fn from_code(code: i32) -> Self {
        match code {
            read_codes::INVALID_OPERATION => Self::InvalidOperation,
            read_codes::BAD_VALUE => Self::BadValue,
            read_codes::DEAD_OBJECT => Self::DeadObject,
            read_codes::ERROR => Self::Error,
            other => Self::Unknown(other),
        }
    }

    /// The raw device code this failure corresponds to.
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidOperation => read_codes::INVALID_OPERATION,
            Self::BadValue => read_codes::BAD_VALUE,
            Self::DeadObject => read_codes::DEAD_OBJECT,
            Self::Error => read_codes::ERROR,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperation => f.write_str("ERROR_INVALID_OPERATION"),
            Self::BadValue => f.write_str("ERROR_BAD_VALUE"),
            Self::DeadObject => f.write_str("ERROR_DEAD_OBJECT"),
            Self::Error => f.write_str("ERROR"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Errors that can occur during capture operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(#[from] AcquireError),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("reading of audio buffer failed: {reason}")]
    DeviceReadFailed { reason: ReadFailure },

    #[error("capture thread panicked")]
    CaptureThreadPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(ReadFailure::from_code(-1), ReadFailure::Error);
        assert_eq!(ReadFailure::from_code(-2), ReadFailure::BadValue);
        assert_eq!(ReadFailure::from_code(-3), ReadFailure::InvalidOperation);
        assert_eq!(ReadFailure::from_code(-6), ReadFailure::DeadObject);
    }

    #[test]
    fn unknown_code_keeps_raw_value() {
        let failure = ReadFailure::from_code(-42);
        assert_eq!(failure, ReadFailure::Unknown(-42));
        assert_eq!(failure.code(), -42);
        assert_eq!(failure.to_string(), "unknown (-42)");
    }

    #[test]
    fn read_failure_message_names_the_reason() {
        let err = CaptureError::DeviceReadFailed {
            reason: ReadFailure::DeadObject,
        };
        assert_eq!(
            err.to_string(),
            "reading of audio buffer failed: ERROR_DEAD_OBJECT"
        );
    }

    #[test]
    fn invalid_state_message() {
        let err = CaptureError::InvalidState {
            operation: "start",
            state: PipelineState::Recording,
        };
        assert_eq!(err.to_string(), "cannot start while recording");
    }
}

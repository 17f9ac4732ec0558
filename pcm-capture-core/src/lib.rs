//! # pcm-capture-core
//!
//! Platform-agnostic raw PCM capture core.
//!
//! Sizes a transfer chunk from the driver's minimum buffer, then runs a
//! dedicated capture thread that moves fixed-size chunks from a blocking
//! capture device into a headerless PCM file until a shared stop flag is set.
//! Platform backends implement `CaptureBackend`/`CaptureDevice` and plug into
//! the generic `CapturePipeline`.
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, SessionObserver
//! ├── models/       ← RecordingConfig, CaptureError, PipelineState, CaptureSummary, etc.
//! ├── processing/   ← TransferChunkSize sizing, frame-aligned RingBuffer
//! ├── session/      ← CapturePipeline, StopHandle, DeferredStop
//! └── storage/      ← PcmFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{ChannelLayout, SampleFormat};
pub use models::config::RecordingConfig;
pub use models::error::{read_codes, AcquireError, CaptureError, ConfigError, ReadFailure};
pub use models::recording_result::{CaptureSummary, RecordingMetadata};
pub use models::state::PipelineState;
pub use processing::buffer_sizer::TransferChunkSize;
pub use processing::ring_buffer::RingBuffer;
pub use session::deferred_stop::DeferredStop;
pub use session::pipeline::{CapturePipeline, StopHandle};
pub use storage::pcm_writer::PcmFileWriter;
pub use traits::capture_device::{CaptureBackend, CaptureDevice};
pub use traits::session_observer::SessionObserver;

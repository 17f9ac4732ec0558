//! # pcm-capture-cpal
//!
//! Cross-platform microphone backend for pcm-capture-core, built on cpal.
//!
//! Provides:
//! - `CpalBackend`: buffer sizing and device acquisition for an input device
//! - `CpalCaptureDevice`: an input stream exposed as a blocking byte source
//! - `DeviceEnumerator`: input device enumeration on the default host
//!
//! ## Usage
//! ```ignore
//! use pcm_capture_core::{CapturePipeline, RecordingConfig};
//! use pcm_capture_cpal::CpalBackend;
//!
//! let mut pipeline = CapturePipeline::new(CpalBackend::default_device());
//! pipeline.start(RecordingConfig::default(), "capture.pcm")?;
//! // ...
//! let summary = pipeline.stop_and_wait()?;
//! ```

pub mod capture_queue;
pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::{CpalBackend, CpalCaptureDevice};
pub use device_enumerator::{DeviceEnumerator, InputDeviceInfo};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::{ChannelLayout, SampleFormat};
use super::config::RecordingConfig;

/// Result returned when a capture session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub file_path: PathBuf,
    pub config: RecordingConfig,
    /// Fixed transfer chunk size used for every cycle.
    pub chunk_bytes: usize,
    /// Completed read/write cycles, including short ones.
    pub cycles: u64,
    /// Cycles where the device returned fewer bytes than a full chunk.
    pub short_reads: u64,
    pub bytes_written: u64,
    /// SHA-256 hex digest of every byte written to the file.
    pub checksum: String,
}

impl CaptureSummary {
    pub fn duration_secs(&self) -> f64 {
        let byte_rate = self.config.byte_rate();
        if byte_rate == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / byte_rate as f64
    }
}

/// Out-of-band description of a headerless recording.
///
/// Serializable for a JSON sidecar next to the PCM file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub sample_rate_hz: u32,
    pub channel_layout: ChannelLayout,
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub bits_per_sample: u16,
    pub safety_factor: u32,
    pub chunk_bytes: usize,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn from_summary(summary: &CaptureSummary) -> Self {
        let config = &summary.config;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: summary.file_path.to_string_lossy().into_owned(),
            sample_rate_hz: config.sample_rate_hz,
            channel_layout: config.channel_layout,
            channels: config.channel_count(),
            sample_format: config.sample_format,
            bits_per_sample: config.sample_format.bits_per_sample(),
            safety_factor: config.safety_factor,
            chunk_bytes: summary.chunk_bytes,
            bytes_written: summary.bytes_written,
            duration_secs: summary.duration_secs(),
            checksum: summary.checksum.clone(),
        }
    }
}

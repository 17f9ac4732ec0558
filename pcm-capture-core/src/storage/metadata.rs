use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for a recording: `{recording_path}.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    let mut name = recording_path.as_os_str().to_owned();
    name.push(".metadata.json");
    PathBuf::from(name)
}

/// Write recording metadata as a JSON sidecar file.
///
/// The PCM stream has no header, so this is how the format travels with it.
pub fn write_metadata(
    metadata: &RecordingMetadata,
    recording_path: &Path,
) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::Io(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| CaptureError::Io(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| CaptureError::Io(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::Io(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::RecordingConfig;
    use crate::models::recording_result::CaptureSummary;

    #[test]
    fn sidecar_sits_next_to_recording() {
        let path = metadata_path(Path::new("/data/recording.pcm"));
        assert_eq!(path, PathBuf::from("/data/recording.pcm.metadata.json"));
    }

    #[test]
    fn write_then_read_back() {
        let recording =
            std::env::temp_dir().join(format!("metadata_test_{}.pcm", uuid::Uuid::new_v4()));
        let summary = CaptureSummary {
            file_path: recording.clone(),
            config: RecordingConfig::default(),
            chunk_bytes: 3528,
            cycles: 3,
            short_reads: 1,
            bytes_written: 9000,
            checksum: "deadbeef".into(),
        };
        let metadata = RecordingMetadata::from_summary(&summary);

        let written = write_metadata(&metadata, &recording).unwrap();
        let json = fs::read_to_string(&written).unwrap();
        assert!(json.contains("\"sample_format\": \"s16le\""));
        assert!(json.contains("\"channel_layout\": \"mono\""));

        assert_eq!(read_metadata(&recording).unwrap(), metadata);
        fs::remove_file(&written).ok();
    }

    #[test]
    fn missing_sidecar_is_io_error() {
        let recording =
            std::env::temp_dir().join(format!("metadata_missing_{}.pcm", uuid::Uuid::new_v4()));
        assert!(matches!(read_metadata(&recording), Err(CaptureError::Io(_))));
    }
}

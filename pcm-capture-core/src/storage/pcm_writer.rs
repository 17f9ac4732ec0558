use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;

/// Strict-append writer for a headerless PCM stream.
///
/// ## File Format
///
/// ```text
/// [chunk 1 bytes][chunk 2 bytes]...[final, possibly short, chunk]
/// ```
///
/// Writes go straight to the `File` with no user-space buffering. A SHA-256
/// digest of everything written is kept as the stream goes, so closing does
/// not need to re-read the file.
pub struct PcmFileWriter {
    file_path: PathBuf,
    file: Option<File>,
    hasher: Sha256,
    total_bytes_written: u64,
}

impl PcmFileWriter {
    /// Create (or truncate) the output file.
    pub fn create(file_path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::Io(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&file_path).map_err(|e| {
            CaptureError::Io(format!("failed to create {}: {}", file_path.display(), e))
        })?;

        Ok(Self {
            file_path,
            file: Some(file),
            hasher: Sha256::new(),
            total_bytes_written: 0,
        })
    }

    /// Append `data` in full.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Io("file is not open for writing".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::Io(format!("writing of recorded audio failed: {}", e)))?;
        self.hasher.update(data);
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush to durable storage and close the file.
    ///
    /// Returns the SHA-256 hex digest of the written stream.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::Io("file is not open".into()))?;
        file.flush()
            .map_err(|e| CaptureError::Io(format!("flush failed: {}", e)))?;
        file.sync_all()
            .map_err(|e| CaptureError::Io(format!("sync failed: {}", e)))?;
        drop(file);

        Ok(hex_encode(&self.hasher.finalize_reset()))
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

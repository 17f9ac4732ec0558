//! Input device enumeration via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};

use pcm_capture_core::models::error::AcquireError;

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Audio device enumerator over the platform's default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input devices with readable names.
    pub fn list_input_devices(&self) -> Result<Vec<InputDeviceInfo>, AcquireError> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let devices = self
            .host
            .input_devices()
            .map_err(|e| AcquireError::Backend(format!("failed to enumerate devices: {}", e)))?
            .filter_map(|d| d.name().ok())
            .map(|name| InputDeviceInfo {
                is_default: name == default_name,
                name,
            })
            .collect();

        Ok(devices)
    }

    pub fn default_input_device(&self) -> Result<cpal::Device, AcquireError> {
        self.host
            .default_input_device()
            .ok_or_else(|| AcquireError::NotFound("no default input device".into()))
    }

    /// Find an input device by exact name.
    pub fn find_input_device(&self, name: &str) -> Result<cpal::Device, AcquireError> {
        self.host
            .input_devices()
            .map_err(|e| AcquireError::Backend(format!("failed to enumerate devices: {}", e)))?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .ok_or_else(|| AcquireError::NotFound(format!("input device '{}'", name)))
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

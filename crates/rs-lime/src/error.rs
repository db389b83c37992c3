//! Error types for rs-lime operations.

use thiserror::Error;

use crate::stream::SampleFormat;

/// Result type for rs-lime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during LimeSDR operations.
///
/// Every failed native call carries the entry-point name and the text
/// reported by `LMS_GetLastErrorMessage`, which is the driver's only
/// failure channel.
#[derive(Debug, Error)]
pub enum Error {
    /// libLimeSuite could not be loaded.
    #[error("libLimeSuite not found - install the LimeSuite package")]
    LibraryNotFound,

    /// No LimeSDR device found during enumeration.
    #[error("No LimeSDR device found")]
    DeviceNotFound,

    /// Failed to open a device.
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// A native call returned a non-zero status.
    #[error("{func} failed: {message}")]
    Call {
        /// Native entry point that failed.
        func: &'static str,
        /// Driver's last-error message at the time of failure.
        message: String,
    },

    /// Stream setup failed.
    #[error("Stream setup failed: {0}")]
    StreamSetupFailed(String),

    /// Operation requires a running stream.
    #[error("Stream not running")]
    StreamInactive,

    /// Typed recv/send call does not match the configured wire format.
    #[error("Sample format mismatch: stream is configured as {0:?}")]
    FormatMismatch(SampleFormat),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a [`Error::Call`] from a failed entry point, capturing the
    /// driver's last-error message.
    pub(crate) fn call(func: &'static str) -> Self {
        Error::Call {
            func,
            message: crate::ffi::last_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_display() {
        let err = Error::Call {
            func: "LMS_SetLOFrequency",
            message: "out of range".to_string(),
        };
        assert_eq!(err.to_string(), "LMS_SetLOFrequency failed: out of range");
    }

    #[test]
    fn test_format_mismatch_display() {
        let err = Error::FormatMismatch(SampleFormat::I16);
        assert!(err.to_string().contains("I16"));
    }

    #[test]
    fn test_device_not_found_display() {
        assert_eq!(Error::DeviceNotFound.to_string(), "No LimeSDR device found");
    }
}

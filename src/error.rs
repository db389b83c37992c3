//! Error handling for the limeade library
//!
//! This module provides a unified error type for all operations in the
//! limeade library, covering I/O, driver-level failures reported by
//! libLimeSuite, and device configuration errors.

use std::fmt;
use std::io;

/// A specialized Result type for limeade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for limeade operations
#[derive(Debug)]
pub enum Error {
    /// I/O error (file operations, etc.)
    Io(io::Error),

    /// Driver-level error reported by libLimeSuite
    Driver(rs_lime::Error),

    /// Device configuration or initialization error
    Device(String),

    /// Generic error with custom message
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Driver(err) => write!(f, "Driver error: {}", err),
            Error::Device(msg) => write!(f, "Device error: {}", msg),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Driver(err) => Some(err),
            _ => None,
        }
    }
}

// From conversions for common error types

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<rs_lime::Error> for Error {
    fn from(err: rs_lime::Error) -> Self {
        Error::Driver(err)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

// Helper constructors for common error scenarios

impl Error {
    /// Create a device error with a custom message
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Error::Device(msg.into())
    }

    /// Create a generic error with a custom message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_driver_error_conversion() {
        let err: Error = rs_lime::Error::DeviceNotFound.into();
        assert!(matches!(err, Error::Driver(_)));
        assert!(err.to_string().contains("Driver error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_string_conversion() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_device_error_constructor() {
        let err = Error::device("initialization failed");
        assert!(matches!(err, Error::Device(_)));
        assert_eq!(err.to_string(), "Device error: initialization failed");
    }

    #[test]
    fn test_error_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.source().is_some());
        assert!(Error::Device("x".to_string()).source().is_none());
    }
}

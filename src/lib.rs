#![doc = include_str!("../readme.md")]

pub mod error;
pub mod limesdr;

pub use error::{Error, Result};
pub use limesdr::{
    enumerate_devices, AsyncLimeSdrReader, DeviceSelector, LimeSdrConfig, LimeSdrReader,
    LimeSdrWriter,
};

// Re-export the low-level driver crate for direct device access.
pub use rs_lime;

/**
 * Gain configuration
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gain {
    /// Leave the gain at the device/configuration-file default
    Auto,
    /// Combined gain in dB
    Manual(f64),
}

impl Default for Gain {
    fn default() -> Self {
        Gain::Auto
    }
}

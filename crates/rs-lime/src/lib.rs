//! Rust interface to LimeSDR devices through the LimeSuite driver library.
//!
//! # Overview
//!
//! `rs-lime` wraps the `LMS_*` C API of libLimeSuite — device enumeration,
//! configuration, and timestamped sample streaming — behind safe Rust types.
//! The library is loaded at runtime, so this crate builds and runs on
//! machines without LimeSuite installed; operations then report
//! [`Error::LibraryNotFound`].
//!
//! All USB transport, FPGA control, and the streaming engine live inside
//! libLimeSuite. This crate marshals arguments across the C boundary and
//! turns non-zero status codes into [`Error`] values carrying the driver's
//! last-error message.
//!
//! # Example
//!
//! ```no_run
//! use rs_lime::LimeDevice;
//!
//! let device = LimeDevice::open_first()?;
//! device.init()?;
//! println!("Chip temperature: {:.1} C", device.chip_temperature()?);
//! # Ok::<(), rs_lime::Error>(())
//! ```

pub mod device;
pub mod error;
pub mod ffi;
pub mod stream;

pub use device::{enumerate_devices, DeviceInfo, LimeDevice, LimeDeviceInfo};
pub use error::{Error, Result};
pub use ffi::{is_available, library_version};
pub use stream::{LimeStream, SampleFormat, StreamConfig, StreamMeta, StreamStatus};

/// Stream and channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Receive (device to host)
    Rx,
    /// Transmit (host to device)
    Tx,
}

impl Direction {
    /// The boolean `dir_tx` flag used by every directional `LMS_*` call.
    pub(crate) fn is_tx(self) -> bool {
        matches!(self, Direction::Tx)
    }
}

/// Number of RF channels per direction on LMS7002M-based boards.
pub const MAX_CHANNELS: usize = 2;

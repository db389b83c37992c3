//! LimeSDR device handle: enumeration, lifecycle, and channel configuration.

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use crate::error::{Error, Result};
use crate::ffi::{self, LmsDeviceHandle, LmsInfoStr, LmsName};
use crate::stream::{LimeStream, StreamConfig};
use crate::Direction;

/// Device information parsed from an `lms_info_str_t` connection string.
///
/// The driver formats these as
/// `LimeSDR-USB, media=USB 3.0, module=FX3, addr=1d50:6108, serial=...`;
/// the raw string is kept verbatim because `LMS_Open` expects it back
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Board name (e.g. "LimeSDR-USB", "LimeSDR Mini").
    pub name: String,
    /// Connection media (e.g. "USB 3.0").
    pub media: String,
    /// Driver module (e.g. "FX3").
    pub module: String,
    /// Bus address.
    pub addr: String,
    /// Board serial number.
    pub serial: String,
    /// The unmodified connection string.
    pub raw: String,
}

impl DeviceInfo {
    /// Parse a connection string into its labelled fields.
    pub fn parse(raw: &str) -> Self {
        let mut info = DeviceInfo {
            name: String::new(),
            media: String::new(),
            module: String::new(),
            addr: String::new(),
            serial: String::new(),
            raw: raw.to_string(),
        };

        for (i, part) in raw.split(',').enumerate() {
            let part = part.trim();
            if i == 0 {
                info.name = part.to_string();
                continue;
            }
            if let Some(pos) = part.find('=') {
                let key = &part[..pos];
                let value = part[pos + 1..].to_string();
                match key {
                    "media" => info.media = value,
                    "module" => info.module = value,
                    "addr" => info.addr = value,
                    "serial" => info.serial = value,
                    _ => {}
                }
            }
        }

        info
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (serial: {})", self.name, self.serial)
    }
}

/// Enumerate connected LimeSDR devices.
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;

    let count = unsafe { (lib.get_device_list)(ptr::null_mut()) };
    if count < 0 {
        return Err(Error::call("LMS_GetDeviceList"));
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut list: Vec<LmsInfoStr> = vec![[0; 256]; count as usize];
    let filled = unsafe { (lib.get_device_list)(list.as_mut_ptr()) };
    if filled < 0 {
        return Err(Error::call("LMS_GetDeviceList"));
    }

    Ok(list
        .iter()
        .take(filled as usize)
        .map(|entry| DeviceInfo::parse(&ffi::char_array_to_string(entry)))
        .collect())
}

/// Board identification read through `LMS_GetDeviceInfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimeDeviceInfo {
    pub device_name: String,
    pub expansion_name: String,
    pub firmware_version: String,
    pub hardware_version: String,
    pub protocol_version: String,
    pub gateware_version: String,
    pub gateware_target_board: String,
    pub board_serial_number: u64,
}

/// An open LimeSDR device.
///
/// The handle is an opaque pointer owned by libLimeSuite; dropping the
/// `LimeDevice` closes it. Streams created from a device must be dropped
/// before the device itself.
pub struct LimeDevice {
    handle: LmsDeviceHandle,
    info: DeviceInfo,
}

// SAFETY: libLimeSuite device handles may be used from any thread; the
// driver serializes access internally.
unsafe impl Send for LimeDevice {}

impl LimeDevice {
    /// Open the first available LimeSDR device.
    pub fn open_first() -> Result<Self> {
        let devices = enumerate_devices()?;
        let info = devices.first().ok_or(Error::DeviceNotFound)?;
        Self::open(info)
    }

    /// Open the device with the given serial number.
    pub fn open_by_serial(serial: &str) -> Result<Self> {
        let devices = enumerate_devices()?;
        let info = devices
            .iter()
            .find(|d| d.serial == serial)
            .ok_or(Error::DeviceNotFound)?;
        Self::open(info)
    }

    /// Open a device from enumeration info.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;

        let info_cstr = CString::new(info.raw.as_str())
            .map_err(|_| Error::InvalidConfig("Connection string contains NUL".to_string()))?;

        let mut handle: LmsDeviceHandle = ptr::null_mut();
        let ret = unsafe { (lib.open)(&mut handle, info_cstr.as_ptr(), ptr::null_mut()) };
        if ret != 0 || handle.is_null() {
            return Err(Error::OpenFailed(ffi::last_error()));
        }

        tracing::info!("Opened LimeSDR device: {}", info);

        Ok(Self {
            handle,
            info: info.clone(),
        })
    }

    /// Enumeration info this device was opened from.
    pub fn connection_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Initialize the device with default settings (`LMS_Init`).
    pub fn init(&self) -> Result<()> {
        self.simple_call("LMS_Init", |lib| unsafe { (lib.init)(self.handle) })
    }

    /// Reset the device (`LMS_Reset`).
    pub fn reset(&self) -> Result<()> {
        self.simple_call("LMS_Reset", |lib| unsafe { (lib.reset)(self.handle) })
    }

    /// Load a LimeSuite configuration file (.ini) into the device.
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_cstr = path_to_cstring(path.as_ref())?;
        self.simple_call("LMS_LoadConfig", |lib| unsafe {
            (lib.load_config)(self.handle, path_cstr.as_ptr())
        })
    }

    /// Save the current device configuration to a file.
    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_cstr = path_to_cstring(path.as_ref())?;
        self.simple_call("LMS_SaveConfig", |lib| unsafe {
            (lib.save_config)(self.handle, path_cstr.as_ptr())
        })
    }

    /// Read the LMS7002M chip temperature in degrees Celsius.
    pub fn chip_temperature(&self) -> Result<f64> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut temp = 0.0f64;
        let ret = unsafe { (lib.get_chip_temperature)(self.handle, 0, &mut temp) };
        if ret != 0 {
            return Err(Error::call("LMS_GetChipTemperature"));
        }
        Ok(temp)
    }

    /// Read board identification (names, versions, serial).
    pub fn device_info(&self) -> Result<LimeDeviceInfo> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let ptr = unsafe { (lib.get_device_info)(self.handle) };
        if ptr.is_null() {
            return Err(Error::call("LMS_GetDeviceInfo"));
        }
        let raw = unsafe { &*ptr };
        Ok(LimeDeviceInfo {
            device_name: ffi::char_array_to_string(&raw.device_name),
            expansion_name: ffi::char_array_to_string(&raw.expansion_name),
            firmware_version: ffi::char_array_to_string(&raw.firmware_version),
            hardware_version: ffi::char_array_to_string(&raw.hardware_version),
            protocol_version: ffi::char_array_to_string(&raw.protocol_version),
            gateware_version: ffi::char_array_to_string(&raw.gateware_version),
            gateware_target_board: ffi::char_array_to_string(&raw.gateware_target_board),
            board_serial_number: raw.board_serial_number,
        })
    }

    /// Number of RF channels for the given direction.
    pub fn num_channels(&self, direction: Direction) -> Result<usize> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let ret = unsafe { (lib.get_num_channels)(self.handle, direction.is_tx()) };
        if ret < 0 {
            return Err(Error::call("LMS_GetNumChannels"));
        }
        Ok(ret as usize)
    }

    /// Enable or disable an RF channel.
    pub fn enable_channel(&self, direction: Direction, channel: usize, enabled: bool) -> Result<()> {
        self.simple_call("LMS_EnableChannel", |lib| unsafe {
            (lib.enable_channel)(self.handle, direction.is_tx(), channel, enabled)
        })
    }

    /// Set the sampling rate for all channels, in samples per second.
    ///
    /// `oversample` selects the RF oversampling ratio (0 lets the driver
    /// choose).
    pub fn set_sample_rate(&self, rate: f64, oversample: usize) -> Result<()> {
        self.simple_call("LMS_SetSampleRate", |lib| unsafe {
            (lib.set_sample_rate)(self.handle, rate, oversample)
        })
    }

    /// Get the sampling rate of a channel as `(host_hz, rf_hz)`.
    pub fn sample_rate(&self, direction: Direction, channel: usize) -> Result<(f64, f64)> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut host = 0.0f64;
        let mut rf = 0.0f64;
        let ret = unsafe {
            (lib.get_sample_rate)(self.handle, direction.is_tx(), channel, &mut host, &mut rf)
        };
        if ret != 0 {
            return Err(Error::call("LMS_GetSampleRate"));
        }
        Ok((host, rf))
    }

    /// Set the RF center frequency in Hz.
    pub fn set_frequency(&self, direction: Direction, channel: usize, freq_hz: f64) -> Result<()> {
        self.simple_call("LMS_SetLOFrequency", |lib| unsafe {
            (lib.set_lo_frequency)(self.handle, direction.is_tx(), channel, freq_hz)
        })
    }

    /// Get the RF center frequency in Hz.
    pub fn frequency(&self, direction: Direction, channel: usize) -> Result<f64> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut freq = 0.0f64;
        let ret = unsafe {
            (lib.get_lo_frequency)(self.handle, direction.is_tx(), channel, &mut freq)
        };
        if ret != 0 {
            return Err(Error::call("LMS_GetLOFrequency"));
        }
        Ok(freq)
    }

    /// Set combined gain in dB (0..=73 for RX, 0..=52 for TX).
    pub fn set_gain_db(&self, direction: Direction, channel: usize, gain_db: u32) -> Result<()> {
        self.simple_call("LMS_SetGaindB", |lib| unsafe {
            (lib.set_gain_db)(self.handle, direction.is_tx(), channel, gain_db)
        })
    }

    /// Get combined gain in dB.
    pub fn gain_db(&self, direction: Direction, channel: usize) -> Result<u32> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut gain = 0u32;
        let ret = unsafe { (lib.get_gain_db)(self.handle, direction.is_tx(), channel, &mut gain) };
        if ret != 0 {
            return Err(Error::call("LMS_GetGaindB"));
        }
        Ok(gain)
    }

    /// Set gain as a normalized value in 0.0..=1.0.
    pub fn set_normalized_gain(&self, direction: Direction, channel: usize, gain: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(Error::InvalidConfig(format!(
                "Normalized gain {} outside 0.0..=1.0",
                gain
            )));
        }
        self.simple_call("LMS_SetNormalizedGain", |lib| unsafe {
            (lib.set_normalized_gain)(self.handle, direction.is_tx(), channel, gain)
        })
    }

    /// Get gain as a normalized value in 0.0..=1.0.
    pub fn normalized_gain(&self, direction: Direction, channel: usize) -> Result<f64> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut gain = 0.0f64;
        let ret = unsafe {
            (lib.get_normalized_gain)(self.handle, direction.is_tx(), channel, &mut gain)
        };
        if ret != 0 {
            return Err(Error::call("LMS_GetNormalizedGain"));
        }
        Ok(gain)
    }

    /// Select an antenna port by index (see [`LimeDevice::antenna_list`]).
    pub fn set_antenna(&self, direction: Direction, channel: usize, index: usize) -> Result<()> {
        self.simple_call("LMS_SetAntenna", |lib| unsafe {
            (lib.set_antenna)(self.handle, direction.is_tx(), channel, index)
        })
    }

    /// Currently selected antenna port index.
    pub fn antenna(&self, direction: Direction, channel: usize) -> Result<usize> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let ret = unsafe { (lib.get_antenna)(self.handle, direction.is_tx(), channel) };
        if ret < 0 {
            return Err(Error::call("LMS_GetAntenna"));
        }
        Ok(ret as usize)
    }

    /// List antenna port names; the position of a name is its index.
    pub fn antenna_list(&self, direction: Direction, channel: usize) -> Result<Vec<String>> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;

        // First call with a null list returns the count.
        let count = unsafe {
            (lib.get_antenna_list)(self.handle, direction.is_tx(), channel, ptr::null_mut())
        };
        if count < 0 {
            return Err(Error::call("LMS_GetAntennaList"));
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut names: Vec<LmsName> = vec![[0; 16]; count as usize];
        let filled = unsafe {
            (lib.get_antenna_list)(self.handle, direction.is_tx(), channel, names.as_mut_ptr())
        };
        if filled < 0 {
            return Err(Error::call("LMS_GetAntennaList"));
        }

        Ok(names
            .iter()
            .take(filled as usize)
            .map(|n| ffi::char_array_to_string(n))
            .collect())
    }

    /// Set the analog low-pass filter bandwidth in Hz.
    pub fn set_lpf_bandwidth(&self, direction: Direction, channel: usize, bw_hz: f64) -> Result<()> {
        self.simple_call("LMS_SetLPFBW", |lib| unsafe {
            (lib.set_lpf_bw)(self.handle, direction.is_tx(), channel, bw_hz)
        })
    }

    /// Get the analog low-pass filter bandwidth in Hz.
    pub fn lpf_bandwidth(&self, direction: Direction, channel: usize) -> Result<f64> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut bw = 0.0f64;
        let ret = unsafe { (lib.get_lpf_bw)(self.handle, direction.is_tx(), channel, &mut bw) };
        if ret != 0 {
            return Err(Error::call("LMS_GetLPFBW"));
        }
        Ok(bw)
    }

    /// Run the automatic DC/IQ calibration procedure for a channel.
    ///
    /// `bandwidth_hz` is the bandwidth to calibrate for; the channel must
    /// already be tuned and the sample rate set.
    pub fn calibrate(&self, direction: Direction, channel: usize, bandwidth_hz: f64) -> Result<()> {
        self.simple_call("LMS_Calibrate", |lib| unsafe {
            (lib.calibrate)(self.handle, direction.is_tx(), channel, bandwidth_hz, 0)
        })
    }

    /// Set up a receive stream on the given channel.
    pub fn rx_stream(&self, config: &StreamConfig) -> Result<LimeStream> {
        LimeStream::setup(self.handle, Direction::Rx, config)
    }

    /// Set up a transmit stream on the given channel.
    pub fn tx_stream(&self, config: &StreamConfig) -> Result<LimeStream> {
        LimeStream::setup(self.handle, Direction::Tx, config)
    }

    /// Run a status-returning native call, mapping non-zero to an error.
    fn simple_call<F>(&self, func: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&'static ffi::LimeSuiteLib) -> i32,
    {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        if f(lib) != 0 {
            return Err(Error::call(func));
        }
        Ok(())
    }
}

impl Drop for LimeDevice {
    fn drop(&mut self) {
        if let Some(lib) = ffi::get_lib() {
            tracing::debug!("Closing LimeSDR device: {}", self.info);
            unsafe { (lib.close)(self.handle) };
        }
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let s = path
        .to_str()
        .ok_or_else(|| Error::InvalidConfig("Path is not valid UTF-8".to_string()))?;
    CString::new(s).map_err(|_| Error::InvalidConfig("Path contains NUL".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_info_string() {
        let raw = "LimeSDR-USB, media=USB 3.0, module=FX3, addr=1d50:6108, serial=0009060B00473718";
        let info = DeviceInfo::parse(raw);
        assert_eq!(info.name, "LimeSDR-USB");
        assert_eq!(info.media, "USB 3.0");
        assert_eq!(info.module, "FX3");
        assert_eq!(info.addr, "1d50:6108");
        assert_eq!(info.serial, "0009060B00473718");
        assert_eq!(info.raw, raw);
    }

    #[test]
    fn test_parse_name_only() {
        let info = DeviceInfo::parse("LimeSDR Mini");
        assert_eq!(info.name, "LimeSDR Mini");
        assert!(info.serial.is_empty());
        assert!(info.media.is_empty());
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let info = DeviceInfo::parse("LimeNET-Micro, media=PCIe, index=3");
        assert_eq!(info.media, "PCIe");
        assert!(info.addr.is_empty());
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::parse("LimeSDR-USB, serial=00090605");
        assert_eq!(info.to_string(), "LimeSDR-USB (serial: 00090605)");
    }

    #[test]
    fn test_enumerate_without_library() {
        // On machines without libLimeSuite the call must fail cleanly,
        // never crash.
        match enumerate_devices() {
            Ok(devices) => {
                println!("Found {} LimeSDR devices", devices.len());
                for dev in &devices {
                    println!("  - {}", dev);
                }
            }
            Err(Error::LibraryNotFound) => {
                println!("libLimeSuite not available (expected on most dev machines)");
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

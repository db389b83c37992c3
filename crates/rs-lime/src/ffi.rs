//! Low-level FFI bindings to libLimeSuite.
//!
//! This module uses dynamic loading (libloading) to avoid a compile-time
//! dependency on libLimeSuite. The library is loaded at runtime, allowing
//! the same binary to work with or without LimeSDR hardware support
//! installed.
//!
//! The structs and function signatures declared here are owned and
//! versioned by the LimeSuite project; this module re-declares them
//! `#[repr(C)]` for marshalling only.
//!
//! ## Sample Formats
//!
//! The streaming API accepts three wire formats: 32-bit float I/Q
//! ([`LMS_FMT_F32`]), 16-bit integer I/Q ([`LMS_FMT_I16`]), and packed
//! 12-bit integer I/Q ([`LMS_FMT_I12`], delivered in 16-bit containers).

// Struct names mirror LimeSuite.h.
#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_double, c_float, c_int, c_uint, c_void, CStr};
use std::sync::OnceLock;

use libloading::{Library, Symbol};

/// LimeSuite device handle (opaque pointer).
pub type LmsDeviceHandle = *mut c_void;

/// Connection info string (`lms_info_str_t`).
pub type LmsInfoStr = [c_char; 256];

/// Short name string (`lms_name_t`), used for antenna lists.
pub type LmsName = [c_char; 16];

/// Boolean direction flag: receive.
pub const LMS_CH_RX: bool = false;
/// Boolean direction flag: transmit.
pub const LMS_CH_TX: bool = true;

/// Stream format: 32-bit float I/Q.
pub const LMS_FMT_F32: c_int = 0;
/// Stream format: 16-bit integer I/Q.
pub const LMS_FMT_I16: c_int = 1;
/// Stream format: packed 12-bit integer I/Q.
pub const LMS_FMT_I12: c_int = 2;

/// Stream descriptor (`lms_stream_t`).
///
/// `handle` is written by `LMS_SetupStream` and identifies the stream to
/// the driver; the remaining fields are configuration supplied by the
/// caller. The struct address must stay stable between setup and destroy.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct lms_stream_t {
    pub handle: usize,
    pub is_tx: bool,
    pub channel: u32,
    pub fifo_size: u32,
    pub throughput_vs_latency: c_float,
    pub data_fmt: c_int,
}

/// Streaming metadata (`lms_stream_meta_t`): hardware timestamp plus
/// synchronization flags.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct lms_stream_meta_t {
    pub timestamp: u64,
    pub wait_for_timestamp: bool,
    pub flush_partial_packet: bool,
}

/// Stream status (`lms_stream_status_t`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct lms_stream_status_t {
    pub active: bool,
    pub fifo_filled_count: u32,
    pub fifo_size: u32,
    pub underrun: u32,
    pub overrun: u32,
    pub dropped_packets: u32,
    pub sample_rate: c_double,
    pub link_rate: c_double,
    pub timestamp: u64,
}

/// Device information (`lms_dev_info_t`), returned by `LMS_GetDeviceInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct lms_dev_info_t {
    pub device_name: [c_char; 32],
    pub expansion_name: [c_char; 32],
    pub firmware_version: [c_char; 16],
    pub hardware_version: [c_char; 16],
    pub protocol_version: [c_char; 16],
    pub board_serial_number: u64,
    pub gateware_version: [c_char; 16],
    pub gateware_target_board: [c_char; 32],
}

/// Loaded libLimeSuite library and function pointers.
pub(crate) struct LimeSuiteLib {
    _lib: Library,
    // Device enumeration and lifecycle
    pub get_device_list: Symbol<'static, unsafe extern "C" fn(*mut LmsInfoStr) -> c_int>,
    pub open: Symbol<'static, unsafe extern "C" fn(*mut LmsDeviceHandle, *const c_char, *mut c_void) -> c_int>,
    pub close: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle) -> c_int>,
    pub init: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle) -> c_int>,
    pub reset: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle) -> c_int>,
    // Channels
    pub enable_channel: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, bool) -> c_int>,
    pub get_num_channels: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool) -> c_int>,
    // Sample rate
    pub set_sample_rate: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, c_double, usize) -> c_int>,
    pub get_sample_rate: Symbol<
        'static,
        unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut c_double, *mut c_double) -> c_int,
    >,
    // Frequency
    pub set_lo_frequency: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, c_double) -> c_int>,
    pub get_lo_frequency: Symbol<
        'static,
        unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut c_double) -> c_int,
    >,
    // Gain
    pub set_normalized_gain: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, c_double) -> c_int>,
    pub get_normalized_gain: Symbol<
        'static,
        unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut c_double) -> c_int,
    >,
    pub set_gain_db: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, c_uint) -> c_int>,
    pub get_gain_db: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut c_uint) -> c_int>,
    // Antenna
    pub set_antenna: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, usize) -> c_int>,
    pub get_antenna: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize) -> c_int>,
    pub get_antenna_list: Symbol<
        'static,
        unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut LmsName) -> c_int,
    >,
    // Analog low-pass filter
    pub set_lpf_bw: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, c_double) -> c_int>,
    pub get_lpf_bw: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, *mut c_double) -> c_int>,
    pub calibrate: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, bool, usize, c_double, c_uint) -> c_int>,
    // Configuration files
    pub load_config: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, *const c_char) -> c_int>,
    pub save_config: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, *const c_char) -> c_int>,
    // Sensors
    pub get_chip_temperature: Symbol<
        'static,
        unsafe extern "C" fn(LmsDeviceHandle, usize, *mut c_double) -> c_int,
    >,
    // Streaming
    pub setup_stream: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, *mut lms_stream_t) -> c_int>,
    pub destroy_stream: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle, *mut lms_stream_t) -> c_int>,
    pub start_stream: Symbol<'static, unsafe extern "C" fn(*mut lms_stream_t) -> c_int>,
    pub stop_stream: Symbol<'static, unsafe extern "C" fn(*mut lms_stream_t) -> c_int>,
    pub recv_stream: Symbol<
        'static,
        unsafe extern "C" fn(*mut lms_stream_t, *mut c_void, usize, *mut lms_stream_meta_t, c_uint) -> c_int,
    >,
    pub send_stream: Symbol<
        'static,
        unsafe extern "C" fn(*mut lms_stream_t, *const c_void, usize, *const lms_stream_meta_t, c_uint) -> c_int,
    >,
    pub get_stream_status: Symbol<
        'static,
        unsafe extern "C" fn(*mut lms_stream_t, *mut lms_stream_status_t) -> c_int,
    >,
    // Device info and diagnostics
    pub get_device_info: Symbol<'static, unsafe extern "C" fn(LmsDeviceHandle) -> *const lms_dev_info_t>,
    pub get_library_version: Symbol<'static, unsafe extern "C" fn() -> *const c_char>,
    pub get_last_error_message: Symbol<'static, unsafe extern "C" fn() -> *const c_char>,
}

/// Global library instance (loaded once).
static LIMESUITE_LIB: OnceLock<Option<LimeSuiteLib>> = OnceLock::new();

/// Library names to try on different platforms.
#[cfg(target_os = "linux")]
const LIB_NAMES: &[&str] = &["libLimeSuite.so.20.10-1", "libLimeSuite.so.20.01-1", "libLimeSuite.so"];

#[cfg(target_os = "macos")]
const LIB_NAMES: &[&str] = &["libLimeSuite.dylib", "libLimeSuite.20.10-1.dylib"];

#[cfg(target_os = "windows")]
const LIB_NAMES: &[&str] = &["LimeSuite.dll", "libLimeSuite.dll"];

/// Resolve all required symbols from an already-opened library.
unsafe fn resolve_symbols(lib: Library) -> Option<LimeSuiteLib> {
    // The symbols borrow the Library; transmuting the reference to 'static
    // is sound because the Library is stored alongside them and never moves
    // out of the struct.
    let lib_ref: &'static Library = std::mem::transmute(&lib);

    Some(LimeSuiteLib {
        get_device_list: lib_ref.get(b"LMS_GetDeviceList\0").ok()?,
        open: lib_ref.get(b"LMS_Open\0").ok()?,
        close: lib_ref.get(b"LMS_Close\0").ok()?,
        init: lib_ref.get(b"LMS_Init\0").ok()?,
        reset: lib_ref.get(b"LMS_Reset\0").ok()?,
        enable_channel: lib_ref.get(b"LMS_EnableChannel\0").ok()?,
        get_num_channels: lib_ref.get(b"LMS_GetNumChannels\0").ok()?,
        set_sample_rate: lib_ref.get(b"LMS_SetSampleRate\0").ok()?,
        get_sample_rate: lib_ref.get(b"LMS_GetSampleRate\0").ok()?,
        set_lo_frequency: lib_ref.get(b"LMS_SetLOFrequency\0").ok()?,
        get_lo_frequency: lib_ref.get(b"LMS_GetLOFrequency\0").ok()?,
        set_normalized_gain: lib_ref.get(b"LMS_SetNormalizedGain\0").ok()?,
        get_normalized_gain: lib_ref.get(b"LMS_GetNormalizedGain\0").ok()?,
        set_gain_db: lib_ref.get(b"LMS_SetGaindB\0").ok()?,
        get_gain_db: lib_ref.get(b"LMS_GetGaindB\0").ok()?,
        set_antenna: lib_ref.get(b"LMS_SetAntenna\0").ok()?,
        get_antenna: lib_ref.get(b"LMS_GetAntenna\0").ok()?,
        get_antenna_list: lib_ref.get(b"LMS_GetAntennaList\0").ok()?,
        set_lpf_bw: lib_ref.get(b"LMS_SetLPFBW\0").ok()?,
        get_lpf_bw: lib_ref.get(b"LMS_GetLPFBW\0").ok()?,
        calibrate: lib_ref.get(b"LMS_Calibrate\0").ok()?,
        load_config: lib_ref.get(b"LMS_LoadConfig\0").ok()?,
        save_config: lib_ref.get(b"LMS_SaveConfig\0").ok()?,
        get_chip_temperature: lib_ref.get(b"LMS_GetChipTemperature\0").ok()?,
        setup_stream: lib_ref.get(b"LMS_SetupStream\0").ok()?,
        destroy_stream: lib_ref.get(b"LMS_DestroyStream\0").ok()?,
        start_stream: lib_ref.get(b"LMS_StartStream\0").ok()?,
        stop_stream: lib_ref.get(b"LMS_StopStream\0").ok()?,
        recv_stream: lib_ref.get(b"LMS_RecvStream\0").ok()?,
        send_stream: lib_ref.get(b"LMS_SendStream\0").ok()?,
        get_stream_status: lib_ref.get(b"LMS_GetStreamStatus\0").ok()?,
        get_device_info: lib_ref.get(b"LMS_GetDeviceInfo\0").ok()?,
        get_library_version: lib_ref.get(b"LMS_GetLibraryVersion\0").ok()?,
        get_last_error_message: lib_ref.get(b"LMS_GetLastErrorMessage\0").ok()?,
        _lib: lib,
    })
}

/// Load the LimeSuite library.
fn load_library() -> Option<LimeSuiteLib> {
    for name in LIB_NAMES {
        if let Ok(lib) = unsafe { Library::new(name) } {
            if let Some(resolved) = unsafe { resolve_symbols(lib) } {
                tracing::info!("Loaded LimeSuite library: {}", name);
                return Some(resolved);
            }
        }
    }
    tracing::debug!("LimeSuite library not found");
    None
}

/// Get the loaded library, initializing if necessary.
pub(crate) fn get_lib() -> Option<&'static LimeSuiteLib> {
    LIMESUITE_LIB.get_or_init(load_library).as_ref()
}

/// Check if libLimeSuite is available on this machine.
pub fn is_available() -> bool {
    get_lib().is_some()
}

/// Get the LimeSuite library version string, if the library is loaded.
pub fn library_version() -> Option<String> {
    get_lib().map(|lib| {
        let ptr = unsafe { (lib.get_library_version)() };
        cstr_to_string(ptr)
    })
}

/// Get the driver's last error message.
pub fn last_error() -> String {
    get_lib()
        .map(|lib| {
            let ptr = unsafe { (lib.get_last_error_message)() };
            cstr_to_string(ptr)
        })
        .unwrap_or_default()
}

/// Convert a possibly-null C string pointer to an owned String.
pub(crate) fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }
    }
}

/// Convert a fixed-size C char array to an owned String.
pub(crate) fn char_array_to_string(arr: &[c_char]) -> String {
    let bytes: Vec<u8> = arr
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_library_availability() {
        let available = is_available();
        if available {
            println!("libLimeSuite is available: {:?}", library_version());
        } else {
            println!("libLimeSuite not available (expected on most dev machines)");
        }
    }

    #[test]
    fn test_stream_struct_layout() {
        // Field order and sizes must match LimeSuite.h exactly.
        assert_eq!(mem::size_of::<lms_stream_meta_t>(), 16);
        assert_eq!(mem::size_of::<lms_stream_status_t>(), 48);
        assert_eq!(mem::size_of::<lms_dev_info_t>(), 168);
        assert_eq!(mem::size_of::<lms_stream_t>(), 32);
    }

    #[test]
    fn test_char_array_to_string() {
        let mut arr: [c_char; 16] = [0; 16];
        for (i, b) in b"LimeSDR".iter().enumerate() {
            arr[i] = *b as c_char;
        }
        assert_eq!(char_array_to_string(&arr), "LimeSDR");

        let empty: [c_char; 16] = [0; 16];
        assert_eq!(char_array_to_string(&empty), "");
    }

    #[test]
    fn test_format_constants() {
        assert_eq!(LMS_FMT_F32, 0);
        assert_eq!(LMS_FMT_I16, 1);
        assert_eq!(LMS_FMT_I12, 2);
        assert!(!LMS_CH_RX);
        assert!(LMS_CH_TX);
    }
}

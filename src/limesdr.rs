//! LimeSDR I/Q Data Source and Sink Module
//!
//! This module provides functionality to read I/Q samples from LimeSDR
//! devices, both synchronously and asynchronously, and to transmit I/Q
//! samples including timestamp-synchronized bursts. It uses the `rs_lime`
//! crate to interface with the LimeSDR hardware through libLimeSuite.
//!
//! # Example
//!
//! ```no_run
//! use limeade::{LimeSdrConfig, LimeSdrReader};
//!
//! let config = LimeSdrConfig::new(100_000_000.0, 10_000_000.0);
//! let reader = LimeSdrReader::new(&config)?;
//!
//! for samples in reader.take(10) {
//!     let samples = samples?;
//!     println!("Received {} samples", samples.len());
//! }
//! # Ok::<(), limeade::Error>(())
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use num_complex::Complex;
use rs_lime::{
    DeviceInfo, Direction, LimeDevice, LimeStream, StreamConfig, StreamMeta, StreamStatus,
};
use tokio::sync::mpsc;

use crate::{error, Gain};

/// Samples per chunk handed to the consumer
const DEFAULT_CHUNK_SIZE: usize = 16384;

/// Timeout for a single driver recv/send call
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Device selector for LimeSDR devices
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSelector {
    /// Select device by index (0 for first device)
    Index(usize),
    /// Select device by serial number
    Serial(String),
}

impl Default for DeviceSelector {
    fn default() -> Self {
        DeviceSelector::Index(0)
    }
}

/**
 * LimeSDR Configuration
 */
#[derive(Debug, Clone, PartialEq)]
pub struct LimeSdrConfig {
    /// Device selector (index or serial)
    pub device: DeviceSelector,
    /// Center frequency in Hz
    pub center_freq: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// RF oversampling ratio (0 lets the driver choose)
    pub oversample: usize,
    /// RF channel index (0 or 1)
    pub channel: usize,
    /// Gain configuration
    pub gain: Gain,
    /// Antenna port name (e.g. "LNAW", "BAND1"); None keeps the device default
    pub antenna: Option<String>,
    /// Analog low-pass filter bandwidth in Hz; None keeps the device default
    pub lpf_bandwidth: Option<f64>,
    /// Run DC/IQ calibration after tuning
    pub calibrate: bool,
    /// LimeSuite configuration file (.ini) to load before anything else
    pub config_file: Option<std::path::PathBuf>,
}

impl LimeSdrConfig {
    /// Create a new LimeSDR configuration with specified parameters
    pub fn new(center_freq: f64, sample_rate: f64) -> Self {
        Self {
            device: DeviceSelector::default(),
            center_freq,
            sample_rate,
            oversample: 0,
            channel: 0,
            gain: Gain::Auto,
            antenna: None,
            lpf_bandwidth: None,
            calibrate: false,
            config_file: None,
        }
    }
}

/// Enumerate available LimeSDR devices
pub fn enumerate_devices() -> error::Result<Vec<DeviceInfo>> {
    rs_lime::enumerate_devices().map_err(Into::into)
}

/// Open the selected device and bring one channel up for streaming.
fn open_and_configure(
    config: &LimeSdrConfig,
    direction: Direction,
) -> error::Result<(LimeDevice, LimeStream)> {
    let device = match &config.device {
        DeviceSelector::Index(index) => {
            let devices = rs_lime::enumerate_devices()?;
            let info = devices
                .get(*index)
                .ok_or(rs_lime::Error::DeviceNotFound)?;
            LimeDevice::open(info)?
        }
        DeviceSelector::Serial(serial) => LimeDevice::open_by_serial(serial)?,
    };

    // A configuration file replaces LMS_Init as the baseline state.
    match &config.config_file {
        Some(path) => device.load_config(path)?,
        None => device.init()?,
    }

    device.enable_channel(direction, config.channel, true)?;
    device.set_sample_rate(config.sample_rate, config.oversample)?;
    device.set_frequency(direction, config.channel, config.center_freq)?;

    if let Some(name) = &config.antenna {
        let antennas = device.antenna_list(direction, config.channel)?;
        let index = antennas
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| {
                error::Error::device(format!(
                    "Unknown antenna '{}' (available: {})",
                    name,
                    antennas.join(", ")
                ))
            })?;
        device.set_antenna(direction, config.channel, index)?;
    }

    match config.gain {
        Gain::Manual(gain_db) => {
            device.set_gain_db(direction, config.channel, gain_db.round() as u32)?;
        }
        Gain::Auto => {
            // Keep whatever LMS_Init or the configuration file set up
        }
    }

    if let Some(bw) = config.lpf_bandwidth {
        device.set_lpf_bandwidth(direction, config.channel, bw)?;
    }

    if config.calibrate {
        let bw = config.lpf_bandwidth.unwrap_or(config.sample_rate);
        device.calibrate(direction, config.channel, bw)?;
    }

    let stream_config = StreamConfig {
        channel: config.channel as u32,
        ..StreamConfig::default()
    };
    let mut stream = match direction {
        Direction::Rx => device.rx_stream(&stream_config)?,
        Direction::Tx => device.tx_stream(&stream_config)?,
    };
    stream.start()?;

    tracing::debug!(
        "LimeSDR {:?} channel {} streaming at {} Hz, {} S/s",
        direction,
        config.channel,
        config.center_freq,
        config.sample_rate
    );

    Ok((device, stream))
}

/**
 * Synchronous LimeSDR I/Q Reader
 */
pub struct LimeSdrReader {
    // The device must outlive the stream; field order matters for Drop.
    stream: LimeStream,
    _device: LimeDevice,
    buf: Vec<Complex<f32>>,
}

impl LimeSdrReader {
    pub fn new(config: &LimeSdrConfig) -> error::Result<Self> {
        let (device, stream) = open_and_configure(config, Direction::Rx)?;
        Ok(Self {
            stream,
            _device: device,
            buf: vec![Complex::new(0.0, 0.0); DEFAULT_CHUNK_SIZE],
        })
    }

    /// Driver-side stream status: FIFO fill, drop counters, rates.
    pub fn status(&mut self) -> error::Result<StreamStatus> {
        self.stream.status().map_err(Into::into)
    }
}

impl Iterator for LimeSdrReader {
    type Item = error::Result<Vec<Complex<f32>>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stream.recv(&mut self.buf, DEFAULT_TIMEOUT) {
            Ok((0, _)) => None, // End of stream
            Ok((len, _meta)) => Some(Ok(self.buf[..len].to_vec())),
            Err(e) => Some(Err(e.into())),
        }
    }
}

/**
 * Asynchronous LimeSDR I/Q Reader
 */
pub struct AsyncLimeSdrReader {
    rx: mpsc::Receiver<error::Result<Vec<Complex<f32>>>>,
    _handle: std::thread::JoinHandle<()>,
}

impl AsyncLimeSdrReader {
    pub fn new(config: &LimeSdrConfig) -> error::Result<Self> {
        let (tx, rx) = mpsc::channel::<error::Result<Vec<Complex<f32>>>>(32);
        let (tx_init, rx_init) = std::sync::mpsc::channel::<error::Result<()>>();
        let cfg = config.clone();

        let handle = std::thread::spawn(move || {
            match open_and_configure(&cfg, Direction::Rx) {
                Ok((_device, mut stream)) => {
                    let _ = tx_init.send(Ok(()));
                    let mut buffer = vec![Complex::new(0.0, 0.0); DEFAULT_CHUNK_SIZE];

                    loop {
                        match stream.recv(&mut buffer, DEFAULT_TIMEOUT) {
                            Ok((0, _)) => {
                                let _ = tx.blocking_send(Ok(Vec::new()));
                                return;
                            }
                            Ok((len, _meta)) => {
                                if tx.blocking_send(Ok(buffer[..len].to_vec())).is_err() {
                                    // Receiver dropped, exit loop
                                    return;
                                }
                            }
                            Err(e) => {
                                let _ = tx.blocking_send(Err(e.into()));
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    let _ = tx_init.send(Err(e));
                }
            }
        });

        match rx_init.recv() {
            Ok(Ok(())) => Ok(Self {
                rx,
                _handle: handle,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(error::Error::device("Failed to initialize LimeSDR device")),
        }
    }
}

impl Stream for AsyncLimeSdrReader {
    type Item = error::Result<Vec<Complex<f32>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/**
 * Synchronous LimeSDR I/Q Writer
 */
pub struct LimeSdrWriter {
    stream: LimeStream,
    _device: LimeDevice,
    timeout: Duration,
}

impl LimeSdrWriter {
    pub fn new(config: &LimeSdrConfig) -> error::Result<Self> {
        let (device, stream) = open_and_configure(config, Direction::Tx)?;
        Ok(Self {
            stream,
            _device: device,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Queue samples for immediate transmission.
    ///
    /// Returns the number of samples accepted into the driver FIFO, which
    /// may be less than `samples.len()` when the FIFO is near capacity.
    pub fn write(&mut self, samples: &[Complex<f32>]) -> error::Result<usize> {
        self.stream
            .send(samples, &StreamMeta::default(), self.timeout)
            .map_err(Into::into)
    }

    /// Queue a burst to be transmitted when the hardware clock reaches
    /// `timestamp` (in samples since stream start).
    pub fn write_at(&mut self, samples: &[Complex<f32>], timestamp: u64) -> error::Result<usize> {
        self.stream
            .send(samples, &StreamMeta::at_timestamp(timestamp), self.timeout)
            .map_err(Into::into)
    }

    /// Queue all samples, blocking until the driver has accepted them.
    pub fn write_all(&mut self, samples: &[Complex<f32>]) -> error::Result<()> {
        let mut remaining = samples;
        while !remaining.is_empty() {
            let sent = self.write(remaining)?;
            if sent == 0 {
                return Err(error::Error::device("TX FIFO did not drain within timeout"));
            }
            remaining = &remaining[sent..];
        }
        Ok(())
    }

    /// Driver-side stream status: FIFO fill, underrun counters, rates.
    pub fn status(&mut self) -> error::Result<StreamStatus> {
        self.stream.status().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LimeSdrConfig::new(100e6, 10e6);
        assert_eq!(config.device, DeviceSelector::Index(0));
        assert_eq!(config.channel, 0);
        assert_eq!(config.oversample, 0);
        assert_eq!(config.gain, Gain::Auto);
        assert!(config.antenna.is_none());
        assert!(config.lpf_bandwidth.is_none());
        assert!(!config.calibrate);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_device_selector_default() {
        assert_eq!(DeviceSelector::default(), DeviceSelector::Index(0));
    }

    #[test]
    fn test_reader_without_library_or_device() {
        // Without libLimeSuite (or without hardware) construction must
        // fail with a clean error rather than panic.
        let config = LimeSdrConfig::new(100e6, 10e6);
        if let Err(e) = LimeSdrReader::new(&config) {
            println!("expected failure without hardware: {}", e);
        }
    }
}

//! Sample streaming: stream setup, start/stop, blocking recv/send, status.

use std::ffi::c_void;
use std::time::Duration;

use num_complex::Complex;

use crate::error::{Error, Result};
use crate::ffi::{self, lms_stream_meta_t, lms_stream_status_t, lms_stream_t, LmsDeviceHandle};
use crate::Direction;

/// Wire format of the samples crossing the driver boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 32-bit float I/Q, normalized to -1.0..1.0.
    #[default]
    F32,
    /// 16-bit integer I/Q.
    I16,
    /// 12-bit integer I/Q, packed on the USB link, presented to the host
    /// in 16-bit containers.
    I12,
}

impl SampleFormat {
    fn to_native(self) -> i32 {
        match self {
            SampleFormat::F32 => ffi::LMS_FMT_F32,
            SampleFormat::I16 => ffi::LMS_FMT_I16,
            SampleFormat::I12 => ffi::LMS_FMT_I12,
        }
    }
}

/// Stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// RF channel index (0 or 1).
    pub channel: u32,
    /// Wire sample format.
    pub format: SampleFormat,
    /// Driver FIFO size in samples.
    pub fifo_size: u32,
    /// 0.0 optimizes for latency, 1.0 for throughput.
    pub throughput_vs_latency: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            format: SampleFormat::F32,
            fifo_size: 64 * 1024,
            throughput_vs_latency: 0.5,
        }
    }
}

/// Streaming metadata: the hardware timestamp of the first sample of a
/// transfer, plus transmit synchronization flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMeta {
    /// Hardware timestamp in samples since stream start.
    pub timestamp: u64,
    /// TX: hold the burst until the hardware clock reaches `timestamp`.
    pub wait_for_timestamp: bool,
    /// TX: send a partially filled packet immediately (end of burst).
    pub flush_partial_packet: bool,
}

impl StreamMeta {
    /// Metadata for a transmit burst scheduled at a hardware timestamp.
    pub fn at_timestamp(timestamp: u64) -> Self {
        Self {
            timestamp,
            wait_for_timestamp: true,
            flush_partial_packet: false,
        }
    }

    fn to_native(self) -> lms_stream_meta_t {
        lms_stream_meta_t {
            timestamp: self.timestamp,
            wait_for_timestamp: self.wait_for_timestamp,
            flush_partial_packet: self.flush_partial_packet,
        }
    }

    fn from_native(raw: lms_stream_meta_t) -> Self {
        Self {
            timestamp: raw.timestamp,
            wait_for_timestamp: raw.wait_for_timestamp,
            flush_partial_packet: raw.flush_partial_packet,
        }
    }
}

/// Stream status snapshot from `LMS_GetStreamStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamStatus {
    /// Whether the stream is currently running.
    pub active: bool,
    /// Samples currently held in the driver FIFO.
    pub fifo_filled: u32,
    /// Driver FIFO capacity in samples.
    pub fifo_size: u32,
    /// FIFO underrun count since start.
    pub underrun: u32,
    /// FIFO overrun count since start.
    pub overrun: u32,
    /// Packets dropped by the hardware since start.
    pub dropped_packets: u32,
    /// Sampling rate of the stream in Hz.
    pub sample_rate: f64,
    /// Combined data rate of all streams on the link, bytes per second.
    pub link_rate: f64,
    /// Current hardware timestamp.
    pub timestamp: u64,
}

impl StreamStatus {
    fn from_native(raw: lms_stream_status_t) -> Self {
        Self {
            active: raw.active,
            fifo_filled: raw.fifo_filled_count,
            fifo_size: raw.fifo_size,
            underrun: raw.underrun,
            overrun: raw.overrun,
            dropped_packets: raw.dropped_packets,
            sample_rate: raw.sample_rate,
            link_rate: raw.link_rate,
            timestamp: raw.timestamp,
        }
    }
}

/// A configured receive or transmit stream.
///
/// The underlying `lms_stream_t` descriptor is boxed: the driver keeps the
/// struct address between `LMS_SetupStream` and `LMS_DestroyStream`, so it
/// must not move while the stream exists. Dropping the stream stops it if
/// running and destroys it.
pub struct LimeStream {
    device: LmsDeviceHandle,
    inner: Box<lms_stream_t>,
    direction: Direction,
    format: SampleFormat,
    running: bool,
}

// SAFETY: stream operations are synchronized inside the driver.
unsafe impl Send for LimeStream {}

impl LimeStream {
    /// Register a stream with the driver (`LMS_SetupStream`).
    pub(crate) fn setup(
        device: LmsDeviceHandle,
        direction: Direction,
        config: &StreamConfig,
    ) -> Result<Self> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;

        let mut inner = Box::new(lms_stream_t {
            handle: 0,
            is_tx: direction.is_tx(),
            channel: config.channel,
            fifo_size: config.fifo_size,
            throughput_vs_latency: config.throughput_vs_latency,
            data_fmt: config.format.to_native(),
        });

        let ret = unsafe { (lib.setup_stream)(device, inner.as_mut()) };
        if ret != 0 {
            return Err(Error::StreamSetupFailed(ffi::last_error()));
        }

        tracing::debug!(
            "Stream set up: {:?} channel {} format {:?}",
            direction,
            config.channel,
            config.format
        );

        Ok(Self {
            device,
            inner,
            direction,
            format: config.format,
            running: false,
        })
    }

    /// Stream direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// RF channel index.
    pub fn channel(&self) -> u32 {
        self.inner.channel
    }

    /// Configured wire format.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Whether the stream has been started.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start streaming.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let ret = unsafe { (lib.start_stream)(self.inner.as_mut()) };
        if ret != 0 {
            return Err(Error::call("LMS_StartStream"));
        }
        self.running = true;
        Ok(())
    }

    /// Stop streaming. The stream can be started again.
    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let ret = unsafe { (lib.stop_stream)(self.inner.as_mut()) };
        if ret != 0 {
            return Err(Error::call("LMS_StopStream"));
        }
        self.running = false;
        Ok(())
    }

    /// Receive float I/Q samples from an RX stream.
    ///
    /// Blocks until `buffer.len()` samples arrive or `timeout` elapses;
    /// returns the number of samples actually read (which may be smaller)
    /// and the metadata of the first sample.
    pub fn recv(
        &mut self,
        buffer: &mut [Complex<f32>],
        timeout: Duration,
    ) -> Result<(usize, StreamMeta)> {
        self.check_recv(SampleFormat::F32)?;
        self.recv_raw(buffer.as_mut_ptr() as *mut c_void, buffer.len(), timeout)
    }

    /// Receive integer I/Q samples (I16 and I12 wire formats).
    pub fn recv_i16(
        &mut self,
        buffer: &mut [Complex<i16>],
        timeout: Duration,
    ) -> Result<(usize, StreamMeta)> {
        self.check_recv(SampleFormat::I16)?;
        self.recv_raw(buffer.as_mut_ptr() as *mut c_void, buffer.len(), timeout)
    }

    /// Transmit float I/Q samples on a TX stream.
    ///
    /// Returns the number of samples accepted into the driver FIFO.
    pub fn send(
        &mut self,
        buffer: &[Complex<f32>],
        meta: &StreamMeta,
        timeout: Duration,
    ) -> Result<usize> {
        self.check_send(SampleFormat::F32)?;
        self.send_raw(buffer.as_ptr() as *const c_void, buffer.len(), meta, timeout)
    }

    /// Transmit integer I/Q samples (I16 and I12 wire formats).
    pub fn send_i16(
        &mut self,
        buffer: &[Complex<i16>],
        meta: &StreamMeta,
        timeout: Duration,
    ) -> Result<usize> {
        self.check_send(SampleFormat::I16)?;
        self.send_raw(buffer.as_ptr() as *const c_void, buffer.len(), meta, timeout)
    }

    /// Query stream status: FIFO fill, drop counters, rates, timestamp.
    pub fn status(&mut self) -> Result<StreamStatus> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut raw = lms_stream_status_t::default();
        let ret = unsafe { (lib.get_stream_status)(self.inner.as_mut(), &mut raw) };
        if ret != 0 {
            return Err(Error::call("LMS_GetStreamStatus"));
        }
        Ok(StreamStatus::from_native(raw))
    }

    fn check_recv(&self, called_as: SampleFormat) -> Result<()> {
        if self.direction != Direction::Rx {
            return Err(Error::InvalidConfig("recv on a TX stream".to_string()));
        }
        self.check_common(called_as)
    }

    fn check_send(&self, called_as: SampleFormat) -> Result<()> {
        if self.direction != Direction::Tx {
            return Err(Error::InvalidConfig("send on an RX stream".to_string()));
        }
        self.check_common(called_as)
    }

    fn check_common(&self, called_as: SampleFormat) -> Result<()> {
        if !self.running {
            return Err(Error::StreamInactive);
        }
        // The I12 wire format is serviced through the I16 call path: the
        // driver hands 12-bit payloads to the host in 16-bit containers.
        let compatible = match called_as {
            SampleFormat::F32 => self.format == SampleFormat::F32,
            SampleFormat::I16 => matches!(self.format, SampleFormat::I16 | SampleFormat::I12),
            SampleFormat::I12 => false,
        };
        if !compatible {
            return Err(Error::FormatMismatch(self.format));
        }
        Ok(())
    }

    fn recv_raw(
        &mut self,
        samples: *mut c_void,
        count: usize,
        timeout: Duration,
    ) -> Result<(usize, StreamMeta)> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let mut meta = lms_stream_meta_t::default();
        let ret = unsafe {
            (lib.recv_stream)(
                self.inner.as_mut(),
                samples,
                count,
                &mut meta,
                timeout_ms(timeout),
            )
        };
        if ret < 0 {
            return Err(Error::call("LMS_RecvStream"));
        }
        Ok((ret as usize, StreamMeta::from_native(meta)))
    }

    fn send_raw(
        &mut self,
        samples: *const c_void,
        count: usize,
        meta: &StreamMeta,
        timeout: Duration,
    ) -> Result<usize> {
        let lib = ffi::get_lib().ok_or(Error::LibraryNotFound)?;
        let native_meta = meta.to_native();
        let ret = unsafe {
            (lib.send_stream)(
                self.inner.as_mut(),
                samples,
                count,
                &native_meta,
                timeout_ms(timeout),
            )
        };
        if ret < 0 {
            return Err(Error::call("LMS_SendStream"));
        }
        Ok(ret as usize)
    }
}

impl Drop for LimeStream {
    fn drop(&mut self) {
        if let Some(lib) = ffi::get_lib() {
            if self.running {
                let _ = self.stop();
            }
            tracing::debug!(
                "Destroying {:?} stream on channel {}",
                self.direction,
                self.inner.channel
            );
            unsafe { (lib.destroy_stream)(self.device, self.inner.as_mut()) };
        }
    }
}

fn timeout_ms(timeout: Duration) -> u32 {
    timeout.as_millis().min(u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.channel, 0);
        assert_eq!(config.format, SampleFormat::F32);
        assert_eq!(config.fifo_size, 64 * 1024);
        assert!((config.throughput_vs_latency - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_meta_at_timestamp() {
        let meta = StreamMeta::at_timestamp(123_456);
        assert_eq!(meta.timestamp, 123_456);
        assert!(meta.wait_for_timestamp);
        assert!(!meta.flush_partial_packet);
    }

    #[test]
    fn test_meta_roundtrip() {
        let meta = StreamMeta {
            timestamp: 42,
            wait_for_timestamp: true,
            flush_partial_packet: true,
        };
        assert_eq!(StreamMeta::from_native(meta.to_native()), meta);
    }

    #[test]
    fn test_status_from_native() {
        let raw = lms_stream_status_t {
            active: true,
            fifo_filled_count: 100,
            fifo_size: 4096,
            underrun: 1,
            overrun: 2,
            dropped_packets: 3,
            sample_rate: 10e6,
            link_rate: 80e6,
            timestamp: 999,
        };
        let status = StreamStatus::from_native(raw);
        assert!(status.active);
        assert_eq!(status.fifo_filled, 100);
        assert_eq!(status.fifo_size, 4096);
        assert_eq!(status.underrun, 1);
        assert_eq!(status.overrun, 2);
        assert_eq!(status.dropped_packets, 3);
        assert_eq!(status.timestamp, 999);
    }

    #[test]
    fn test_timeout_conversion() {
        assert_eq!(timeout_ms(Duration::from_millis(250)), 250);
        assert_eq!(timeout_ms(Duration::from_secs(2)), 2000);
        assert_eq!(timeout_ms(Duration::from_secs(u64::MAX / 1000)), u32::MAX);
    }
}

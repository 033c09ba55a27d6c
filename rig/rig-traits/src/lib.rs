use std::fmt;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

// --- Basic Types ---

/// A point on the logger's monotonic clock, split the way the rig logs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: u64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub const fn new(seconds: u64, nanoseconds: u32) -> Self {
        Timestamp {
            seconds: seconds + (nanoseconds / 1_000_000_000) as u64,
            nanoseconds: nanoseconds % 1_000_000_000,
        }
    }

    pub fn from_duration(d: Duration) -> Self {
        Timestamp {
            seconds: d.as_secs(),
            nanoseconds: d.subsec_nanos(),
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::new(self.seconds, self.nanoseconds)
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.as_duration().saturating_sub(earlier.as_duration())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// Which device a log line came from. Rendered lowercase in the log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum SourceTag {
    Imu,
    Gps,
}

// --- Line Sources ---

/// Why a read produced no usable line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The underlying port reported an I/O failure other than a timeout
    #[error("I/O error: {0}")]
    Io(String),
    /// Bytes arrived but did not form a valid line
    #[error("malformed line: {0}")]
    Malformed(String),
    /// No line terminator arrived within the buffer limit
    #[error("line exceeded {limit} bytes without a terminator")]
    Overflow { limit: usize },
}

/// Result of one attempt to pull a line from a source.
///
/// "Nothing arrived yet" is the common case on a short-timeout port, so it is
/// a variant of its own rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    NoData,
    Failed(ReadError),
}

impl ReadOutcome {
    pub fn into_line(self) -> Option<String> {
        match self {
            ReadOutcome::Line(line) => Some(line),
            _ => None,
        }
    }
}

pub trait LineSource {
    /// Attempts to read one line. Must return promptly when no data is pending.
    fn read_line(&mut self) -> ReadOutcome;

    /// Human readable name of the device, used in diagnostics.
    fn name(&self) -> &str;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> ReadOutcome {
        (**self).read_line()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// --- Cameras ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraInfo {
    pub serial_number: u32,
    pub model_name: String,
    pub vendor_name: String,
    pub sensor_info: String,
    pub sensor_resolution: String,
    pub firmware_version: String,
    pub firmware_build_time: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** CAMERA INFORMATION ***")?;
        writeln!(f, "Serial number - {}", self.serial_number)?;
        writeln!(f, "Camera model - {}", self.model_name)?;
        writeln!(f, "Camera vendor - {}", self.vendor_name)?;
        writeln!(f, "Sensor - {}", self.sensor_info)?;
        writeln!(f, "Resolution - {}", self.sensor_resolution)?;
        writeln!(f, "Firmware version - {}", self.firmware_version)?;
        write!(f, "Firmware build time - {}", self.firmware_build_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PixelFormat {
    Mono8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// One completed image pulled out of the camera's buffer queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// Camera-side frame counter
    pub sequence: u64,
}

impl Frame {
    /// True when the payload length matches the declared geometry.
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum CaptureMode {
    /// Each frame is requested by writing the software trigger register
    SoftwareTrigger,
    /// The camera streams at its own rate; the logger only pulls buffers
    FreeRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// Enumeration or connection failed
    #[error("Device error: {0}")]
    Device(String),
    #[error("Register 0x{address:03X} access failed: {message}")]
    Register { address: u32, message: String },
    #[error("Capture error: {0}")]
    Capture(String),
    #[error("Trigger error: {0}")]
    Trigger(String),
    #[error("Timed out waiting for a buffer after {0:?}")]
    BufferTimeout(Duration),
    /// Functionality not supported by this specific camera
    #[error("Not supported: {0}")]
    NotSupported(String),
}

pub trait Camera {
    fn info(&mut self) -> Result<CameraInfo, CameraError>;

    fn capture_mode(&self) -> CaptureMode;

    fn start_capture(&mut self) -> Result<(), CameraError>;

    fn stop_capture(&mut self) -> Result<(), CameraError>;

    /// Requests one frame. Only meaningful in [`CaptureMode::SoftwareTrigger`].
    fn fire_trigger(&mut self) -> Result<(), CameraError>;

    /// Pulls the next completed frame out of the camera's queue.
    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError>;
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn info(&mut self) -> Result<CameraInfo, CameraError> {
        (**self).info()
    }

    fn capture_mode(&self) -> CaptureMode {
        (**self).capture_mode()
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        (**self).start_capture()
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        (**self).stop_capture()
    }

    fn fire_trigger(&mut self) -> Result<(), CameraError> {
        (**self).fire_trigger()
    }

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError> {
        (**self).retrieve_buffer()
    }
}

/// Enumerates attached cameras and hands out connected handles.
pub trait CameraBus {
    fn num_cameras(&mut self) -> Result<u32, CameraError>;

    fn connect(&mut self, index: u32, mode: CaptureMode) -> Result<Box<dyn Camera>, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn timestamp_normalizes_nanoseconds() {
        let ts = Timestamp::new(3, 1_500_000_000);
        assert_eq!(ts, Timestamp::new(4, 500_000_000));
        assert_eq!(ts.to_string(), "4.500000000");
    }

    #[test]
    fn duration_since_saturates() {
        let early = Timestamp::new(1, 0);
        let late = Timestamp::new(2, 250);
        assert_eq!(late.duration_since(early), Duration::new(1, 250));
        assert_eq!(early.duration_since(late), Duration::ZERO);
    }

    #[test]
    fn source_tags_render_lowercase() {
        assert_eq!(SourceTag::Imu.to_string(), "imu");
        assert_eq!(SourceTag::from_str("gps").unwrap(), SourceTag::Gps);
    }

    #[test]
    fn camera_info_prints_block() {
        let info = CameraInfo {
            serial_number: 1234,
            model_name: "Chameleon".into(),
            ..Default::default()
        };
        let text = info.to_string();
        assert!(text.starts_with("*** CAMERA INFORMATION ***\n"));
        assert!(text.contains("Serial number - 1234\n"));
        assert!(text.contains("Camera model - Chameleon\n"));
    }

    #[test]
    fn frame_completeness_checks_geometry() {
        let mut frame = Frame {
            width: 4,
            height: 2,
            format: PixelFormat::Mono8,
            data: vec![0; 8],
            sequence: 0,
        };
        assert!(frame.is_complete());
        frame.format = PixelFormat::Rgb8;
        assert!(!frame.is_complete());
    }
}

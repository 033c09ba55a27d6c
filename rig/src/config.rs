//! Logger configuration and the presets that reproduce each rig program.
//!
//! Everything here is fixed at startup; nothing is re-read while the loop runs.

use crate::filter::FilterRule;
use crate::frames::ImageFormat;
use crate::sink::TimestampFormat;
use rig_traits::{CaptureMode, SourceTag};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

pub const LOG_FILE_NAME: &str = "log.txt";

pub const IMU_DEVICE: &str = "/dev/ttyO2";
pub const IMU_BAUD_RATE: u32 = 57600;
pub const GPS_DEVICE: &str = "/dev/ttyO1";
pub const GPS_BAUD_RATE: u32 = 38400;

pub const DEFAULT_TRIGGER_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("trigger period must be a whole number of seconds, at least 1 (got {0:?})")]
    TriggerPeriod(Duration),
    #[error("a secondary source needs a primary source")]
    SecondaryWithoutPrimary,
    #[error("{0} is configured for more than one source")]
    DuplicateDevice(String),
    #[error("baud rate for {0} must be non-zero")]
    BaudRate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub tag: SourceTag,
    pub device: String,
    pub baud_rate: u32,
    pub filter: Option<FilterRule>,
}

impl SourceConfig {
    pub fn new(tag: SourceTag, device: impl Into<String>, baud_rate: u32) -> Self {
        SourceConfig {
            tag,
            device: device.into(),
            baud_rate,
            filter: None,
        }
    }

    pub fn imu() -> Self {
        Self::new(SourceTag::Imu, IMU_DEVICE, IMU_BAUD_RATE)
    }

    pub fn gps() -> Self {
        Self::new(SourceTag::Gps, GPS_DEVICE, GPS_BAUD_RATE)
    }

    pub fn with_filter(mut self, filter: FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    /// Position on the camera bus
    pub index: u32,
    pub mode: CaptureMode,
    pub image_format: ImageFormat,
}

impl CameraConfig {
    pub fn new(mode: CaptureMode, image_format: ImageFormat) -> Self {
        CameraConfig {
            index: 0,
            mode,
            image_format,
        }
    }
}

/// Where the log and the frames go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Log at this path, frames beside it
    LogFile(PathBuf),
    /// Log at `<dir>/log.txt`, frames in `<dir>`
    Directory(PathBuf),
}

impl OutputTarget {
    pub fn log_path(&self) -> PathBuf {
        match self {
            OutputTarget::LogFile(path) => path.clone(),
            OutputTarget::Directory(dir) => dir.join(LOG_FILE_NAME),
        }
    }

    pub fn frame_dir(&self) -> PathBuf {
        match self {
            OutputTarget::LogFile(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
            OutputTarget::Directory(dir) => dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigConfig {
    /// High-rate source, read first every iteration
    pub primary: Option<SourceConfig>,
    pub secondary: Option<SourceConfig>,
    pub camera: Option<CameraConfig>,
    pub trigger_period: Duration,
    pub timestamp_format: TimestampFormat,
    /// Pause before any device is touched
    pub startup_delay: Duration,
    pub output: OutputTarget,
}

impl RigConfig {
    pub fn new(output: OutputTarget) -> Self {
        RigConfig {
            primary: None,
            secondary: None,
            camera: None,
            trigger_period: DEFAULT_TRIGGER_PERIOD,
            timestamp_format: TimestampFormat::default(),
            startup_delay: Duration::ZERO,
            output,
        }
    }

    pub fn with_primary(mut self, source: SourceConfig) -> Self {
        self.primary = Some(source);
        self
    }

    pub fn with_secondary(mut self, source: SourceConfig) -> Self {
        self.secondary = Some(source);
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_trigger_period(mut self, period: Duration) -> Self {
        self.trigger_period = period;
        self
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Configured sources in poll order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.primary.iter().chain(self.secondary.iter())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_period < Duration::from_secs(1) || self.trigger_period.subsec_nanos() != 0 {
            return Err(ConfigError::TriggerPeriod(self.trigger_period));
        }
        if self.secondary.is_some() && self.primary.is_none() {
            return Err(ConfigError::SecondaryWithoutPrimary);
        }
        for source in self.sources() {
            if source.baud_rate == 0 {
                return Err(ConfigError::BaudRate(source.device.clone()));
            }
        }
        if let (Some(a), Some(b)) = (&self.primary, &self.secondary) {
            if a.device == b.device {
                return Err(ConfigError::DuplicateDevice(a.device.clone()));
            }
        }
        Ok(())
    }
}

/// The historical rig programs, one binary each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Preset {
    /// IMU + GPS, free-running camera, log file argument
    Bblog,
    /// IMU + GPS, software-triggered camera, log directory argument
    BblogDir,
    /// IMU only with the `!` sentinel filter, log directory argument
    Imulog,
    /// IMU + GPS without a camera, log file argument
    Sensorlog,
    /// Software-triggered camera only, BMP frames, log directory argument
    Camlog,
}

impl Preset {
    /// Binary name, also used as the program name in usage text.
    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    pub fn takes_directory(&self) -> bool {
        matches!(self, Preset::BblogDir | Preset::Imulog | Preset::Camlog)
    }

    pub fn about(&self) -> &'static str {
        match self {
            Preset::Bblog => "Log IMU and GPS lines and grab a camera frame every second",
            Preset::BblogDir => "Log IMU and GPS lines into a directory and trigger a frame every second",
            Preset::Imulog => "Log sentinel-checked IMU lines into a directory",
            Preset::Sensorlog => "Log IMU and GPS lines without a camera",
            Preset::Camlog => "Trigger and save a camera frame every second",
        }
    }

    pub fn output(&self, target: &Path) -> OutputTarget {
        if self.takes_directory() {
            OutputTarget::Directory(target.to_path_buf())
        } else {
            OutputTarget::LogFile(target.to_path_buf())
        }
    }

    pub fn config(&self, target: &Path) -> RigConfig {
        let base = RigConfig::new(self.output(target));
        match self {
            Preset::Bblog => base
                .with_primary(SourceConfig::imu())
                .with_secondary(SourceConfig::gps())
                .with_camera(CameraConfig::new(CaptureMode::FreeRunning, ImageFormat::Pgm)),
            Preset::BblogDir => base
                .with_primary(SourceConfig::imu())
                .with_secondary(SourceConfig::gps())
                .with_camera(CameraConfig::new(CaptureMode::SoftwareTrigger, ImageFormat::Pgm)),
            Preset::Imulog => {
                base.with_primary(SourceConfig::imu().with_filter(FilterRule::SoleLeadingMarker('!')))
            }
            Preset::Sensorlog => base
                .with_primary(SourceConfig::imu())
                .with_secondary(SourceConfig::gps())
                .with_timestamp_format(TimestampFormat::Fractional),
            Preset::Camlog => base
                .with_camera(CameraConfig::new(CaptureMode::SoftwareTrigger, ImageFormat::Bmp))
                .with_startup_delay(Duration::from_secs(2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_preset_validates() {
        for preset in Preset::iter() {
            let config = preset.config(Path::new("/tmp/rig"));
            assert_eq!(config.validate(), Ok(()), "{}", preset);
        }
    }

    #[test]
    fn preset_names_match_binaries() {
        assert_eq!(Preset::Bblog.to_string(), "bblog");
        assert_eq!(Preset::BblogDir.to_string(), "bblog_dir");
        assert_eq!("camlog".parse::<Preset>().unwrap(), Preset::Camlog);
    }

    #[test]
    fn directory_target_puts_log_inside() {
        let out = OutputTarget::Directory(PathBuf::from("/data/run1"));
        assert_eq!(out.log_path(), PathBuf::from("/data/run1/log.txt"));
        assert_eq!(out.frame_dir(), PathBuf::from("/data/run1"));
    }

    #[test]
    fn file_target_keeps_frames_beside_log() {
        let out = OutputTarget::LogFile(PathBuf::from("/data/run1.txt"));
        assert_eq!(out.frame_dir(), PathBuf::from("/data"));
        let bare = OutputTarget::LogFile(PathBuf::from("run1.txt"));
        assert_eq!(bare.frame_dir(), PathBuf::from("."));
    }

    #[test]
    fn rejects_bad_trigger_periods() {
        let base = RigConfig::new(OutputTarget::Directory(PathBuf::from(".")));
        let zero = base.clone().with_trigger_period(Duration::ZERO);
        assert_eq!(zero.validate(), Err(ConfigError::TriggerPeriod(Duration::ZERO)));
        let fractional = base.with_trigger_period(Duration::from_millis(1500));
        assert!(matches!(fractional.validate(), Err(ConfigError::TriggerPeriod(_))));
    }

    #[test]
    fn rejects_inconsistent_sources() {
        let base = RigConfig::new(OutputTarget::Directory(PathBuf::from(".")));
        assert_eq!(
            base.clone().with_secondary(SourceConfig::gps()).validate(),
            Err(ConfigError::SecondaryWithoutPrimary)
        );
        assert_eq!(
            base.clone()
                .with_primary(SourceConfig::imu())
                .with_secondary(SourceConfig::new(SourceTag::Gps, IMU_DEVICE, 9600))
                .validate(),
            Err(ConfigError::DuplicateDevice(IMU_DEVICE.to_string()))
        );
        assert_eq!(
            base.with_primary(SourceConfig::new(SourceTag::Imu, "/dev/ttyUSB0", 0))
                .validate(),
            Err(ConfigError::BaudRate("/dev/ttyUSB0".to_string()))
        );
    }

    #[test]
    fn imulog_filters_primary() {
        let config = Preset::Imulog.config(Path::new("out"));
        assert_eq!(
            config.primary.and_then(|p| p.filter),
            Some(FilterRule::SoleLeadingMarker('!'))
        );
        assert!(config.camera.is_none());
    }
}

pub mod cli;
pub mod clock;
pub mod config;
pub mod filter;
pub mod frames;
pub mod logger;
pub mod sink;
pub mod startup;

pub use rig_traits::{
    Camera, CameraBus, CameraError, CameraInfo, CaptureMode, Frame, LineSource, PixelFormat,
    ReadError, ReadOutcome, SourceTag, Timestamp,
};

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CameraConfig, ConfigError, OutputTarget, Preset, RigConfig, SourceConfig};
pub use filter::{FilterRule, LineFilter};
pub use frames::{frame_file_name, FrameSaveError, FrameStore, ImageFormat};
pub use logger::{CaptureError, CaptureOutcome, IterationReport, Logger, SensorChannel};
pub use sink::{RecordLog, TimestampFormat};
pub use startup::{open_logger, open_logger_with, StartupError};

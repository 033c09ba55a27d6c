use crate::clock::MonotonicClock;
use crate::config::{ConfigError, OutputTarget, RigConfig, SourceConfig};
use crate::frames::{FrameStore, ImageFormat};
use crate::logger::{Logger, SensorChannel};
use crate::sink::RecordLog;
use rig_traits::{CameraBus, CameraError, LineSource};
use serial_line::{SerialLineError, SerialLineSource};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use thiserror::Error;
use tracing::info;

/// Anything that stops the rig from starting. All of these are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot open log output {}: {source}", path.display())]
    LogOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Serial(#[from] SerialLineError),
    #[error("no cameras found on the bus")]
    NoCamera,
    #[error("camera {stage} failed: {source}")]
    Camera {
        stage: &'static str,
        #[source]
        source: CameraError,
    },
}

fn camera_error(stage: &'static str) -> impl FnOnce(CameraError) -> StartupError {
    move |source| StartupError::Camera { stage, source }
}

/// Opens every device named in `config` over real serial ports.
pub fn open_logger<B: CameraBus + ?Sized>(
    config: &RigConfig,
    bus: &mut B,
) -> Result<Logger<MonotonicClock>, StartupError> {
    open_logger_with(config, bus, |source| {
        let port = SerialLineSource::open(&source.device, source.baud_rate)?;
        Ok(Box::new(port) as Box<dyn LineSource>)
    })
}

/// Same as [`open_logger`], with the way line sources are opened supplied by
/// the caller.
///
/// Order: startup delay, log output, line sources, camera. Whatever was opened
/// before a failure is dropped (and so released) on the way out.
pub fn open_logger_with<B, F>(
    config: &RigConfig,
    bus: &mut B,
    mut open_source: F,
) -> Result<Logger<MonotonicClock>, StartupError>
where
    B: CameraBus + ?Sized,
    F: FnMut(&SourceConfig) -> Result<Box<dyn LineSource>, StartupError>,
{
    config.validate()?;

    if !config.startup_delay.is_zero() {
        info!("Waiting {:?} before opening devices", config.startup_delay);
        thread::sleep(config.startup_delay);
    }

    let sink = open_sink(config)?;
    info!("Opening: {}", config.output.log_path().display());

    let mut channels = Vec::new();
    for source in config.sources() {
        let line_source = open_source(source)?;
        let mut channel = SensorChannel::new(source.tag, line_source);
        if let Some(filter) = source.filter.clone() {
            channel = channel.with_filter(filter);
        }
        channels.push(channel);
    }

    let image_format = config
        .camera
        .map(|c| c.image_format)
        .unwrap_or(ImageFormat::Pgm);
    let frames = FrameStore::new(config.output.frame_dir(), image_format);

    let camera = match config.camera {
        Some(camera_config) => {
            let count = bus.num_cameras().map_err(camera_error("enumeration"))?;
            info!("Found: {} cameras", count);
            if count <= camera_config.index {
                return Err(StartupError::NoCamera);
            }

            let mut camera = bus
                .connect(camera_config.index, camera_config.mode)
                .map_err(camera_error("connect"))?;
            let camera_info = camera.info().map_err(camera_error("info"))?;
            println!("\n{}\n", camera_info);
            camera.start_capture().map_err(camera_error("capture start"))?;
            Some(camera)
        }
        None => None,
    };

    let mut logger = Logger::new(sink, frames, MonotonicClock::new(), config.trigger_period);
    for channel in channels {
        logger = logger.with_channel(channel);
    }
    if let Some(camera) = camera {
        logger = logger.with_camera(camera);
    }
    info!("Beginning logging");
    Ok(logger)
}

fn open_sink(config: &RigConfig) -> Result<RecordLog, StartupError> {
    let log_path = config.output.log_path();
    let to_startup_error = |source| StartupError::LogOutput {
        path: log_path.clone(),
        source,
    };

    if let OutputTarget::Directory(dir) = &config.output {
        fs::create_dir_all(dir).map_err(to_startup_error)?;
    }
    RecordLog::open(&log_path, config.timestamp_format).map_err(to_startup_error)
}

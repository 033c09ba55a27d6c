mod common;

use common::ScriptedSource;
use pgcam::sim::{SimulatedBus, SimulatedDevice};
use pgcam::UnboundBus;
use rig::{
    open_logger, open_logger_with, CameraError, ConfigError, LineSource, OutputTarget, Preset,
    RigConfig, SourceConfig, SourceTag, StartupError,
};
use std::time::Duration;
use tempfile::TempDir;

fn scripted(source: &SourceConfig) -> Result<Box<dyn LineSource>, StartupError> {
    Ok(Box::new(ScriptedSource::lines(&source.device, &[])))
}

#[test]
fn camlog_starts_with_camera_only() {
    let dir = TempDir::new().unwrap();
    let run = dir.path().join("run1");
    let config = Preset::Camlog
        .config(&run)
        .with_startup_delay(Duration::ZERO);
    let mut bus = SimulatedBus::single();

    let logger = open_logger_with(&config, &mut bus, |_| {
        panic!("camlog has no line sources")
    })
    .unwrap();

    assert!(logger.has_camera());
    assert!(logger.channel_tags().is_empty());
    assert!(run.join("log.txt").is_file());
    assert_eq!(logger.frames().dir(), run.as_path());
    assert_eq!(logger.frames().format().extension(), "bmp");
}

#[test]
fn sources_open_in_poll_order() {
    let dir = TempDir::new().unwrap();
    let config = Preset::Sensorlog.config(&dir.path().join("sensors.txt"));
    let mut opened = Vec::new();

    let logger = open_logger_with(&config, &mut SimulatedBus::default(), |source| {
        opened.push(source.device.clone());
        scripted(source)
    })
    .unwrap();

    assert_eq!(opened, vec!["/dev/ttyO2", "/dev/ttyO1"]);
    assert_eq!(logger.channel_tags(), vec![SourceTag::Imu, SourceTag::Gps]);
    assert!(!logger.has_camera());
}

#[test]
fn empty_bus_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = Preset::BblogDir.config(dir.path());
    let mut bus = SimulatedBus::new(Vec::new());

    let err = open_logger_with(&config, &mut bus, scripted).unwrap_err();
    assert!(matches!(err, StartupError::NoCamera));
}

#[test]
fn camera_presets_need_a_camera_library() {
    let dir = TempDir::new().unwrap();
    for preset in [Preset::Bblog, Preset::BblogDir, Preset::Camlog] {
        let target = dir.path().join(preset.name());
        let config = preset.config(&target).with_startup_delay(Duration::ZERO);

        let err = open_logger_with(&config, &mut UnboundBus, scripted).unwrap_err();
        assert!(
            matches!(
                err,
                StartupError::Camera {
                    stage: "enumeration",
                    source: CameraError::Device(_),
                }
            ),
            "{}: {}",
            preset,
            err
        );
    }
    assert!(image_files_under(dir.path()).is_empty());
}

#[test]
fn sensor_presets_run_without_a_camera_library() {
    let dir = TempDir::new().unwrap();
    let config = Preset::Imulog.config(dir.path());
    let logger = open_logger_with(&config, &mut UnboundBus, scripted).unwrap();
    assert!(!logger.has_camera());
}

fn image_files_under(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(image_files_under(&path));
        } else if path.extension().is_some_and(|e| e == "pgm" || e == "bmp") {
            found.push(path);
        }
    }
    found
}

#[test]
fn camera_without_software_trigger_fails_capture_start() {
    let dir = TempDir::new().unwrap();
    let config = Preset::Camlog
        .config(dir.path())
        .with_startup_delay(Duration::ZERO);
    let mut bus = SimulatedBus::new(vec![SimulatedDevice::new(64, 48).without_software_trigger()]);

    let err = open_logger_with(&config, &mut bus, scripted).unwrap_err();
    assert!(matches!(
        err,
        StartupError::Camera {
            stage: "capture start",
            source: CameraError::NotSupported(_),
        }
    ));
}

#[test]
fn invalid_config_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("log.txt");
    let config = RigConfig::new(OutputTarget::LogFile(log.clone()))
        .with_primary(SourceConfig::imu())
        .with_trigger_period(Duration::from_millis(500));

    let err = open_logger_with(&config, &mut SimulatedBus::default(), |_| {
        panic!("sources must not be opened")
    })
    .unwrap_err();
    assert!(matches!(err, StartupError::Config(ConfigError::TriggerPeriod(_))));
    assert!(!log.exists());
}

#[test]
fn log_file_in_missing_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = Preset::Sensorlog.config(&dir.path().join("absent").join("log.txt"));

    let err = open_logger_with(&config, &mut SimulatedBus::default(), scripted).unwrap_err();
    assert!(matches!(err, StartupError::LogOutput { .. }));
}

#[test]
fn existing_log_is_appended_to() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("log.txt");
    std::fs::write(&log, "imu 0 1 !previous\n").unwrap();
    let config = Preset::Imulog.config(dir.path());

    let mut logger = open_logger_with(&config, &mut SimulatedBus::default(), |_| {
        Ok(Box::new(ScriptedSource::lines("imu", &["!next"])) as Box<dyn LineSource>)
    })
    .unwrap();
    logger.step();

    let content = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "imu 0 1 !previous");
    assert!(lines[1].starts_with("imu ") && lines[1].ends_with(" !next"));
}

#[test]
fn missing_serial_device_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = RigConfig::new(OutputTarget::LogFile(dir.path().join("log.txt")))
        .with_primary(SourceConfig::new(
            SourceTag::Imu,
            "/dev/rig-no-such-port",
            57600,
        ));

    let err = open_logger(&config, &mut SimulatedBus::default()).unwrap_err();
    assert!(matches!(err, StartupError::Serial(_)));
    assert!(dir.path().join("log.txt").exists());
}

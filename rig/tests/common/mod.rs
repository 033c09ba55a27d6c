#![allow(dead_code)]

use rig::{Camera, CameraError, CameraInfo, CaptureMode, Frame, LineSource, ReadOutcome};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// Replays a fixed list of read outcomes, then reports no data forever.
pub struct ScriptedSource {
    name: String,
    script: VecDeque<ReadOutcome>,
}

impl ScriptedSource {
    pub fn new(name: &str, script: Vec<ReadOutcome>) -> Self {
        ScriptedSource {
            name: name.to_string(),
            script: script.into(),
        }
    }

    pub fn lines(name: &str, lines: &[&str]) -> Self {
        Self::new(
            name,
            lines
                .iter()
                .map(|l| ReadOutcome::Line(l.to_string()))
                .collect(),
        )
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self) -> ReadOutcome {
        self.script.pop_front().unwrap_or(ReadOutcome::NoData)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Accepts triggers but never delivers a frame.
pub struct StalledCamera {
    pub mode: CaptureMode,
}

impl Camera for StalledCamera {
    fn info(&mut self) -> Result<CameraInfo, CameraError> {
        Ok(CameraInfo::default())
    }

    fn capture_mode(&self) -> CaptureMode {
        self.mode
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn fire_trigger(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError> {
        Err(CameraError::BufferTimeout(Duration::from_secs(2)))
    }
}

/// Rejects every trigger and counts how often a buffer was asked for anyway.
#[derive(Default)]
pub struct JammedTrigger {
    pub retrieves: Rc<Cell<u32>>,
}

impl Camera for JammedTrigger {
    fn info(&mut self) -> Result<CameraInfo, CameraError> {
        Ok(CameraInfo::default())
    }

    fn capture_mode(&self) -> CaptureMode {
        CaptureMode::SoftwareTrigger
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn fire_trigger(&mut self) -> Result<(), CameraError> {
        Err(CameraError::Trigger("trigger still busy".to_string()))
    }

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError> {
        self.retrieves.set(self.retrieves.get() + 1);
        Err(CameraError::BufferTimeout(Duration::from_secs(2)))
    }
}

pub fn log_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn image_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("Image-"))
        .collect();
    names.sort();
    names
}

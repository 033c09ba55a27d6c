use crate::clock::Clock;
use crate::filter::LineFilter;
use crate::frames::{FrameSaveError, FrameStore};
use crate::sink::RecordLog;
use rig_traits::{Camera, CameraError, CaptureMode, LineSource, ReadOutcome, SourceTag, Timestamp};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to fire trigger: {0}")]
    Trigger(#[source] CameraError),
    #[error("failed to retrieve buffer: {0}")]
    Retrieve(#[source] CameraError),
    #[error(transparent)]
    Save(#[from] FrameSaveError),
}

#[derive(Debug)]
pub enum CaptureOutcome {
    /// The period elapsed but no camera is configured
    NoCamera,
    Saved(PathBuf),
    Failed(CaptureError),
}

/// What a single pass through the loop did.
#[derive(Debug, Default)]
pub struct IterationReport {
    pub logged: usize,
    pub filtered: usize,
    pub read_errors: usize,
    pub write_errors: usize,
    /// Set only on iterations where the trigger period had elapsed
    pub capture: Option<CaptureOutcome>,
}

/// A line source plus the tag and filter applied to its output.
pub struct SensorChannel {
    tag: SourceTag,
    source: Box<dyn LineSource>,
    filter: Option<Box<dyn LineFilter>>,
}

impl SensorChannel {
    pub fn new(tag: SourceTag, source: impl LineSource + 'static) -> Self {
        SensorChannel {
            tag,
            source: Box::new(source),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl LineFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn tag(&self) -> SourceTag {
        self.tag
    }

    fn accepts(&self, line: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accepts(line))
    }
}

/// Polls every channel once per iteration, then grabs a frame whenever the
/// trigger period has elapsed.
pub struct Logger<C: Clock> {
    channels: Vec<SensorChannel>,
    camera: Option<Box<dyn Camera>>,
    frames: FrameStore,
    sink: RecordLog,
    clock: C,
    period: Duration,
    last_trigger_check: Timestamp,
}

impl<C: Clock> fmt::Debug for Logger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("channels", &self.channel_tags())
            .field("camera", &self.camera.as_ref().map(|c| c.capture_mode()))
            .field("frames", &self.frames)
            .field("log", &self.sink.path())
            .field("period", &self.period)
            .field("last_trigger_check", &self.last_trigger_check)
            .finish()
    }
}

impl<C: Clock> Logger<C> {
    pub fn new(sink: RecordLog, frames: FrameStore, clock: C, period: Duration) -> Self {
        let last_trigger_check = clock.now();
        Logger {
            channels: Vec::new(),
            camera: None,
            frames,
            sink,
            clock,
            period,
            last_trigger_check,
        }
    }

    /// Channels are polled in the order they are added.
    pub fn with_channel(mut self, channel: SensorChannel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_camera(mut self, camera: Box<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn channel_tags(&self) -> Vec<SourceTag> {
        self.channels.iter().map(SensorChannel::tag).collect()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn sink(&self) -> &RecordLog {
        &self.sink
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn step(&mut self) -> IterationReport {
        let mut report = IterationReport::default();

        for channel in self.channels.iter_mut() {
            poll_channel(channel, &self.clock, &mut self.sink, &mut report);
        }

        let now = self.clock.now();
        if now.duration_since(self.last_trigger_check) >= self.period {
            // re-arm first so a slow capture cannot cause back-to-back fires
            self.last_trigger_check = now;
            report.capture = Some(self.capture(now));
        }

        report
    }

    /// Runs until the process is killed.
    pub fn run(&mut self) -> ! {
        info!(
            "Logging {:?} every iteration, capturing every {:?}{}",
            self.channel_tags(),
            self.period,
            if self.has_camera() { "" } else { " (no camera)" }
        );
        loop {
            self.step();
        }
    }

    fn capture(&mut self, now: Timestamp) -> CaptureOutcome {
        let Some(camera) = self.camera.as_mut() else {
            return CaptureOutcome::NoCamera;
        };

        match capture_frame(camera.as_mut(), &self.frames, now) {
            Ok(path) => {
                debug!("Saved {}", path.display());
                CaptureOutcome::Saved(path)
            }
            Err(e) => {
                warn!("Capture at {} failed: {}", now, e);
                CaptureOutcome::Failed(e)
            }
        }
    }
}

fn capture_frame(
    camera: &mut dyn Camera,
    frames: &FrameStore,
    now: Timestamp,
) -> Result<PathBuf, CaptureError> {
    if camera.capture_mode() == CaptureMode::SoftwareTrigger {
        camera.fire_trigger().map_err(CaptureError::Trigger)?;
    }
    let frame = camera.retrieve_buffer().map_err(CaptureError::Retrieve)?;
    Ok(frames.save(&frame, now)?)
}

fn poll_channel<C: Clock>(
    channel: &mut SensorChannel,
    clock: &C,
    sink: &mut RecordLog,
    report: &mut IterationReport,
) {
    let line = match channel.source.read_line() {
        ReadOutcome::Line(line) => line,
        ReadOutcome::NoData => return,
        ReadOutcome::Failed(e) => {
            warn!("{} read from {} failed: {}", channel.tag, channel.source.name(), e);
            report.read_errors += 1;
            return;
        }
    };

    if line.is_empty() {
        return;
    }
    if !channel.accepts(&line) {
        trace!("{} dropped: {}", channel.tag, line);
        report.filtered += 1;
        return;
    }

    let ts = clock.now();
    info!("{} {}", channel.tag, line);
    match sink.append(channel.tag, ts, &line) {
        Ok(()) => report.logged += 1,
        Err(e) => {
            warn!("Failed to write {} line to log: {}", channel.tag, e);
            report.write_errors += 1;
        }
    }
}

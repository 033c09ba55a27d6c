mod registers;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use registers::{
    CameraPower, Registers, SoftwareTrigger, TriggerInquiry, TriggerMode, SOFTWARE_TRIGGER_SOURCE,
};
pub use rig_traits::{Camera, CameraBus, CameraError, CameraInfo, CaptureMode, Frame};
use tracing::{debug, info, warn};

/// How many register reads to spend waiting on a busy bit before giving up.
pub const DEFAULT_MAX_POLLS: u32 = 10_000;

/// The vendor library surface this driver sits on: raw register access plus
/// the handful of calls that are not register writes in the vendor API.
pub trait CameraDevice {
    fn read_register(&mut self, address: u32) -> Result<u32, CameraError>;

    fn write_register(&mut self, address: u32, value: u32) -> Result<(), CameraError>;

    fn camera_info(&mut self) -> Result<CameraInfo, CameraError>;

    fn set_trigger_mode(&mut self, mode: &TriggerMode) -> Result<(), CameraError>;

    fn start_capture(&mut self) -> Result<(), CameraError>;

    fn stop_capture(&mut self) -> Result<(), CameraError>;

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError>;
}

pub struct PgCamera<D: CameraDevice> {
    device: D,
    mode: CaptureMode,
    max_polls: u32,
    capturing: bool,
    trigger_enabled: bool,
}

impl<D: CameraDevice> PgCamera<D> {
    /// Powers the camera on and, in software trigger mode, arms trigger mode 0
    /// on source 7 and waits until the first trigger can be accepted.
    pub fn open(device: D, mode: CaptureMode) -> Result<Self, CameraError> {
        Self::open_with_poll_limit(device, mode, DEFAULT_MAX_POLLS)
    }

    pub fn open_with_poll_limit(
        device: D,
        mode: CaptureMode,
        max_polls: u32,
    ) -> Result<Self, CameraError> {
        let mut cam = PgCamera {
            device,
            mode,
            max_polls,
            capturing: false,
            trigger_enabled: false,
        };

        cam.power_on()?;

        if mode == CaptureMode::SoftwareTrigger {
            cam.device.set_trigger_mode(&TriggerMode::software())?;
            cam.trigger_enabled = true;
            cam.poll_for_trigger_ready()?;
        }

        Ok(cam)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn power_on(&mut self) -> Result<(), CameraError> {
        let address = Registers::CameraPower.address();
        self.device.write_register(address, CameraPower::ON.bits())?;

        for _ in 0..self.max_polls {
            let value = CameraPower::from_bits_truncate(self.device.read_register(address)?);
            if value.contains(CameraPower::ON) {
                debug!("Camera powered up");
                return Ok(());
            }
        }
        Err(CameraError::Device(format!(
            "camera did not report power-up after {} polls",
            self.max_polls
        )))
    }

    pub fn has_software_trigger(&mut self) -> Result<bool, CameraError> {
        let value = self.device.read_register(Registers::TriggerInquiry.address())?;
        Ok(TriggerInquiry::from_bits_truncate(value).contains(TriggerInquiry::SOFTWARE_TRIGGER))
    }

    /// Spins on the software trigger register until the busy bit clears.
    pub fn poll_for_trigger_ready(&mut self) -> Result<(), CameraError> {
        let address = Registers::SoftwareTrigger.address();
        for _ in 0..self.max_polls {
            let value = SoftwareTrigger::from_bits_truncate(self.device.read_register(address)?);
            if !value.contains(SoftwareTrigger::FIRE) {
                return Ok(());
            }
        }
        Err(CameraError::Trigger(format!(
            "trigger still busy after {} polls",
            self.max_polls
        )))
    }
}

impl<D: CameraDevice> Camera for PgCamera<D> {
    fn info(&mut self) -> Result<CameraInfo, CameraError> {
        self.device.camera_info()
    }

    fn capture_mode(&self) -> CaptureMode {
        self.mode
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        self.device.start_capture()?;
        self.capturing = true;

        if self.mode == CaptureMode::SoftwareTrigger && !self.has_software_trigger()? {
            return Err(CameraError::NotSupported(
                "software trigger not implemented on this camera".to_string(),
            ));
        }
        info!("Capture started ({})", self.mode);
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        self.device.stop_capture()?;
        self.capturing = false;
        Ok(())
    }

    fn fire_trigger(&mut self) -> Result<(), CameraError> {
        if self.mode != CaptureMode::SoftwareTrigger {
            return Err(CameraError::NotSupported(format!(
                "cannot fire a trigger in {} mode",
                self.mode
            )));
        }
        self.poll_for_trigger_ready()?;
        self.device
            .write_register(Registers::SoftwareTrigger.address(), SoftwareTrigger::FIRE.bits())
    }

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError> {
        self.device.retrieve_buffer()
    }
}

/// The bus seen when no vendor camera library is linked into the build.
///
/// Enumeration fails, so anything that needs a camera stops at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundBus;

impl UnboundBus {
    fn unbound() -> CameraError {
        CameraError::Device("no camera library is linked into this build".to_string())
    }
}

impl CameraBus for UnboundBus {
    fn num_cameras(&mut self) -> Result<u32, CameraError> {
        Err(Self::unbound())
    }

    fn connect(&mut self, _index: u32, _mode: CaptureMode) -> Result<Box<dyn Camera>, CameraError> {
        Err(Self::unbound())
    }
}

impl<D: CameraDevice> Drop for PgCamera<D> {
    fn drop(&mut self) {
        if self.capturing {
            if let Err(e) = self.device.stop_capture() {
                warn!("Failed to stop capture: {}", e);
            }
        }
        if self.trigger_enabled {
            if let Err(e) = self.device.set_trigger_mode(&TriggerMode::off()) {
                warn!("Failed to turn trigger mode off: {}", e);
            }
        }
    }
}

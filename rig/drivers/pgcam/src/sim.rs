//! In-process stand-in for a camera on the vendor bus.
//!
//! Emulates the power, trigger inquiry and software trigger registers closely
//! enough to drive [`PgCamera`](crate::PgCamera) through its full sequence,
//! and renders a moving gradient as frame content.

use crate::registers::{CameraPower, Registers, SoftwareTrigger, TriggerInquiry, TriggerMode};
use crate::{CameraDevice, PgCamera};
use rig_traits::{Camera, CameraBus, CameraError, CameraInfo, CaptureMode, Frame, PixelFormat};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const POWER_UP_READS: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub powered: bool,
    pub capturing: bool,
    pub trigger_mode: TriggerMode,
    pub pending_triggers: u32,
    pub triggers_fired: u64,
    pub sequence: u64,
    power_up_remaining: Option<u32>,
    busy_remaining: u32,
    registers: HashMap<u32, u32>,
}

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    width: u32,
    height: u32,
    serial_number: u32,
    busy_reads: u32,
    software_trigger: bool,
    grab_timeout: Duration,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDevice {
    pub fn new(width: u32, height: u32) -> Self {
        SimulatedDevice {
            width,
            height,
            serial_number: 13_020_001,
            busy_reads: 0,
            software_trigger: true,
            grab_timeout: Duration::from_secs(2),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Number of reads the trigger register stays busy after each fire.
    pub fn with_busy_reads(mut self, reads: u32) -> Self {
        self.busy_reads = reads;
        self
    }

    pub fn with_serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = serial_number;
        self
    }

    pub fn without_software_trigger(mut self) -> Self {
        self.software_trigger = false;
        self
    }

    /// Same settings, fresh register state.
    pub fn fresh(&self) -> Self {
        SimulatedDevice {
            state: Arc::new(Mutex::new(SimState::default())),
            ..self.clone()
        }
    }

    /// Shared view of the emulated state; stays valid after the device is dropped.
    pub fn state_handle(&self) -> Arc<Mutex<SimState>> {
        Arc::clone(&self.state)
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.state
            .lock()
            .map(|s| s.trigger_mode)
            .unwrap_or_default()
    }

    pub fn triggers_fired(&self) -> u64 {
        self.state.lock().map(|s| s.triggers_fired).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, SimState>, CameraError> {
        self.state
            .lock()
            .map_err(|e| CameraError::Device(format!("simulated state poisoned: {}", e)))
    }

    fn render(&self, sequence: u64) -> Frame {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x as u64 + y as u64 + sequence) % 256) as u8);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            format: PixelFormat::Mono8,
            data,
            sequence,
        }
    }
}

impl CameraDevice for SimulatedDevice {
    fn read_register(&mut self, address: u32) -> Result<u32, CameraError> {
        let software_trigger = self.software_trigger;
        let mut state = self.state()?;

        let value = match address {
            a if a == Registers::CameraPower.address() => match state.power_up_remaining {
                Some(0) => {
                    state.powered = true;
                    CameraPower::ON.bits()
                }
                Some(n) => {
                    state.power_up_remaining = Some(n - 1);
                    0
                }
                None => 0,
            },
            a if a == Registers::TriggerInquiry.address() => {
                if software_trigger {
                    TriggerInquiry::SOFTWARE_TRIGGER.bits()
                } else {
                    0
                }
            }
            a if a == Registers::SoftwareTrigger.address() => {
                if state.busy_remaining > 0 {
                    state.busy_remaining -= 1;
                    SoftwareTrigger::FIRE.bits()
                } else {
                    0
                }
            }
            a => state.registers.get(&a).copied().unwrap_or(0),
        };
        Ok(value)
    }

    fn write_register(&mut self, address: u32, value: u32) -> Result<(), CameraError> {
        let busy_reads = self.busy_reads;
        let mut state = self.state()?;

        match address {
            a if a == Registers::CameraPower.address() => {
                if CameraPower::from_bits_truncate(value).contains(CameraPower::ON) {
                    if !state.powered && state.power_up_remaining.is_none() {
                        state.power_up_remaining = Some(POWER_UP_READS);
                    }
                } else {
                    state.powered = false;
                    state.power_up_remaining = None;
                }
            }
            a if a == Registers::SoftwareTrigger.address() => {
                if !SoftwareTrigger::from_bits_truncate(value).contains(SoftwareTrigger::FIRE) {
                    return Ok(());
                }
                if state.busy_remaining > 0 {
                    return Err(CameraError::Trigger("trigger fired while busy".to_string()));
                }
                state.triggers_fired += 1;
                state.busy_remaining = busy_reads;
                if state.capturing && state.trigger_mode.on_off {
                    state.pending_triggers += 1;
                }
            }
            a => {
                state.registers.insert(a, value);
            }
        }
        Ok(())
    }

    fn camera_info(&mut self) -> Result<CameraInfo, CameraError> {
        Ok(CameraInfo {
            serial_number: self.serial_number,
            model_name: "Simulated IIDC Camera".to_string(),
            vendor_name: "rig".to_string(),
            sensor_info: "Simulated CCD (Mono8)".to_string(),
            sensor_resolution: format!("{}x{}", self.width, self.height),
            firmware_version: "sim-1.0".to_string(),
            firmware_build_time: "n/a".to_string(),
        })
    }

    fn set_trigger_mode(&mut self, mode: &TriggerMode) -> Result<(), CameraError> {
        let mut state = self.state()?;
        if !state.powered {
            return Err(CameraError::Device("camera is not powered".to_string()));
        }
        state.trigger_mode = *mode;
        Ok(())
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        let mut state = self.state()?;
        if !state.powered {
            return Err(CameraError::Capture("camera is not powered".to_string()));
        }
        if state.capturing {
            return Err(CameraError::Capture("isochronous capture already started".to_string()));
        }
        state.capturing = true;
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        let mut state = self.state()?;
        state.capturing = false;
        state.pending_triggers = 0;
        Ok(())
    }

    fn retrieve_buffer(&mut self) -> Result<Frame, CameraError> {
        let sequence = {
            let mut state = self.state()?;
            if !state.capturing {
                return Err(CameraError::Capture("capture not started".to_string()));
            }
            if state.trigger_mode.on_off {
                if state.pending_triggers == 0 {
                    return Err(CameraError::BufferTimeout(self.grab_timeout));
                }
                state.pending_triggers -= 1;
            }
            state.sequence += 1;
            state.sequence
        };
        debug!("Simulated frame {}", sequence);
        Ok(self.render(sequence))
    }
}

/// A bus populated with simulated cameras.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    cameras: Vec<SimulatedDevice>,
}

impl SimulatedBus {
    pub fn new(cameras: Vec<SimulatedDevice>) -> Self {
        SimulatedBus { cameras }
    }

    /// One 640x480 camera, the default rig setup.
    pub fn single() -> Self {
        SimulatedBus::new(vec![SimulatedDevice::new(640, 480)])
    }
}

impl CameraBus for SimulatedBus {
    fn num_cameras(&mut self) -> Result<u32, CameraError> {
        Ok(self.cameras.len() as u32)
    }

    fn connect(&mut self, index: u32, mode: CaptureMode) -> Result<Box<dyn Camera>, CameraError> {
        let device = self
            .cameras
            .get(index as usize)
            .ok_or_else(|| CameraError::Device(format!("no camera at index {}", index)))?
            .fresh();
        Ok(Box::new(PgCamera::open(device, mode)?))
    }
}

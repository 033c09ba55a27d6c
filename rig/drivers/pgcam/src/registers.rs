use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registers {
    TriggerInquiry = 0x530,
    CameraPower = 0x610,
    SoftwareTrigger = 0x62C,
}

impl Registers {
    pub const fn address(self) -> u32 {
        self as u32
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TriggerInquiry: u32 {
        const SOFTWARE_TRIGGER = 0x0001_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CameraPower: u32 {
        const ON = 0x8000_0000;
    }
}

bitflags! {
    /// Writing `FIRE` requests a frame; the same bit reads back set until the
    /// camera can accept another trigger.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SoftwareTrigger: u32 {
        const FIRE = 0x8000_0000;
    }
}

/// Trigger source 7 selects the software trigger register.
pub const SOFTWARE_TRIGGER_SOURCE: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerMode {
    pub on_off: bool,
    pub mode: u32,
    pub parameter: u32,
    pub source: u32,
}

impl TriggerMode {
    /// Mode 0 (one exposure per trigger) driven from the software register.
    pub const fn software() -> Self {
        TriggerMode {
            on_off: true,
            mode: 0,
            parameter: 0,
            source: SOFTWARE_TRIGGER_SOURCE,
        }
    }

    pub const fn off() -> Self {
        TriggerMode {
            on_off: false,
            mode: 0,
            parameter: 0,
            source: 0,
        }
    }
}

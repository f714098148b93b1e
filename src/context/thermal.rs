//! Heater control settings

/// Placeholder written for PID terms when the capability is absent
pub const PID_PLACEHOLDER: f32 = 3000.0;

const DEFAULT_HOTEND_PID: Pid = Pid {
    p: 22.2,
    i: 1.08,
    d: 114.0,
};
const DEFAULT_BED_PID: Pid = Pid {
    p: 10.0,
    i: 0.023,
    d: 305.4,
};
const DEFAULT_LPQ_LEN: i16 = 20;

const DEFAULT_PREHEAT: [PreheatPreset; 2] = [
    PreheatPreset {
        hotend_temp: 180,
        bed_temp: 70,
        fan_speed: 0,
    },
    PreheatPreset {
        hotend_temp: 240,
        bed_temp: 110,
        fan_speed: 0,
    },
];

/// PID gain triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pid {
    /// Proportional gain
    pub p: f32,
    /// Integral gain
    pub i: f32,
    /// Derivative gain
    pub d: f32,
}

/// One preheat preset (material profile)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreheatPreset {
    /// Hotend target (degrees C)
    pub hotend_temp: i16,
    /// Bed target (degrees C)
    pub bed_temp: i16,
    /// Fan speed (0-255)
    pub fan_speed: u8,
}

/// Heater control settings
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSettings {
    /// Hotend PID gains (meaningful with `PID_TUNING`)
    pub hotend_pid: Pid,
    /// Smoothing queue length for PID extrusion scaling
    pub lpq_len: i16,
    /// Bed PID gains (meaningful with `BED_PID`)
    pub bed_pid: Pid,
    /// Preheat presets selectable from the UI
    pub preheat: [PreheatPreset; 2],
}

impl Default for ThermalSettings {
    fn default() -> Self {
        Self {
            hotend_pid: DEFAULT_HOTEND_PID,
            lpq_len: DEFAULT_LPQ_LEN,
            bed_pid: DEFAULT_BED_PID,
            preheat: DEFAULT_PREHEAT,
        }
    }
}

//! Stepper driver and mechanics compensation settings

/// Default PWM motor current X/Z/E (mA)
const DEFAULT_MOTOR_CURRENT: [u32; 3] = [1300, 1300, 1250];

/// Backlash smoothing written as a placeholder when `BACKLASH` is absent
pub const BACKLASH_SMOOTHING_PLACEHOLDER: f32 = 3.0;

/// Stepper driver and mechanics compensation
#[derive(Debug, Clone, PartialEq)]
pub struct DriveSettings {
    /// PWM motor current X/Z/E (meaningful with `MOTOR_CURRENT`)
    pub motor_current: [u32; 3],
    /// Backlash distance per axis (meaningful with `BACKLASH`)
    pub backlash_distance: [f32; 3],
    /// Backlash correction amount, 0-255 maps 0-100%
    pub backlash_correction: u8,
    /// Backlash smoothing distance (mm)
    pub backlash_smoothing: f32,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            motor_current: DEFAULT_MOTOR_CURRENT,
            backlash_distance: [0.0; 3],
            backlash_correction: 0,
            backlash_smoothing: BACKLASH_SMOOTHING_PLACEHOLDER,
        }
    }
}

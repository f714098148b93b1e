//! Planner motion limit settings
//!
//! Per-channel arrays cover the three primary axes plus up to
//! [`MAX_EXTRA_CHANNELS`](super::MAX_EXTRA_CHANNELS) extra actuator
//! channels; only the first `BuildProfile::channel_count()` entries are
//! meaningful on a given build. Extra channels added after a record was
//! written receive the per-channel defaults below.

use super::MAX_CHANNELS;

// --- Defaults ---
// Per-channel default tables cover X, Y, Z and one generic extra channel;
// channels past the table reuse its last entry.

const DEFAULT_MAX_ACCELERATION: [u32; 4] = [3000, 3000, 100, 10_000];
const DEFAULT_STEPS_PER_UNIT: [f32; 4] = [80.0, 80.0, 400.0, 500.0];
const DEFAULT_MAX_FEEDRATE: [f32; 4] = [300.0, 300.0, 5.0, 25.0];

const DEFAULT_MIN_SEGMENT_TIME_US: u32 = 20_000;
const DEFAULT_ACCELERATION: f32 = 3000.0;
const DEFAULT_RETRACT_ACCELERATION: f32 = 3000.0;
const DEFAULT_TRAVEL_ACCELERATION: f32 = 3000.0;
const DEFAULT_MIN_FEEDRATE: f32 = 0.0;
const DEFAULT_MIN_TRAVEL_FEEDRATE: f32 = 0.0;
const DEFAULT_MAX_JERK: [f32; 4] = [10.0, 10.0, 0.4, 5.0];
const DEFAULT_JUNCTION_DEVIATION: f32 = 0.013;

/// Per-channel default acceleration, reusing the last table entry past Z+1
pub fn default_max_acceleration(channel: usize) -> u32 {
    DEFAULT_MAX_ACCELERATION[channel.min(DEFAULT_MAX_ACCELERATION.len() - 1)]
}

/// Per-channel default steps-per-unit
pub fn default_steps_per_unit(channel: usize) -> f32 {
    DEFAULT_STEPS_PER_UNIT[channel.min(DEFAULT_STEPS_PER_UNIT.len() - 1)]
}

/// Per-channel default maximum feedrate
pub fn default_max_feedrate(channel: usize) -> f32 {
    DEFAULT_MAX_FEEDRATE[channel.min(DEFAULT_MAX_FEEDRATE.len() - 1)]
}

/// Planner motion limits
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    /// Maximum acceleration per channel (units/s^2)
    pub max_acceleration: [u32; MAX_CHANNELS],
    /// Steps per unit per channel
    pub steps_per_unit: [f32; MAX_CHANNELS],
    /// Maximum feedrate per channel (units/s)
    pub max_feedrate: [f32; MAX_CHANNELS],
    /// Minimum planner segment time (microseconds)
    pub min_segment_time_us: u32,
    /// Default move acceleration (units/s^2)
    pub acceleration: f32,
    /// Retract acceleration (units/s^2)
    pub retract_acceleration: f32,
    /// Travel (non-extruding) acceleration (units/s^2)
    pub travel_acceleration: f32,
    /// Minimum feedrate for moves (units/s)
    pub min_feedrate: f32,
    /// Minimum feedrate for travel moves (units/s)
    pub min_travel_feedrate: f32,
    /// Classic jerk limits X/Y/Z/E (meaningful with `CLASSIC_JERK`)
    pub max_jerk: [f32; 4],
    /// Junction deviation (meaningful without `CLASSIC_JERK`)
    pub junction_deviation: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        let mut max_acceleration = [0u32; MAX_CHANNELS];
        let mut steps_per_unit = [0f32; MAX_CHANNELS];
        let mut max_feedrate = [0f32; MAX_CHANNELS];
        for i in 0..MAX_CHANNELS {
            max_acceleration[i] = default_max_acceleration(i);
            steps_per_unit[i] = default_steps_per_unit(i);
            max_feedrate[i] = default_max_feedrate(i);
        }
        Self {
            max_acceleration,
            steps_per_unit,
            max_feedrate,
            min_segment_time_us: DEFAULT_MIN_SEGMENT_TIME_US,
            acceleration: DEFAULT_ACCELERATION,
            retract_acceleration: DEFAULT_RETRACT_ACCELERATION,
            travel_acceleration: DEFAULT_TRAVEL_ACCELERATION,
            min_feedrate: DEFAULT_MIN_FEEDRATE,
            min_travel_feedrate: DEFAULT_MIN_TRAVEL_FEEDRATE,
            max_jerk: DEFAULT_MAX_JERK,
            junction_deviation: DEFAULT_JUNCTION_DEVIATION,
        }
    }
}

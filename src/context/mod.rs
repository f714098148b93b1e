//! Live settings state and build configuration
//!
//! This module provides the [`SettingsContext`] that the record protocol
//! streams to and from the medium, plus the [`BuildProfile`] describing
//! which capabilities the current firmware build carries.
//!
//! The context is an explicit object passed by reference into the codec, so
//! the record protocol has no hidden coupling to subsystem internals beyond
//! the field list. The profile is resolved once at start-up and consulted at
//! each feature-gated field; feature-gated fields occupy their full width in
//! every record regardless of the profile, so offsets never shift between
//! builds sharing a version tag.

pub mod drive;
pub mod geometry;
pub mod leveling;
pub mod material;
pub mod motion;
pub mod thermal;

pub use drive::DriveSettings;
pub use geometry::GeometrySettings;
pub use leveling::{LevelingSettings, MeshGrid};
pub use material::MaterialSettings;
pub use motion::MotionSettings;
pub use thermal::{Pid, PreheatPreset, ThermalSettings};

use bitflags::bitflags;

/// Primary motion axes (X, Y, Z)
pub const AXES: usize = 3;

/// Maximum extra actuator channels beyond the primary axes
pub const MAX_EXTRA_CHANNELS: usize = 5;

/// Maximum per-channel array length (axes + extra channels)
pub const MAX_CHANNELS: usize = AXES + MAX_EXTRA_CHANNELS;

/// Maximum tool count (one tool per extra channel, plus the first)
pub const MAX_TOOLS: usize = 1 + MAX_EXTRA_CHANNELS;

/// Maximum calibration grid dimension per side
pub const GRID_MAX_POINTS: usize = 9;

bitflags! {
    /// Compiled feature set, resolved once at start-up
    ///
    /// Replaces conditional compilation at each feature-gated field: the
    /// codec consults these flags to decide whether a field carries live
    /// state or a neutral placeholder of identical width.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Capabilities: u32 {
        /// Classic per-axis jerk limits (otherwise junction deviation)
        const CLASSIC_JERK     = 1 << 0;
        /// Per-tool nozzle offsets
        const TOOL_OFFSETS     = 1 << 1;
        /// Filament runout sensor
        const RUNOUT_SENSOR    = 1 << 2;
        /// Leveling fade height
        const LEVELING_FADE    = 1 << 3;
        /// Mesh bed leveling grid
        const MESH_LEVELING    = 1 << 4;
        /// Bed probe with XYZ offset
        const BED_PROBE        = 1 << 5;
        /// Hotend PID control
        const PID_TUNING       = 1 << 6;
        /// Heated bed PID control
        const BED_PID          = 1 << 7;
        /// Linear pressure advance
        const LINEAR_ADVANCE   = 1 << 8;
        /// PWM motor current control
        const MOTOR_CURRENT    = 1 << 9;
        /// XY/XZ/YZ skew correction
        const SKEW_CORRECTION  = 1 << 10;
        /// Backlash compensation
        const BACKLASH         = 1 << 11;
        /// Persist the active mesh slot on every save
        const MESH_AUTOSAVE    = 1 << 12;
    }
}

/// Build configuration consulted by the record codec
///
/// `extra_channels` and the grid dimensions are build-time quantities in
/// spirit, but carried as runtime values so the field-order invariant stays
/// enforceable and testable without recompiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuildProfile {
    /// Capability set for feature-gated fields
    pub caps: Capabilities,
    /// Extra actuator channels beyond X/Y/Z (0..=MAX_EXTRA_CHANNELS)
    pub extra_channels: u8,
    /// Calibration grid points along X (1..=GRID_MAX_POINTS)
    pub grid_points_x: u8,
    /// Calibration grid points along Y (1..=GRID_MAX_POINTS)
    pub grid_points_y: u8,
}

impl BuildProfile {
    /// Per-channel array length for this build (axes + extra channels)
    pub fn channel_count(&self) -> usize {
        AXES + self.extra_channels as usize
    }

    /// Tool count for this build (first tool + one per extra channel)
    pub fn tool_count(&self) -> usize {
        1 + self.extra_channels as usize
    }

    /// Whether every count fits the compiled maxima
    pub fn is_valid(&self) -> bool {
        self.extra_channels as usize <= MAX_EXTRA_CHANNELS
            && (1..=GRID_MAX_POINTS).contains(&(self.grid_points_x as usize))
            && (1..=GRID_MAX_POINTS).contains(&(self.grid_points_y as usize))
    }

    /// Whether a capability is present in this build
    pub fn has(&self, cap: Capabilities) -> bool {
        self.caps.contains(cap)
    }
}

impl Default for BuildProfile {
    fn default() -> Self {
        Self {
            caps: Capabilities::TOOL_OFFSETS
                | Capabilities::RUNOUT_SENSOR
                | Capabilities::LEVELING_FADE
                | Capabilities::MESH_LEVELING
                | Capabilities::BED_PROBE
                | Capabilities::PID_TUNING
                | Capabilities::BED_PID
                | Capabilities::LINEAR_ADVANCE
                | Capabilities::MOTOR_CURRENT
                | Capabilities::SKEW_CORRECTION
                | Capabilities::BACKLASH,
            extra_channels: 1,
            grid_points_x: 5,
            grid_points_y: 5,
        }
    }
}

/// Live subsystem state persisted by the settings record
///
/// `Default` yields the hardcoded factory defaults, the same values
/// `reset()` installs.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsContext {
    /// Planner motion limits
    pub motion: MotionSettings,
    /// Workspace and probe geometry
    pub geometry: GeometrySettings,
    /// Bed leveling state and calibration grid
    pub leveling: LevelingSettings,
    /// Heater control settings
    pub thermal: ThermalSettings,
    /// Filament and extrusion settings
    pub material: MaterialSettings,
    /// Stepper driver and mechanics compensation
    pub drive: DriveSettings,
}

impl SettingsContext {
    /// Factory defaults sized for the given build profile
    pub fn defaults(profile: &BuildProfile) -> Self {
        Self {
            motion: MotionSettings::default(),
            geometry: GeometrySettings::default(),
            leveling: LevelingSettings::defaults(profile.grid_points_x, profile.grid_points_y),
            thermal: ThermalSettings::default(),
            material: MaterialSettings::default(),
            drive: DriveSettings::default(),
        }
    }
}

impl Default for SettingsContext {
    fn default() -> Self {
        Self::defaults(&BuildProfile::default())
    }
}

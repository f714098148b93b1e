//! Filament and extrusion settings
//!
//! Per-tool arrays are sized for the compiled maximum; only the leading
//! `BuildProfile::tool_count()` entries are meaningful.

use super::MAX_TOOLS;

/// Default filament diameter per tool (mm)
pub const DEFAULT_FILAMENT_DIAMETER: f32 = 1.75;

/// Default pressure advance gain per tool
pub const DEFAULT_ADVANCE_K: f32 = 0.0;

/// Default runout trigger distance (mm)
const DEFAULT_RUNOUT_DISTANCE: f32 = 25.0;

/// Runout distance written as a placeholder when `RUNOUT_SENSOR` is absent
pub const RUNOUT_DISTANCE_PLACEHOLDER: f32 = 0.0;

/// Filament handling settings
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSettings {
    /// Runout sensor armed (meaningful with `RUNOUT_SENSOR`)
    pub runout_enabled: bool,
    /// Filament travel after runout triggers (mm)
    pub runout_distance: f32,
    /// Volumetric extrusion enabled
    pub volumetric_enabled: bool,
    /// Filament diameter per tool (mm)
    pub filament_diameter: [f32; MAX_TOOLS],
    /// Pressure advance gain per tool (meaningful with `LINEAR_ADVANCE`)
    pub advance_k: [f32; MAX_TOOLS],
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            runout_enabled: true,
            runout_distance: DEFAULT_RUNOUT_DISTANCE,
            volumetric_enabled: false,
            filament_diameter: [DEFAULT_FILAMENT_DIAMETER; MAX_TOOLS],
            advance_k: [DEFAULT_ADVANCE_K; MAX_TOOLS],
        }
    }
}

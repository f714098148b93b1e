//! Bed leveling state and the calibration mesh grid

use super::GRID_MAX_POINTS;

/// Fade height written as a placeholder when `LEVELING_FADE` is absent
pub const FADE_HEIGHT_PLACEHOLDER: f32 = 10.0;

/// No mesh slot selected
pub const MESH_SLOT_NONE: i8 = -1;

/// A 2-D calibration grid of Z compensation values
///
/// Storage is sized for the compiled maximum; only the leading
/// `points_x` x `points_y` cells are meaningful. A grid whose stored
/// dimensions do not match the current build is stale and is replaced with
/// the flat state via [`MeshGrid::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGrid {
    /// Z offset applied on top of the grid
    pub z_offset: f32,
    /// Grid points along X
    pub points_x: u8,
    /// Grid points along Y
    pub points_y: u8,
    /// Z compensation values, indexed `[x][y]`
    pub z_values: [[f32; GRID_MAX_POINTS]; GRID_MAX_POINTS],
}

impl MeshGrid {
    /// A flat (all-zero) grid with the given dimensions
    pub fn flat(points_x: u8, points_y: u8) -> Self {
        Self {
            z_offset: 0.0,
            points_x,
            points_y,
            z_values: [[0.0; GRID_MAX_POINTS]; GRID_MAX_POINTS],
        }
    }

    /// Reset to the flat state, keeping the given dimensions
    pub fn reset(&mut self, points_x: u8, points_y: u8) {
        *self = Self::flat(points_x, points_y);
    }

    /// Payload size in bytes when streamed (dimensions excluded)
    pub fn payload_len(&self) -> usize {
        self.points_x as usize * self.points_y as usize * core::mem::size_of::<f32>()
    }
}

/// Leveling state persisted with the main record
#[derive(Debug, Clone, PartialEq)]
pub struct LevelingSettings {
    /// Height at which leveling compensation fades out (`LEVELING_FADE`)
    pub z_fade_height: f32,
    /// Active calibration mesh (`MESH_LEVELING`)
    pub mesh: MeshGrid,
    /// Whether leveling compensation is applied to moves
    pub leveling_active: bool,
    /// Mesh slot the active mesh was loaded from, or [`MESH_SLOT_NONE`]
    pub mesh_slot: i8,
    /// Skew correction factors XY/XZ/YZ (`SKEW_CORRECTION`)
    pub skew_factor: [f32; 3],
}

impl LevelingSettings {
    /// Factory defaults with a flat mesh of the given dimensions
    pub fn defaults(points_x: u8, points_y: u8) -> Self {
        Self {
            z_fade_height: 0.0,
            mesh: MeshGrid::flat(points_x, points_y),
            leveling_active: false,
            mesh_slot: MESH_SLOT_NONE,
            skew_factor: [0.0; 3],
        }
    }
}

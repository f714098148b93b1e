//! Record and slot region layout calculations
//!
//! Every size and offset here is a pure function over the current build
//! counts, never a cached value, so the math stays correct across builds
//! whose record sizes differ.
//!
//! # Medium Layout
//!
//! ```text
//! [Reserved]        0 .. RECORD_OFFSET            host scratch, untouched
//! [Settings Record] RECORD_OFFSET ..              header + field stream
//! [Float Gap]       record end .. meshes_start    padding, lets the record
//!                                                 grow without moving slots
//! [Mesh Slots]      meshes_start .. meshes_end    slot N-1 first, slot 0
//!                                                 last (packed downward)
//! [Tail Reserved]   meshes_end .. capacity        TAIL_RESERVED bytes
//! ```

use crate::context::BuildProfile;

/// Byte offset of the settings record on the medium
pub const RECORD_OFFSET: u32 = 100;

/// Bytes reserved at the very end of the medium for host bookkeeping
pub const TAIL_RESERVED: u32 = 129;

/// Record header: 4-byte version tag + 2-byte checksum
pub const HEADER_SIZE: u32 = 6;

/// CRC-16 trailer appended to each mesh slot
pub const SLOT_CRC_SIZE: u32 = 2;

/// Padding added past the record end before the slot region may begin
const MESH_START_PAD: u32 = 32;

/// Body bytes for the motion section (per-channel arrays plus scalars)
fn motion_len(extra_channels: u8) -> u32 {
    let channels = 3 + extra_channels as u32;
    // max_acceleration + steps_per_unit + max_feedrate arrays,
    // min_segment_time, five f32 scalars, jerk quad, junction deviation
    channels * 12 + 4 + 20 + 16 + 4
}

/// Body bytes for the mesh section (z_offset, dims, grid payload)
fn mesh_len(grid_x: u8, grid_y: u8) -> u32 {
    6 + grid_payload_len(grid_x, grid_y)
}

/// Grid payload bytes for the given dimensions
pub fn grid_payload_len(grid_x: u8, grid_y: u8) -> u32 {
    grid_x as u32 * grid_y as u32 * 4
}

/// Body bytes for the per-tool volumetrics section
fn volumetrics_len(extra_channels: u8) -> u32 {
    let tools = 1 + extra_channels as u32;
    // volumetric_enabled + filament_diameter + advance_k
    1 + tools * 8
}

/// Total record size (header included) for the given stored counts
///
/// `save` checks this against the current profile; `load` checks it against
/// the counts read from the record, so legitimate cardinality differences
/// reconcile instead of tripping the size gate.
pub fn record_size(extra_channels: u8, grid_x: u8, grid_y: u8) -> u16 {
    let body = 1                                  // extra_channels
        + motion_len(extra_channels)
        + 24                                      // home_offset + tool_offset
        + 5                                       // runout enabled + distance
        + 4                                       // z_fade_height
        + mesh_len(grid_x, grid_y)
        + 12                                      // probe_offset
        + 2                                       // leveling_active + mesh_slot
        + 10                                      // preheat presets
        + 26                                      // hotend PID + lpq_len + bed PID
        + volumetrics_len(extra_channels)
        + 12                                      // motor_current
        + 12                                      // skew_factor
        + 17; // backlash distance + correction + smoothing
    (HEADER_SIZE + body) as u16
}

/// Record size for the current build profile
pub fn record_size_for(profile: &BuildProfile) -> u16 {
    record_size(profile.extra_channels, profile.grid_points_x, profile.grid_points_y)
}

/// Record offset of the home_offset field (debug cross-check anchor)
pub fn offset_of_home_offset(extra_channels: u8) -> u32 {
    HEADER_SIZE + 1 + motion_len(extra_channels)
}

/// Record offset of the probe_offset field (debug cross-check anchor)
pub fn offset_of_probe_offset(extra_channels: u8, grid_x: u8, grid_y: u8) -> u32 {
    offset_of_home_offset(extra_channels) + 24 + 5 + 4 + mesh_len(grid_x, grid_y)
}

/// One past the last byte usable by mesh slots
pub fn meshes_end(capacity: u32) -> u32 {
    capacity.saturating_sub(TAIL_RESERVED)
}

/// First byte usable by mesh slots
///
/// The record end is padded and aligned down to 8 bytes so the record can
/// float up or down a little across versions without relocating slots.
pub fn meshes_start(profile: &BuildProfile) -> u32 {
    (RECORD_OFFSET + record_size_for(profile) as u32 + MESH_START_PAD) & !0x7
}

/// Stride of one mesh slot: grid payload plus its own checksum
pub fn slot_stride(profile: &BuildProfile) -> u32 {
    grid_payload_len(profile.grid_points_x, profile.grid_points_y) + SLOT_CRC_SIZE
}

/// Number of whole slots that fit between the record and the tail reserve
pub fn num_slots(capacity: u32, profile: &BuildProfile) -> u8 {
    let end = meshes_end(capacity);
    let start = meshes_start(profile);
    if end <= start {
        return 0;
    }
    let slots = (end - start) / slot_stride(profile);
    slots.min(u8::MAX as u32) as u8
}

/// Medium offset of slot `slot` (slots packed downward from `meshes_end`)
pub fn slot_offset(capacity: u32, profile: &BuildProfile, slot: u8) -> u32 {
    meshes_end(capacity) - (slot as u32 + 1) * slot_stride(profile)
}

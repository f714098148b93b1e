//! Settings record protocol: save, validate, load, reset
//!
//! The record is an offset-based packed stream: field order between the
//! write walk and the read walk is byte-identical, and any change to field
//! order, presence rules, or width requires bumping [`RECORD_VERSION`].
//!
//! Loading is two-phase. `validate()` streams the whole record into scratch
//! state, gating on version, size, and checksum; only when that passes does
//! `load()` re-run the identical byte walk committing into live state. A
//! corrupt or incompatible record therefore never partially mutates the
//! [`SettingsContext`].
//!
//! # Record Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Version tag: [u8; 4], b"S12\0"                │  RECORD_OFFSET + 0
//! ├───────────────────────────────────────────────┤
//! │ Checksum: u16 LE (CRC-16/XMODEM over body)    │  RECORD_OFFSET + 4
//! ├───────────────────────────────────────────────┤
//! │ extra_channels: u8                            │  RECORD_OFFSET + 6
//! │ Field stream, canonical order (see walks)     │
//! └───────────────────────────────────────────────┘
//! ```

use crate::codec::RecordStream;
use crate::context::drive::BACKLASH_SMOOTHING_PLACEHOLDER;
use crate::context::leveling::FADE_HEIGHT_PLACEHOLDER;
use crate::context::material::{
    DEFAULT_ADVANCE_K, DEFAULT_FILAMENT_DIAMETER, RUNOUT_DISTANCE_PLACEHOLDER,
};
use crate::context::motion::{
    default_max_acceleration, default_max_feedrate, default_steps_per_unit,
};
use crate::context::thermal::PID_PLACEHOLDER;
use crate::context::{
    BuildProfile, Capabilities, SettingsContext, MAX_CHANNELS, MAX_TOOLS,
};
use crate::error::{MediumError, Result, SettingsError};
use crate::layout;
use crate::medium::StorageMedium;

/// Version tag of the current record layout
///
/// Only the first three bytes participate in the version gate; the fourth
/// is a build-variant marker excluded from the comparison.
pub const RECORD_VERSION: [u8; 4] = *b"S12\0";

/// Tag written before the body on rewritable media
///
/// An interrupted save leaves this tag in place, so the next load fails the
/// version gate instead of trusting a half-written body.
const VERSION_PLACEHOLDER: [u8; 4] = *b"ERR\0";

/// Jerk quad written when `CLASSIC_JERK` is absent
const JERK_PLACEHOLDER: [f32; 4] = [10.0, 10.0, 0.4, 5.0];

/// Junction deviation written when `CLASSIC_JERK` is present
const JUNCTION_PLACEHOLDER: f32 = 0.02;

/// Callback invoked once after a successful load or a reset
///
/// Lets dependent subsystems recompute derived state (acceleration rates,
/// software endstops, heater tuning). Must not fail; nothing it does is
/// surfaced by this crate.
pub trait PostApplyHook {
    /// Settings were just committed to `ctx`
    fn settings_applied(&mut self, ctx: &mut SettingsContext);
}

impl<F: FnMut(&mut SettingsContext)> PostApplyHook for F {
    fn settings_applied(&mut self, ctx: &mut SettingsContext) {
        self(ctx)
    }
}

/// Hook that does nothing
pub struct NullHook;

impl PostApplyHook for NullHook {
    fn settings_applied(&mut self, _ctx: &mut SettingsContext) {}
}

/// Versioned, checksummed settings persistence over a storage medium
///
/// # Example
///
/// ```
/// use nvsettings::context::{BuildProfile, SettingsContext};
/// use nvsettings::medium::MockMedium;
/// use nvsettings::record::{NullHook, SettingsStore};
///
/// let profile = BuildProfile::default();
/// let mut store = SettingsStore::new(MockMedium::new(), profile);
///
/// let mut ctx = SettingsContext::defaults(&profile);
/// ctx.motion.acceleration = 1800.0;
/// store.save(&ctx).unwrap();
///
/// let mut restored = SettingsContext::defaults(&profile);
/// store.load(&mut restored, &mut NullHook).unwrap();
/// assert_eq!(restored.motion.acceleration, 1800.0);
/// ```
pub struct SettingsStore<M: StorageMedium> {
    pub(crate) medium: M,
    pub(crate) backup: Option<M>,
    pub(crate) profile: BuildProfile,
}

impl<M: StorageMedium> SettingsStore<M> {
    /// Create a store over `medium` for the given build profile
    pub fn new(medium: M, profile: BuildProfile) -> Self {
        Self {
            medium,
            backup: None,
            profile,
        }
    }

    /// Attach a backup medium tried once when primary validation fails
    pub fn with_backup(mut self, backup: M) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Build profile this store was configured with
    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    /// Expected record size (header included) for the current build
    pub fn record_size(&self) -> u16 {
        layout::record_size_for(&self.profile)
    }

    /// Primary medium access (test instrumentation)
    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Persist the live settings as one packed record
    ///
    /// Streams every field in canonical order, then seeks back and writes
    /// the version tag and final checksum. On media that cannot rewrite
    /// without an erase the header slot is skipped instead of pre-written,
    /// deferring the only header write to the end.
    ///
    /// When the profile carries `MESH_AUTOSAVE` and the context names a
    /// mesh slot, the active mesh is stored to that slot afterwards; slot
    /// failures stay local to the slot.
    ///
    /// # Errors
    ///
    /// `Medium` if the transaction cannot open or any write fails;
    /// `SizeMismatch` if the streamed size disagrees with the layout math
    /// (silent layout drift).
    pub fn save(&mut self, ctx: &SettingsContext) -> Result<()> {
        self.medium.open()?;
        let result = write_record(&mut self.medium, &self.profile, ctx);
        self.medium.close();
        result?;

        if self.profile.has(Capabilities::MESH_AUTOSAVE) && ctx.leveling.mesh_slot >= 0 {
            self.store_mesh(ctx.leveling.mesh_slot, &ctx.leveling.mesh).ok();
        }
        Ok(())
    }

    /// Check the stored record without touching live state
    ///
    /// Runs the full read walk into scratch state: version gate first, then
    /// the complete body stream, then the size and checksum gates. If a
    /// backup medium is configured and the primary fails for any reason
    /// other than being unavailable, the primary is restored from the
    /// backup and validated once more.
    pub fn validate(&mut self) -> Result<()> {
        match self.validate_once() {
            Ok(()) => Ok(()),
            Err(e) => {
                if matches!(e, SettingsError::Medium(MediumError::Unavailable))
                    || self.backup.is_none()
                {
                    return Err(e);
                }
                self.restore_from_backup()?;
                self.validate_once()
            }
        }
    }

    fn validate_once(&mut self) -> Result<()> {
        self.medium.open()?;
        let mut scratch = SettingsContext::defaults(&self.profile);
        let result = read_record(&mut self.medium, &self.profile, &mut scratch, true);
        self.medium.close();
        result
    }

    /// Load the stored record into live state
    ///
    /// Validates first; only a record that passes every gate is re-read in
    /// commit mode. After a successful commit the post-apply hook runs
    /// exactly once, then the mesh slot recorded in the settings (if any)
    /// is loaded; a failed slot read resets the live mesh and is not an
    /// error.
    ///
    /// On validation failure the context is reset to factory defaults (and
    /// the hook runs), then the original error is returned so the caller
    /// may decide to re-persist defaults.
    pub fn load(&mut self, ctx: &mut SettingsContext, hook: &mut dyn PostApplyHook) -> Result<()> {
        if let Err(e) = self.validate() {
            self.reset(ctx, hook);
            return Err(e);
        }

        self.medium.open()?;
        let result = read_record(&mut self.medium, &self.profile, ctx, false);
        self.medium.close();
        result?;

        hook.settings_applied(ctx);

        if self.profile.has(Capabilities::MESH_LEVELING) {
            let slot = ctx.leveling.mesh_slot;
            if slot >= 0 {
                let mut mesh = ctx.leveling.mesh.clone();
                if self.load_mesh(slot, &mut mesh).is_ok() {
                    ctx.leveling.mesh = mesh;
                } else {
                    ctx.leveling
                        .mesh
                        .reset(self.profile.grid_points_x, self.profile.grid_points_y);
                    ctx.leveling.mesh_slot = crate::context::leveling::MESH_SLOT_NONE;
                }
            }
        }
        Ok(())
    }

    /// Install factory defaults into every live field, no medium access
    pub fn reset(&self, ctx: &mut SettingsContext, hook: &mut dyn PostApplyHook) {
        *ctx = SettingsContext::defaults(&self.profile);
        hook.settings_applied(ctx);
    }

    /// Copy the backup medium over the primary, byte for byte
    fn restore_from_backup(&mut self) -> Result<()> {
        let backup = self
            .backup
            .as_mut()
            .ok_or(SettingsError::Medium(MediumError::Unavailable))?;

        backup.open()?;
        if let Err(e) = self.medium.open() {
            backup.close();
            return Err(e.into());
        }

        let len = self.medium.capacity().min(backup.capacity());
        let mut buf = [0u8; 64];
        let mut offset = 0;
        let mut result = Ok(());
        while offset < len {
            let chunk = ((len - offset) as usize).min(buf.len());
            if let Err(e) = backup
                .read(offset, &mut buf[..chunk])
                .and_then(|()| self.medium.write(offset, &buf[..chunk]))
            {
                result = Err(e.into());
                break;
            }
            offset += chunk as u32;
        }

        self.medium.close();
        backup.close();
        result
    }
}

/// Write walk: live state to medium, canonical field order
///
/// Must stay byte-for-byte aligned with [`read_record`].
fn write_record<M: StorageMedium>(
    medium: &mut M,
    profile: &BuildProfile,
    ctx: &SettingsContext,
) -> Result<()> {
    let rewritable = medium.rewritable();
    let mut s = RecordStream::new(medium, layout::RECORD_OFFSET);

    // Header: invalidate the tag up front on rewritable media, or skip it
    // entirely where a rewrite would need an erase cycle.
    if rewritable {
        s.write_raw(&VERSION_PLACEHOLDER)?;
    } else {
        s.skip(4);
    }
    s.skip(2); // checksum slot, unknown until the body is streamed
    s.reset_crc();

    let extra = profile.extra_channels;
    let channels = profile.channel_count();
    s.write_u8(extra)?;

    // Planner motion
    for i in 0..channels {
        s.write_u32(ctx.motion.max_acceleration[i])?;
    }
    s.write_u32(ctx.motion.min_segment_time_us)?;
    s.write_f32s(&ctx.motion.steps_per_unit[..channels])?;
    s.write_f32s(&ctx.motion.max_feedrate[..channels])?;
    s.write_f32(ctx.motion.acceleration)?;
    s.write_f32(ctx.motion.retract_acceleration)?;
    s.write_f32(ctx.motion.travel_acceleration)?;
    s.write_f32(ctx.motion.min_feedrate)?;
    s.write_f32(ctx.motion.min_travel_feedrate)?;

    if profile.has(Capabilities::CLASSIC_JERK) {
        s.write_f32s(&ctx.motion.max_jerk)?;
        s.write_f32(JUNCTION_PLACEHOLDER)?;
    } else {
        s.write_f32s(&JERK_PLACEHOLDER)?;
        s.write_f32(ctx.motion.junction_deviation)?;
    }

    // Workspace geometry
    s.check_offset(layout::offset_of_home_offset(extra));
    s.write_f32s(&ctx.geometry.home_offset)?;
    if profile.has(Capabilities::TOOL_OFFSETS) {
        s.write_f32s(&ctx.geometry.tool_offset)?;
    } else {
        s.write_f32s(&[0.0; 3])?;
    }

    // Filament runout sensor
    if profile.has(Capabilities::RUNOUT_SENSOR) {
        s.write_bool(ctx.material.runout_enabled)?;
        s.write_f32(ctx.material.runout_distance)?;
    } else {
        s.write_bool(true)?;
        s.write_f32(RUNOUT_DISTANCE_PLACEHOLDER)?;
    }

    // Leveling fade height
    if profile.has(Capabilities::LEVELING_FADE) {
        s.write_f32(ctx.leveling.z_fade_height)?;
    } else {
        s.write_f32(FADE_HEIGHT_PLACEHOLDER)?;
    }

    // Calibration mesh: dimensions always reflect the current build so a
    // reader can realign even when the payload is stale for it.
    let mesh_on = profile.has(Capabilities::MESH_LEVELING);
    s.write_f32(if mesh_on { ctx.leveling.mesh.z_offset } else { 0.0 })?;
    s.write_u8(profile.grid_points_x)?;
    s.write_u8(profile.grid_points_y)?;
    for x in 0..profile.grid_points_x as usize {
        for y in 0..profile.grid_points_y as usize {
            s.write_f32(if mesh_on { ctx.leveling.mesh.z_values[x][y] } else { 0.0 })?;
        }
    }

    // Probe offset
    s.check_offset(layout::offset_of_probe_offset(
        extra,
        profile.grid_points_x,
        profile.grid_points_y,
    ));
    if profile.has(Capabilities::BED_PROBE) {
        s.write_f32s(&ctx.geometry.probe_offset)?;
    } else {
        s.write_f32s(&[0.0; 3])?;
    }

    // Leveling state
    s.write_bool(ctx.leveling.leveling_active)?;
    s.write_i8(ctx.leveling.mesh_slot)?;

    // Preheat presets
    s.write_i16s(&[ctx.thermal.preheat[0].hotend_temp, ctx.thermal.preheat[1].hotend_temp])?;
    s.write_i16s(&[ctx.thermal.preheat[0].bed_temp, ctx.thermal.preheat[1].bed_temp])?;
    s.write(&[ctx.thermal.preheat[0].fan_speed, ctx.thermal.preheat[1].fan_speed])?;

    // Heater control
    if profile.has(Capabilities::PID_TUNING) {
        s.write_f32s(&[ctx.thermal.hotend_pid.p, ctx.thermal.hotend_pid.i, ctx.thermal.hotend_pid.d])?;
    } else {
        s.write_f32s(&[PID_PLACEHOLDER; 3])?;
    }
    s.write_i16(ctx.thermal.lpq_len)?;
    if profile.has(Capabilities::BED_PID) {
        s.write_f32s(&[ctx.thermal.bed_pid.p, ctx.thermal.bed_pid.i, ctx.thermal.bed_pid.d])?;
    } else {
        s.write_f32s(&[PID_PLACEHOLDER; 3])?;
    }

    // Volumetrics, per tool
    let tools = profile.tool_count();
    s.write_bool(ctx.material.volumetric_enabled)?;
    s.write_f32s(&ctx.material.filament_diameter[..tools])?;
    if profile.has(Capabilities::LINEAR_ADVANCE) {
        s.write_f32s(&ctx.material.advance_k[..tools])?;
    } else {
        for _ in 0..tools {
            s.write_f32(DEFAULT_ADVANCE_K)?;
        }
    }

    // Drive
    if profile.has(Capabilities::MOTOR_CURRENT) {
        s.write_u32s(&ctx.drive.motor_current)?;
    } else {
        s.write_u32s(&[0; 3])?;
    }
    if profile.has(Capabilities::SKEW_CORRECTION) {
        s.write_f32s(&ctx.leveling.skew_factor)?;
    } else {
        s.write_f32s(&[0.0; 3])?;
    }
    if profile.has(Capabilities::BACKLASH) {
        s.write_f32s(&ctx.drive.backlash_distance)?;
        s.write_u8(ctx.drive.backlash_correction)?;
        s.write_f32(ctx.drive.backlash_smoothing)?;
    } else {
        s.write_f32s(&[0.0; 3])?;
        s.write_u8(0)?;
        s.write_f32(BACKLASH_SMOOTHING_PLACEHOLDER)?;
    }

    // Size self-check against the layout math, then commit the header
    let actual = s.bytes_used();
    let expected = layout::record_size_for(profile);
    if actual != expected {
        return Err(SettingsError::SizeMismatch { expected, actual });
    }
    let crc = s.crc_value();
    s.rewind();
    s.write_raw(&RECORD_VERSION)?;
    s.write_raw(&crc.to_le_bytes())?;
    Ok(())
}

/// Read walk: medium to live state, canonical field order
///
/// With `validating` set, every field is streamed and checksummed but
/// nothing is committed; this is the dry pre-pass that protects live state
/// from half-bad records. Cardinality-variable fields reconcile the stored
/// channel count against the current build; grid-variable fields skip a
/// stale payload byte-for-byte to keep the stream aligned.
fn read_record<M: StorageMedium>(
    medium: &mut M,
    profile: &BuildProfile,
    ctx: &mut SettingsContext,
    validating: bool,
) -> Result<()> {
    let mut s = RecordStream::new(medium, layout::RECORD_OFFSET);
    let commit = !validating;

    // Read the header unconditionally so diagnostics can report it even
    // when the gate is about to fail.
    let mut stored_ver = [0u8; 4];
    s.read_raw(&mut stored_ver)?;
    let mut crc_buf = [0u8; 2];
    s.read_raw(&mut crc_buf)?;
    let stored_crc = u16::from_le_bytes(crc_buf);

    if stored_ver[..3] != RECORD_VERSION[..3] {
        return Err(SettingsError::VersionMismatch { stored: stored_ver });
    }
    s.reset_crc();

    // Channel count the record was written with; may differ from ours
    let stored_extra = s.read_u8()?;
    let stored_channels = 3 + stored_extra as usize;
    let channels = profile.channel_count();

    // Planner motion: stored-count arrays, reconciled per channel
    let mut accel = heapless::Vec::<u32, MAX_CHANNELS>::new();
    for i in 0..stored_channels {
        let v = s.read_u32()?;
        if i < MAX_CHANNELS {
            accel.push(v).ok();
        }
    }
    let min_segment_time_us = s.read_u32()?;
    let mut steps = heapless::Vec::<f32, MAX_CHANNELS>::new();
    for i in 0..stored_channels {
        let v = s.read_f32()?;
        if i < MAX_CHANNELS {
            steps.push(v).ok();
        }
    }
    let mut feedrate = heapless::Vec::<f32, MAX_CHANNELS>::new();
    for i in 0..stored_channels {
        let v = s.read_f32()?;
        if i < MAX_CHANNELS {
            feedrate.push(v).ok();
        }
    }
    if commit {
        ctx.motion.min_segment_time_us = min_segment_time_us;
        for i in 0..MAX_CHANNELS {
            // Channels present in both the stored and current counts keep
            // their stored values; anything else gets per-channel defaults.
            let keep = i < stored_channels && i < channels;
            ctx.motion.max_acceleration[i] =
                if keep { accel[i] } else { default_max_acceleration(i) };
            ctx.motion.steps_per_unit[i] =
                if keep { steps[i] } else { default_steps_per_unit(i) };
            ctx.motion.max_feedrate[i] =
                if keep { feedrate[i] } else { default_max_feedrate(i) };
        }
    }

    let acceleration = s.read_f32()?;
    let retract_acceleration = s.read_f32()?;
    let travel_acceleration = s.read_f32()?;
    let min_feedrate = s.read_f32()?;
    let min_travel_feedrate = s.read_f32()?;
    if commit {
        ctx.motion.acceleration = acceleration;
        ctx.motion.retract_acceleration = retract_acceleration;
        ctx.motion.travel_acceleration = travel_acceleration;
        ctx.motion.min_feedrate = min_feedrate;
        ctx.motion.min_travel_feedrate = min_travel_feedrate;
    }

    let mut jerk = [0.0f32; 4];
    s.read_f32s_into(&mut jerk)?;
    let junction_deviation = s.read_f32()?;
    if commit {
        if profile.has(Capabilities::CLASSIC_JERK) {
            ctx.motion.max_jerk = jerk;
        } else {
            ctx.motion.junction_deviation = junction_deviation;
        }
    }

    // Workspace geometry
    s.check_offset(layout::offset_of_home_offset(stored_extra));
    let mut home_offset = [0.0f32; 3];
    s.read_f32s_into(&mut home_offset)?;
    let mut tool_offset = [0.0f32; 3];
    s.read_f32s_into(&mut tool_offset)?;
    if commit {
        ctx.geometry.home_offset = home_offset;
        if profile.has(Capabilities::TOOL_OFFSETS) {
            ctx.geometry.tool_offset = tool_offset;
        }
    }

    // Filament runout sensor
    let runout_enabled = s.read_bool()?;
    let runout_distance = s.read_f32()?;
    if commit && profile.has(Capabilities::RUNOUT_SENSOR) {
        ctx.material.runout_enabled = runout_enabled;
        ctx.material.runout_distance = runout_distance;
    }

    // Leveling fade height
    let z_fade_height = s.read_f32()?;
    if commit && profile.has(Capabilities::LEVELING_FADE) {
        ctx.leveling.z_fade_height = z_fade_height;
    }

    // Calibration mesh, gated on the stored dimensions
    let mesh_z_offset = s.read_f32()?;
    let stored_gx = s.read_u8()?;
    let stored_gy = s.read_u8()?;
    let mesh_on = profile.has(Capabilities::MESH_LEVELING);
    let dims_match = stored_gx == profile.grid_points_x && stored_gy == profile.grid_points_y;
    if commit && mesh_on {
        ctx.leveling.mesh.z_offset = mesh_z_offset;
    }
    if commit && mesh_on && dims_match {
        ctx.leveling.mesh.points_x = stored_gx;
        ctx.leveling.mesh.points_y = stored_gy;
        for x in 0..stored_gx as usize {
            for y in 0..stored_gy as usize {
                ctx.leveling.mesh.z_values[x][y] = s.read_f32()?;
            }
        }
    } else {
        // Stale or disabled grid: consume the whole payload to keep the
        // stream aligned, then flatten the live grid if we carry one.
        s.discard(layout::grid_payload_len(stored_gx, stored_gy))?;
        if commit && mesh_on {
            ctx.leveling
                .mesh
                .reset(profile.grid_points_x, profile.grid_points_y);
        }
    }

    // Probe offset
    s.check_offset(layout::offset_of_probe_offset(stored_extra, stored_gx, stored_gy));
    let mut probe_offset = [0.0f32; 3];
    s.read_f32s_into(&mut probe_offset)?;
    if commit && profile.has(Capabilities::BED_PROBE) {
        ctx.geometry.probe_offset = probe_offset;
    }

    // Leveling state
    let leveling_active = s.read_bool()?;
    let mesh_slot = s.read_i8()?;
    if commit {
        ctx.leveling.leveling_active = leveling_active;
        ctx.leveling.mesh_slot = mesh_slot;
    }

    // Preheat presets
    let mut hotend_temp = [0i16; 2];
    s.read_i16s_into(&mut hotend_temp)?;
    let mut bed_temp = [0i16; 2];
    s.read_i16s_into(&mut bed_temp)?;
    let mut fan_speed = [0u8; 2];
    s.read(&mut fan_speed)?;
    if commit {
        for p in 0..2 {
            ctx.thermal.preheat[p].hotend_temp = hotend_temp[p];
            ctx.thermal.preheat[p].bed_temp = bed_temp[p];
            ctx.thermal.preheat[p].fan_speed = fan_speed[p];
        }
    }

    // Heater control
    let mut hotend_pid = [0.0f32; 3];
    s.read_f32s_into(&mut hotend_pid)?;
    let lpq_len = s.read_i16()?;
    let mut bed_pid = [0.0f32; 3];
    s.read_f32s_into(&mut bed_pid)?;
    if commit {
        if profile.has(Capabilities::PID_TUNING) {
            ctx.thermal.hotend_pid.p = hotend_pid[0];
            ctx.thermal.hotend_pid.i = hotend_pid[1];
            ctx.thermal.hotend_pid.d = hotend_pid[2];
        }
        ctx.thermal.lpq_len = lpq_len;
        if profile.has(Capabilities::BED_PID) {
            ctx.thermal.bed_pid.p = bed_pid[0];
            ctx.thermal.bed_pid.i = bed_pid[1];
            ctx.thermal.bed_pid.d = bed_pid[2];
        }
    }

    // Volumetrics, per stored tool count
    let stored_tools = 1 + stored_extra as usize;
    let tools = profile.tool_count();
    let volumetric_enabled = s.read_bool()?;
    let mut diameter = heapless::Vec::<f32, MAX_TOOLS>::new();
    for i in 0..stored_tools {
        let v = s.read_f32()?;
        if i < MAX_TOOLS {
            diameter.push(v).ok();
        }
    }
    let mut advance = heapless::Vec::<f32, MAX_TOOLS>::new();
    for i in 0..stored_tools {
        let v = s.read_f32()?;
        if i < MAX_TOOLS {
            advance.push(v).ok();
        }
    }
    if commit {
        ctx.material.volumetric_enabled = volumetric_enabled;
        let advance_on = profile.has(Capabilities::LINEAR_ADVANCE);
        for i in 0..MAX_TOOLS {
            let keep = i < stored_tools && i < tools;
            ctx.material.filament_diameter[i] =
                if keep { diameter[i] } else { DEFAULT_FILAMENT_DIAMETER };
            ctx.material.advance_k[i] =
                if keep && advance_on { advance[i] } else { DEFAULT_ADVANCE_K };
        }
    }

    // Drive
    let mut motor_current = [0u32; 3];
    for v in &mut motor_current {
        *v = s.read_u32()?;
    }
    let mut skew_factor = [0.0f32; 3];
    s.read_f32s_into(&mut skew_factor)?;
    let mut backlash_distance = [0.0f32; 3];
    s.read_f32s_into(&mut backlash_distance)?;
    let backlash_correction = s.read_u8()?;
    let backlash_smoothing = s.read_f32()?;
    if commit {
        if profile.has(Capabilities::MOTOR_CURRENT) {
            ctx.drive.motor_current = motor_current;
        }
        if profile.has(Capabilities::SKEW_CORRECTION) {
            ctx.leveling.skew_factor = skew_factor;
        }
        if profile.has(Capabilities::BACKLASH) {
            ctx.drive.backlash_distance = backlash_distance;
            ctx.drive.backlash_correction = backlash_correction;
            ctx.drive.backlash_smoothing = backlash_smoothing;
        }
    }

    // Size gate against the stored counts, then the checksum gate
    let actual = s.bytes_used();
    let expected = layout::record_size(stored_extra, stored_gx, stored_gy);
    if actual != expected {
        return Err(SettingsError::SizeMismatch { expected, actual });
    }
    let computed = s.crc_value();
    if computed != stored_crc {
        return Err(SettingsError::ChecksumMismatch {
            stored: stored_crc,
            computed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RECORD_OFFSET;
    use crate::medium::MockMedium;

    fn store_with(profile: BuildProfile) -> SettingsStore<MockMedium> {
        SettingsStore::new(MockMedium::new(), profile)
    }

    fn customized(profile: &BuildProfile) -> SettingsContext {
        let mut ctx = SettingsContext::defaults(profile);
        ctx.motion.max_acceleration[0] = 2500;
        ctx.motion.max_acceleration[3] = 7000;
        ctx.motion.steps_per_unit[2] = 410.5;
        ctx.motion.acceleration = 1800.0;
        ctx.motion.junction_deviation = 0.02;
        ctx.geometry.home_offset = [1.0, -2.0, 0.5];
        ctx.geometry.tool_offset = [18.0, 0.2, -0.1];
        ctx.geometry.probe_offset = [12.0, -4.0, -1.2];
        ctx.material.runout_distance = 7.5;
        ctx.material.filament_diameter[1] = 2.85;
        ctx.material.advance_k[0] = 0.06;
        ctx.leveling.z_fade_height = 8.0;
        ctx.leveling.mesh.z_offset = 0.15;
        ctx.leveling.mesh.z_values[1][2] = -0.08;
        ctx.leveling.leveling_active = true;
        ctx.thermal.hotend_pid.p = 31.5;
        ctx.thermal.bed_pid.d = 299.0;
        ctx.thermal.preheat[1].bed_temp = 95;
        ctx.drive.motor_current = [900, 950, 1000];
        ctx.drive.backlash_distance = [0.1, 0.12, 0.0];
        ctx.drive.backlash_correction = 128;
        ctx
    }

    #[test]
    fn test_save_commits_version_tag() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        let ctx = SettingsContext::defaults(&profile);
        store.save(&ctx).unwrap();

        // Header carries the real tag, not the placeholder
        assert_eq!(
            store.medium_mut().contents(RECORD_OFFSET, 4),
            &RECORD_VERSION
        );
    }

    #[test]
    fn test_roundtrip_restores_every_field() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        let saved = customized(&profile);
        store.save(&saved).unwrap();

        let mut loaded = SettingsContext::defaults(&profile);
        store.load(&mut loaded, &mut NullHook).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_validate_passes_after_save() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.save(&SettingsContext::defaults(&profile)).unwrap();
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_validate_fails_on_blank_medium() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        assert!(matches!(
            store.validate(),
            Err(SettingsError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_version_gate_ignores_variant_byte() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.save(&SettingsContext::defaults(&profile)).unwrap();

        // Fourth byte is a build-variant marker, excluded from the gate
        store.medium_mut().poke(RECORD_OFFSET + 3, b'x');
        assert!(store.validate().is_ok());

        // Third byte participates
        store.medium_mut().poke(RECORD_OFFSET + 2, b'9');
        assert!(matches!(
            store.validate(),
            Err(SettingsError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_checksum_gate_catches_body_corruption() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.save(&customized(&profile)).unwrap();

        store.medium_mut().inject_corruption(RECORD_OFFSET + 40, 1);
        assert!(matches!(
            store.validate(),
            Err(SettingsError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_load_leaves_defaults_not_partial_state() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        let saved = customized(&profile);
        store.save(&saved).unwrap();
        store.medium_mut().inject_corruption(RECORD_OFFSET + 60, 2);

        let mut ctx = SettingsContext::defaults(&profile);
        let err = store.load(&mut ctx, &mut NullHook).unwrap_err();
        assert!(matches!(err, SettingsError::ChecksumMismatch { .. }));
        // Fallback is a full reset, never a partial commit
        assert_eq!(ctx, SettingsContext::defaults(&profile));
    }

    #[test]
    fn test_cardinality_growth_preserves_and_defaults() {
        let mut writer_profile = BuildProfile::default();
        writer_profile.extra_channels = 1;
        let mut store = store_with(writer_profile);
        let mut saved = SettingsContext::defaults(&writer_profile);
        saved.motion.max_acceleration[3] = 4321;
        saved.motion.max_feedrate[3] = 77.0;
        saved.material.filament_diameter[1] = 2.85;
        store.save(&saved).unwrap();

        // Same medium, one more channel configured
        let mut reader_profile = writer_profile;
        reader_profile.extra_channels = 2;
        let mut reader = SettingsStore::new(
            core::mem::replace(store.medium_mut(), MockMedium::new()),
            reader_profile,
        );
        let mut ctx = SettingsContext::defaults(&reader_profile);
        reader.load(&mut ctx, &mut NullHook).unwrap();

        assert_eq!(ctx.motion.max_acceleration[3], 4321);
        assert_eq!(ctx.motion.max_feedrate[3], 77.0);
        assert_eq!(ctx.material.filament_diameter[1], 2.85);
        // Channel added since the record was written gets defaults
        assert_eq!(ctx.motion.max_acceleration[4], default_max_acceleration(4));
        assert_eq!(ctx.material.filament_diameter[2], DEFAULT_FILAMENT_DIAMETER);
    }

    #[test]
    fn test_cardinality_shrink_discards_surplus() {
        let mut writer_profile = BuildProfile::default();
        writer_profile.extra_channels = 3;
        let mut store = store_with(writer_profile);
        let mut saved = SettingsContext::defaults(&writer_profile);
        saved.motion.max_acceleration[5] = 9999;
        store.save(&saved).unwrap();

        let mut reader_profile = writer_profile;
        reader_profile.extra_channels = 1;
        let mut reader = SettingsStore::new(
            core::mem::replace(store.medium_mut(), MockMedium::new()),
            reader_profile,
        );
        let mut ctx = SettingsContext::defaults(&reader_profile);
        reader.load(&mut ctx, &mut NullHook).unwrap();

        // Surplus channel was consumed but not kept
        assert_eq!(ctx.motion.max_acceleration[5], default_max_acceleration(5));
    }

    #[test]
    fn test_grid_staleness_skips_and_keeps_alignment() {
        let mut writer_profile = BuildProfile::default();
        writer_profile.grid_points_x = 5;
        writer_profile.grid_points_y = 5;
        let mut store = store_with(writer_profile);
        let mut saved = customized(&writer_profile);
        saved.leveling.mesh.z_values[4][4] = 0.42;
        store.save(&saved).unwrap();

        let mut reader_profile = writer_profile;
        reader_profile.grid_points_x = 7;
        reader_profile.grid_points_y = 7;
        let mut reader = SettingsStore::new(
            core::mem::replace(store.medium_mut(), MockMedium::new()),
            reader_profile,
        );
        let mut ctx = SettingsContext::defaults(&reader_profile);
        reader.load(&mut ctx, &mut NullHook).unwrap();

        // Stale grid flattened for the new dimensions
        assert_eq!(ctx.leveling.mesh, crate::context::MeshGrid::flat(7, 7));
        // Every field after the grid still read correctly
        assert_eq!(ctx.geometry.probe_offset, saved.geometry.probe_offset);
        assert_eq!(ctx.thermal.preheat[1].bed_temp, saved.thermal.preheat[1].bed_temp);
        assert_eq!(ctx.drive.backlash_correction, saved.drive.backlash_correction);
    }

    #[test]
    fn test_medium_unavailable_fails_fast() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.medium_mut().fail_next_open();
        assert_eq!(
            store.save(&SettingsContext::defaults(&profile)),
            Err(SettingsError::Medium(MediumError::Unavailable))
        );
    }

    #[test]
    fn test_write_failure_propagates() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.medium_mut().fail_next_write();
        assert!(matches!(
            store.save(&SettingsContext::defaults(&profile)),
            Err(SettingsError::Medium(MediumError::WriteFailed))
        ));
    }

    #[test]
    fn test_write_once_medium_defers_header() {
        let profile = BuildProfile::default();
        let mut store = SettingsStore::new(MockMedium::new_write_once(), profile);
        store.save(&SettingsContext::defaults(&profile)).unwrap();
        assert_eq!(
            store.medium_mut().contents(RECORD_OFFSET, 4),
            &RECORD_VERSION
        );
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_reset_installs_defaults_and_runs_hook() {
        let profile = BuildProfile::default();
        let store = store_with(profile);
        let mut ctx = customized(&profile);
        let mut hook_runs = 0u32;
        let mut hook = |_: &mut SettingsContext| hook_runs += 1;
        store.reset(&mut ctx, &mut hook);
        assert_eq!(ctx, SettingsContext::defaults(&profile));
        assert_eq!(hook_runs, 1);
    }

    #[test]
    fn test_load_runs_hook_once_after_commit() {
        let profile = BuildProfile::default();
        let mut store = store_with(profile);
        store.save(&customized(&profile)).unwrap();

        let mut ctx = SettingsContext::defaults(&profile);
        let mut hook_runs = 0u32;
        let mut hook = |_: &mut SettingsContext| hook_runs += 1;
        store.load(&mut ctx, &mut hook).unwrap();
        assert_eq!(hook_runs, 1);
    }

    #[test]
    fn test_backup_recovers_corrupt_primary() {
        let profile = BuildProfile::default();
        let saved = customized(&profile);

        // Build a good image, clone it as the backup, corrupt the primary
        let mut seed = store_with(profile);
        seed.save(&saved).unwrap();
        let mut backup = MockMedium::new();
        let image: heapless::Vec<u8, 4096> =
            heapless::Vec::from_slice(seed.medium_mut().contents(0, 4096)).unwrap();
        backup.write(0, &image).unwrap();

        let mut primary = core::mem::replace(seed.medium_mut(), MockMedium::new());
        primary.inject_corruption(RECORD_OFFSET + 30, 4);

        let mut store = SettingsStore::new(primary, profile).with_backup(backup);
        let mut ctx = SettingsContext::defaults(&profile);
        store.load(&mut ctx, &mut NullHook).unwrap();
        assert_eq!(ctx, saved);
    }

    #[test]
    fn test_backup_not_consulted_when_medium_unavailable() {
        let profile = BuildProfile::default();
        let mut primary = MockMedium::new();
        primary.fail_next_open();
        let mut store = SettingsStore::new(primary, profile).with_backup(MockMedium::new());
        assert_eq!(
            store.validate(),
            Err(SettingsError::Medium(MediumError::Unavailable))
        );
    }
}

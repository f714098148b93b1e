//! Versioned, checksummed settings persistence for motion controller firmware
//!
//! Persists tuned machine parameters (motion limits, geometry offsets,
//! heater control, filament handling, leveling state) across power cycles
//! on a small byte-addressable medium, typically a few KB of EEPROM or
//! emulated flash.
//!
//! # Design
//!
//! - **One packed record.** Every field streams in a single canonical
//!   order with no per-field framing; compactness comes from the strict
//!   field-order invariant, enforced by a version tag.
//! - **Validate, then commit.** [`record::SettingsStore::load`] runs the
//!   whole read walk twice: a validating pre-pass into scratch state that
//!   gates on version, size, and checksum, then an identical committing
//!   pass. Live state is never partially overwritten by a bad record.
//! - **Capability-gated fields.** Fields for features a build lacks still
//!   occupy their full width (written as neutral placeholders), so record
//!   offsets never shift between builds sharing a version tag.
//! - **Self-describing cardinality.** Per-channel and grid-sized fields
//!   are preceded by their stored counts; a record written by a build with
//!   different counts reconciles instead of being rejected.
//! - **Independent mesh slots.** Calibration meshes live in fixed-size
//!   slots packed downward from the medium tail, each with its own
//!   checksum, decoupled from the main record lifecycle.
//!
//! # Medium Layout
//!
//! ```text
//! 0              100                                  cap-129      cap
//! ├─ reserved ──┼─ settings record ──┼── gap ──┼─ mesh slots ─┼─ tail ─┤
//! │  (host)     │ tag + crc + fields │ (float) │ N-1 ... 1, 0 │ (host) │
//! ```
//!
//! # Example
//!
//! ```
//! use nvsettings::context::{BuildProfile, SettingsContext};
//! use nvsettings::medium::MockMedium;
//! use nvsettings::record::{NullHook, SettingsStore};
//!
//! let profile = BuildProfile::default();
//! let mut store = SettingsStore::new(MockMedium::new(), profile);
//!
//! let mut ctx = SettingsContext::defaults(&profile);
//! ctx.motion.acceleration = 1500.0;
//! store.save(&ctx).unwrap();
//!
//! let mut restored = SettingsContext::defaults(&profile);
//! store.load(&mut restored, &mut NullHook).unwrap();
//! assert_eq!(restored.motion.acceleration, 1500.0);
//! ```

#![no_std]

pub mod checksum;
pub mod codec;
pub mod context;
pub mod error;
pub mod layout;
pub mod medium;
pub mod record;
pub mod slots;

pub use context::{BuildProfile, Capabilities, SettingsContext};
pub use error::{MediumError, Result, SettingsError};
pub use medium::StorageMedium;
pub use record::{NullHook, PostApplyHook, SettingsStore, RECORD_VERSION};

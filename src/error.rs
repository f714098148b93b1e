//! Error types for settings persistence
//!
//! All errors are recoverable at the call site: the caller falls back to
//! `reset()` on any load failure and may re-persist defaults. Mesh slot
//! failures are local to that slot and never affect the main record.

use core::fmt;

/// Result type for settings operations
pub type Result<T> = core::result::Result<T, SettingsError>;

/// Errors reported by the storage medium driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediumError {
    /// Medium transaction could not be opened
    Unavailable,
    /// Offset or length outside the medium capacity
    OutOfBounds,
    /// Byte-range read failed
    ReadFailed,
    /// Byte-range write failed
    WriteFailed,
}

/// Errors from settings record and mesh slot operations
///
/// Version, size, and checksum mismatches are detected during the
/// validating pre-pass, before any live state is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Medium I/O failed (fatal to the call, not to the process)
    Medium(MediumError),
    /// Stored version tag does not match this build's record layout
    VersionMismatch {
        /// Tag found on the medium
        stored: [u8; 4],
    },
    /// Bytes consumed do not match the expected record size
    SizeMismatch {
        /// Expected size for the stored counts
        expected: u16,
        /// Bytes actually streamed
        actual: u16,
    },
    /// Accumulated checksum does not match the stored checksum
    ChecksumMismatch {
        /// Checksum found in the record header
        stored: u16,
        /// Checksum accumulated over the streamed body
        computed: u16,
    },
    /// Mesh slot index outside the computed slot range
    InvalidSlot {
        /// Requested slot
        slot: i8,
        /// Number of slots available on this medium
        available: u8,
    },
}

impl From<MediumError> for SettingsError {
    fn from(e: MediumError) -> Self {
        SettingsError::Medium(e)
    }
}

impl fmt::Display for MediumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediumError::Unavailable => write!(f, "medium unavailable"),
            MediumError::OutOfBounds => write!(f, "access outside medium capacity"),
            MediumError::ReadFailed => write!(f, "medium read failed"),
            MediumError::WriteFailed => write!(f, "medium write failed"),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Medium(e) => write!(f, "medium error: {}", e),
            SettingsError::VersionMismatch { stored } => {
                write!(f, "record version mismatch (stored ")?;
                for b in stored.iter().take(3) {
                    if b.is_ascii_graphic() {
                        write!(f, "{}", *b as char)?;
                    } else {
                        write!(f, "?")?;
                    }
                }
                write!(f, ")")
            }
            SettingsError::SizeMismatch { expected, actual } => {
                write!(f, "record size mismatch (expected {}, got {})", expected, actual)
            }
            SettingsError::ChecksumMismatch { stored, computed } => write!(
                f,
                "record checksum mismatch (stored {:#06x}, computed {:#06x})",
                stored, computed
            ),
            SettingsError::InvalidSlot { slot, available } => {
                write!(f, "invalid mesh slot {} ({} slots available)", slot, available)
            }
        }
    }
}

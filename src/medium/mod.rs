//! Storage medium abstraction
//!
//! This module defines the byte-addressable non-volatile medium that the
//! settings record and mesh slots are persisted to. Implementations wrap a
//! real EEPROM, an I2C/SPI FRAM, or a flash-emulation driver.

pub mod mock;

pub use mock::{MockMedium, MOCK_CAPACITY};

use crate::error::MediumError;

/// Byte-addressable non-volatile storage medium
///
/// # Access Discipline
///
/// - Every save/load/slot operation is bracketed by `open()`/`close()`.
///   The transaction is exclusive; this crate never nests or interleaves
///   transactions.
/// - `read`/`write` address absolute byte offsets; implementations must
///   range-check against `capacity()`.
/// - Media that cannot rewrite a byte without an erase cycle (flash
///   emulation) report `rewritable() == false`; the record protocol then
///   skips the header slot on its first pass and writes the header exactly
///   once, at the end of a save.
pub trait StorageMedium {
    /// Begin an exclusive access transaction
    ///
    /// # Errors
    ///
    /// Returns `MediumError::Unavailable` if the device cannot be accessed.
    fn open(&mut self) -> Result<(), MediumError>;

    /// End the current access transaction
    fn close(&mut self);

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns `MediumError::OutOfBounds` if the range exceeds capacity,
    /// `MediumError::ReadFailed` if the device read fails.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), MediumError>;

    /// Write `data` starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns `MediumError::OutOfBounds` if the range exceeds capacity,
    /// `MediumError::WriteFailed` if the device write fails.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), MediumError>;

    /// Total capacity in bytes
    fn capacity(&self) -> u32;

    /// Whether a byte can be rewritten in place without an erase cycle
    fn rewritable(&self) -> bool {
        true
    }
}

//! Mock storage medium for testing
//!
//! Provides an in-memory EEPROM simulation with fault injection for
//! exercising error recovery paths.

use super::StorageMedium;
use crate::error::MediumError;

/// Mock medium capacity (4 KB, a typical small EEPROM)
pub const MOCK_CAPACITY: u32 = 4096;

/// In-memory storage medium
///
/// Simulates a byte-addressable EEPROM. Supports:
/// - Read/write at arbitrary byte offsets
/// - Corruption injection for checksum testing
/// - Forced transaction and write failures
/// - Write counting for verifying a medium was left untouched
///
/// # Example
///
/// ```
/// use nvsettings::medium::{MockMedium, StorageMedium};
///
/// let mut medium = MockMedium::new();
/// medium.open().unwrap();
/// medium.write(100, &[0x53, 0x31, 0x32, 0x00]).unwrap();
///
/// let mut buf = [0u8; 4];
/// medium.read(100, &mut buf).unwrap();
/// assert_eq!(&buf, b"S12\0");
/// medium.close();
/// ```
pub struct MockMedium {
    /// Backing storage (erased state 0xFF)
    data: [u8; MOCK_CAPACITY as usize],
    /// Transaction currently open
    open: bool,
    /// Refuse the next `open()` call
    fail_open: bool,
    /// Fail the write after this many more writes succeed
    fail_write_after: Option<u32>,
    /// Total bytes written over the lifetime of this medium
    bytes_written: u32,
    /// Emulate write-once-per-erase-cycle media
    write_once: bool,
}

impl MockMedium {
    /// Create a mock medium in the erased state
    pub fn new() -> Self {
        Self {
            data: [0xFF; MOCK_CAPACITY as usize],
            open: false,
            fail_open: false,
            fail_write_after: None,
            bytes_written: 0,
            write_once: false,
        }
    }

    /// Create a mock for flash-emulation media (`rewritable() == false`)
    pub fn new_write_once() -> Self {
        Self {
            write_once: true,
            ..Self::new()
        }
    }

    /// Raw contents for test verification
    pub fn contents(&self, offset: u32, len: usize) -> &[u8] {
        &self.data[offset as usize..offset as usize + len]
    }

    /// Flip bits at `offset` to simulate medium corruption
    pub fn inject_corruption(&mut self, offset: u32, len: usize) {
        for b in &mut self.data[offset as usize..offset as usize + len] {
            *b ^= 0xAA;
        }
    }

    /// Overwrite a single byte directly, bypassing the transaction
    pub fn poke(&mut self, offset: u32, value: u8) {
        self.data[offset as usize] = value;
    }

    /// Make the next `open()` report the medium as unavailable
    pub fn fail_next_open(&mut self) {
        self.fail_open = true;
    }

    /// Make the next `write()` fail
    pub fn fail_next_write(&mut self) {
        self.fail_write_after = Some(0);
    }

    /// Let `n` more writes succeed, then fail the one after
    ///
    /// Simulates power loss partway through a multi-write operation.
    pub fn fail_write_after(&mut self, n: u32) {
        self.fail_write_after = Some(n);
    }

    /// Total bytes written since creation
    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<(), MediumError> {
        if offset as usize + len > MOCK_CAPACITY as usize {
            return Err(MediumError::OutOfBounds);
        }
        Ok(())
    }
}

impl Default for MockMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMedium for MockMedium {
    fn open(&mut self) -> Result<(), MediumError> {
        if self.fail_open {
            self.fail_open = false;
            return Err(MediumError::Unavailable);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        self.check_range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[offset as usize..offset as usize + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), MediumError> {
        self.check_range(offset, data.len())?;
        match self.fail_write_after {
            Some(0) => {
                self.fail_write_after = None;
                return Err(MediumError::WriteFailed);
            }
            Some(n) => self.fail_write_after = Some(n - 1),
            None => {}
        }
        self.data[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        self.bytes_written += data.len() as u32;
        Ok(())
    }

    fn capacity(&self) -> u32 {
        MOCK_CAPACITY
    }

    fn rewritable(&self) -> bool {
        !self.write_once
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let mut medium = MockMedium::new();
        medium.open().unwrap();
        medium.write(200, &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 4];
        medium.read(200, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        medium.close();
    }

    #[test]
    fn test_erased_state_is_ff() {
        let mut medium = MockMedium::new();
        let mut buf = [0u8; 8];
        medium.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 8]);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut medium = MockMedium::new();
        let mut buf = [0u8; 4];
        assert_eq!(
            medium.read(MOCK_CAPACITY - 2, &mut buf),
            Err(MediumError::OutOfBounds)
        );
        assert_eq!(
            medium.write(MOCK_CAPACITY, &[0]),
            Err(MediumError::OutOfBounds)
        );
    }

    #[test]
    fn test_fail_next_open_is_one_shot() {
        let mut medium = MockMedium::new();
        medium.fail_next_open();
        assert_eq!(medium.open(), Err(MediumError::Unavailable));
        assert_eq!(medium.open(), Ok(()));
    }

    #[test]
    fn test_fail_next_write_is_one_shot() {
        let mut medium = MockMedium::new();
        medium.fail_next_write();
        assert_eq!(medium.write(0, &[0]), Err(MediumError::WriteFailed));
        assert_eq!(medium.write(0, &[0]), Ok(()));
    }

    #[test]
    fn test_fail_write_after_counts_down() {
        let mut medium = MockMedium::new();
        medium.fail_write_after(2);
        assert_eq!(medium.write(0, &[0]), Ok(()));
        assert_eq!(medium.write(1, &[0]), Ok(()));
        assert_eq!(medium.write(2, &[0]), Err(MediumError::WriteFailed));
        assert_eq!(medium.write(2, &[0]), Ok(()));
    }

    #[test]
    fn test_corruption_flips_bits() {
        let mut medium = MockMedium::new();
        medium.write(300, &[0x00; 4]).unwrap();
        medium.inject_corruption(300, 2);

        let mut buf = [0u8; 4];
        medium.read(300, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xAA, 0x00, 0x00]);
    }

    #[test]
    fn test_write_counting() {
        let mut medium = MockMedium::new();
        assert_eq!(medium.bytes_written(), 0);
        medium.write(0, &[0; 10]).unwrap();
        medium.write(10, &[0; 5]).unwrap();
        assert_eq!(medium.bytes_written(), 15);
    }

    #[test]
    fn test_write_once_reports_not_rewritable() {
        let medium = MockMedium::new_write_once();
        assert!(!medium.rewritable());
        assert!(MockMedium::new().rewritable());
    }
}

//! Streaming CRC-16 accumulator for record validation
//!
//! The record checksum is accumulated while the field stream is written or
//! read, so no buffer sized to the whole record ever exists. The algorithm
//! is CRC-16/XMODEM (polynomial 0x1021, initial value 0), accumulated over
//! every body byte after the record header.

use crc::{Crc, Digest, CRC_16_XMODEM};

/// CRC-16 algorithm used for the settings record and mesh slots
static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Running checksum over a byte stream
///
/// # Example
///
/// ```
/// use nvsettings::checksum::ChecksumAccumulator;
///
/// let mut acc = ChecksumAccumulator::new();
/// acc.update(b"123456789");
/// assert_eq!(acc.value(), 0x31C3);
/// ```
pub struct ChecksumAccumulator {
    digest: Digest<'static, u16>,
}

impl ChecksumAccumulator {
    /// Create a fresh accumulator (initial value 0)
    pub fn new() -> Self {
        Self {
            digest: CRC16.digest(),
        }
    }

    /// Fold a byte range into the running checksum
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Restart the accumulator for a new independent stream
    pub fn reset(&mut self) {
        self.digest = CRC16.digest();
    }

    /// Current checksum value without consuming the accumulator
    pub fn value(&self) -> u16 {
        self.digest.clone().finalize()
    }
}

impl Default for ChecksumAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot checksum of a contiguous buffer (used by mesh slots)
pub fn checksum_of(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

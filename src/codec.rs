//! Field stream codec over a storage medium
//!
//! [`RecordStream`] owns the monotonically increasing cursor and the running
//! checksum for one record pass. Fields are streamed one at a time in both
//! directions, so peak memory is bounded by the single largest field, never
//! by the whole record.
//!
//! Header bytes go through the `_raw` variants, which move the cursor
//! without touching the checksum. The `discard` path reads bytes and folds
//! them into the checksum without delivering them anywhere; it implements
//! both the validating pre-pass and stale-payload skips with a single
//! medium read.

use crate::checksum::ChecksumAccumulator;
use crate::error::Result;
use crate::medium::StorageMedium;

/// Streaming cursor + checksum over one record pass
pub struct RecordStream<'m, M: StorageMedium> {
    medium: &'m mut M,
    base: u32,
    cursor: u32,
    crc: ChecksumAccumulator,
}

impl<'m, M: StorageMedium> RecordStream<'m, M> {
    /// Start a pass at `base` on an already-open medium
    pub fn new(medium: &'m mut M, base: u32) -> Self {
        Self {
            medium,
            base,
            cursor: base,
            crc: ChecksumAccumulator::new(),
        }
    }

    /// Bytes streamed or skipped since `base`
    pub fn bytes_used(&self) -> u16 {
        (self.cursor - self.base) as u16
    }

    /// Current checksum over every checksummed byte so far
    pub fn crc_value(&self) -> u16 {
        self.crc.value()
    }

    /// Restart the checksum before the first body byte
    pub fn reset_crc(&mut self) {
        self.crc.reset();
    }

    /// Advance the cursor without reading, writing, or checksumming
    pub fn skip(&mut self, len: u32) {
        self.cursor += len;
    }

    /// Rewind to `base` (used to write the header after the body)
    pub fn rewind(&mut self) {
        self.cursor = self.base;
    }

    /// Cross-check the cursor against a statically expected record offset
    ///
    /// Compiled out of production builds; layout drift in test builds
    /// panics at the first misaligned field instead of at the size gate.
    #[inline]
    pub fn check_offset(&self, expected: u32) {
        debug_assert_eq!(
            self.cursor - self.base,
            expected,
            "record field offset drifted from layout"
        );
    }

    /// Write bytes and fold them into the checksum
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.medium.write(self.cursor, data)?;
        self.crc.update(data);
        self.cursor += data.len() as u32;
        Ok(())
    }

    /// Write header bytes (cursor only, no checksum)
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.medium.write(self.cursor, data)?;
        self.cursor += data.len() as u32;
        Ok(())
    }

    /// Read bytes and fold them into the checksum
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.medium.read(self.cursor, buf)?;
        self.crc.update(buf);
        self.cursor += buf.len() as u32;
        Ok(())
    }

    /// Read header bytes (cursor only, no checksum)
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.medium.read(self.cursor, buf)?;
        self.cursor += buf.len() as u32;
        Ok(())
    }

    /// Consume `len` bytes: checksum them, deliver nothing
    pub fn discard(&mut self, len: u32) -> Result<()> {
        let mut scratch = [0u8; 16];
        let mut remaining = len as usize;
        while remaining > 0 {
            let chunk = remaining.min(scratch.len());
            self.read(&mut scratch[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }

    // --- Typed field IO, little-endian ---

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write(&[v])
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write(&v.to_le_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write(&v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write(&v.to_le_bytes())
    }

    /// Write a whole f32 slice in order
    pub fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// Write a whole u32 slice in order
    pub fn write_u32s(&mut self, values: &[u32]) -> Result<()> {
        for &v in values {
            self.write_u32(v)?;
        }
        Ok(())
    }

    /// Write a whole i16 slice in order
    pub fn write_i16s(&mut self, values: &[i16]) -> Result<()> {
        for &v in values {
            self.write_i16(v)?;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    /// Read f32 values into the leading entries of `dest`
    pub fn read_f32s_into(&mut self, dest: &mut [f32]) -> Result<()> {
        for v in dest {
            *v = self.read_f32()?;
        }
        Ok(())
    }

    /// Read i16 values into the leading entries of `dest`
    pub fn read_i16s_into(&mut self, dest: &mut [i16]) -> Result<()> {
        for v in dest {
            *v = self.read_i16()?;
        }
        Ok(())
    }
}

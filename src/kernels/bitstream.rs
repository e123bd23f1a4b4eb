//! This module contains the bit-level cursor every decode kernel reads through.
//!
//! Bits are consumed MSB-first (bit 7 of byte 0 is bit offset 0). A cursor only
//! borrows its payload, so any number of cursors may sit at different absolute
//! offsets of one shared catalog stream. The cursor is panic-free: reading past
//! the end of the payload surfaces as `SpriteError::OutOfBounds`.

use bitvec::prelude::*;

use crate::error::SpriteError;

/// A forward-only, bit-granular reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct BitstreamCursor<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    start: usize,
    offset: usize,
}

impl<'a> BitstreamCursor<'a> {
    /// Creates a cursor positioned at the first bit of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::at(buffer, 0)
    }

    /// Creates a cursor positioned at an absolute bit offset into `buffer`.
    pub fn at(buffer: &'a [u8], bit_offset: usize) -> Self {
        Self {
            bits: BitSlice::from_slice(buffer),
            start: bit_offset,
            offset: bit_offset,
        }
    }

    /// Reads the bit under the cursor and advances by one.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool, SpriteError> {
        let bit = self
            .bits
            .get(self.offset)
            .map(|bit| *bit)
            .ok_or(SpriteError::OutOfBounds {
                offset: self.offset,
                limit: self.bits.len(),
            })?;
        self.offset += 1;
        Ok(bit)
    }

    /// The absolute bit offset of the next read.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of bits read since the cursor was created.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.offset - self.start
    }

    /// Bits left before the end of the payload.
    pub fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.offset)
    }
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_msb_first() {
        let data = [0b1010_0000u8, 0b0000_0001];
        let mut cursor = BitstreamCursor::new(&data);
        let first: Vec<bool> = (0..4).map(|_| cursor.read_bit().unwrap()).collect();
        assert_eq!(first, vec![true, false, true, false]);

        let mut tail = BitstreamCursor::at(&data, 15);
        assert!(tail.read_bit().unwrap());
        assert_eq!(tail.position(), 16);
        assert_eq!(tail.consumed(), 1);
    }

    #[test]
    fn test_independent_cursors_share_one_payload() {
        let data = [0xF0u8, 0x0F];
        let mut a = BitstreamCursor::at(&data, 0);
        let mut b = BitstreamCursor::at(&data, 8);
        assert!(a.read_bit().unwrap());
        assert!(!b.read_bit().unwrap());
        assert_eq!(a.position(), 1);
        assert_eq!(b.position(), 9);
    }

    #[test]
    fn test_read_past_end_is_out_of_bounds() {
        let data = [0xFFu8];
        let mut cursor = BitstreamCursor::at(&data, 7);
        assert!(cursor.read_bit().unwrap());
        assert_eq!(cursor.remaining(), 0);

        let err = cursor.read_bit().unwrap_err();
        assert!(matches!(err, SpriteError::OutOfBounds { offset: 8, limit: 8 }));
        // A failed read must not move the cursor.
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_empty_buffer() {
        let mut cursor = BitstreamCursor::new(&[]);
        assert!(cursor.read_bit().is_err());
    }
}

//! Reading runs of bits packed MSB-first.
//!
//! Embedded bitmaps and some hinting formats pack fields that are narrower
//! than a byte. A [`BitCursor`] walks such data, crossing byte boundaries as
//! needed.

use crate::font_data::Cursor;
use crate::read::ReadError;

/// A cursor that reads bit fields from an underlying byte [`Cursor`].
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    cursor: Cursor<'a>,
    // bits already consumed from the byte at `cursor.position()`; always 0..8
    bit_offset: u32,
}

impl<'a> BitCursor<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        BitCursor {
            cursor,
            bit_offset: 0,
        }
    }

    /// The number of bits that can still be read.
    pub fn bit_len(&self) -> usize {
        self.cursor.remaining_bytes() * 8 - self.bit_offset as usize
    }

    /// The position, in bits, from the start of the underlying data.
    pub fn bit_position(&self) -> usize {
        self.cursor.position() * 8 + self.bit_offset as usize
    }

    /// Read an unsigned field of `width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is not in `1..=32`.
    pub fn read_bits(&mut self, width: u32) -> Result<u32, ReadError> {
        assert!((1..=32).contains(&width), "bit width must be in 1..=32");
        self.check_available(width as usize)?;
        let mut result = 0u64;
        let mut remaining = width;
        while remaining > 0 {
            let byte = self.cursor.peek::<u8>()?;
            let available = 8 - self.bit_offset;
            let take = available.min(remaining);
            let shift = available - take;
            let bits = (byte as u32 >> shift) & ((1u32 << take) - 1);
            result = (result << take) | bits as u64;
            remaining -= take;
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.cursor.skip(1)?;
                self.bit_offset = 0;
            }
        }
        Ok(result as u32)
    }

    /// Read a two's complement field of `width` bits.
    pub fn read_signed_bits(&mut self, width: u32) -> Result<i32, ReadError> {
        let raw = self.read_bits(width)?;
        Ok(sign_extend(raw, width))
    }

    /// Read `count` unsigned fields of `width` bits each.
    ///
    /// Either all of the fields are read, or none are.
    pub fn read_bits_group(&mut self, width: u32, count: usize) -> Result<Vec<u32>, ReadError> {
        self.check_group(width, count)?;
        (0..count).map(|_| self.read_bits(width)).collect()
    }

    /// Read `count` signed fields of `width` bits each.
    pub fn read_signed_bits_group(
        &mut self,
        width: u32,
        count: usize,
    ) -> Result<Vec<i32>, ReadError> {
        self.check_group(width, count)?;
        (0..count).map(|_| self.read_signed_bits(width)).collect()
    }

    pub fn skip_bits(&mut self, n_bits: usize) -> Result<(), ReadError> {
        self.check_available(n_bits)?;
        let total = self.bit_offset as usize + n_bits;
        self.cursor.skip(total / 8)?;
        self.bit_offset = (total % 8) as u32;
        Ok(())
    }

    /// Discard the rest of a partially read byte.
    pub fn align_to_byte(&mut self) {
        if self.bit_offset != 0 {
            // the partial byte exists, so this cannot fail
            let _ = self.cursor.skip(1);
            self.bit_offset = 0;
        }
    }

    /// Align to the next byte and return the underlying cursor.
    pub fn into_cursor(mut self) -> Cursor<'a> {
        self.align_to_byte();
        self.cursor
    }

    fn check_group(&self, width: u32, count: usize) -> Result<(), ReadError> {
        match (width as usize).checked_mul(count) {
            Some(n_bits) => self.check_available(n_bits),
            None => Err(ReadError::InsufficientData {
                requested: usize::MAX,
                available: self.cursor.remaining_bytes(),
            }),
        }
    }

    fn check_available(&self, n_bits: usize) -> Result<(), ReadError> {
        if n_bits > self.bit_len() {
            let needed = (self.bit_offset as usize + n_bits).div_ceil(8);
            return Err(ReadError::InsufficientData {
                requested: needed,
                available: self.cursor.remaining_bytes(),
            });
        }
        Ok(())
    }
}

fn sign_extend(raw: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((raw << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bits(bytes: &[u8]) -> BitCursor<'_> {
        BitCursor::new(Cursor::new(bytes))
    }

    #[test]
    fn single_bits() {
        let mut cursor = bits(&[0xA5]);
        assert_eq!(
            cursor.read_bits_group(1, 7).unwrap(),
            vec![1, 0, 1, 0, 0, 1, 0]
        );
        assert_eq!(cursor.bit_len(), 1);
    }

    #[rstest]
    #[case(4, &[0x4C, 0x29, 0xA5, 0x50], vec![4, 12, 2, 9, 10, 5, 5])]
    #[case(5, &[0x23, 0x04, 0x95, 0x14, 0xA0], vec![4, 12, 2, 9, 10, 5, 5])]
    fn unsigned_groups(#[case] width: u32, #[case] bytes: &[u8], #[case] expected: Vec<u32>) {
        let mut cursor = bits(bytes);
        assert_eq!(
            cursor.read_bits_group(width, expected.len()).unwrap(),
            expected
        );
    }

    #[test]
    fn signed_group() {
        let mut cursor = bits(&[0x97, 0x70, 0x53]);
        assert_eq!(
            cursor.read_signed_bits_group(3, 8).unwrap(),
            vec![-4, -3, -2, -1, 0, 1, 2, 3]
        );
    }

    #[test]
    fn wide_reads_cross_bytes() {
        let mut cursor = bits(&[0xFF, 0x80, 0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(cursor.read_bits(9).unwrap(), 0x1FF);
        assert_eq!(cursor.bit_position(), 9);
        cursor.align_to_byte();
        assert_eq!(cursor.bit_position(), 16);
        assert_eq!(cursor.read_bits(32).unwrap(), 0x12345678);
        assert_eq!(cursor.read_signed_bits(4).unwrap(), -7);
        cursor.skip_bits(3).unwrap();
        assert_eq!(cursor.read_bits(1).unwrap(), 0);
        assert_eq!(cursor.bit_len(), 0);
    }

    #[test]
    fn insufficient_bits() {
        let mut cursor = bits(&[0xFF, 0x00]);
        cursor.read_bits(3).unwrap();
        assert_eq!(
            cursor.read_bits(14),
            Err(ReadError::InsufficientData {
                requested: 3,
                available: 2
            })
        );
        // nothing was consumed
        assert_eq!(cursor.bit_len(), 13);
        assert!(cursor.read_bits_group(5, 3).is_err());
        assert_eq!(cursor.read_bits(13).unwrap(), 0x1F00);
    }

    #[test]
    fn huge_group_count() {
        let mut cursor = bits(&[0xAB, 0xCD]);
        cursor.read_bits(4).unwrap();
        assert_eq!(
            cursor.read_bits_group(16, usize::MAX),
            Err(ReadError::InsufficientData {
                requested: usize::MAX,
                available: 2
            })
        );
        assert!(matches!(
            cursor.read_signed_bits_group(3, usize::MAX / 2),
            Err(ReadError::InsufficientData { .. })
        ));
        assert_eq!(cursor.read_bits(12).unwrap(), 0xBCD);
    }

    #[test]
    fn back_to_bytes() {
        let mut cursor = bits(&[0xF0, 0x00, 0x07]);
        cursor.read_bits(2).unwrap();
        let mut bytes = cursor.into_cursor();
        assert_eq!(bytes.read::<u16>().unwrap(), 7);
    }
}

use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};

use types::Scalar;

use crate::error::Error;
use crate::validate::Validate;

/// A type that that can be written out as part of a font table.
///
/// Positions that are not known yet are marked with [`Stake`]s, and offsets
/// between stakes are filled in when the writer produces its bytes.
pub trait FontWrite {
    /// Write our data and information about offsets into this [LinkedWriter].
    fn write_into(&self, writer: &mut LinkedWriter);
}

/// A marker for a position in the output of a [`LinkedWriter`].
///
/// A stake can be created before the position it marks has been written,
/// and can be pointed at by offsets either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stake(u32);

/// The width of an offset field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OffsetLen {
    Offset8,
    Offset16,
    Offset24,
    Offset32,
    /// A field of 1 to 32 bits, which need not start on a byte boundary.
    Bits(u8),
}

impl OffsetLen {
    /// The width of the field in bits.
    pub fn bits(self) -> u32 {
        match self {
            OffsetLen::Offset8 => 8,
            OffsetLen::Offset16 => 16,
            OffsetLen::Offset24 => 24,
            OffsetLen::Offset32 => 32,
            OffsetLen::Bits(bits) => bits as u32,
        }
    }
}

/// Adjustments applied when an offset is resolved.
///
/// The stored value is `(to - from + byte_delta) / divisor`, where `to` and
/// `from` are the byte positions of the two stakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetOptions {
    pub byte_delta: i64,
    /// The distance must be an exact multiple of this.
    pub divisor: u32,
    /// Overrides the writer-wide setting from
    /// [`allow_negative_offsets`](LinkedWriter::allow_negative_offsets).
    pub allow_negative: Option<bool>,
}

impl Default for OffsetOptions {
    fn default() -> Self {
        OffsetOptions {
            byte_delta: 0,
            divisor: 1,
            allow_negative: None,
        }
    }
}

/// A value that was written as a placeholder and can be replaced later.
#[derive(Debug)]
pub struct DeferredValue<T> {
    bit_pos: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for DeferredValue<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DeferredValue<T> {}

#[derive(Clone, Debug)]
struct PendingOffset {
    bit_pos: usize,
    len: OffsetLen,
    from: Stake,
    to: Stake,
    options: OffsetOptions,
}

/// An append-only bit buffer with forward references.
///
/// Bytes are appended as they are written; offsets between [`Stake`]s are
/// reserved as zeroed fields and only computed by
/// [`binary_string`](Self::binary_string), which leaves the writer unchanged
/// so it can be resolved again after more data is added.
#[derive(Clone, Debug, Default)]
pub struct LinkedWriter {
    bytes: Vec<u8>,
    bit_len: usize,
    /// The bit position of each stake, once it has been placed.
    stakes: Vec<Option<usize>>,
    offsets: Vec<PendingOffset>,
    allow_negative: bool,
    error: Option<Error>,
}

/// Attempt to serialize a table.
///
/// The table is validated first; if it is malformed this returns
/// [`Error::ValidationFailed`], otherwise the bytes encoding the table with
/// all offsets resolved.
pub fn dump_table<T: FontWrite + Validate>(table: &T) -> Result<Vec<u8>, Error> {
    table.validate()?;
    let mut writer = LinkedWriter::new();
    table.write_into(&mut writer);
    writer.binary_string()
}

impl LinkedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// The number of bytes written so far, counting a partial last byte.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Discard everything, including stakes and pending offsets.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write raw bytes.
    ///
    /// The caller is responsible for ensuring bytes are in big-endian order.
    #[inline]
    pub fn write_slice(&mut self, bytes: &[u8]) {
        if self.bit_len % 8 == 0 {
            self.bytes.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            bytes
                .iter()
                .for_each(|byte| self.push_bits(*byte as u64, 8));
        }
    }

    /// Write any [`FontWrite`] object.
    pub fn add<T: FontWrite + ?Sized>(&mut self, obj: &T) {
        obj.write_into(self)
    }

    /// Append the first `count` bits of `bits`, most significant bit first.
    ///
    /// # Panics
    ///
    /// If `bits` holds fewer than `count` bits.
    pub fn add_bits(&mut self, bits: &[u8], count: usize) {
        assert!(
            count <= bits.len() * 8,
            "{count} bits requested from {} bytes",
            bits.len()
        );
        for i in 0..count {
            let bit = (bits[i / 8] >> (7 - i % 8)) & 1;
            self.push_bits(bit as u64, 1);
        }
    }

    /// Append `value` in `count` bits.
    ///
    /// Negative values are written in two's complement.
    pub fn add_bits_from_number(&mut self, value: i64, count: u32) -> Result<(), Error> {
        let raw = encode_bits(value, count, value < 0)?;
        self.push_bits(raw, count);
        Ok(())
    }

    /// Append each of `values` in `count` bits.
    ///
    /// Nothing is written unless every value fits.
    pub fn add_bits_group(&mut self, values: &[i64], count: u32, signed: bool) -> Result<(), Error> {
        let raw = values
            .iter()
            .map(|value| encode_bits(*value, count, signed))
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().for_each(|bits| self.push_bits(bits, count));
        Ok(())
    }

    /// Pad with zero bits up to a multiple of `multiple` bits.
    pub fn align_to_bit_multiple(&mut self, multiple: usize) {
        let rem = self.bit_len % multiple;
        if rem != 0 {
            self.pad_bits(multiple - rem);
        }
    }

    /// Pad with zero bits up to a multiple of `multiple` bytes.
    pub fn align_to_byte_multiple(&mut self, multiple: usize) {
        self.align_to_bit_multiple(multiple * 8)
    }

    /// Create a stake that is not placed yet.
    pub fn new_stake(&mut self) -> Stake {
        self.stakes.push(None);
        Stake(self.stakes.len() as u32 - 1)
    }

    /// Create a stake at the current position.
    pub fn stake_current(&mut self) -> Stake {
        let stake = self.new_stake();
        self.stake_current_with_value(stake);
        stake
    }

    /// Place an existing stake at the current position.
    pub fn stake_current_with_value(&mut self, stake: Stake) {
        self.stakes[stake.0 as usize] = Some(self.bit_len);
    }

    /// The byte position of a stake, if it has been placed on a byte boundary.
    pub fn stake_position(&self, stake: Stake) -> Option<usize> {
        self.stakes
            .get(stake.0 as usize)
            .copied()
            .flatten()
            .filter(|bit_pos| bit_pos % 8 == 0)
            .map(|bit_pos| bit_pos / 8)
    }

    /// Reserve a field for the offset from one stake to another.
    pub fn add_unresolved_offset(&mut self, len: OffsetLen, from: Stake, to: Stake) {
        self.add_unresolved_offset_with(len, from, to, OffsetOptions::default())
    }

    /// Reserve a field for an offset, with a delta, divisor or sign override.
    ///
    /// # Panics
    ///
    /// If the field is wider than 32 bits, or the divisor is zero.
    pub fn add_unresolved_offset_with(
        &mut self,
        len: OffsetLen,
        from: Stake,
        to: Stake,
        options: OffsetOptions,
    ) {
        let bits = len.bits();
        assert!((1..=32).contains(&bits), "invalid offset width {bits}");
        assert!(options.divisor != 0, "offset divisor must not be zero");
        self.offsets.push(PendingOffset {
            bit_pos: self.bit_len,
            len,
            from,
            to,
            options,
        });
        self.pad_bits(bits as usize);
    }

    /// Allow offsets to resolve to negative values.
    pub fn allow_negative_offsets(&mut self) {
        self.allow_negative = true;
    }

    /// Write a value that can be overwritten with [`set_deferred_value`](Self::set_deferred_value).
    pub fn add_deferred_value<T: Scalar>(&mut self, initial: T) -> DeferredValue<T> {
        let bit_pos = self.bit_len;
        self.write_slice(initial.to_raw().as_ref());
        DeferredValue {
            bit_pos,
            _marker: PhantomData,
        }
    }

    /// Overwrite a value written with [`add_deferred_value`](Self::add_deferred_value).
    pub fn set_deferred_value<T: Scalar>(&mut self, slot: DeferredValue<T>, value: T) {
        let raw = value.to_raw();
        for (i, byte) in raw.as_ref().iter().enumerate() {
            set_bits(&mut self.bytes, slot.bit_pos + i * 8, *byte as u64, 8);
        }
    }

    /// Record an error found while writing.
    ///
    /// [`FontWrite`] has no way to fail, so objects that find a problem while
    /// writing report it here; the first one is returned by
    /// [`binary_string`](Self::binary_string).
    pub fn report_error(&mut self, error: Error) {
        log::debug!("error while writing: {error}");
        self.error.get_or_insert(error);
    }

    /// The bytes written so far, with every offset resolved.
    ///
    /// A partial last byte is padded with zero bits.
    pub fn binary_string(&self) -> Result<Vec<u8>, Error> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut out = self.bytes.clone();
        for offset in &self.offsets {
            let value = self.resolve(offset)?;
            set_bits(&mut out, offset.bit_pos, value, offset.len.bits());
        }
        Ok(out)
    }

    /// The table checksum of the resolved bytes in `range`.
    ///
    /// The bytes are summed as big-endian u32 words, with a short last word
    /// padded with zeros.
    pub fn checksum(&self, range: impl RangeBounds<usize>) -> Result<u32, Error> {
        let bytes = self.binary_string()?;
        let end = match range.end_bound() {
            Bound::Included(end) => end + 1,
            Bound::Excluded(end) => *end,
            Bound::Unbounded => bytes.len(),
        }
        .min(bytes.len());
        let start = match range.start_bound() {
            Bound::Included(start) => *start,
            Bound::Excluded(start) => start + 1,
            Bound::Unbounded => 0,
        }
        .min(end);
        Ok(bytes[start..end].chunks(4).fold(0u32, |sum, chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum.wrapping_add(u32::from_be_bytes(word))
        }))
    }

    fn push_bits(&mut self, value: u64, count: u32) {
        let start = self.bit_len;
        self.pad_bits(count as usize);
        set_bits(&mut self.bytes, start, value, count);
    }

    // bits past bit_len are always zero, so padding only has to grow the buffer
    fn pad_bits(&mut self, count: usize) {
        self.bit_len += count;
        self.bytes.resize(self.bit_len.div_ceil(8), 0);
    }

    fn stake_byte_pos(&self, stake: Stake) -> Result<i64, Error> {
        let bit_pos = self
            .stakes
            .get(stake.0 as usize)
            .copied()
            .flatten()
            .ok_or(Error::UnresolvedStake(stake))?;
        if bit_pos % 8 != 0 {
            return Err(Error::UnalignedStake(stake));
        }
        Ok((bit_pos / 8) as i64)
    }

    fn resolve(&self, offset: &PendingOffset) -> Result<u64, Error> {
        let OffsetOptions {
            byte_delta,
            divisor,
            allow_negative,
        } = offset.options;
        let distance =
            self.stake_byte_pos(offset.to)? - self.stake_byte_pos(offset.from)? + byte_delta;
        if distance % divisor as i64 != 0 {
            return Err(Error::InexactOffset { distance, divisor });
        }
        let value = distance / divisor as i64;
        if value < 0 && !allow_negative.unwrap_or(self.allow_negative) {
            return Err(Error::NegativeOffset(value));
        }
        let bits = offset.len.bits();
        encode_bits(value, bits, value < 0).map_err(|_| Error::OffsetOverflow { value, bits })
    }
}

/// Encode `value` in the low `count` bits, as two's complement if `signed`.
fn encode_bits(value: i64, count: u32, signed: bool) -> Result<u64, Error> {
    assert!((1..=32).contains(&count), "invalid bit count {count}");
    let fits = if signed {
        let half = 1i64 << (count - 1);
        (-half..half).contains(&value)
    } else {
        (0..1i64 << count).contains(&value)
    };
    if !fits {
        return Err(Error::BitsOverflow { value, bits: count });
    }
    Ok(value as u64 & ((1u64 << count) - 1))
}

fn set_bits(bytes: &mut [u8], bit_pos: usize, value: u64, count: u32) {
    let count = count as usize;
    for i in 0..count {
        let pos = bit_pos + i;
        let mask = 0x80u8 >> (pos % 8);
        if (value >> (count - 1 - i)) & 1 == 1 {
            bytes[pos / 8] |= mask;
        } else {
            bytes[pos / 8] &= !mask;
        }
    }
}

macro_rules! write_be_bytes {
    ($ty:ty) => {
        impl FontWrite for $ty {
            #[inline]
            fn write_into(&self, writer: &mut LinkedWriter) {
                writer.write_slice(Scalar::to_raw(*self).as_ref())
            }
        }
    };
}

//NOTE: not implemented for stakes! an offset needs to know where it starts from.
write_be_bytes!(u8);
write_be_bytes!(i8);
write_be_bytes!(u16);
write_be_bytes!(i16);
write_be_bytes!(u32);
write_be_bytes!(i32);
write_be_bytes!(types::Uint24);
write_be_bytes!(types::F2Dot14);
write_be_bytes!(types::Fixed);
write_be_bytes!(types::Tag);
write_be_bytes!(types::GlyphId16);

impl<T: FontWrite> FontWrite for [T] {
    fn write_into(&self, writer: &mut LinkedWriter) {
        self.iter().for_each(|item| item.write_into(writer))
    }
}

impl<T: FontWrite, const N: usize> FontWrite for [T; N] {
    fn write_into(&self, writer: &mut LinkedWriter) {
        self.as_slice().write_into(writer)
    }
}

impl<T: FontWrite> FontWrite for Vec<T> {
    fn write_into(&self, writer: &mut LinkedWriter) {
        self.as_slice().write_into(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::four_bits(4, &[0x4C, 0x29, 0xA5, 0x50])]
    #[case::five_bits(5, &[0x23, 0x04, 0x95, 0x14, 0xA0])]
    fn bits_group(#[case] bits: u32, #[case] expected: &[u8]) {
        let mut writer = LinkedWriter::new();
        writer
            .add_bits_group(&[4, 12, 2, 9, 10, 5, 5], bits, false)
            .unwrap();
        assert_eq!(writer.binary_string().unwrap(), expected);
    }

    #[test]
    fn signed_bits_group() {
        let mut writer = LinkedWriter::new();
        writer
            .add_bits_group(&[-4, -3, -2, -1, 0, 1, 2, 3], 3, true)
            .unwrap();
        assert_eq!(writer.binary_string().unwrap(), [0x97, 0x70, 0x53]);
    }

    #[test]
    fn bits_group_is_all_or_nothing() {
        let mut writer = LinkedWriter::new();
        let err = writer.add_bits_group(&[1, 2, 16, 3], 4, false).unwrap_err();
        assert!(matches!(err, Error::BitsOverflow { value: 16, bits: 4 }));
        assert!(writer.is_empty());
        assert!(writer.add_bits_group(&[4], 3, true).is_err());
    }

    #[test]
    fn bits_from_number() {
        let mut writer = LinkedWriter::new();
        writer.add_bits_from_number(-5, 4).unwrap();
        writer.add_bits_from_number(5, 4).unwrap();
        writer.add_bits_from_number(3, 8).unwrap();
        assert_eq!(writer.binary_string().unwrap(), [0xB5, 0x03]);
        assert!(writer.add_bits_from_number(15, 3).is_err());
        assert_eq!(writer.bit_len(), 16);
    }

    #[test]
    fn leading_bits() {
        let mut writer = LinkedWriter::new();
        writer.add_bits(&[0xFF, 0xFF], 9);
        assert_eq!(writer.binary_string().unwrap(), [0xFF, 0x80]);
        writer.add_bits(&[0x55], 6);
        assert_eq!(writer.binary_string().unwrap(), [0xFF, 0xAA]);
        assert_eq!(writer.bit_len(), 15);
        writer.align_to_byte_multiple(2);
        writer.write_slice(&[1]);
        assert_eq!(writer.binary_string().unwrap(), [0xFF, 0xAA, 0x01]);
    }

    #[test]
    fn unaligned_slice() {
        let mut writer = LinkedWriter::new();
        writer.add_bits(&[0xF0], 4);
        writer.add(&0xABCD_u16);
        writer.align_to_bit_multiple(8);
        assert_eq!(writer.binary_string().unwrap(), [0xFA, 0xBC, 0xD0]);
    }

    #[test]
    fn offsets_with_byte_delta() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        let target = writer.new_stake();
        writer.add(&-1_i16);
        writer.add_unresolved_offset(OffsetLen::Offset16, start, target);
        writer.add(&-2_i16);
        writer.add_unresolved_offset_with(
            OffsetLen::Offset16,
            start,
            target,
            OffsetOptions {
                byte_delta: 10,
                ..Default::default()
            },
        );
        writer.stake_current_with_value(target);
        writer.add(&-3_i16);
        writer.write_slice(b"Hi there");
        assert_eq!(
            writer.binary_string().unwrap(),
            b"\xFF\xFF\x00\x08\xFF\xFE\x00\x12\xFF\xFDHi there"
        );
        assert_eq!(writer.stake_position(target), Some(8));
    }

    #[test]
    fn offset_in_bit_field() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        writer.add(&0xFFFF_u16);
        writer.add_bits(&[0xC0], 2);
        let target = writer.new_stake();
        writer.add_unresolved_offset(OffsetLen::Bits(14), start, target);
        writer.stake_current_with_value(target);
        writer.add(&[0xFFFE_u16, 0xFFFD]);
        assert_eq!(
            writer.binary_string().unwrap(),
            [0xFF, 0xFF, 0xC0, 0x04, 0xFF, 0xFE, 0xFF, 0xFD]
        );
    }

    #[rstest]
    #[case::sixteen_bits(false, &[0xFF, 0xDB])]
    #[case::twenty_nine_bits(true, &[0x1F, 0xFF, 0xFF, 0xDB])]
    fn scaled_negative_offset(#[case] bit_field: bool, #[case] expected: &[u8]) {
        let mut writer = LinkedWriter::new();
        writer.allow_negative_offsets();
        let start = writer.stake_current();
        let target = writer.new_stake();
        let options = OffsetOptions {
            byte_delta: -140,
            divisor: 2,
            allow_negative: None,
        };
        if bit_field {
            writer.add_bits(&[0], 3);
            writer.add_unresolved_offset_with(OffsetLen::Bits(29), start, target, options);
        } else {
            writer.add_unresolved_offset_with(OffsetLen::Offset16, start, target, options);
        }
        let field_len = writer.byte_len();
        writer.write_slice(&vec![0; 66 - field_len]);
        writer.stake_current_with_value(target);
        let bytes = writer.binary_string().unwrap();
        assert_eq!(&bytes[..field_len], expected);
    }

    #[test]
    fn inexact_offset() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        let target = writer.new_stake();
        let options = OffsetOptions {
            divisor: 4,
            ..Default::default()
        };
        writer.add_unresolved_offset_with(OffsetLen::Offset16, start, target, options);
        writer.stake_current_with_value(target);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::InexactOffset {
                distance: 2,
                divisor: 4
            })
        ));
    }

    #[test]
    fn negative_offset() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        writer.add(&5_u16);
        writer.write_slice(b"Hello!");
        let here = writer.stake_current();
        writer.add_unresolved_offset(OffsetLen::Offset16, here, start);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::NegativeOffset(-8))
        ));
        writer.allow_negative_offsets();
        assert_eq!(
            writer.binary_string().unwrap(),
            b"\x00\x05Hello!\xFF\xF8"
        );
    }

    #[test]
    fn offset_overflow() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        let target = writer.new_stake();
        writer.add_unresolved_offset(OffsetLen::Offset16, start, target);
        writer.write_slice(&[0; 18]);
        writer.stake_current_with_value(target);
        assert_eq!(writer.binary_string().unwrap()[..2], [0, 20]);

        writer.write_slice(&vec![0; 70_000 - 20]);
        writer.stake_current_with_value(target);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::OffsetOverflow {
                value: 70_000,
                bits: 16
            })
        ));
    }

    #[test]
    fn stake_errors() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        let nowhere = writer.new_stake();
        writer.add_unresolved_offset(OffsetLen::Offset8, start, nowhere);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::UnresolvedStake(stake)) if stake == nowhere
        ));
        writer.add_bits(&[0x80], 1);
        writer.stake_current_with_value(nowhere);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::UnalignedStake(stake)) if stake == nowhere
        ));
        assert_eq!(writer.stake_position(nowhere), None);
    }

    #[test]
    fn deferred_value() {
        let mut writer = LinkedWriter::new();
        writer.write_slice(b"ab");
        let slot = writer.add_deferred_value(0_i16);
        writer.write_slice(b"yz");
        assert_eq!(writer.binary_string().unwrap(), b"ab\x00\x00yz");
        writer.set_deferred_value(slot, -1);
        assert_eq!(writer.binary_string().unwrap(), b"ab\xFF\xFFyz");
    }

    #[test]
    fn checksum() {
        let mut writer = LinkedWriter::new();
        writer.write_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(writer.checksum(..).unwrap(), 0x06020304);
        assert_eq!(writer.checksum(2..4).unwrap(), 0x03040000);
        assert_eq!(writer.checksum(3..).unwrap(), 0x04050000);
    }

    #[test]
    fn resolving_is_repeatable() {
        let mut writer = LinkedWriter::new();
        let start = writer.stake_current();
        let end = writer.new_stake();
        writer.add_unresolved_offset(OffsetLen::Offset32, start, end);
        writer.stake_current_with_value(end);
        assert_eq!(writer.binary_string().unwrap(), [0, 0, 0, 4]);
        writer.add(&[1_u8, 2]);
        writer.stake_current_with_value(end);
        assert_eq!(writer.binary_string().unwrap(), [0, 0, 0, 6, 1, 2]);

        writer.reset();
        assert!(writer.is_empty());
        assert_eq!(writer.binary_string().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn reported_error() {
        let mut writer = LinkedWriter::new();
        writer.add(&1_u8);
        writer.report_error(Error::TooManyEntries(300));
        writer.report_error(Error::TooManyClasses(300));
        assert!(matches!(
            writer.binary_string(),
            Err(Error::TooManyEntries(300))
        ));
    }
}

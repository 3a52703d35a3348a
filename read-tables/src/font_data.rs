//! raw table bytes, and a cursor for walking them

use std::ops::{Range, RangeBounds};

use bytemuck::AnyBitPattern;
use types::{BigEndian, FixedSize, Scalar};

use crate::read::{FontRead, ReadError};

/// A reference to raw binary table data.
///
/// This is a wrapper around a byte slice, that provides convenience methods
/// for parsing and validating that data. Copying a `FontData` never copies
/// the underlying bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FontData<'a> {
    bytes: &'a [u8],
}

/// A cursor for reading through a [`FontData`].
///
/// The cursor's position is always within `0..=len`, where `len` is the
/// length of the data it was created from; that length is the exclusive
/// bound for every read. A failed read never moves the cursor.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    pos: usize,
    data: FontData<'a>,
}

/// Where an offset passed to [`Cursor::sub_cursor`] is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The start of the cursor's data.
    Start,
    /// The cursor's current position.
    Current,
}

impl<'a> FontData<'a> {
    /// Create a new `FontData` with these bytes.
    pub const fn new(bytes: &'a [u8]) -> Self {
        FontData { bytes }
    }

    /// The length of the data, in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if the data has a length of zero bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the data starting at `pos`, or `None` if `pos` is past the end.
    pub fn split_off(&self, pos: usize) -> Option<FontData<'a>> {
        self.bytes.get(pos..).map(FontData::new)
    }

    /// Returns the data up to (but not including) `pos`.
    pub fn take_up_to(&self, pos: usize) -> Option<FontData<'a>> {
        self.bytes.get(..pos).map(FontData::new)
    }

    pub fn slice(&self, range: impl RangeBounds<usize>) -> Option<FontData<'a>> {
        let bounds = (range.start_bound().cloned(), range.end_bound().cloned());
        self.bytes.get(bounds).map(FontData::new)
    }

    /// Read a scalar at the provided byte offset.
    pub fn read_at<T: Scalar>(&self, offset: usize) -> Result<T, ReadError> {
        self.bytes
            .get(offset..offset.saturating_add(T::RAW_BYTE_LEN))
            .and_then(T::read)
            .ok_or_else(|| self.insufficient(offset, T::RAW_BYTE_LEN))
    }

    /// Interpret the bytes at `offset` as a reference to some type `T`.
    pub fn read_ref_at<T: AnyBitPattern + FixedSize>(
        &self,
        offset: usize,
    ) -> Result<&'a T, ReadError> {
        let bytes = self
            .bytes
            .get(offset..offset.saturating_add(T::RAW_BYTE_LEN))
            .ok_or_else(|| self.insufficient(offset, T::RAW_BYTE_LEN))?;
        bytemuck::try_from_bytes(bytes).map_err(|_| ReadError::InvalidArrayLen)
    }

    /// Interpret the bytes in `range` as a slice of `T`.
    ///
    /// The length of the range must be a multiple of the size of `T`.
    pub fn read_array<T: AnyBitPattern + FixedSize>(
        &self,
        range: Range<usize>,
    ) -> Result<&'a [T], ReadError> {
        let bytes = self
            .bytes
            .get(range.clone())
            .ok_or_else(|| self.insufficient(range.start, range.len()))?;
        if bytes.len() % T::RAW_BYTE_LEN != 0 {
            return Err(ReadError::InvalidArrayLen);
        }
        bytemuck::try_cast_slice(bytes).map_err(|_| ReadError::InvalidArrayLen)
    }

    /// Read a `T` from the data starting at `offset`.
    pub fn read_table_at<T: FontRead<'a>>(&self, offset: usize) -> Result<T, ReadError> {
        self.split_off(offset)
            .ok_or(ReadError::OutOfBounds)
            .and_then(T::read)
    }

    pub fn cursor(&self) -> Cursor<'a> {
        Cursor {
            pos: 0,
            data: *self,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    fn insufficient(&self, offset: usize, requested: usize) -> ReadError {
        ReadError::InsufficientData {
            requested,
            available: self.len().saturating_sub(offset),
        }
    }
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        FontData::new(bytes).cursor()
    }

    /// Read a scalar and advance past it.
    pub fn read<T: Scalar>(&mut self) -> Result<T, ReadError> {
        let value = self.data.read_at(self.pos)?;
        self.pos += T::RAW_BYTE_LEN;
        Ok(value)
    }

    /// Read a scalar without advancing.
    pub fn peek<T: Scalar>(&self) -> Result<T, ReadError> {
        self.data.read_at(self.pos)
    }

    /// Read `count` items, borrowing them from the underlying data.
    ///
    /// The whole run is checked before anything is consumed.
    pub fn read_array<T: AnyBitPattern + FixedSize>(
        &mut self,
        count: usize,
    ) -> Result<&'a [T], ReadError> {
        let len = count
            .checked_mul(T::RAW_BYTE_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        let array = self.data.read_array(self.pos..self.pos.saturating_add(len))?;
        self.pos += len;
        Ok(array)
    }

    /// Read `count` scalars into a vector.
    pub fn read_group<T>(&mut self, count: usize) -> Result<Vec<T>, ReadError>
    where
        T: Scalar + Copy + 'static,
    {
        let raw = self.read_array::<BigEndian<T>>(count)?;
        Ok(raw.iter().map(BigEndian::get).collect())
    }

    /// Read as many whole scalars as remain.
    ///
    /// A trailing partial item is an error.
    pub fn read_rest<T>(&mut self) -> Result<Vec<T>, ReadError>
    where
        T: Scalar + Copy + 'static,
    {
        if self.remaining_bytes() % T::RAW_BYTE_LEN != 0 {
            return Err(ReadError::InvalidArrayLen);
        }
        self.read_group(self.remaining_bytes() / T::RAW_BYTE_LEN)
    }

    /// Read a `T` from the data at the current position.
    ///
    /// The cursor is not advanced, since the size of `T` is not known.
    pub fn read_table<T: FontRead<'a>>(&self) -> Result<T, ReadError> {
        T::read(self.remaining())
    }

    /// Read a length byte, then that many bytes.
    pub fn read_pascal_string(&mut self) -> Result<&'a [u8], ReadError> {
        let len = self.peek::<u8>()? as usize;
        let bytes = self
            .data
            .as_bytes()
            .get(self.pos + 1..self.pos + 1 + len)
            .ok_or_else(|| self.data.insufficient(self.pos, len + 1))?;
        self.pos += len + 1;
        Ok(bytes)
    }

    /// Take the next `len` bytes.
    pub fn chunk(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        let bytes = self
            .data
            .as_bytes()
            .get(self.pos..self.pos.saturating_add(len))
            .ok_or_else(|| self.data.insufficient(self.pos, len))?;
        self.pos += len;
        Ok(bytes)
    }

    /// Borrow `len` bytes at `offset` without moving.
    pub fn piece(&self, len: usize, offset: usize, origin: Origin) -> Result<&'a [u8], ReadError> {
        let start = self.resolve(offset, origin)?;
        self.data
            .as_bytes()
            .get(start..start.saturating_add(len))
            .ok_or_else(|| self.data.insufficient(start, len))
    }

    /// All bytes from the current position to the end, without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        self.remaining().as_bytes()
    }

    /// The data from the current position to the end.
    pub fn remaining(&self) -> FontData<'a> {
        self.data.split_off(self.pos).unwrap_or_default()
    }

    pub fn remaining_bytes(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to `pos`, which may equal the length of the data but not exceed it.
    pub fn set_position(&mut self, pos: usize) -> Result<(), ReadError> {
        if pos > self.data.len() {
            return Err(ReadError::OutOfBounds);
        }
        self.pos = pos;
        Ok(())
    }

    /// Move back to the start of the data.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn skip(&mut self, n_bytes: usize) -> Result<(), ReadError> {
        if n_bytes > self.remaining_bytes() {
            return Err(self.data.insufficient(self.pos, n_bytes));
        }
        self.pos += n_bytes;
        Ok(())
    }

    /// Skip forward to the next multiple of `multiple`, measured from the
    /// start of the data.
    pub fn align(&mut self, multiple: usize) -> Result<(), ReadError> {
        let excess = self.pos % multiple.max(1);
        if excess != 0 {
            self.skip(multiple - excess)?;
        }
        Ok(())
    }

    /// Create a new cursor over the same bytes, starting at `offset`.
    ///
    /// If `limit` is provided, the new cursor cannot read more than that many
    /// bytes. The parent cursor is never moved.
    pub fn sub_cursor(
        &self,
        offset: usize,
        origin: Origin,
        limit: Option<usize>,
    ) -> Result<Cursor<'a>, ReadError> {
        let start = self.resolve(offset, origin)?;
        let data = match limit {
            Some(len) => self
                .data
                .slice(start..start.saturating_add(len))
                .ok_or_else(|| self.data.insufficient(start, len))?,
            None => self.data.split_off(start).ok_or(ReadError::OutOfBounds)?,
        };
        Ok(data.cursor())
    }

    /// The data this cursor was created from.
    pub fn data(&self) -> FontData<'a> {
        self.data
    }

    fn resolve(&self, offset: usize, origin: Origin) -> Result<usize, ReadError> {
        let start = match origin {
            Origin::Start => offset,
            Origin::Current => self.pos.checked_add(offset).ok_or(ReadError::OutOfBounds)?,
        };
        if start > self.data.len() {
            return Err(ReadError::OutOfBounds);
        }
        Ok(start)
    }
}

/// Turn a set of offsets (all measured from the start of `data`) into cursors.
///
/// Each cursor is bounded by the next larger offset, or by the end of the data
/// for the largest one. If `granularity` is provided, each length is rounded
/// down to a multiple of it. Zero offsets produce `None`.
pub fn offsets_to_sub_cursors<'a>(
    data: FontData<'a>,
    offsets: &[usize],
    granularity: Option<usize>,
) -> Result<Vec<Option<Cursor<'a>>>, ReadError> {
    let mut sorted = offsets
        .iter()
        .copied()
        .filter(|off| *off != 0)
        .collect::<Vec<_>>();
    sorted.sort_unstable();
    sorted.dedup();

    offsets
        .iter()
        .map(|&offset| {
            if offset == 0 {
                return Ok(None);
            }
            if offset > data.len() {
                return Err(ReadError::OutOfBounds);
            }
            let end = sorted
                .iter()
                .copied()
                .find(|other| *other > offset)
                .unwrap_or(data.len())
                .min(data.len());
            let mut len = end - offset;
            if let Some(granularity) = granularity.filter(|g| *g > 1) {
                len -= len % granularity;
            }
            data.slice(offset..offset + len)
                .map(|data| Some(data.cursor()))
                .ok_or(ReadError::OutOfBounds)
        })
        .collect()
}

impl AsRef<[u8]> for FontData<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for FontData<'a> {
    fn from(src: &'a [u8]) -> FontData<'a> {
        FontData::new(src)
    }
}

// useful so we can have offsets that are just to data
impl<'a> FontRead<'a> for FontData<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{F2Dot14, Fixed, Tag, Uint24};

    #[test]
    fn read_scalars() {
        let bytes = [
            0x01, 0xFF, 0xFE, 0x00, 0x01, 0x80, 0x00, 0x40, 0x00, 0x12, 0x34, 0x56, b'm', b'o',
            b'r', b'x',
        ];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read::<u8>().unwrap(), 1);
        assert_eq!(cursor.read::<i16>().unwrap(), -2);
        assert_eq!(cursor.read::<Fixed>().unwrap(), Fixed::from_f64(1.5));
        assert_eq!(cursor.read::<F2Dot14>().unwrap(), F2Dot14::ONE);
        assert_eq!(cursor.read::<Uint24>().unwrap(), Uint24::new(0x123456));
        assert_eq!(cursor.read::<Tag>().unwrap(), Tag::new(b"morx"));
        assert!(cursor.at_end());
    }

    #[test]
    fn failed_read_does_not_advance() {
        let mut cursor = Cursor::new(&[0, 1, 2]);
        cursor.skip(1).unwrap();
        assert_eq!(
            cursor.read::<u32>(),
            Err(ReadError::InsufficientData {
                requested: 4,
                available: 2
            })
        );
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read::<u16>().unwrap(), 0x0102);
    }

    #[test]
    fn peek() {
        let cursor = Cursor::new(&[0xAB, 0xCD]);
        assert_eq!(cursor.peek::<u16>().unwrap(), 0xABCD);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn group_is_all_or_nothing() {
        let mut cursor = Cursor::new(&[0, 1, 0, 2, 0]);
        assert!(matches!(
            cursor.read_group::<u16>(3),
            Err(ReadError::InsufficientData {
                requested: 6,
                available: 5
            })
        ));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_group::<u16>(2).unwrap(), vec![1, 2]);
        assert_eq!(cursor.remaining_bytes(), 1);
    }

    #[test]
    fn read_rest_rejects_partial_item() {
        let mut cursor = Cursor::new(&[0, 1, 0, 2, 0]);
        assert_eq!(cursor.read_rest::<u16>(), Err(ReadError::InvalidArrayLen));
        cursor.skip(1).unwrap();
        assert_eq!(cursor.read_rest::<u16>().unwrap(), vec![0x0100, 0x0200]);
    }

    #[test]
    fn sub_cursor_leaves_parent_alone() {
        let bytes = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let mut parent = Cursor::new(&bytes);
        parent.skip(2).unwrap();

        let mut child = parent.sub_cursor(4, Origin::Start, None).unwrap();
        assert_eq!(child.read::<u8>().unwrap(), 4);
        assert_eq!(child.remaining_bytes(), 3);
        assert_eq!(parent.position(), 2);

        let mut relative = parent.sub_cursor(1, Origin::Current, Some(2)).unwrap();
        assert_eq!(relative.read::<u16>().unwrap(), 0x0304);
        assert!(relative.at_end());
        // the limit is a hard bound, even though the parent has more data
        assert!(matches!(
            relative.read::<u8>(),
            Err(ReadError::InsufficientData { .. })
        ));

        assert_eq!(
            parent.sub_cursor(9, Origin::Start, None).err(),
            Some(ReadError::OutOfBounds)
        );
        assert!(matches!(
            parent.sub_cursor(6, Origin::Start, Some(4)),
            Err(ReadError::InsufficientData {
                requested: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn positions() {
        let mut cursor = Cursor::new(&[1, 2, 3, 4, 5]);
        cursor.set_position(5).unwrap();
        assert!(cursor.at_end());
        assert_eq!(cursor.set_position(6), Err(ReadError::OutOfBounds));
        cursor.reset();
        cursor.skip(1).unwrap();
        cursor.align(4).unwrap();
        assert_eq!(cursor.position(), 4);
        cursor.align(4).unwrap();
        assert_eq!(cursor.position(), 4);
        cursor.skip(1).unwrap();
        assert!(cursor.align(2).is_err());
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn strings_and_chunks() {
        let bytes = [3, b'a', b'b', b'c', 9, 8, 7];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_pascal_string().unwrap(), b"abc");
        assert_eq!(cursor.rest(), &[9, 8, 7]);
        assert_eq!(cursor.piece(2, 1, Origin::Current).unwrap(), &[8, 7]);
        assert_eq!(cursor.piece(1, 0, Origin::Start).unwrap(), &[3]);
        assert_eq!(cursor.chunk(2).unwrap(), &[9, 8]);
        assert!(cursor.chunk(2).is_err());
        assert_eq!(cursor.remaining_bytes(), 1);

        let mut short = Cursor::new(&[5, b'x']);
        assert!(matches!(
            short.read_pascal_string(),
            Err(ReadError::InsufficientData { .. })
        ));
        assert_eq!(short.position(), 0);
    }

    #[test]
    fn zero_copy_arrays() {
        let bytes = [0, 1, 0, 2, 0, 3];
        let mut cursor = Cursor::new(&bytes);
        let array = cursor.read_array::<BigEndian<u16>>(3).unwrap();
        assert_eq!(array.iter().map(|x| x.get()).collect::<Vec<_>>(), [1, 2, 3]);
        let data = FontData::new(&bytes);
        assert_eq!(
            data.read_array::<BigEndian<u16>>(0..3).err(),
            Some(ReadError::InvalidArrayLen)
        );
    }

    #[test]
    fn sub_cursors_from_offsets() {
        let bytes = (0u8..20).collect::<Vec<_>>();
        let data = FontData::new(&bytes);
        let cursors = offsets_to_sub_cursors(data, &[10, 0, 4, 15], None).unwrap();
        let lens = cursors
            .iter()
            .map(|c| c.as_ref().map(Cursor::remaining_bytes))
            .collect::<Vec<_>>();
        assert_eq!(lens, [Some(5), None, Some(6), Some(5)]);
        assert_eq!(cursors[2].as_ref().unwrap().peek::<u8>().unwrap(), 4);

        let cursors = offsets_to_sub_cursors(data, &[4, 15], Some(4)).unwrap();
        let lens = cursors
            .iter()
            .map(|c| c.as_ref().map(Cursor::remaining_bytes))
            .collect::<Vec<_>>();
        assert_eq!(lens, [Some(8), Some(4)]);

        assert_eq!(
            offsets_to_sub_cursors(data, &[21], None).err(),
            Some(ReadError::OutOfBounds)
        );
    }
}

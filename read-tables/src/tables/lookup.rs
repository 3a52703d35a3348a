//! AAT lookup tables.
//!
//! A lookup maps glyph ids to 16-bit values using one of several layouts.
//! See <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6Tables.html>

use types::{BigEndian, FixedSize};

use crate::diagnostics::{Diagnostics, ReadValidated};
use crate::font_data::{Cursor, FontData};
use crate::read::{FontRead, ReadError};

/// The glyph id used by guard records.
pub const GUARD_GLYPH: u16 = 0xFFFF;

/// The binary search header shared by formats 2, 4 and 6.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinSearchHeader {
    pub unit_size: u16,
    pub n_units: u16,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
}

impl BinSearchHeader {
    pub const RAW_BYTE_LEN: usize = 5 * u16::RAW_BYTE_LEN;

    fn read(cursor: &mut Cursor) -> Result<Self, ReadError> {
        let raw = cursor.read_array::<BigEndian<u16>>(5)?;
        Ok(BinSearchHeader {
            unit_size: raw[0].get(),
            n_units: raw[1].get(),
            search_range: raw[2].get(),
            entry_selector: raw[3].get(),
            range_shift: raw[4].get(),
        })
    }
}

/// Lookup segment for formats 2 and 4.
///
/// In format 4, `value` is an offset from the start of the lookup to an array
/// with one value per glyph in the segment.
#[derive(Copy, Clone, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct LookupSegment {
    /// Last glyph index in this segment.
    pub last_glyph: BigEndian<u16>,
    /// First glyph index in this segment.
    pub first_glyph: BigEndian<u16>,
    /// The lookup value.
    pub value: BigEndian<u16>,
}

/// Note: this requires `LookupSegment` to be `repr(packed)`.
impl FixedSize for LookupSegment {
    const RAW_BYTE_LEN: usize = std::mem::size_of::<Self>();
}

impl LookupSegment {
    pub fn first_glyph(&self) -> u16 {
        self.first_glyph.get()
    }

    pub fn last_glyph(&self) -> u16 {
        self.last_glyph.get()
    }

    pub fn value(&self) -> u16 {
        self.value.get()
    }

    fn is_guard(&self) -> bool {
        self.first_glyph() == GUARD_GLYPH && self.last_glyph() == GUARD_GLYPH
    }

    fn contains(&self, glyph: u16) -> bool {
        (self.first_glyph()..=self.last_glyph()).contains(&glyph)
    }
}

/// Lookup single record for format 6.
#[derive(Copy, Clone, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct LookupSingle {
    /// The glyph index.
    pub glyph: BigEndian<u16>,
    /// The lookup value.
    pub value: BigEndian<u16>,
}

/// Note: this requires `LookupSingle` to be `repr(packed)`.
impl FixedSize for LookupSingle {
    const RAW_BYTE_LEN: usize = std::mem::size_of::<Self>();
}

impl LookupSingle {
    pub fn glyph(&self) -> u16 {
        self.glyph.get()
    }

    pub fn value(&self) -> u16 {
        self.value.get()
    }
}

/// Format 0: one value for every glyph, starting at glyph 0.
#[derive(Clone, Debug)]
pub struct Lookup0<'a> {
    values: &'a [BigEndian<u16>],
}

/// Format 2: segments of glyphs sharing a single value.
#[derive(Clone, Debug)]
pub struct Lookup2<'a> {
    header: BinSearchHeader,
    segments: &'a [LookupSegment],
    guard: Option<&'a LookupSegment>,
}

/// Format 4: segments of glyphs, each with its own array of values.
#[derive(Clone, Debug)]
pub struct Lookup4<'a> {
    data: FontData<'a>,
    header: BinSearchHeader,
    segments: &'a [LookupSegment],
    guard: Option<&'a LookupSegment>,
}

/// Format 6: sorted single glyphs.
#[derive(Clone, Debug)]
pub struct Lookup6<'a> {
    header: BinSearchHeader,
    entries: &'a [LookupSingle],
    guard: Option<&'a LookupSingle>,
}

/// Format 8: a trimmed array starting at some first glyph.
#[derive(Clone, Debug)]
pub struct Lookup8<'a> {
    first_glyph: u16,
    values: &'a [BigEndian<u16>],
}

/// Format 10: a trimmed array of 1, 2 or 4 byte values.
#[derive(Clone, Debug)]
pub struct Lookup10<'a> {
    unit_size: u16,
    first_glyph: u16,
    values: &'a [u8],
}

/// A lookup table in any of the supported formats.
#[derive(Clone, Debug)]
pub enum Lookup<'a> {
    Format0(Lookup0<'a>),
    Format2(Lookup2<'a>),
    Format4(Lookup4<'a>),
    Format6(Lookup6<'a>),
    Format8(Lookup8<'a>),
    Format10(Lookup10<'a>),
}

impl<'a> Lookup0<'a> {
    pub fn values(&self) -> &'a [BigEndian<u16>] {
        self.values
    }

    pub fn value(&self, glyph: u16) -> Option<u16> {
        self.values.get(glyph as usize).map(BigEndian::get)
    }
}

impl<'a> Lookup2<'a> {
    pub fn header(&self) -> BinSearchHeader {
        self.header
    }

    /// The segments, not including the guard.
    pub fn segments(&self) -> &'a [LookupSegment] {
        self.segments
    }

    pub fn guard(&self) -> Option<&'a LookupSegment> {
        self.guard
    }

    pub fn value(&self, glyph: u16) -> Option<u16> {
        find_segment(self.segments, glyph).map(LookupSegment::value)
    }
}

impl<'a> Lookup4<'a> {
    pub fn header(&self) -> BinSearchHeader {
        self.header
    }

    /// The segments, not including the guard.
    pub fn segments(&self) -> &'a [LookupSegment] {
        self.segments
    }

    pub fn guard(&self) -> Option<&'a LookupSegment> {
        self.guard
    }

    /// The values for the segment at `index`, one per glyph.
    pub fn segment_values(&self, index: usize) -> Result<&'a [BigEndian<u16>], ReadError> {
        let segment = self.segments.get(index).ok_or(ReadError::OutOfBounds)?;
        segment_values(self.data, segment)
    }

    pub fn value(&self, glyph: u16) -> Option<u16> {
        let segment = find_segment(self.segments, glyph)?;
        let values = segment_values(self.data, segment).ok()?;
        values
            .get((glyph - segment.first_glyph()) as usize)
            .map(BigEndian::get)
    }
}

impl<'a> Lookup6<'a> {
    pub fn header(&self) -> BinSearchHeader {
        self.header
    }

    /// The entries, not including the guard.
    pub fn entries(&self) -> &'a [LookupSingle] {
        self.entries
    }

    pub fn guard(&self) -> Option<&'a LookupSingle> {
        self.guard
    }

    pub fn value(&self, glyph: u16) -> Option<u16> {
        self.entries
            .binary_search_by_key(&glyph, LookupSingle::glyph)
            .ok()
            .map(|ix| self.entries[ix].value())
    }
}

impl<'a> Lookup8<'a> {
    pub fn first_glyph(&self) -> u16 {
        self.first_glyph
    }

    pub fn values(&self) -> &'a [BigEndian<u16>] {
        self.values
    }

    pub fn value(&self, glyph: u16) -> Option<u16> {
        glyph
            .checked_sub(self.first_glyph)
            .and_then(|ix| self.values.get(ix as usize))
            .map(BigEndian::get)
    }
}

impl<'a> Lookup10<'a> {
    pub fn unit_size(&self) -> u16 {
        self.unit_size
    }

    pub fn first_glyph(&self) -> u16 {
        self.first_glyph
    }

    pub fn glyph_count(&self) -> usize {
        self.values.len() / self.unit_size as usize
    }

    pub fn value(&self, glyph: u16) -> Option<u32> {
        let ix = glyph.checked_sub(self.first_glyph)? as usize;
        self.value_at(ix)
    }

    fn value_at(&self, ix: usize) -> Option<u32> {
        let unit_size = self.unit_size as usize;
        let data = FontData::new(self.values);
        let offset = ix * unit_size;
        match unit_size {
            1 => data.read_at::<u8>(offset).ok().map(u32::from),
            2 => data.read_at::<u16>(offset).ok().map(u32::from),
            _ => data.read_at::<u32>(offset).ok(),
        }
    }
}

impl<'a> Lookup<'a> {
    /// A lookup with no values.
    pub(crate) fn empty() -> Self {
        Lookup::Format8(Lookup8 {
            first_glyph: 0,
            values: &[],
        })
    }

    pub fn format(&self) -> u16 {
        match self {
            Lookup::Format0(_) => 0,
            Lookup::Format2(_) => 2,
            Lookup::Format4(_) => 4,
            Lookup::Format6(_) => 6,
            Lookup::Format8(_) => 8,
            Lookup::Format10(_) => 10,
        }
    }

    /// The value for a single glyph, or `None` if the lookup does not cover it.
    ///
    /// Formats 2, 4 and 6 use a binary search.
    pub fn value(&self, glyph: u16) -> Option<u32> {
        match self {
            Lookup::Format0(lookup) => lookup.value(glyph).map(u32::from),
            Lookup::Format2(lookup) => lookup.value(glyph).map(u32::from),
            Lookup::Format4(lookup) => lookup.value(glyph).map(u32::from),
            Lookup::Format6(lookup) => lookup.value(glyph).map(u32::from),
            Lookup::Format8(lookup) => lookup.value(glyph).map(u32::from),
            Lookup::Format10(lookup) => lookup.value(glyph),
        }
    }

    /// Every (glyph, value) pair stored in the lookup, in glyph order.
    ///
    /// This includes glyphs whose value is only there to fill a gap.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (u16, u32)> + 'a> {
        match self.clone() {
            Lookup::Format0(lookup) => Box::new(
                (0..=u16::MAX)
                    .zip(lookup.values)
                    .map(|(glyph, value)| (glyph, value.get() as u32)),
            ),
            Lookup::Format2(lookup) => {
                Box::new(lookup.segments.iter().flat_map(|segment| {
                    (segment.first_glyph()..=segment.last_glyph())
                        .map(move |glyph| (glyph, segment.value() as u32))
                }))
            }
            Lookup::Format4(lookup) => {
                let data = lookup.data;
                Box::new(lookup.segments.iter().flat_map(move |segment| {
                    let values = segment_values(data, segment).unwrap_or_default();
                    (segment.first_glyph()..=segment.last_glyph())
                        .zip(values)
                        .map(|(glyph, value)| (glyph, value.get() as u32))
                }))
            }
            Lookup::Format6(lookup) => Box::new(
                lookup
                    .entries
                    .iter()
                    .map(|entry| (entry.glyph(), entry.value() as u32)),
            ),
            Lookup::Format8(lookup) => Box::new(
                (lookup.first_glyph..=u16::MAX)
                    .zip(lookup.values)
                    .map(|(glyph, value)| (glyph, value.get() as u32)),
            ),
            Lookup::Format10(lookup) => {
                let count = lookup.glyph_count();
                Box::new(
                    (lookup.first_glyph..=u16::MAX)
                        .zip(0..count)
                        .filter_map(move |(glyph, ix)| {
                            lookup.value_at(ix).map(|value| (glyph, value))
                        }),
                )
            }
        }
    }

    /// Parse the structure without checking segment order.
    fn read_unchecked(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        match format {
            0 => {
                let n_values = cursor.remaining_bytes() / u16::RAW_BYTE_LEN;
                Ok(Lookup::Format0(Lookup0 {
                    values: cursor.read_array(n_values)?,
                }))
            }
            2 => {
                let header = read_header(&mut cursor, LookupSegment::RAW_BYTE_LEN, 2)?;
                let (segments, guard) = read_records(&mut cursor, header, LookupSegment::is_guard)?;
                Ok(Lookup::Format2(Lookup2 {
                    header,
                    segments,
                    guard,
                }))
            }
            4 => {
                let header = read_header(&mut cursor, LookupSegment::RAW_BYTE_LEN, 4)?;
                let (segments, guard) = read_records(&mut cursor, header, LookupSegment::is_guard)?;
                for segment in segments.iter().filter(|seg| seg.first_glyph() <= seg.last_glyph())
                {
                    segment_values(data, segment)?;
                }
                Ok(Lookup::Format4(Lookup4 {
                    data,
                    header,
                    segments,
                    guard,
                }))
            }
            6 => {
                let header = read_header(&mut cursor, LookupSingle::RAW_BYTE_LEN, 6)?;
                let (entries, guard) =
                    read_records(&mut cursor, header, |entry: &LookupSingle| {
                        entry.glyph() == GUARD_GLYPH
                    })?;
                Ok(Lookup::Format6(Lookup6 {
                    header,
                    entries,
                    guard,
                }))
            }
            8 => {
                let first_glyph = cursor.read()?;
                let glyph_count: u16 = cursor.read()?;
                Ok(Lookup::Format8(Lookup8 {
                    first_glyph,
                    values: cursor.read_array(glyph_count as usize)?,
                }))
            }
            10 => {
                let unit_size: u16 = cursor.read()?;
                if !matches!(unit_size, 1 | 2 | 4) {
                    return Err(ReadError::MalformedData(
                        "invalid unit_size in format 10 AAT lookup table",
                    ));
                }
                let first_glyph = cursor.read()?;
                let glyph_count: u16 = cursor.read()?;
                Ok(Lookup::Format10(Lookup10 {
                    unit_size,
                    first_glyph,
                    values: cursor.chunk(glyph_count as usize * unit_size as usize)?,
                }))
            }
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }

    /// Every violation of the ordering rules, as (record index, reason).
    fn segment_problems(&self) -> Vec<(usize, &'static str)> {
        let mut problems = Vec::new();
        match self {
            Lookup::Format2(Lookup2 { segments, .. }) | Lookup::Format4(Lookup4 { segments, .. }) => {
                let mut prev_last: Option<u16> = None;
                for (i, segment) in segments.iter().enumerate() {
                    if segment.first_glyph() > segment.last_glyph() {
                        problems.push((i, "first glyph is after last glyph"));
                        continue;
                    }
                    if prev_last.is_some_and(|prev| segment.first_glyph() <= prev) {
                        problems.push((i, "segments are unsorted or overlap"));
                    }
                    prev_last = Some(segment.last_glyph());
                }
            }
            Lookup::Format6(lookup) => {
                for (i, pair) in lookup.entries.windows(2).enumerate() {
                    if pair[1].glyph() <= pair[0].glyph() {
                        problems.push((i + 1, "glyphs are not strictly increasing"));
                    }
                }
            }
            _ => (),
        }
        if let Lookup::Format4(lookup) = self {
            let records_end = 2
                + BinSearchHeader::RAW_BYTE_LEN
                + lookup.header.n_units as usize * LookupSegment::RAW_BYTE_LEN;
            for (i, segment) in lookup.segments.iter().enumerate() {
                if (segment.value() as usize) < records_end {
                    problems.push((i, "value offset points into the segment records"));
                }
            }
        }
        problems
    }

    fn has_guard(&self) -> Option<bool> {
        match self {
            Lookup::Format2(lookup) => Some(lookup.guard.is_some()),
            Lookup::Format4(lookup) => Some(lookup.guard.is_some()),
            Lookup::Format6(lookup) => Some(lookup.guard.is_some()),
            _ => None,
        }
    }
}

fn read_header(
    cursor: &mut Cursor,
    unit_size: usize,
    format: u16,
) -> Result<BinSearchHeader, ReadError> {
    let header = BinSearchHeader::read(cursor)?;
    if header.unit_size as usize != unit_size {
        return Err(ReadError::MalformedData(match format {
            2 => "unexpected unitSize in format 2 AAT lookup table",
            4 => "unexpected unitSize in format 4 AAT lookup table",
            _ => "unexpected unitSize in format 6 AAT lookup table",
        }));
    }
    Ok(header)
}

/// Read `n_units` records, splitting off a guard record.
///
/// The guard may be counted in `n_units`, or may follow the counted records.
fn read_records<'a, T>(
    cursor: &mut Cursor<'a>,
    header: BinSearchHeader,
    is_guard: impl Fn(&T) -> bool,
) -> Result<(&'a [T], Option<&'a T>), ReadError>
where
    T: bytemuck::AnyBitPattern + FixedSize,
{
    let records: &'a [T] = cursor.read_array(header.n_units as usize)?;
    if let Some((last, rest)) = records.split_last() {
        if is_guard(last) {
            return Ok((rest, Some(last)));
        }
    }
    let guard = cursor
        .read_array::<T>(1)
        .ok()
        .and_then(|guard| guard.first())
        .filter(|guard| is_guard(guard));
    Ok((records, guard))
}

/// Binary search for the segment containing `glyph`.
fn find_segment(segments: &[LookupSegment], glyph: u16) -> Option<&LookupSegment> {
    let ix = segments.partition_point(|segment| segment.last_glyph() < glyph);
    segments.get(ix).filter(|segment| segment.contains(glyph))
}

fn segment_values<'a>(
    data: FontData<'a>,
    segment: &LookupSegment,
) -> Result<&'a [BigEndian<u16>], ReadError> {
    let n_glyphs = segment
        .last_glyph()
        .checked_sub(segment.first_glyph())
        .ok_or(ReadError::MalformedData(
            "invalid segment in format 4 AAT lookup table",
        ))? as usize
        + 1;
    let start = segment.value() as usize;
    data.read_array(start..start + n_glyphs * u16::RAW_BYTE_LEN)
}

impl<'a> FontRead<'a> for Lookup<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let lookup = Self::read_unchecked(data)?;
        match lookup.segment_problems().first() {
            Some((index, reason)) => Err(ReadError::MalformedSegment {
                index: *index,
                reason,
            }),
            None => Ok(lookup),
        }
    }
}

impl<'a> ReadValidated<'a> for Lookup<'a> {
    fn read_validated(
        data: FontData<'a>,
        _args: &(),
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        diagnostics.in_table("Lookup", |d| {
            let errors_before = d.error_count();
            let lookup = match Self::read_unchecked(data) {
                Ok(lookup) => lookup,
                Err(e) => {
                    d.error(e);
                    return None;
                }
            };
            d.debug(format!("format {}, {} bytes", lookup.format(), data.len()));
            d.in_field("segments", |d| {
                for (index, reason) in lookup.segment_problems() {
                    d.at_index(index, |d| d.error(reason));
                }
            });
            if lookup.has_guard() == Some(false) {
                d.warning("expected a guard record but none is present");
            }
            if let Lookup::Format0(lookup) = &lookup {
                if lookup.values.is_empty() {
                    d.warning("the format 0 lookup has no values");
                }
            }
            if let Some(max_glyph) = lookup.iter().map(|(glyph, _)| glyph).max() {
                d.check_glyph(max_glyph);
            }
            (d.error_count() == errors_before).then_some(lookup)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test_data::bebuffer::BeBuffer;

    fn read(buf: &BeBuffer) -> Lookup<'_> {
        Lookup::read(buf.data().into()).unwrap()
    }

    #[test]
    fn lookup_format_0() {
        let buf = BeBuffer::new().extend([0_u16, 4, 2]);
        let lookup = read(&buf);
        assert_eq!(lookup.format(), 0);
        assert_eq!(lookup.value(0), Some(4));
        assert_eq!(lookup.value(1), Some(2));
        assert_eq!(lookup.value(2), None);
        assert_eq!(lookup.iter().collect::<Vec<_>>(), [(0, 4), (1, 2)]);
    }

    #[test]
    fn lookup_format_2() {
        let lookup = Lookup::read(table_test_data::aat::LOOKUP_FORMAT_2.into()).unwrap();
        let Lookup::Format2(format2) = &lookup else {
            panic!("wrong format");
        };
        assert_eq!(format2.header().search_range, 24);
        assert_eq!(format2.segments().len(), 4);
        assert_eq!(format2.guard().map(|g| g.value()), Some(1));
        let cases = [
            (11, None),
            (12, Some(4)),
            (13, Some(4)),
            (14, None),
            (16, Some(4)),
            (17, Some(5)),
            (18, Some(5)),
            (19, None),
            (29, Some(4)),
            (30, None),
        ];
        for (glyph, value) in cases {
            assert_eq!(lookup.value(glyph), value, "glyph {glyph}");
        }
        assert_eq!(lookup.iter().count(), 6);
    }

    #[test]
    fn lookup_format_4() {
        let lookup = Lookup::read(table_test_data::aat::LOOKUP_FORMAT_4.into()).unwrap();
        assert_eq!(lookup.format(), 4);
        for glyph in (50..70).chain(150..170) {
            assert_eq!(lookup.value(glyph), Some(4 + (glyph as u32 % 2)), "{glyph}");
        }
        assert_eq!(lookup.value(70), None);
        assert_eq!(lookup.value(149), None);
        assert_eq!(lookup.iter().count(), 40);
    }

    #[test]
    fn lookup_format_6() {
        let lookup = Lookup::read(table_test_data::aat::LOOKUP_FORMAT_6.into()).unwrap();
        assert_eq!(lookup.value(12), Some(4));
        assert_eq!(lookup.value(90), Some(4));
        assert_eq!(lookup.value(13), None);
        assert_eq!(lookup.iter().collect::<Vec<_>>(), [(12, 4), (90, 4)]);
    }

    #[test]
    fn lookup_format_8() {
        let buf = BeBuffer::new().extend([8_u16, 0x72, 3, 0x219, 1, 0x21B]);
        let lookup = read(&buf);
        assert_eq!(lookup.value(0x71), None);
        assert_eq!(lookup.value(0x72), Some(0x219));
        assert_eq!(lookup.value(0x73), Some(1));
        assert_eq!(lookup.value(0x74), Some(0x21B));
        assert_eq!(lookup.value(0x75), None);
    }

    #[test]
    fn lookup_format_10() {
        let buf = BeBuffer::new()
            .extend([10_u16, 1, 20, 3])
            .extend([7_u8, 8, 9])
            .push(0_u8);
        let lookup = read(&buf);
        assert_eq!(lookup.value(21), Some(8));
        assert_eq!(lookup.value(23), None);
        assert_eq!(lookup.iter().collect::<Vec<_>>(), [(20, 7), (21, 8), (22, 9)]);

        let buf = BeBuffer::new().extend([10_u16, 3, 20, 3]);
        assert!(matches!(
            Lookup::read(buf.data().into()),
            Err(ReadError::MalformedData(_))
        ));
    }

    #[test]
    fn unknown_format() {
        let buf = BeBuffer::new().extend([0x0600_u16, 0, 0]);
        assert_eq!(
            Lookup::read(buf.data().into()).err(),
            Some(ReadError::InvalidFormat(0x600))
        );
    }

    #[test]
    fn guard_counted_in_units() {
        #[rustfmt::skip]
        let buf = BeBuffer::new().extend([
            6_u16, 4, 2, 8, 1, 0,
            5, 1,
            0xFFFF, 0xFFFF,
        ]);
        let Lookup::Format6(lookup) = read(&buf) else {
            panic!("wrong format");
        };
        assert_eq!(lookup.entries().len(), 1);
        assert!(lookup.guard().is_some());
    }

    #[test]
    fn unsorted_segments() {
        #[rustfmt::skip]
        let buf = BeBuffer::new().extend([
            2_u16, 6, 2, 12, 1, 0,
            30, 20, 1,
            15, 10, 2,
            0xFFFF, 0xFFFF, 0xFFFF,
        ]);
        assert_eq!(
            Lookup::read(buf.data().into()).err(),
            Some(ReadError::MalformedSegment {
                index: 1,
                reason: "segments are unsorted or overlap"
            })
        );
    }

    #[test]
    fn bad_unit_size() {
        let buf = BeBuffer::new().extend([2_u16, 3, 0, 0, 0, 0]);
        assert!(matches!(
            Lookup::read(buf.data().into()),
            Err(ReadError::MalformedData(_))
        ));
    }

    #[test]
    fn truncation_is_insufficient_data() {
        let full = table_test_data::aat::LOOKUP_FORMAT_4;
        // cut at each structural boundary: format, header, records, values
        for len in [1, 6, 12, 20, 30, 50, full.len() - 2] {
            let result = Lookup::read(full[..len].into());
            assert!(
                matches!(result, Err(ReadError::InsufficientData { .. })),
                "len {len}: {result:?}"
            );
        }
    }

    #[test]
    fn validated_read_reports_everything() {
        #[rustfmt::skip]
        let buf = BeBuffer::new().extend([
            2_u16, 6, 3, 12, 1, 6,
            30, 20, 1,
            15, 16, 2,
            40, 25, 3,
        ]);
        let mut diagnostics = Diagnostics::new().with_glyph_count(32);
        assert!(Lookup::read_validated(buf.data().into(), &(), &mut diagnostics).is_none());
        let messages = diagnostics
            .at_least(crate::diagnostics::Severity::Warning)
            .map(|msg| (msg.location.as_str(), msg.message.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            [
                ("Lookup.segments[1]", "first glyph is after last glyph"),
                ("Lookup.segments[2]", "segments are unsorted or overlap"),
                ("Lookup", "expected a guard record but none is present"),
                ("Lookup", "glyph 40 is past the end of the font (32 glyphs)"),
            ]
        );
    }

    #[test]
    fn validated_read_of_good_data() {
        let mut diagnostics = Diagnostics::new().with_glyph_count(100);
        let lookup = Lookup::read_validated(
            table_test_data::aat::LOOKUP_FORMAT_6.into(),
            &(),
            &mut diagnostics,
        );
        assert!(lookup.is_some());
        assert!(!diagnostics.has_errors());
    }
}

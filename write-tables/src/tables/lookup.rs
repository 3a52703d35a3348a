//! Lookup tables: compact maps from glyph to a 16-bit value.
//!
//! A [`LookupMap`] is written in whichever of the lookup formats encodes it
//! in the fewest bytes.

use std::collections::BTreeMap;

use read::tables::lookup::{Lookup, GUARD_GLYPH};
use read::ReadError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::from_obj::FromTableRef;
use crate::util::SearchRange;
use crate::validate::{Validate, ValidationCtx};
use crate::write::{FontWrite, LinkedWriter, OffsetLen, Stake};

/// The formats tried when no format is forced, in order of preference.
pub const DEFAULT_FORMAT_ORDER: [u16; 5] = [0, 2, 4, 6, 8];

/// Segments and single-glyph entries are looked up with a binary search header.
const SEGMENT_UNIT_SIZE: usize = 6;
const SINGLE_UNIT_SIZE: usize = 4;

/// Settings that control how a [`LookupMap`] is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LookupOptions {
    /// Always write this format instead of choosing the smallest.
    pub preferred_format: Option<u16>,
    /// Keep every key exactly.
    ///
    /// When set, no format is used that would add values for glyphs missing
    /// from the map. When unset, glyphs mapped to `absent_value` are left out
    /// and gaps may be filled with it.
    pub no_gaps: bool,
    /// The value that means "no value" to whoever reads the lookup.
    pub absent_value: u16,
    /// The value written in the guard record of the binary searched formats.
    pub guard_value: u16,
    /// The formats to consider, in order of preference on a tie.
    pub format_order: [u16; 5],
}

/// Presets for common kinds of lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LookupFamily {
    /// Class and value lookups, where a missing glyph reads as 1.
    #[default]
    Aat,
    /// Lookups whose values are glyphs; every key is kept.
    OutputGlyph,
}

impl LookupFamily {
    pub fn options(self) -> LookupOptions {
        match self {
            LookupFamily::Aat => LookupOptions {
                preferred_format: None,
                no_gaps: false,
                absent_value: 1,
                guard_value: 0xFFFF,
                format_order: DEFAULT_FORMAT_ORDER,
            },
            LookupFamily::OutputGlyph => LookupOptions {
                preferred_format: None,
                no_gaps: true,
                absent_value: 0xFFFF,
                guard_value: 0xFFFF,
                format_order: DEFAULT_FORMAT_ORDER,
            },
        }
    }
}

impl Default for LookupOptions {
    fn default() -> Self {
        LookupFamily::Aat.options()
    }
}

impl From<LookupFamily> for LookupOptions {
    fn from(family: LookupFamily) -> Self {
        family.options()
    }
}

/// A map from glyph to value, written as a lookup table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LookupMap {
    pub values: BTreeMap<u16, u16>,
    pub options: LookupOptions,
}

impl LookupMap {
    pub fn new(options: impl Into<LookupOptions>) -> Self {
        LookupMap {
            values: BTreeMap::new(),
            options: options.into(),
        }
    }

    pub fn from_values(
        values: impl IntoIterator<Item = (u16, u16)>,
        options: impl Into<LookupOptions>,
    ) -> Self {
        LookupMap {
            values: values.into_iter().collect(),
            options: options.into(),
        }
    }

    /// A copy of this map that is always written in `format`.
    pub fn with_format(&self, format: u16) -> Self {
        let mut result = self.clone();
        result.options.preferred_format = Some(format);
        result
    }

    pub fn insert(&mut self, glyph: u16, value: u16) -> Option<u16> {
        self.values.insert(glyph, value)
    }

    pub fn get(&self, glyph: u16) -> Option<u16> {
        self.values.get(&glyph).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a map from a parsed lookup.
    ///
    /// Without `no_gaps`, glyphs that read as the absent value are dropped,
    /// so values a writer used to fill gaps do not become keys.
    pub fn from_lookup(lookup: &Lookup, options: impl Into<LookupOptions>) -> Result<Self, ReadError> {
        let options = options.into();
        let mut values = BTreeMap::new();
        for (glyph, value) in lookup.iter() {
            let value = u16::try_from(value)
                .map_err(|_| ReadError::MalformedData("lookup value does not fit in 16 bits"))?;
            if options.no_gaps || value != options.absent_value {
                values.insert(glyph, value);
            }
        }
        Ok(LookupMap { values, options })
    }

    /// The formats that can represent this map, in order of preference.
    pub fn candidate_formats(&self) -> Vec<u16> {
        if let Some(format) = self.options.preferred_format {
            return vec![format];
        }
        let entries = self.entries();
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return vec![6];
        };
        let mut formats = self.options.format_order.to_vec();
        if self.options.no_gaps {
            let contiguous = (last.0 - first.0) as usize + 1 == entries.len();
            if !contiguous {
                formats.retain(|format| matches!(format, 2 | 4 | 6));
            } else if first.0 != 0 {
                formats.retain(|format| *format != 0);
            }
        }
        formats
    }

    /// The format this map is written in.
    ///
    /// Each candidate is encoded, and the first of the smallest wins.
    pub fn chosen_format(&self) -> u16 {
        let candidates = self.candidate_formats();
        if let [format] = candidates.as_slice() {
            return *format;
        }
        let mut best: Option<(u16, usize)> = None;
        for format in candidates {
            let len = self.encoded_len(format);
            log::trace!("lookup of {} glyphs: format {format} takes {len} bytes", self.len());
            if best.is_none_or(|(_, best_len)| len < best_len) {
                best = Some((format, len));
            }
        }
        best.map(|(format, _)| format).unwrap_or(6)
    }

    /// The number of bytes this map takes in `format`.
    pub fn encoded_len(&self, format: u16) -> usize {
        let mut scratch = LinkedWriter::new();
        self.write_format(format, &mut scratch);
        scratch.byte_len()
    }

    fn entries(&self) -> Vec<(u16, u16)> {
        self.values
            .iter()
            .map(|(glyph, value)| (*glyph, *value))
            .filter(|(_, value)| self.options.no_gaps || *value != self.options.absent_value)
            .collect()
    }

    fn write_format(&self, format: u16, writer: &mut LinkedWriter) {
        let entries = self.entries();
        if format == 10 {
            if let Err(e) = write_format10(&entries, self.options.absent_value, writer) {
                writer.report_error(e);
            }
            return;
        }
        let encoder = Encoder {
            entries: &entries,
            fill: self.options.absent_value,
            guard: self.options.guard_value,
            exact_runs: self.options.no_gaps,
            write_value: &|value: u16, writer: &mut LinkedWriter| writer.add(&value),
        };
        if let Err(e) = encoder.write(format, writer) {
            writer.report_error(e);
        }
    }
}

impl FontWrite for LookupMap {
    fn write_into(&self, writer: &mut LinkedWriter) {
        let format = self.chosen_format();
        log::debug!("writing lookup of {} glyphs as format {format}", self.len());
        self.write_format(format, writer)
    }
}

impl Validate for LookupMap {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("Lookup", |ctx| {
            ctx.in_field("values", |ctx| {
                if self.values.contains_key(&GUARD_GLYPH) {
                    ctx.report(Error::InvalidLookupKey(GUARD_GLYPH));
                }
            });
            ctx.in_field("format_order", |ctx| {
                for format in self.options.format_order {
                    if !DEFAULT_FORMAT_ORDER.contains(&format) {
                        ctx.report(format!("unknown lookup format {format}"));
                    }
                }
            });
            let candidates = self.candidate_formats();
            ctx.in_field("preferred_format", |ctx| match self.options.preferred_format {
                Some(format) if !matches!(format, 0 | 2 | 4 | 6 | 8 | 10) => {
                    ctx.report(format!("unknown lookup format {format}"))
                }
                Some(format @ (0 | 8 | 10)) if self.options.no_gaps => {
                    let entries = self.entries();
                    let start = if format == 0 { Some(&(0, 0)) } else { entries.first() };
                    if let (Some(first), Some(last)) = (start, entries.last()) {
                        if (last.0 - first.0) as usize + 1 != entries.len() {
                            ctx.report(format!("format {format} cannot keep gaps between glyphs"));
                        }
                    }
                }
                _ if candidates.is_empty() => {
                    ctx.report("no format in format_order can keep gaps between glyphs")
                }
                _ => (),
            });
        })
    }
}

impl FromTableRef<Lookup<'_>> for LookupMap {
    fn from_table_ref(from: &Lookup<'_>) -> Result<Self, ReadError> {
        LookupMap::from_lookup(from, LookupFamily::Aat)
    }
}

/// Write a lookup whose values are 16-bit offsets from `base` to other stakes.
///
/// There is no value to fill a gap with, so formats 0 and 8 require the keys
/// to be contiguous (and format 0 to start at glyph 0), and format 4 only
/// groups consecutive glyphs. Format 10 cannot hold offsets.
pub fn write_offset_lookup(
    writer: &mut LinkedWriter,
    values: &BTreeMap<u16, Stake>,
    base: Stake,
    format: u16,
    guard_value: u16,
) -> Result<(), Error> {
    if values.contains_key(&GUARD_GLYPH) {
        return Err(Error::InvalidLookupKey(GUARD_GLYPH));
    }
    let entries = values
        .iter()
        .map(|(glyph, stake)| (*glyph, *stake))
        .collect::<Vec<_>>();
    if matches!(format, 0 | 8) {
        let mut expected = match format {
            0 => 0,
            _ => entries.first().map(|(glyph, _)| *glyph).unwrap_or_default(),
        };
        for (glyph, _) in &entries {
            if *glyph != expected {
                return Err(Error::GapInOffsetLookup {
                    format,
                    glyph: expected,
                });
            }
            expected += 1;
        }
    }
    let encoder = Encoder {
        entries: &entries,
        fill: base,
        guard: guard_value,
        exact_runs: true,
        write_value: &|stake: Stake, writer: &mut LinkedWriter| {
            writer.add_unresolved_offset(OffsetLen::Offset16, base, stake)
        },
    };
    encoder.write(format, writer)
}

/// Writes sorted `(glyph, value)` entries in one of the 16-bit formats.
struct Encoder<'a, V> {
    entries: &'a [(u16, V)],
    /// Written for glyphs inside a covered range that have no entry.
    fill: V,
    guard: u16,
    /// Only group consecutive glyphs into format 4 segments.
    exact_runs: bool,
    write_value: &'a dyn Fn(V, &mut LinkedWriter),
}

impl<V: Copy + PartialEq> Encoder<'_, V> {
    fn write(&self, format: u16, writer: &mut LinkedWriter) -> Result<(), Error> {
        match format {
            0 => self.write_format0(writer),
            2 => self.write_format2(writer),
            4 => self.write_format4(writer),
            6 => self.write_format6(writer),
            8 => self.write_format8(writer)?,
            _ => return Err(Error::UnsupportedLookupFormat(format)),
        }
        Ok(())
    }

    fn value_or_fill(&self, glyph: u16) -> V {
        self.entries
            .binary_search_by_key(&glyph, |(glyph, _)| *glyph)
            .map(|ix| self.entries[ix].1)
            .unwrap_or(self.fill)
    }

    fn write_values(&self, first: u16, last: u16, writer: &mut LinkedWriter) {
        for glyph in first..=last {
            (self.write_value)(self.value_or_fill(glyph), writer);
        }
    }

    fn write_format0(&self, writer: &mut LinkedWriter) {
        writer.add(&0u16);
        if let Some((last, _)) = self.entries.last() {
            self.write_values(0, *last, writer);
        }
    }

    fn write_format2(&self, writer: &mut LinkedWriter) {
        // (first, last, value), grouping consecutive glyphs with equal values
        let mut segments: Vec<(u16, u16, V)> = Vec::new();
        for (glyph, value) in self.entries {
            match segments.last_mut() {
                Some((_, last, seg_value)) if *last + 1 == *glyph && seg_value == value => {
                    *last = *glyph
                }
                _ => segments.push((*glyph, *glyph, *value)),
            }
        }
        writer.add(&2u16);
        write_search_header(writer, SEGMENT_UNIT_SIZE, segments.len());
        for (first, last, value) in segments {
            writer.add(&[last, first]);
            (self.write_value)(value, writer);
        }
        writer.add(&[GUARD_GLYPH, GUARD_GLYPH, self.guard]);
    }

    fn write_format4(&self, writer: &mut LinkedWriter) {
        // a gap of up to two glyphs costs no more to fill than a new segment
        let max_step = if self.exact_runs { 1 } else { 3 };
        let mut segments: Vec<(u16, u16)> = Vec::new();
        for (glyph, _) in self.entries {
            match segments.last_mut() {
                Some((_, last)) if *glyph - *last <= max_step => *last = *glyph,
                _ => segments.push((*glyph, *glyph)),
            }
        }
        let start = writer.stake_current();
        writer.add(&4u16);
        write_search_header(writer, SEGMENT_UNIT_SIZE, segments.len());
        let stakes = segments
            .iter()
            .map(|_| writer.new_stake())
            .collect::<Vec<_>>();
        for ((first, last), stake) in segments.iter().zip(&stakes) {
            writer.add(&[*last, *first]);
            writer.add_unresolved_offset(OffsetLen::Offset16, start, *stake);
        }
        writer.add(&[GUARD_GLYPH, GUARD_GLYPH, self.guard]);
        for ((first, last), stake) in segments.iter().zip(stakes) {
            writer.stake_current_with_value(stake);
            self.write_values(*first, *last, writer);
        }
    }

    fn write_format6(&self, writer: &mut LinkedWriter) {
        writer.add(&6u16);
        write_search_header(writer, SINGLE_UNIT_SIZE, self.entries.len());
        for (glyph, value) in self.entries {
            writer.add(glyph);
            (self.write_value)(*value, writer);
        }
        writer.add(&[GUARD_GLYPH, self.guard]);
    }

    fn write_format8(&self, writer: &mut LinkedWriter) -> Result<(), Error> {
        let (first, last) = match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => {
                writer.add(&[8u16, 0, 0]);
                return Ok(());
            }
        };
        writer.add(&[8u16, first, glyph_count(first, last)?]);
        self.write_values(first, last, writer);
        Ok(())
    }
}

// values are one byte wide when they all fit, padded to an even length
fn write_format10(
    entries: &[(u16, u16)],
    fill: u16,
    writer: &mut LinkedWriter,
) -> Result<(), Error> {
    let (first, count) = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => (first.0, glyph_count(first.0, last.0)?),
        _ => (0, 0),
    };
    let mut values = vec![fill; count as usize];
    for (glyph, value) in entries {
        values[(glyph - first) as usize] = *value;
    }
    let narrow = values.iter().all(|value| *value <= 0xFF);
    writer.add(&[10u16, if narrow { 1 } else { 2 }, first, count]);
    for value in values {
        if narrow {
            writer.add(&(value as u8));
        } else {
            writer.add(&value);
        }
    }
    writer.align_to_byte_multiple(2);
    Ok(())
}

/// The length of a trimmed array from `first` to `last`.
///
/// Only the full range of glyphs, which includes the guard glyph, overflows.
fn glyph_count(first: u16, last: u16) -> Result<u16, Error> {
    (last - first)
        .checked_add(1)
        .ok_or(Error::InvalidLookupKey(GUARD_GLYPH))
}

fn write_search_header(writer: &mut LinkedWriter, unit_size: usize, n_units: usize) {
    let range = SearchRange::compute(n_units, unit_size);
    writer.add(&[
        unit_size as u16,
        n_units as u16,
        range.search_range,
        range.entry_selector,
        range.range_shift,
    ]);
}

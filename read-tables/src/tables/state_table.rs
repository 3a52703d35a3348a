//! Classic ('mort', 'kern') and extended ('morx', 'kerx') state tables.

use std::marker::PhantomData;

use types::{BigEndian, FixedSize};

use super::class;
use super::class_table::ClassTable;
use super::lookup::Lookup;
use super::name_stash::NameStash;
use crate::diagnostics::{Diagnostics, ReadValidated};
use crate::font_data::FontData;
use crate::read::{FontRead, FontReadWithArgs, ReadArgs, ReadError};

/// Empty data type for a state table entry with no payload.
///
/// Note: this type is only intended for use as the type parameter for
/// `StateEntry`. The inner field is private and this type cannot be
/// constructed outside of this module.
#[derive(Copy, Clone, bytemuck::AnyBitPattern, Debug)]
pub struct NoPayload(());

impl FixedSize for NoPayload {
    const RAW_BYTE_LEN: usize = 0;
}

/// The payload of a contextual substitution entry.
#[derive(Copy, Clone, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct ContextualPayload {
    /// Index of the substitution table for the marked glyph, or 0xFFFF.
    pub mark_index: BigEndian<u16>,
    /// Index of the substitution table for the current glyph, or 0xFFFF.
    pub current_index: BigEndian<u16>,
}

impl FixedSize for ContextualPayload {
    const RAW_BYTE_LEN: usize = std::mem::size_of::<Self>();
}

/// Entry in an (extended) state table.
#[derive(Clone, Debug)]
pub struct StateEntry<T = NoPayload> {
    /// Index of the next state.
    pub new_state: u16,
    /// Flag values are table specific.
    pub flags: u16,
    /// Payload is table specific.
    pub payload: T,
}

impl<'a, T: bytemuck::AnyBitPattern + FixedSize> FontRead<'a> for StateEntry<T> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let new_state = cursor.read()?;
        let flags = cursor.read()?;
        let payload = *cursor.remaining().read_ref_at(0)?;
        Ok(Self {
            new_state,
            flags,
            payload,
        })
    }
}

impl<T> FixedSize for StateEntry<T>
where
    T: FixedSize,
{
    // Two u16 fields + payload
    const RAW_BYTE_LEN: usize = u16::RAW_BYTE_LEN + u16::RAW_BYTE_LEN + T::RAW_BYTE_LEN;
}

/// The header variants of classic state tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassicHeader {
    /// nClasses and offsets to the class table, state array and entry table.
    #[default]
    Standard,
    /// As `Standard`, followed by an offset to a value table ('kern' format 1).
    WithValueTable,
}

impl ClassicHeader {
    pub fn header_len(self) -> usize {
        match self {
            ClassicHeader::Standard => 8,
            ClassicHeader::WithValueTable => 10,
        }
    }
}

/// Table for driving a finite state machine for layout.
///
/// The input to the state machine consists of the current state
/// and a glyph class. The output is an [entry](StateEntry) containing
/// the next state and a payload that is dependent on the type of
/// layout action being performed.
///
/// In this classic form, each cell of the state array is one byte and the
/// entries store the next state as a byte offset to its row. The views here
/// convert that offset to an index.
///
/// See <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6Tables.html#StateHeader>
/// for more detail.
#[derive(Clone, Debug)]
pub struct StateTable<'a, T = NoPayload> {
    data: FontData<'a>,
    n_classes: usize,
    class_table_offset: u16,
    state_array_offset: u16,
    entry_table_offset: u16,
    value_table_offset: Option<u16>,
    class_table: ClassTable<'a>,
    state_array: &'a [u8],
    entry_table: &'a [u8],
    names: NameStash,
    _marker: PhantomData<fn() -> T>,
}

/// The extended form of a state table.
///
/// Classes come from a lookup table, and both state array cells and next
/// states are 16-bit indices.
#[derive(Clone)]
pub struct ExtendedStateTable<'a, T = NoPayload> {
    n_classes: usize,
    class_table_offset: u32,
    state_array_offset: u32,
    entry_table_offset: u32,
    class_table: Lookup<'a>,
    state_array: &'a [BigEndian<u16>],
    entry_table: &'a [u8],
    names: NameStash,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> StateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_states(&self) -> usize {
        self.state_array.len() / self.n_classes
    }

    pub fn n_entries(&self) -> usize {
        self.entry_table.len() / StateEntry::<T>::RAW_BYTE_LEN
    }

    pub fn class_table_offset(&self) -> u16 {
        self.class_table_offset
    }

    pub fn state_array_offset(&self) -> u16 {
        self.state_array_offset
    }

    pub fn entry_table_offset(&self) -> u16 {
        self.entry_table_offset
    }

    /// The value table offset, for tables with a [`ClassicHeader::WithValueTable`] header.
    pub fn value_table_offset(&self) -> Option<u16> {
        self.value_table_offset
    }

    pub fn class_table(&self) -> &ClassTable<'a> {
        &self.class_table
    }

    pub fn names(&self) -> &NameStash {
        &self.names
    }

    /// Returns the class table entry for the given glyph identifier.
    pub fn class(&self, glyph_id: u16) -> u8 {
        self.class_table.class(glyph_id)
    }

    /// Returns the entry index stored for the given state and class.
    ///
    /// Classes past the end of the table are treated as out of bounds.
    pub fn entry_index(&self, state: u16, class: u8) -> Result<u16, ReadError> {
        let mut class = class as usize;
        if class >= self.n_classes {
            class = class::OUT_OF_BOUNDS as usize;
        }
        self.state_array
            .get(state as usize * self.n_classes + class)
            .map(|ix| *ix as u16)
            .ok_or(ReadError::OutOfBounds)
    }

    /// Returns the entry for the given state and class.
    pub fn entry(&self, state: u16, class: u8) -> Result<StateEntry<T>, ReadError> {
        self.entry_at(self.entry_index(state, class)?)
    }

    /// Returns the entry at `index` in the entry table.
    ///
    /// The next state is converted from a row offset to a state index.
    pub fn entry_at(&self, index: u16) -> Result<StateEntry<T>, ReadError> {
        let mut entry = self.raw_entry(index)?;
        entry.new_state = row_for_offset(entry.new_state, self.state_array_offset, self.n_classes)?;
        Ok(entry)
    }

    /// Returns the entry at `index` exactly as stored.
    pub fn raw_entry(&self, index: u16) -> Result<StateEntry<T>, ReadError> {
        let entry_offset = index as usize * StateEntry::<T>::RAW_BYTE_LEN;
        let entry_data = self
            .entry_table
            .get(entry_offset..)
            .ok_or(ReadError::OutOfBounds)?;
        StateEntry::read(FontData::new(entry_data))
    }

    /// Reads scalar values that are referenced from state table entries.
    pub fn read_value<S: types::Scalar>(&self, offset: usize) -> Result<S, ReadError> {
        self.data.read_at::<S>(offset)
    }

    /// Reads a 'kern' value list at `offset` from the start of the table.
    ///
    /// The list ends at the first value with its low bit set. That bit is
    /// kept in the returned values.
    pub fn value_list(&self, offset: u16) -> Result<Vec<i16>, ReadError> {
        let mut cursor = self
            .data
            .split_off(offset as usize)
            .ok_or(ReadError::OutOfBounds)?
            .cursor();
        let mut values = Vec::new();
        loop {
            let value: i16 = cursor.read()?;
            values.push(value);
            if value & 1 != 0 {
                return Ok(values);
            }
        }
    }

    fn read_parts(
        data: FontData<'a>,
        header: ClassicHeader,
    ) -> Result<(Self, Vec<ReadError>), ReadError> {
        let mut cursor = data.cursor();
        let n_classes = cursor.read::<u16>()? as usize;
        let class_table_offset: u16 = cursor.read()?;
        let state_array_offset: u16 = cursor.read()?;
        let entry_table_offset: u16 = cursor.read()?;
        let value_table_offset = match header {
            ClassicHeader::Standard => None,
            ClassicHeader::WithValueTable => Some(cursor.read::<u16>()?),
        };
        if n_classes == 0 {
            // This will result in a divide by 0 in all cases
            return Err(ReadError::MalformedData("empty AAT state table"));
        }
        let offsets = [
            Some(class_table_offset),
            Some(state_array_offset),
            Some(entry_table_offset),
            value_table_offset,
        ];
        let offsets = offsets.into_iter().flatten().map(usize::from).collect::<Vec<_>>();
        let names = read_stash(data, header.header_len(), &offsets)?;
        let class_table = data.read_table_at(class_table_offset as usize)?;
        let entry_region = region_after(data, entry_table_offset as usize, &offsets);
        let entry_size = StateEntry::<T>::RAW_BYTE_LEN;

        let mut problems = Vec::new();
        let state_data = data
            .split_off(state_array_offset as usize)
            .ok_or(ReadError::OutOfBounds)?;
        let (n_states, n_entries) = discover_states(
            n_classes,
            |cell| state_data.read_at::<u8>(cell).map(usize::from),
            entry_region.len() / entry_size,
            |entry| {
                let new_state = entry_region.read_at::<u16>(entry * entry_size)?;
                row_for_offset(new_state, state_array_offset, n_classes).map(usize::from)
            },
            &mut problems,
        )?;
        let state_array = state_data.as_bytes().get(..n_states * n_classes).unwrap_or_default();
        let entry_table = entry_region
            .as_bytes()
            .get(..n_entries * entry_size)
            .unwrap_or_default();
        let table = StateTable {
            data,
            n_classes,
            class_table_offset,
            state_array_offset,
            entry_table_offset,
            value_table_offset,
            class_table,
            state_array,
            entry_table,
            names,
            _marker: PhantomData,
        };
        Ok((table, problems))
    }
}

impl<'a, T> ExtendedStateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    pub const HEADER_LEN: usize = u32::RAW_BYTE_LEN * 4;

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_states(&self) -> usize {
        self.state_array.len() / self.n_classes
    }

    pub fn n_entries(&self) -> usize {
        self.entry_table.len() / StateEntry::<T>::RAW_BYTE_LEN
    }

    pub fn class_table_offset(&self) -> u32 {
        self.class_table_offset
    }

    pub fn state_array_offset(&self) -> u32 {
        self.state_array_offset
    }

    pub fn entry_table_offset(&self) -> u32 {
        self.entry_table_offset
    }

    pub fn class_table(&self) -> &Lookup<'a> {
        &self.class_table
    }

    pub fn names(&self) -> &NameStash {
        &self.names
    }

    /// Returns the class table entry for the given glyph identifier.
    pub fn class(&self, glyph_id: u16) -> u16 {
        if glyph_id == 0xFFFF {
            return class::DELETED_GLYPH as u16;
        }
        self.class_table
            .value(glyph_id)
            .and_then(|class| u16::try_from(class).ok())
            .unwrap_or(class::OUT_OF_BOUNDS as u16)
    }

    /// Returns the entry index stored for the given state and class.
    pub fn entry_index(&self, state: u16, class: u16) -> Result<u16, ReadError> {
        let mut class = class as usize;
        if class >= self.n_classes {
            class = class::OUT_OF_BOUNDS as usize;
        }
        self.state_array
            .get(state as usize * self.n_classes + class)
            .map(BigEndian::get)
            .ok_or(ReadError::OutOfBounds)
    }

    /// Returns the entry for the given state and class.
    pub fn entry(&self, state: u16, class: u16) -> Result<StateEntry<T>, ReadError> {
        self.entry_at(self.entry_index(state, class)?)
    }

    /// Returns the entry at `index` in the entry table.
    pub fn entry_at(&self, index: u16) -> Result<StateEntry<T>, ReadError> {
        let entry_offset = index as usize * StateEntry::<T>::RAW_BYTE_LEN;
        let entry_data = self
            .entry_table
            .get(entry_offset..)
            .ok_or(ReadError::OutOfBounds)?;
        StateEntry::read(FontData::new(entry_data))
    }

    /// Read the table, with `read_class_table` parsing the class lookup.
    fn read_parts(
        data: FontData<'a>,
        read_class_table: impl FnOnce(FontData<'a>) -> Result<Lookup<'a>, ReadError>,
    ) -> Result<(Self, Vec<ReadError>), ReadError> {
        let mut cursor = data.cursor();
        let n_classes = cursor.read::<u32>()? as usize;
        let class_table_offset: u32 = cursor.read()?;
        let state_array_offset: u32 = cursor.read()?;
        let entry_table_offset: u32 = cursor.read()?;
        if n_classes == 0 {
            return Err(ReadError::MalformedData("empty AAT state table"));
        }
        let offsets = [class_table_offset, state_array_offset, entry_table_offset]
            .map(|off| off as usize)
            .to_vec();
        let names = read_stash(data, Self::HEADER_LEN, &offsets)?;
        let class_table =
            read_class_table(region_after(data, class_table_offset as usize, &offsets))?;
        let entry_region = region_after(data, entry_table_offset as usize, &offsets);
        let entry_size = StateEntry::<T>::RAW_BYTE_LEN;

        let mut problems = Vec::new();
        let state_data = data
            .split_off(state_array_offset as usize)
            .ok_or(ReadError::OutOfBounds)?;
        let (n_states, n_entries) = discover_states(
            n_classes,
            |cell| state_data.read_at::<u16>(cell * 2).map(usize::from),
            entry_region.len() / entry_size,
            |entry| {
                entry_region
                    .read_at::<u16>(entry * entry_size)
                    .map(usize::from)
            },
            &mut problems,
        )?;
        let state_array = state_data.read_array(0..n_states * n_classes * 2)?;
        let entry_table = entry_region
            .as_bytes()
            .get(..n_entries * entry_size)
            .unwrap_or_default();
        let table = ExtendedStateTable {
            n_classes,
            class_table_offset,
            state_array_offset,
            entry_table_offset,
            class_table,
            state_array,
            entry_table,
            names,
            _marker: PhantomData,
        };
        Ok((table, problems))
    }
}

/// Convert a classic newState row offset to a state index.
fn row_for_offset(new_state: u16, state_array_offset: u16, n_classes: usize) -> Result<u16, ReadError> {
    let delta = new_state
        .checked_sub(state_array_offset)
        .ok_or(ReadError::MalformedData("newState points before the state array"))?
        as usize;
    if delta % n_classes != 0 {
        return Err(ReadError::MalformedData(
            "newState does not point at the start of a state row",
        ));
    }
    Ok((delta / n_classes) as u16)
}

/// The data from `offset` up to the next larger offset, or to the end.
///
/// An offset past the end of the data gives an empty region.
fn region_after<'a>(data: FontData<'a>, offset: usize, offsets: &[usize]) -> FontData<'a> {
    let start = offset.min(data.len());
    let end = offsets
        .iter()
        .copied()
        .filter(|other| *other > offset)
        .min()
        .unwrap_or(data.len())
        .clamp(start, data.len());
    data.slice(start..end).unwrap_or(FontData::new(&[]))
}

fn read_stash(data: FontData, header_len: usize, offsets: &[usize]) -> Result<NameStash, ReadError> {
    let first = offsets.iter().copied().min().unwrap_or(header_len);
    let region = data.slice(header_len..first.max(header_len)).ok_or(ReadError::OutOfBounds)?;
    Ok(NameStash::read(region)?.unwrap_or_default())
}

/// Find the number of states and entries in use.
///
/// Starting from the two predefined states, each row is walked and every
/// entry up to the largest referenced index is read; the states those
/// entries move to extend the set of rows to walk. Cells that refer past
/// `entry_capacity` and entries whose next state cannot be decoded are
/// pushed to `problems` and skipped.
fn discover_states(
    n_classes: usize,
    cell: impl Fn(usize) -> Result<usize, ReadError>,
    entry_capacity: usize,
    target_state: impl Fn(usize) -> Result<usize, ReadError>,
    problems: &mut Vec<ReadError>,
) -> Result<(usize, usize), ReadError> {
    let mut n_states = super::state::FIRST_USER_STATE as usize;
    let mut n_entries = 0;
    let mut row = 0;
    while row < n_states {
        for cell_ix in row * n_classes..(row + 1) * n_classes {
            let entry = cell(cell_ix)?;
            if entry >= entry_capacity {
                problems.push(ReadError::UnresolvedEntryIndex {
                    index: entry,
                    n_entries: entry_capacity,
                });
                continue;
            }
            while n_entries <= entry {
                match target_state(n_entries) {
                    Ok(state) => n_states = n_states.max(state + 1),
                    Err(e) => problems.push(e),
                }
                n_entries += 1;
            }
        }
        row += 1;
    }
    Ok((n_states, n_entries))
}

impl<T> ReadArgs for StateTable<'_, T> {
    type Args = ClassicHeader;
}

impl<'a, T> FontReadWithArgs<'a> for StateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    fn read_with_args(data: FontData<'a>, args: &ClassicHeader) -> Result<Self, ReadError> {
        let (table, problems) = Self::read_parts(data, *args)?;
        match problems.into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(table),
        }
    }
}

impl<'a, T> StateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    /// Read a table with a [`ClassicHeader::Standard`] header.
    pub fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        Self::read_with_args(data, &ClassicHeader::Standard)
    }
}

impl<'a, T> FontRead<'a> for ExtendedStateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let (table, problems) = Self::read_parts(data, Lookup::read)?;
        match problems.into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(table),
        }
    }
}

impl<'a, T> ReadValidated<'a> for StateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    fn read_validated(
        data: FontData<'a>,
        args: &ClassicHeader,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        diagnostics.in_table("StateTable", |d| {
            let errors_before = d.error_count();
            let (table, problems) = match Self::read_parts(data, *args) {
                Ok(parts) => parts,
                Err(e) => {
                    d.error(e);
                    return None;
                }
            };
            d.debug(format!(
                "{} classes, {} states, {} entries",
                table.n_classes(),
                table.n_states(),
                table.n_entries()
            ));
            if let Some(class_data) = data.split_off(table.class_table_offset as usize) {
                ClassTable::read_validated(class_data, &(), d);
            }
            report_problems(d, problems);
            check_cells(
                d,
                table.n_entries(),
                table.state_array.iter().map(|cell| *cell as usize),
            );
            (d.error_count() == errors_before).then_some(table)
        })
    }
}

impl<'a, T> ReadValidated<'a> for ExtendedStateTable<'a, T>
where
    T: FixedSize + bytemuck::AnyBitPattern,
{
    fn read_validated(
        data: FontData<'a>,
        _args: &(),
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        diagnostics.in_table("ExtendedStateTable", |d| {
            let errors_before = d.error_count();
            // a bad class lookup is reported and replaced, so the states are still checked
            let parts = Self::read_parts(data, |region| {
                Ok(Lookup::read_validated(region, &(), d).unwrap_or_else(Lookup::empty))
            });
            let (table, problems) = match parts {
                Ok(parts) => parts,
                Err(e) => {
                    d.error(e);
                    return None;
                }
            };
            d.debug(format!(
                "{} classes, {} states, {} entries",
                table.n_classes(),
                table.n_states(),
                table.n_entries()
            ));
            d.in_field("class_table", |d| {
                for (glyph, class) in table.class_table.iter() {
                    if class as usize >= table.n_classes {
                        d.error(format!(
                            "glyph {glyph} has class {class} but there are only {} classes",
                            table.n_classes
                        ));
                    }
                }
            });
            report_problems(d, problems);
            check_cells(
                d,
                table.n_entries(),
                table.state_array.iter().map(|cell| cell.get() as usize),
            );
            (d.error_count() == errors_before).then_some(table)
        })
    }
}

fn report_problems(d: &mut Diagnostics, problems: Vec<ReadError>) {
    for problem in problems {
        match problem {
            ReadError::UnresolvedEntryIndex { .. } => {
                d.in_field("state_array", |d| d.error(problem))
            }
            other => d.in_field("entry_table", |d| d.error(other)),
        }
    }
}

// entries that no cell refers to are legal, but usually mean a broken writer
fn check_cells(d: &mut Diagnostics, n_entries: usize, cells: impl Iterator<Item = usize>) {
    let mut used = vec![false; n_entries];
    for cell in cells {
        if let Some(slot) = used.get_mut(cell) {
            *slot = true;
        }
    }
    if let Some(unused) = used.iter().position(|used| !used) {
        d.in_field("entry_table", |d| {
            d.at_index(unused, |d| d.warning("entry is not used by any state"))
        });
    }
}

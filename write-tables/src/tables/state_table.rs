//! Owned state tables, with classes and states identified by name.
//!
//! A [`StateTable`] is a map from state name to a row, and each row maps a
//! class name to the [`Entry`] taken when a glyph of that class is seen in
//! that state. Writing assigns indices: the predefined classes and states
//! come first, and identical entries are stored once.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexSet;
use read::tables::name_stash::NameStash as ReadStash;
use read::tables::state_table::{self as rt, ContextualPayload, NoPayload};
use read::tables::{class, state};
use read::types::{BigEndian, FixedSize};
use read::ReadError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::class_table::ClassTable;
use super::lookup::{LookupFamily, LookupMap};
use super::name_stash::{NameStash, NameStashAlignment};
use crate::error::Error;
use crate::from_obj::FromTableRef;
use crate::validate::{Validate, ValidationCtx};
use crate::write::{FontWrite, LinkedWriter, OffsetLen, Stake};

/// The table specific data that follows the next state and flags of an entry.
pub trait EntryPayload: Clone + Default + Ord + std::fmt::Debug {
    /// The parsed form of the payload.
    type Raw: bytemuck::AnyBitPattern + FixedSize;

    fn from_raw(raw: &Self::Raw) -> Self;

    fn write_payload(&self, writer: &mut LinkedWriter);
}

impl EntryPayload for () {
    type Raw = NoPayload;

    fn from_raw(_: &NoPayload) -> Self {}

    fn write_payload(&self, _: &mut LinkedWriter) {}
}

/// A single index, as in the ligature and insertion tables.
impl EntryPayload for u16 {
    type Raw = BigEndian<u16>;

    fn from_raw(raw: &BigEndian<u16>) -> Self {
        raw.get()
    }

    fn write_payload(&self, writer: &mut LinkedWriter) {
        writer.add(self)
    }
}

/// The mark and current substitution indices of a contextual entry.
impl EntryPayload for (u16, u16) {
    type Raw = ContextualPayload;

    fn from_raw(raw: &ContextualPayload) -> Self {
        (raw.mark_index.get(), raw.current_index.get())
    }

    fn write_payload(&self, writer: &mut LinkedWriter) {
        writer.add(&[self.0, self.1])
    }
}

/// What the state machine does on seeing a glyph of some class.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry<P = ()> {
    /// The name of the state to move to.
    pub new_state: String,
    pub flags: u16,
    pub payload: P,
}

impl<P> Entry<P> {
    pub fn with_payload(new_state: impl Into<String>, flags: u16, payload: P) -> Self {
        Entry {
            new_state: new_state.into(),
            flags,
            payload,
        }
    }
}

impl<P: Default> Entry<P> {
    pub fn new(new_state: impl Into<String>, flags: u16) -> Self {
        Self::with_payload(new_state, flags, P::default())
    }
}

/// The entries of one state, by class name.
///
/// Cells that hold the same entry may share one allocation; tables read from
/// font data share an entry wherever the data does.
pub type StateRow<P = ()> = BTreeMap<String, Rc<Entry<P>>>;

/// The layout a [`StateTable`] is written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StateTableFormat {
    /// One-byte classes and cells, 16-bit offsets ('mort', 'kern').
    Classic,
    /// A lookup for classes, 16-bit cells and 32-bit offsets ('morx', 'kerx').
    #[default]
    Extended,
}

/// A finite state machine for glyph processing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateTable<P = ()> {
    pub format: StateTableFormat,
    /// The class of each glyph, by class name.
    ///
    /// Glyphs not in the map are out of bounds.
    pub class_map: BTreeMap<u16, String>,
    /// The rows of the table, by state name.
    ///
    /// "Start of text" and "Start of line" must be present, and are written
    /// first; the other states follow in name order.
    pub states: BTreeMap<String, StateRow<P>>,
}

/// Indices assigned to the names and entries of a table.
#[derive(Debug)]
pub(crate) struct Layout<'t, P> {
    pub(crate) class_names: Vec<&'t str>,
    pub(crate) state_names: Vec<&'t str>,
    /// Distinct entries, in order of first use.
    pub(crate) entries: Vec<&'t Entry<P>>,
    /// The index of the next state of each entry.
    pub(crate) entry_states: Vec<u16>,
    /// The entry index for each class, by state.
    pub(crate) cells: Vec<Vec<u16>>,
    pub(crate) glyph_classes: BTreeMap<u16, u16>,
}

impl<'t, P> Layout<'t, P> {
    fn stash(&self) -> NameStash<'t> {
        NameStash {
            class_names: self.class_names[class::FIRST_USER_CLASS as usize..].to_vec(),
            state_names: self.state_names[state::FIRST_USER_STATE as usize..].to_vec(),
        }
    }

    /// The number of states a reader finds in the written table.
    ///
    /// Readers do not store a state count: starting from the predefined
    /// states, they walk each row and read every entry up to the largest
    /// one used, and the next states of those entries extend the rows to
    /// walk. States past the count are lost.
    fn reachable_state_count(&self) -> usize {
        let mut n_states = state::FIRST_USER_STATE as usize;
        let mut n_entries = 0;
        let mut row = 0;
        while row < n_states.min(self.cells.len()) {
            for cell in &self.cells[row] {
                while n_entries <= *cell as usize {
                    n_states = n_states.max(self.entry_states[n_entries] as usize + 1);
                    n_entries += 1;
                }
            }
            row += 1;
        }
        n_states
    }
}

/// Assigns an index to each distinct name, in order of first appearance.
struct NameIndex<'t>(IndexSet<&'t str>);

impl<'t> NameIndex<'t> {
    fn with_names(names: impl IntoIterator<Item = &'t str>) -> Self {
        NameIndex(names.into_iter().collect())
    }

    fn add(&mut self, name: &'t str) {
        self.0.insert(name);
    }

    fn get(&self, name: &str) -> Option<u16> {
        self.0.get_index_of(name).map(|index| index as u16)
    }

    fn into_names(self) -> Vec<&'t str> {
        self.0.into_iter().collect()
    }
}

impl StateTableFormat {
    fn max_classes(self) -> usize {
        match self {
            StateTableFormat::Classic => u8::MAX as usize + 1,
            StateTableFormat::Extended => u16::MAX as usize + 1,
        }
    }

    fn max_entries(self) -> usize {
        self.max_classes()
    }
}

impl<P> StateTable<P> {
    pub fn new(format: StateTableFormat) -> Self {
        StateTable {
            format,
            class_map: BTreeMap::new(),
            states: BTreeMap::new(),
        }
    }

    /// The class names in index order.
    ///
    /// The predefined classes come first, then the classes of the class map
    /// in glyph order, then any class that only appears in a row.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names = NameIndex::with_names(class::NAMES);
        self.class_map.values().for_each(|name| names.add(name));
        for row in self.states.values() {
            row.keys().for_each(|name| names.add(name));
        }
        names.into_names()
    }

    /// The state names in index order.
    ///
    /// The predefined states come first, then the others sorted by name.
    pub fn state_names(&self) -> Vec<&str> {
        let mut names = NameIndex::with_names(state::NAMES);
        self.states.keys().for_each(|name| names.add(name));
        names.into_names()
    }

    /// The row for `name`, created empty if it does not exist.
    pub fn state_mut(&mut self, name: &str) -> &mut StateRow<P> {
        self.states.entry(name.to_string()).or_default()
    }

    /// Set the entry for a state and class.
    pub fn set_entry(&mut self, state: &str, class: &str, entry: Entry<P>) {
        self.state_mut(state).insert(class.to_string(), Rc::new(entry));
    }

    pub(crate) fn compile_layout(&self, format: StateTableFormat) -> Result<Layout<'_, P>, Error>
    where
        P: Ord,
    {
        let class_names = self.class_names();
        let state_names = self.state_names();
        let classes = NameIndex::with_names(class_names.iter().copied());
        let states = NameIndex::with_names(state_names.iter().copied());
        let mut pool: BTreeMap<&Entry<P>, u16> = BTreeMap::new();
        let mut entries = Vec::new();
        let mut entry_states = Vec::new();
        let mut cells = Vec::with_capacity(state_names.len());

        for state_name in &state_names {
            let row = self
                .states
                .get(*state_name)
                .ok_or_else(|| Error::UnknownState(state_name.to_string()))?;
            let mut row_cells = Vec::with_capacity(class_names.len());
            for class_name in &class_names {
                let entry = row
                    .get(*class_name)
                    .ok_or_else(|| Error::InconsistentClassSet {
                        state: state_name.to_string(),
                        class: class_name.to_string(),
                    })?;
                let index = match pool.get(&**entry) {
                    Some(index) => *index,
                    None => {
                        let target = states
                            .get(&entry.new_state)
                            .ok_or_else(|| Error::UnknownState(entry.new_state.clone()))?;
                        let index = entries.len() as u16;
                        if entries.len() >= format.max_entries() {
                            return Err(Error::TooManyEntries(entries.len() + 1));
                        }
                        entries.push(&**entry);
                        entry_states.push(target);
                        pool.insert(&**entry, index);
                        index
                    }
                };
                row_cells.push(index);
            }
            cells.push(row_cells);
        }
        if class_names.len() > format.max_classes() {
            return Err(Error::TooManyClasses(class_names.len()));
        }
        let glyph_classes = self
            .class_map
            .iter()
            .filter_map(|(glyph, name)| Some((*glyph, classes.get(name)?)))
            .collect();
        log::debug!(
            "state table: {} classes, {} states, {} distinct entries",
            class_names.len(),
            state_names.len(),
            entries.len()
        );
        Ok(Layout {
            class_names,
            state_names,
            entries,
            entry_states,
            cells,
            glyph_classes,
        })
    }

    /// Write the classic layout.
    ///
    /// `write_entry_tail` writes whatever follows the next state of each
    /// entry, and is given the stake at the start of the table. With a
    /// `value_table`, the header gets a fifth field pointing at it.
    pub(crate) fn write_classic(
        &self,
        layout: &Layout<'_, P>,
        writer: &mut LinkedWriter,
        value_table: Option<Stake>,
        mut write_entry_tail: impl FnMut(&Entry<P>, Stake, &mut LinkedWriter),
    ) {
        let start = writer.stake_current();
        let [class_table, state_array, entry_table] = [(); 3].map(|_| writer.new_stake());
        writer.add(&(layout.class_names.len() as u16));
        for target in [Some(class_table), Some(state_array), Some(entry_table), value_table]
            .into_iter()
            .flatten()
        {
            writer.add_unresolved_offset(OffsetLen::Offset16, start, target);
        }
        let stash = layout.stash();
        if !stash.is_default() {
            stash.write(writer, NameStashAlignment::Classic);
        }

        writer.stake_current_with_value(class_table);
        let classes = ClassTable::new(
            layout
                .glyph_classes
                .iter()
                .map(|(glyph, class)| (*glyph, *class as u8)),
        );
        writer.add(&classes);

        writer.stake_current_with_value(state_array);
        let rows = layout
            .cells
            .iter()
            .map(|cells| {
                let row = writer.stake_current();
                cells.iter().for_each(|cell| writer.add(&(*cell as u8)));
                row
            })
            .collect::<Vec<_>>();
        writer.align_to_byte_multiple(2);

        writer.stake_current_with_value(entry_table);
        for (entry, target) in layout.entries.iter().zip(&layout.entry_states) {
            writer.add_unresolved_offset(OffsetLen::Offset16, start, rows[*target as usize]);
            write_entry_tail(*entry, start, writer);
        }
    }

    fn write_extended(&self, layout: &Layout<'_, P>, writer: &mut LinkedWriter)
    where
        P: EntryPayload,
    {
        let start = writer.stake_current();
        let [class_table, state_array, entry_table] = [(); 3].map(|_| writer.new_stake());
        writer.add(&(layout.class_names.len() as u32));
        for target in [class_table, state_array, entry_table] {
            writer.add_unresolved_offset(OffsetLen::Offset32, start, target);
        }
        let stash = layout.stash();
        if !stash.is_default() {
            stash.write(writer, NameStashAlignment::Extended);
        }

        writer.stake_current_with_value(class_table);
        // out of bounds is the absent value, so those glyphs are left out
        let classes = LookupMap::from_values(
            layout
                .glyph_classes
                .iter()
                .map(|(glyph, class)| (*glyph, *class)),
            LookupFamily::Aat,
        );
        writer.add(&classes);

        writer.stake_current_with_value(state_array);
        layout.cells.iter().for_each(|cells| writer.add(cells));

        writer.stake_current_with_value(entry_table);
        for (entry, target) in layout.entries.iter().zip(&layout.entry_states) {
            writer.add(&[*target, entry.flags]);
            entry.payload.write_payload(writer);
        }
    }

    pub(crate) fn validate_rows(&self, ctx: &mut ValidationCtx, format: StateTableFormat)
    where
        P: Ord,
    {
        ctx.in_field("class_map", |ctx| {
            if self.class_map.contains_key(&0xFFFF) {
                ctx.report("glyph 65535 is always the deleted glyph and cannot be given a class");
            }
        });
        let class_names = self.class_names();
        ctx.in_field("states", |ctx| {
            for name in state::NAMES {
                if !self.states.contains_key(name) {
                    ctx.report(format!("missing predefined state '{name}'"));
                }
            }
            for (name, row) in &self.states {
                ctx.in_key(name, |ctx| {
                    for class in &class_names {
                        if !row.contains_key(*class) {
                            ctx.report(Error::InconsistentClassSet {
                                state: name.clone(),
                                class: class.to_string(),
                            });
                        }
                    }
                    for (class, entry) in row {
                        if !self.states.contains_key(&entry.new_state) {
                            ctx.report(format!(
                                "entry for class '{class}' goes to unknown state '{}'",
                                entry.new_state
                            ));
                        }
                    }
                })
            }
        });
        if class_names.len() > format.max_classes() {
            ctx.report(Error::TooManyClasses(class_names.len()));
        }
        let n_entries = self
            .states
            .values()
            .flat_map(|row| row.values().map(|entry| &**entry))
            .collect::<BTreeSet<_>>()
            .len();
        if n_entries > format.max_entries() {
            ctx.report(Error::TooManyEntries(n_entries));
        }
        let state_names = self.state_names();
        let stash = NameStash {
            class_names: class_names[class::FIRST_USER_CLASS as usize..].to_vec(),
            state_names: state_names[state::FIRST_USER_STATE as usize..].to_vec(),
        };
        stash.validate_names(ctx);
        if let Ok(layout) = self.compile_layout(format) {
            let reachable = layout.reachable_state_count();
            ctx.in_field("states", |ctx| {
                for name in &layout.state_names[reachable..] {
                    ctx.report(format!(
                        "state '{name}' is never entered and would be lost when read back"
                    ));
                }
            });
        }
    }
}

impl<P: Clone + Default> StateTable<P> {
    /// Fill in the parts a hand-built table is allowed to leave out.
    ///
    /// A missing "Start of line" becomes a copy of "Start of text", and every
    /// row gets an entry for every class it lacks that moves to "Start of
    /// text" with no flags.
    pub fn normalize(&mut self) {
        let [start_of_text, start_of_line] = state::NAMES;
        if !self.states.contains_key(start_of_text) {
            self.states.insert(start_of_text.to_string(), StateRow::new());
        }
        if !self.states.contains_key(start_of_line) {
            let copy = self.states.get(start_of_text).cloned().unwrap_or_default();
            self.states.insert(start_of_line.to_string(), copy);
        }
        let class_names = self
            .class_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let no_op = Rc::new(Entry::new(start_of_text, 0));
        for row in self.states.values_mut() {
            for class in &class_names {
                row.entry(class.clone()).or_insert_with(|| no_op.clone());
            }
        }
    }
}

impl<P: EntryPayload> StateTable<P> {
    /// Build a table from a parsed classic state table.
    pub fn from_classic(table: &rt::StateTable<'_, P::Raw>) -> Result<Self, ReadError> {
        decode_classic(table, |index| {
            let entry = table.entry_at(index)?;
            Ok((entry.new_state, entry.flags, P::from_raw(&entry.payload)))
        })
    }

    /// Build a table from a parsed extended state table.
    pub fn from_extended(table: &rt::ExtendedStateTable<'_, P::Raw>) -> Result<Self, ReadError> {
        let names = table.names();
        let mut class_map = BTreeMap::new();
        for (glyph, value) in table.class_table().iter() {
            let index = u16::try_from(value)
                .map_err(|_| ReadError::MalformedData("class index does not fit in 16 bits"))?;
            if index != class::OUT_OF_BOUNDS as u16 {
                class_map.insert(glyph, names.class_name(index).into_owned());
            }
        }
        decode_states(
            StateTableFormat::Extended,
            class_map,
            names,
            table.n_states(),
            table.n_classes(),
            |state, class| table.entry_index(state, class),
            |index| {
                let entry = table.entry_at(index)?;
                Ok((entry.new_state, entry.flags, P::from_raw(&entry.payload)))
            },
        )
    }
}

/// Build an owned table from a classic view, decoding entries with `entry_at`.
pub(crate) fn decode_classic<T, P>(
    table: &rt::StateTable<'_, T>,
    entry_at: impl Fn(u16) -> Result<(u16, u16, P), ReadError>,
) -> Result<StateTable<P>, ReadError>
where
    T: bytemuck::AnyBitPattern + FixedSize,
{
    let names = table.names();
    let class_map = table
        .class_table()
        .iter()
        .map(|(glyph, class)| (glyph, names.class_name(class as u16).into_owned()))
        .collect();
    decode_states(
        StateTableFormat::Classic,
        class_map,
        names,
        table.n_states(),
        table.n_classes(),
        |state, class| {
            let class = u8::try_from(class)
                .map_err(|_| ReadError::MalformedData("too many classes for a classic state table"))?;
            table.entry_index(state, class)
        },
        entry_at,
    )
}

fn decode_states<P>(
    format: StateTableFormat,
    class_map: BTreeMap<u16, String>,
    names: &ReadStash,
    n_states: usize,
    n_classes: usize,
    entry_index: impl Fn(u16, u16) -> Result<u16, ReadError>,
    entry_at: impl Fn(u16) -> Result<(u16, u16, P), ReadError>,
) -> Result<StateTable<P>, ReadError> {
    let n_classes = u16::try_from(n_classes)
        .map_err(|_| ReadError::MalformedData("too many classes in state table"))?;
    let n_states = u16::try_from(n_states)
        .map_err(|_| ReadError::MalformedData("too many states in state table"))?;
    let class_names = (0..n_classes)
        .map(|class| names.class_name(class).into_owned())
        .collect::<Vec<_>>();
    let state_names = (0..n_states)
        .map(|state| names.state_name(state).into_owned())
        .collect::<Vec<_>>();
    if class_names.iter().collect::<HashSet<_>>().len() != class_names.len()
        || state_names.iter().collect::<HashSet<_>>().len() != state_names.len()
    {
        return Err(ReadError::MalformedData("name stash repeats a name"));
    }

    let mut decoded: HashMap<u16, Rc<Entry<P>>> = HashMap::new();
    let mut states = BTreeMap::new();
    for (state, state_name) in (0..n_states).zip(&state_names) {
        let mut row = StateRow::new();
        for (class, class_name) in (0..n_classes).zip(&class_names) {
            let index = entry_index(state, class)?;
            let entry = match decoded.get(&index) {
                Some(entry) => entry.clone(),
                None => {
                    let (new_state, flags, payload) = entry_at(index)?;
                    let new_state = state_names
                        .get(new_state as usize)
                        .cloned()
                        .ok_or(ReadError::MalformedData("entry goes to a state past the table"))?;
                    let entry = Rc::new(Entry {
                        new_state,
                        flags,
                        payload,
                    });
                    decoded.insert(index, entry.clone());
                    entry
                }
            };
            row.insert(class_name.clone(), entry);
        }
        states.insert(state_name.clone(), row);
    }
    Ok(StateTable {
        format,
        class_map,
        states,
    })
}

impl<P: EntryPayload> FontWrite for StateTable<P> {
    fn write_into(&self, writer: &mut LinkedWriter) {
        let layout = match self.compile_layout(self.format) {
            Ok(layout) => layout,
            Err(e) => return writer.report_error(e),
        };
        match self.format {
            StateTableFormat::Classic => {
                self.write_classic(&layout, writer, None, |entry, _, writer| {
                    writer.add(&entry.flags);
                    entry.payload.write_payload(writer);
                })
            }
            StateTableFormat::Extended => self.write_extended(&layout, writer),
        }
    }
}

impl<P: Ord> Validate for StateTable<P> {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("StateTable", |ctx| self.validate_rows(ctx, self.format))
    }
}

impl<P: EntryPayload> FromTableRef<rt::StateTable<'_, P::Raw>> for StateTable<P> {
    fn from_table_ref(from: &rt::StateTable<'_, P::Raw>) -> Result<Self, ReadError> {
        StateTable::from_classic(from)
    }
}

impl<P: EntryPayload> FromTableRef<rt::ExtendedStateTable<'_, P::Raw>> for StateTable<P> {
    fn from_table_ref(from: &rt::ExtendedStateTable<'_, P::Raw>) -> Result<Self, ReadError> {
        StateTable::from_extended(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::dump_table;
    use pretty_assertions::assert_eq;
    use read::{FontData, FontRead};
    use table_test_data::aat;

    const START_OF_TEXT: &str = "Start of text";
    const SAW_FIRST: &str = "Saw first";
    const SAW_TRIGGER: &str = "Saw trigger";

    fn fill_row(table: &mut StateTable, state: &str, default: Entry, special: &[(&str, Entry)]) {
        let classes = table
            .class_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let default = Rc::new(default);
        let row = table.state_mut(state);
        for class in classes {
            row.insert(class, default.clone());
        }
        for (class, entry) in special {
            row.insert(class.to_string(), Rc::new(entry.clone()));
        }
    }

    /// The table in the 'morx' rearrangement fixture, built by hand.
    fn rearrangement() -> StateTable {
        let mut table = StateTable::new(StateTableFormat::Extended);
        table.class_map = BTreeMap::from([
            (12, "First".to_string()),
            (19, "Last".to_string()),
            (50, "Trigger".to_string()),
        ]);
        table.set_entry(START_OF_TEXT, "Trigger", Entry::new(SAW_TRIGGER, 0));
        fill_row(
            &mut table,
            SAW_FIRST,
            Entry::new(SAW_FIRST, 0),
            &[
                ("First", Entry::new(SAW_FIRST, 0x8000)),
                ("Last", Entry::new(START_OF_TEXT, 0x2003)),
            ],
        );
        fill_row(
            &mut table,
            SAW_TRIGGER,
            Entry::new(SAW_TRIGGER, 0),
            &[("First", Entry::new(SAW_FIRST, 0x8000))],
        );
        table.normalize();
        table
    }

    #[test]
    fn build_extended() {
        let _ = env_logger::builder().is_test(true).try_init();
        let table = rearrangement();
        assert_eq!(
            table.state_names(),
            ["Start of text", "Start of line", SAW_FIRST, SAW_TRIGGER]
        );
        assert_eq!(table.class_names()[4..], ["First", "Last", "Trigger"]);
        assert_eq!(dump_table(&table).unwrap(), aat::MORX_REARRANGEMENT);
    }

    #[test]
    fn extended_round_trip() {
        let parsed =
            rt::ExtendedStateTable::<NoPayload>::read(FontData::new(aat::MORX_REARRANGEMENT))
                .unwrap();
        let table = StateTable::<()>::from_table_ref(&parsed).unwrap();
        assert_eq!(table, rearrangement());
        assert_eq!(dump_table(&table).unwrap(), aat::MORX_REARRANGEMENT);
    }

    #[test]
    fn classic_round_trip() {
        let parsed = rt::StateTable::<NoPayload>::read(FontData::new(aat::MORT_CLASSIC)).unwrap();
        let table = StateTable::<()>::from_table_ref(&parsed).unwrap();
        assert_eq!(table.format, StateTableFormat::Classic);
        assert_eq!(table.class_map.get(&10).map(String::as_str), Some("User class 1"));
        let added = &table.states["User state 1"]["User class 1"];
        assert_eq!(**added, Entry::new("User state 1", 0));
        assert_eq!(dump_table(&table).unwrap(), aat::MORT_CLASSIC);
    }

    #[test]
    fn decoded_entries_are_shared() {
        let parsed = rt::StateTable::<NoPayload>::read(FontData::new(aat::MORT_CLASSIC)).unwrap();
        let table = StateTable::<()>::from_table_ref(&parsed).unwrap();
        let start_of_text = &table.states["Start of text"];
        let start_of_line = &table.states["Start of line"];
        assert!(Rc::ptr_eq(
            &start_of_text["End of text"],
            &start_of_line["End of text"]
        ));
        assert!(Rc::ptr_eq(
            &start_of_text["End of text"],
            &start_of_text["Deleted glyph"]
        ));
        assert!(!Rc::ptr_eq(
            &start_of_text["End of text"],
            &start_of_text["User class 1"]
        ));
    }

    #[test]
    fn entries_pooled_by_value() {
        let mut table = StateTable::<()>::new(StateTableFormat::Classic);
        table.class_map.insert(5, "Letter".into());
        table.normalize();
        // a separate allocation of an equal entry is still written once
        table.set_entry("Start of line", "Letter", Entry::new(START_OF_TEXT, 0));
        let layout = table.compile_layout(StateTableFormat::Classic).unwrap();
        assert_eq!(layout.entries.len(), 1);
        assert_eq!(layout.cells, [[0u16; 5], [0u16; 5]]);
    }

    #[test]
    fn classic_with_names() {
        let mut table = StateTable::<()>::new(StateTableFormat::Classic);
        table.class_map.insert(3, "Vowel".into());
        table.normalize();
        table.set_entry(START_OF_TEXT, "Vowel", Entry::new("After vowel", 0x8000));
        let row = table.states[START_OF_TEXT].clone();
        table.states.insert("After vowel".into(), row);
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x00, 0x05, 0x00, 0x20, 0x00, 0x26, 0x00, 0x36,
            // stash
            0xFE, 0xED, 0x00, 0x01, 0x05, b'V', b'o', b'w', b'e', b'l',
            0x00, 0x01, 0x0B, b'A', b'f', b't', b'e', b'r', b' ', b'v', b'o', b'w', b'e', b'l',
            // class table, padded
            0x00, 0x03, 0x00, 0x01, 0x04, 0x00,
            // state array
            0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x01,
            0x00,
            // entries
            0x00, 0x26, 0x00, 0x00,
            0x00, 0x30, 0x80, 0x00,
        ];
        let bytes = dump_table(&table).unwrap();
        assert_eq!(bytes, expected);

        let parsed = rt::StateTable::<NoPayload>::read(FontData::new(&bytes)).unwrap();
        assert_eq!(parsed.names().class_names(), ["Vowel"]);
        let decoded = StateTable::<()>::from_table_ref(&parsed).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn contextual_payload_round_trip() {
        let mut table = StateTable::<(u16, u16)>::new(StateTableFormat::Extended);
        table.class_map.insert(20, "Base".into());
        table.normalize();
        table.set_entry(
            "Start of line",
            "Base",
            Entry::with_payload("Start of text", 0x8000, (0xFFFF, 3)),
        );
        let bytes = dump_table(&table).unwrap();
        let parsed =
            rt::ExtendedStateTable::<ContextualPayload>::read(FontData::new(&bytes)).unwrap();
        let entry = parsed.entry(1, 4).unwrap();
        assert_eq!(entry.payload.current_index.get(), 3);
        assert_eq!(
            StateTable::<(u16, u16)>::from_table_ref(&parsed).unwrap(),
            table
        );
    }

    #[test]
    fn missing_cell() {
        let mut table = rearrangement();
        if let Some(row) = table.states.get_mut(SAW_FIRST) {
            row.remove("Trigger");
        }
        let report = table.validate().unwrap_err();
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            ["State 'Saw first' has no entry for class 'Trigger'"]
        );

        // writing without validating reports the same problem
        let mut writer = LinkedWriter::new();
        table.write_into(&mut writer);
        assert!(matches!(
            writer.binary_string(),
            Err(Error::InconsistentClassSet { state, class }) if state == SAW_FIRST && class == "Trigger"
        ));
    }

    #[test]
    fn unknown_states() {
        let mut table = rearrangement();
        table.set_entry(SAW_TRIGGER, "Last", Entry::new("Nowhere", 0));
        table.states.remove("Start of line");
        let report = table.validate().unwrap_err();
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            [
                "missing predefined state 'Start of line'",
                "entry for class 'Last' goes to unknown state 'Nowhere'",
            ]
        );
        assert!(matches!(
            table.compile_layout(StateTableFormat::Extended),
            Err(Error::UnknownState(name)) if name == "Start of line"
        ));
    }

    #[test]
    fn too_many_classes_for_classic() {
        let mut table = StateTable::<()>::new(StateTableFormat::Classic);
        table.class_map = (0..300).map(|glyph| (glyph, format!("c{glyph}"))).collect();
        table.normalize();
        let report = table.validate().unwrap_err();
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            ["Too many classes (304)"]
        );
        table.format = StateTableFormat::Extended;
        assert!(table.validate().is_ok());
    }

    #[test]
    fn normalize_copies_start_of_text() {
        let mut table = StateTable::<u16>::new(StateTableFormat::Extended);
        table.set_entry(START_OF_TEXT, "End of line", Entry::with_payload(START_OF_TEXT, 0x4000, 7));
        table.normalize();
        let start_of_line = &table.states["Start of line"];
        assert_eq!(start_of_line.len(), 4);
        assert_eq!(start_of_line["End of line"].payload, 7);
        assert_eq!(start_of_line["Out of bounds"].new_state, START_OF_TEXT);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn insertion_order_does_not_change_bytes() {
        let cells = [
            (START_OF_TEXT, "Y", 0),
            ("X", "Y", 0x8000),
            ("Y", "X", 0x4000),
        ];
        let build = |format, reversed: bool| {
            let mut table = StateTable::<()>::new(format);
            table.class_map.insert(7, "Mark".into());
            let mut cells = cells.to_vec();
            if reversed {
                cells.reverse();
            }
            for (state, next, flags) in cells {
                table.set_entry(state, "Mark", Entry::new(next, flags));
            }
            table.normalize();
            table
        };
        for format in [StateTableFormat::Classic, StateTableFormat::Extended] {
            let (a, b) = (build(format, false), build(format, true));
            assert_eq!(a, b);
            assert_eq!(a.state_names(), ["Start of text", "Start of line", "X", "Y"]);
            assert_eq!(dump_table(&a).unwrap(), dump_table(&b).unwrap(), "{format:?}");
        }
    }

    #[test]
    fn unreachable_state() {
        let mut table = StateTable::<()>::new(StateTableFormat::Classic);
        table.class_map.insert(5, "Letter".into());
        table.set_entry("Orphan", "Letter", Entry::new("Orphan", 0x8000));
        table.normalize();
        let report = table.validate().unwrap_err();
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            ["state 'Orphan' is never entered and would be lost when read back"]
        );

        // reading the table back finds only the predefined states
        let mut writer = LinkedWriter::new();
        table.write_into(&mut writer);
        let bytes = writer.binary_string().unwrap();
        let parsed = rt::StateTable::<NoPayload>::read(FontData::new(&bytes)).unwrap();
        assert_eq!(parsed.n_states(), 2);

        table.set_entry("Start of line", "Letter", Entry::new("Orphan", 0));
        assert!(table.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let table = rearrangement();
        let json = serde_json::to_string(&table).unwrap();
        let back: StateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}

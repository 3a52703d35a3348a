//! The state table of a 'kern' format 1 subtable.

use std::collections::BTreeSet;

use read::tables::state_table::{self as rt, NoPayload};
use read::ReadError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::state_table::{decode_classic, StateTable, StateTableFormat};
use crate::from_obj::FromTableRef;
use crate::pool::Pool;
use crate::validate::{Validate, ValidationCtx};
use crate::write::{FontWrite, LinkedWriter, OffsetLen};

/// Push the current glyph onto the kerning stack.
pub const PUSH: u16 = 0x8000;
/// Process the current glyph again after this entry.
pub const DONT_ADVANCE: u16 = 0x4000;
/// The low bits of a raw entry hold the offset to its value list.
pub const VALUE_OFFSET_MASK: u16 = 0x3FFF;

/// The kerning values applied to the glyphs on the stack, most recent first.
///
/// Values are even; the low bit marks the end of the list when written.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernValues(pub Vec<i16>);

/// A classic state table whose entries carry kerning values.
///
/// The flags of each entry are [`PUSH`] and [`DONT_ADVANCE`]; the value
/// offset is assigned when the table is written, with identical value lists
/// stored once.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernStateTable(pub StateTable<KernValues>);

impl KernStateTable {
    pub fn new() -> Self {
        KernStateTable(StateTable::new(StateTableFormat::Classic))
    }
}

impl Default for KernStateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FontWrite for KernStateTable {
    fn write_into(&self, writer: &mut LinkedWriter) {
        let layout = match self.0.compile_layout(StateTableFormat::Classic) {
            Ok(layout) => layout,
            Err(e) => return writer.report_error(e),
        };
        let value_table = writer.new_stake();
        let mut lists = Pool::new();
        self.0
            .write_classic(&layout, writer, Some(value_table), |entry, start, writer| {
                if let Err(e) = writer.add_bits_from_number((entry.flags >> 14) as i64, 2) {
                    return writer.report_error(e);
                }
                if entry.payload.0.is_empty() {
                    writer.add_bits(&[0, 0], 14);
                } else {
                    let list = lists.stake_for(entry.payload.clone(), writer);
                    writer.add_unresolved_offset(OffsetLen::Bits(14), start, list);
                }
            });
        writer.stake_current_with_value(value_table);
        lists.write_all(writer, |values, writer| {
            let last = values.0.len() - 1;
            for (i, value) in values.0.iter().enumerate() {
                let end = if i == last { 1 } else { 0 };
                writer.add(&(*value | end));
            }
        });
    }
}

impl Validate for KernStateTable {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("KernStateTable", |ctx| {
            self.0.validate_rows(ctx, StateTableFormat::Classic);
            ctx.in_field("entries", |ctx| {
                let entries = self
                    .0
                    .states
                    .values()
                    .flat_map(|row| row.values().map(|entry| &**entry))
                    .collect::<BTreeSet<_>>();
                for entry in entries {
                    if entry.flags & VALUE_OFFSET_MASK != 0 {
                        ctx.report(format!(
                            "flags {:#06X} overlap the value offset",
                            entry.flags
                        ));
                    }
                    for value in entry.payload.0.iter().filter(|value| *value & 1 != 0) {
                        ctx.report(format!("kerning value {value} is odd"));
                    }
                }
            })
        })
    }
}

impl FromTableRef<rt::StateTable<'_, NoPayload>> for KernStateTable {
    fn from_table_ref(from: &rt::StateTable<'_, NoPayload>) -> Result<Self, ReadError> {
        let table = decode_classic(from, |index| {
            let entry = from.entry_at(index)?;
            let values = match entry.flags & VALUE_OFFSET_MASK {
                0 => Vec::new(),
                offset => from
                    .value_list(offset)?
                    .into_iter()
                    .map(|value| value & !1)
                    .collect(),
            };
            Ok((entry.new_state, entry.flags & !VALUE_OFFSET_MASK, KernValues(values)))
        })?;
        Ok(KernStateTable(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::state_table::Entry;
    use crate::write::dump_table;
    use pretty_assertions::assert_eq;
    use read::tables::state_table::ClassicHeader;
    use read::{FontData, FontReadWithArgs};

    fn read_kern(data: &[u8]) -> rt::StateTable<'_, NoPayload> {
        rt::StateTable::read_with_args(FontData::new(data), &ClassicHeader::WithValueTable).unwrap()
    }

    #[test]
    fn round_trip() {
        let data = table_test_data::aat::KERN_FORMAT_1;
        let table = KernStateTable::from_table_ref(&read_kern(data)).unwrap();
        let entry = &table.0.states["User state 1"]["User class 1"];
        assert_eq!(entry.flags, PUSH);
        assert_eq!(entry.payload, KernValues(vec![-40]));
        assert_eq!(dump_table(&table).unwrap(), data);
    }

    #[test]
    fn value_lists_are_shared() {
        let mut table = KernStateTable::new();
        table.0.class_map.insert(10, "A".into());
        table.0.class_map.insert(11, "B".into());
        table.0.set_entry("Start of text", "A", Entry::new("Saw A", PUSH));
        table.0.normalize();
        let values = KernValues(vec![-40, 12]);
        table.0.set_entry(
            "Saw A",
            "A",
            Entry::with_payload("Saw A", PUSH, values.clone()),
        );
        table.0.set_entry(
            "Saw A",
            "B",
            Entry::with_payload("Start of text", 0, values),
        );
        table.0.normalize();

        let bytes = dump_table(&table).unwrap();
        let parsed = read_kern(&bytes);
        let value_table = parsed.value_table_offset().unwrap();
        let a = parsed.entry(2, 4).unwrap();
        let b = parsed.entry(2, 5).unwrap();
        assert_eq!(a.flags, PUSH | value_table);
        assert_eq!(b.flags, value_table);
        assert_eq!(parsed.value_list(value_table).unwrap(), [-40, 13]);
        // a single list of two values ends the table
        assert_eq!(bytes.len(), value_table as usize + 4);
        assert_eq!(KernStateTable::from_table_ref(&parsed).unwrap(), table);
    }

    #[test]
    fn insertion_order_does_not_change_bytes() {
        let cells = [
            ("Start of text", "A", "Saw A", PUSH, vec![]),
            ("Start of text", "B", "Saw B", PUSH, vec![]),
            ("Saw A", "B", "Start of text", 0, vec![-40]),
            ("Saw B", "A", "Start of text", 0, vec![20, -10]),
            ("Saw B", "B", "Saw B", PUSH, vec![-40]),
        ];
        let build = |reversed: bool| {
            let mut table = KernStateTable::new();
            table.0.class_map.insert(10, "A".into());
            table.0.class_map.insert(11, "B".into());
            let mut cells = cells.to_vec();
            if reversed {
                cells.reverse();
            }
            for (state, class, next, flags, values) in cells {
                table
                    .0
                    .set_entry(state, class, Entry::with_payload(next, flags, KernValues(values)));
            }
            table.0.normalize();
            table
        };
        let (a, b) = (build(false), build(true));
        assert_eq!(a, b);
        let bytes = dump_table(&a).unwrap();
        assert_eq!(bytes, dump_table(&b).unwrap());
        assert_eq!(KernStateTable::from_table_ref(&read_kern(&bytes)).unwrap(), a);
    }

    #[test]
    fn odd_values() {
        let mut table = KernStateTable::new();
        table.0.set_entry(
            "Start of text",
            "End of line",
            Entry::with_payload("Start of text", DONT_ADVANCE | 4, KernValues(vec![-3])),
        );
        table.0.normalize();
        let report = table.validate().unwrap_err();
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            ["flags 0x4004 overlap the value offset", "kerning value -3 is odd"]
        );
    }
}

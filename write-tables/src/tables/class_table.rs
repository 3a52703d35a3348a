//! The classic class table used by 'mort' and 'kern' state tables.

use std::collections::BTreeMap;

use read::tables::{class, class_table as rt};
use read::ReadError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::from_obj::FromTableRef;
use crate::validate::{Validate, ValidationCtx};
use crate::write::{FontWrite, LinkedWriter};

/// A map from glyph to one-byte class.
///
/// Written as an array covering the first to the last glyph in the map,
/// with glyphs in between marked out of bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassTable {
    pub classes: BTreeMap<u16, u8>,
}

impl ClassTable {
    pub fn new(classes: impl IntoIterator<Item = (u16, u8)>) -> Self {
        ClassTable {
            classes: classes.into_iter().collect(),
        }
    }

    fn glyph_range(&self) -> Option<(u16, u16)> {
        let first = self.classes.keys().next()?;
        let last = self.classes.keys().next_back()?;
        Some((*first, *last))
    }
}

impl FontWrite for ClassTable {
    fn write_into(&self, writer: &mut LinkedWriter) {
        let Some((first, last)) = self.glyph_range() else {
            writer.add(&[0u16, 0]);
            return;
        };
        writer.add(&[first, last - first + 1]);
        for glyph in first..=last {
            let class = self.classes.get(&glyph).copied();
            writer.add(&class.unwrap_or(class::OUT_OF_BOUNDS));
        }
        writer.align_to_byte_multiple(2);
    }
}

impl Validate for ClassTable {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("ClassTable", |ctx| {
            ctx.in_field("classes", |ctx| {
                if self.classes.contains_key(&0xFFFF) {
                    ctx.report("glyph 65535 is always the deleted glyph and cannot be given a class");
                }
            })
        })
    }
}

impl FromTableRef<rt::ClassTable<'_>> for ClassTable {
    fn from_table_ref(from: &rt::ClassTable<'_>) -> Result<Self, ReadError> {
        Ok(ClassTable::new(from.iter()))
    }
}

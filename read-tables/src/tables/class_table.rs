//! The classic class table used by 'mort' and 'kern' state tables.

use super::class;
use crate::diagnostics::{Diagnostics, ReadValidated};
use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

/// A trimmed array of one-byte classes, starting at some first glyph.
#[derive(Clone, Debug)]
pub struct ClassTable<'a> {
    first_glyph: u16,
    class_array: &'a [u8],
}

impl<'a> ClassTable<'a> {
    pub fn first_glyph(&self) -> u16 {
        self.first_glyph
    }

    pub fn n_glyphs(&self) -> u16 {
        self.class_array.len() as u16
    }

    pub fn class_array(&self) -> &'a [u8] {
        self.class_array
    }

    /// The class of a glyph.
    ///
    /// Glyphs outside the array are [`OUT_OF_BOUNDS`](class::OUT_OF_BOUNDS),
    /// and the deleted glyph 0xFFFF is always
    /// [`DELETED_GLYPH`](class::DELETED_GLYPH).
    pub fn class(&self, glyph: u16) -> u8 {
        if glyph == 0xFFFF {
            return class::DELETED_GLYPH;
        }
        glyph
            .checked_sub(self.first_glyph)
            .and_then(|ix| self.class_array.get(ix as usize).copied())
            .unwrap_or(class::OUT_OF_BOUNDS)
    }

    /// The (glyph, class) pairs in the table, skipping out-of-bounds entries.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + 'a {
        (self.first_glyph..=u16::MAX)
            .zip(self.class_array.iter().copied())
            .filter(|(_, class)| *class != class::OUT_OF_BOUNDS)
    }

    /// The byte length, including the padding to an even length.
    pub fn byte_len(&self) -> usize {
        let len = 4 + self.class_array.len();
        len + len % 2
    }
}

impl<'a> FontRead<'a> for ClassTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let first_glyph = cursor.read()?;
        let n_glyphs: u16 = cursor.read()?;
        let class_array = cursor.chunk(n_glyphs as usize)?;
        Ok(ClassTable {
            first_glyph,
            class_array,
        })
    }
}

impl<'a> ReadValidated<'a> for ClassTable<'a> {
    fn read_validated(
        data: FontData<'a>,
        _args: &(),
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        diagnostics.in_table("ClassTable", |d| {
            let table = match Self::read(data) {
                Ok(table) => table,
                Err(e) => {
                    d.error(e);
                    return None;
                }
            };
            if table.class_array.is_empty() {
                d.info("class table is empty");
                return Some(table);
            }
            let last_glyph = table.first_glyph as usize + table.class_array.len() - 1;
            if last_glyph >= 0xFFFF {
                d.error(format!("class array runs past the last glyph ({last_glyph})"));
                return None;
            }
            if data.len() < table.byte_len() {
                d.warning("class array is not padded to an even length");
            }
            let errors_before = d.error_count();
            d.check_glyph(last_glyph as u16);
            (d.error_count() == errors_before).then_some(table)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test_data::bebuffer::BeBuffer;

    #[test]
    fn read_classes() {
        let data = table_test_data::aat::CLASS_TABLE;
        let table = ClassTable::read(data.into()).unwrap();
        assert_eq!(table.first_glyph(), 90);
        assert_eq!(table.n_glyphs(), 9);
        assert_eq!(table.byte_len(), data.len());
        assert_eq!(table.class(89), class::OUT_OF_BOUNDS);
        assert_eq!(table.class(90), 4);
        assert_eq!(table.class(94), 3);
        assert_eq!(table.class(95), class::OUT_OF_BOUNDS);
        assert_eq!(table.class(0xFFFF), class::DELETED_GLYPH);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            [(90, 4), (94, 3), (96, 4), (97, 4), (98, 5)]
        );
    }

    #[test]
    fn truncated() {
        let data = table_test_data::aat::CLASS_TABLE;
        assert!(matches!(
            ClassTable::read(data[..8].into()),
            Err(ReadError::InsufficientData { .. })
        ));
    }

    #[test]
    fn validated() {
        let buf = BeBuffer::new().extend([10_u16, 3]).extend([4_u8, 4, 5]);
        let mut diagnostics = Diagnostics::new().with_glyph_count(12);
        let table = ClassTable::read_validated(buf.data().into(), &(), &mut diagnostics);
        assert!(table.is_none());
        let messages = diagnostics
            .messages()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            [
                "Warning: ClassTable: class array is not padded to an even length",
                "Error: ClassTable: glyph 12 is past the end of the font (12 glyphs)",
            ]
        );
    }
}

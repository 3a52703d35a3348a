//! Writing names for the classes and states of a state table.

use read::tables::name_stash::NameStash as ReadStash;

use crate::validate::ValidationCtx;
use crate::write::LinkedWriter;

/// The alignment of the structure that follows a stash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameStashAlignment {
    /// Classic tables use 16-bit offsets to 2-byte aligned structures.
    Classic,
    /// Extended tables use 32-bit offsets and are padded to 4 bytes.
    Extended,
}

impl NameStashAlignment {
    pub fn bytes(self) -> usize {
        match self {
            NameStashAlignment::Classic => 2,
            NameStashAlignment::Extended => 4,
        }
    }
}

/// Names for the classes and states past the predefined ones, in index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameStash<'a> {
    pub class_names: Vec<&'a str>,
    pub state_names: Vec<&'a str>,
}

impl NameStash<'_> {
    /// `true` if every name is the one a reader would make up without a stash.
    ///
    /// Such a stash is not written.
    pub fn is_default(&self) -> bool {
        let defaults = ReadStash::default();
        let classes = self.class_names.iter().enumerate().all(|(i, name)| {
            let index = i + read::tables::class::FIRST_USER_CLASS as usize;
            u16::try_from(index).is_ok_and(|index| defaults.class_name(index) == *name)
        });
        let states = self.state_names.iter().enumerate().all(|(i, name)| {
            let index = i + read::tables::state::FIRST_USER_STATE as usize;
            u16::try_from(index).is_ok_and(|index| defaults.state_name(index) == *name)
        });
        classes && states
    }

    /// Write the stash, followed by padding to `alignment`.
    pub fn write(&self, writer: &mut LinkedWriter, alignment: NameStashAlignment) {
        writer.add(&ReadStash::GUARD);
        for names in [&self.class_names, &self.state_names] {
            writer.add(&(names.len() as u16));
            for name in names {
                writer.add(&(name.len() as u8));
                writer.write_slice(name.as_bytes());
            }
        }
        writer.align_to_byte_multiple(alignment.bytes());
    }

    pub(crate) fn validate_names(&self, ctx: &mut ValidationCtx) {
        ctx.in_field("names", |ctx| {
            for name in self.class_names.iter().chain(&self.state_names) {
                if name.len() > u8::MAX as usize {
                    ctx.report(format!("name '{name}' is longer than 255 bytes"));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stash_layout() {
        let stash = NameStash {
            class_names: vec!["First", "Last", "Trigger"],
            state_names: vec!["Saw first", "Saw trigger"],
        };
        assert!(!stash.is_default());
        let mut writer = LinkedWriter::new();
        stash.write(&mut writer, NameStashAlignment::Extended);
        assert_eq!(
            writer.binary_string().unwrap(),
            table_test_data::aat::MORX_REARRANGEMENT[16..0x40]
        );
    }

    #[test]
    fn classic_padding() {
        let stash = NameStash {
            class_names: vec!["A"],
            state_names: vec![],
        };
        let mut writer = LinkedWriter::new();
        stash.write(&mut writer, NameStashAlignment::Classic);
        assert_eq!(
            writer.binary_string().unwrap(),
            [0xFE, 0xED, 0, 1, 1, b'A', 0, 0]
        );
    }

    #[test]
    fn default_names() {
        let stash = NameStash {
            class_names: vec!["User class 1", "User class 2"],
            state_names: vec!["User state 1"],
        };
        assert!(stash.is_default());
        assert!(NameStash::default().is_default());
        let stash = NameStash {
            class_names: vec!["User class 2"],
            state_names: vec![],
        };
        assert!(!stash.is_default());
    }
}

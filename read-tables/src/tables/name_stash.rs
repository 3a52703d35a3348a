//! Names for the classes and states of a state table.
//!
//! State tables identify classes and states by index only. A name stash is an
//! optional block between the header and the first structure of the table
//! that records a name for each class and state past the predefined ones.

use std::borrow::Cow;

use super::{class, state};
use crate::font_data::{Cursor, FontData};
use crate::read::ReadError;

/// The decoded names, or an empty stash when a table carries none.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameStash {
    class_names: Vec<String>,
    state_names: Vec<String>,
}

impl NameStash {
    /// The first word of a stash.
    pub const GUARD: u16 = 0xFEED;
    /// The smallest region that can hold a stash: guard and two counts.
    pub const MIN_LEN: usize = 6;

    /// Read the stash from the bytes between the header and the first
    /// structure.
    ///
    /// Returns `None` if the region is too short or does not start with the
    /// guard.
    pub fn read(data: FontData) -> Result<Option<NameStash>, ReadError> {
        if data.len() < Self::MIN_LEN || data.read_at::<u16>(0)? != Self::GUARD {
            return Ok(None);
        }
        let mut cursor = data.cursor();
        cursor.skip(2)?;
        let class_names = read_names(&mut cursor)?;
        let state_names = read_names(&mut cursor)?;
        Ok(Some(NameStash {
            class_names,
            state_names,
        }))
    }

    /// Names of the classes past the predefined ones.
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Names of the states past the predefined ones.
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    pub fn is_empty(&self) -> bool {
        self.class_names.is_empty() && self.state_names.is_empty()
    }

    /// The name of the class at `index`.
    ///
    /// Classes missing from the stash are named "User class N", counting
    /// from 1 at the first class past the predefined ones.
    pub fn class_name(&self, index: u16) -> Cow<'_, str> {
        if let Some(name) = class::NAMES.get(index as usize) {
            return Cow::Borrowed(name);
        }
        let user_ix = (index - class::FIRST_USER_CLASS as u16) as usize;
        match self.class_names.get(user_ix) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("User class {}", user_ix + 1)),
        }
    }

    /// The name of the state at `index`.
    pub fn state_name(&self, index: u16) -> Cow<'_, str> {
        if let Some(name) = state::NAMES.get(index as usize) {
            return Cow::Borrowed(name);
        }
        let user_ix = (index - state::FIRST_USER_STATE) as usize;
        match self.state_names.get(user_ix) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("User state {}", user_ix + 1)),
        }
    }
}

fn read_names(cursor: &mut Cursor) -> Result<Vec<String>, ReadError> {
    let count: u16 = cursor.read()?;
    (0..count)
        .map(|_| {
            let bytes = cursor.read_pascal_string()?;
            String::from_utf8(bytes.to_vec())
                .map_err(|_| ReadError::MalformedData("name stash entry is not valid UTF-8"))
        })
        .collect()
}

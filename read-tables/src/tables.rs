//! Shared AAT structures: lookups, class tables and state tables.
//!
//! See <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6Tables.html>

pub mod class_table;
pub mod lookup;
pub mod name_stash;
pub mod state_table;

/// Predefined classes.
pub mod class {
    pub const END_OF_TEXT: u8 = 0;
    pub const OUT_OF_BOUNDS: u8 = 1;
    pub const DELETED_GLYPH: u8 = 2;
    pub const END_OF_LINE: u8 = 3;
    /// The index of the first class that is not predefined.
    pub const FIRST_USER_CLASS: u8 = 4;

    /// Names of the predefined classes, by index.
    pub const NAMES: [&str; 4] = ["End of text", "Out of bounds", "Deleted glyph", "End of line"];
}

/// Predefined states.
pub mod state {
    pub const START_OF_TEXT: u16 = 0;
    pub const START_OF_LINE: u16 = 1;
    /// The index of the first state that is not predefined.
    pub const FIRST_USER_STATE: u16 = 2;

    /// Names of the predefined states, by index.
    pub const NAMES: [&str; 2] = ["Start of text", "Start of line"];
}

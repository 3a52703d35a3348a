//! Owned versions of the shared AAT structures.

pub mod class_table;
pub mod kern;
pub mod lookup;
pub mod name_stash;
pub mod state_table;

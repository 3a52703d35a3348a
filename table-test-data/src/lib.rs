//! test data shared between the table crates.

pub mod aat;
pub mod bebuffer;

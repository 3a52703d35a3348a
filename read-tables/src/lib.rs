//! Reading the shared structures of binary font tables
//!
//! This crate provides memory safe zero-allocation parsing of the pieces
//! that many tables are built from: big-endian scalars, bit fields, AAT
//! lookup tables, class tables and state tables.
//!
//! Two kinds of entry point are provided. [`FontRead::read`] (and
//! [`FontReadWithArgs::read_with_args`] for types that need outside
//! information) stops at the first problem and returns a [`ReadError`].
//! [`ReadValidated::read_validated`] keeps going where it can and records
//! every problem it finds in a [`Diagnostics`] sink.
//!
//! # Example
//!
//! ```
//! use read_tables::{tables::lookup::Lookup, FontData, FontRead};
//!
//! // a format 8 lookup mapping glyphs 10 and 11 to 4 and 5
//! let bytes = [0u8, 8, 0, 10, 0, 2, 0, 4, 0, 5];
//! let lookup = Lookup::read(FontData::new(&bytes)).unwrap();
//! assert_eq!(lookup.value(11), Some(5));
//! assert_eq!(lookup.value(12), None);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bit_cursor;
pub mod diagnostics;
mod font_data;
mod read;
pub mod tables;

/// Public re-export of the table-types crate.
pub extern crate table_types as types;

pub use bit_cursor::BitCursor;
pub use diagnostics::{Diagnostic, Diagnostics, ReadValidated, Severity};
pub use font_data::{offsets_to_sub_cursors, Cursor, FontData, Origin};
pub use read::{FontRead, FontReadWithArgs, ReadArgs, ReadError};

//! Compiling the shared structures of binary font tables
//!
//! This crate builds the bytes of AAT lookups, class tables and state
//! tables from owned, editable types. Each type implements [`FontWrite`],
//! and is laid out by a [`LinkedWriter`]: a bit-granular buffer in which
//! positions are marked with [`Stake`]s and offsets between them are filled
//! in once everything has been written.
//!
//! Owned types can be built by hand, or converted from the views in
//! [`read_tables`](read) with [`FromTableRef`]. Before writing, a table can
//! be checked with [`Validate`], which reports every problem found along
//! with where in the table it occurred.
//!
//! # Example
//!
//! ```
//! use write_tables::{dump_table, tables::lookup::{LookupFamily, LookupMap}};
//!
//! let lookup = LookupMap::from_values([(12, 4), (90, 4)], LookupFamily::Aat);
//! let bytes = dump_table(&lookup).unwrap();
//! // a sparse map is written as format 6, one record per glyph
//! assert_eq!(&bytes[..2], &[0, 6]);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod error;
mod from_obj;
pub mod pool;
pub mod tables;
pub mod util;
pub mod validate;
mod write;

/// Public re-export of the read-tables crate.
pub extern crate read_tables as read;
/// Public re-export of the table-types crate.
pub extern crate table_types as types;

pub use error::Error;
pub use from_obj::{FromTableRef, ToOwnedTable};
pub use validate::{Validate, ValidationReport};
pub use write::{
    dump_table, DeferredValue, FontWrite, LinkedWriter, OffsetLen, OffsetOptions, Stake,
};

//! Common scalar data types used in binary font tables
//!
//! Everything here is stored big-endian on disk. The [`Scalar`] trait
//! describes how a type maps to its raw bytes, and [`BigEndian`] wraps those
//! bytes so that arrays of values can be borrowed straight from font data.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod fixed;
mod glyph_id;
mod raw;
mod tag;
mod uint24;

#[cfg(all(test, feature = "serde"))]
mod serde_test;

pub use fixed::{F2Dot14, Fixed};
pub use glyph_id::GlyphId16;
pub use raw::{BigEndian, FixedSize, Scalar};
pub use tag::{InvalidTag, Tag};
pub use uint24::Uint24;

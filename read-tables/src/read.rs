//! Traits for interpreting table data

use crate::font_data::FontData;

/// A type that can be read from raw table data.
///
/// This trait is implemented for all tables that are self-describing: that
/// is, tables that do not require any external state in order to interpret their
/// underlying bytes. (Tables that require external state implement
/// [`FontReadWithArgs`] instead)
pub trait FontRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data, performing validation.
    ///
    /// In the case of a table, this method is responsible for ensuring the input
    /// data is consistent: this means ensuring that any array lengths are not
    /// out-of-bounds, and that sorted data is actually sorted.
    fn read(data: FontData<'a>) -> Result<Self, ReadError>;
}

/// A trait for a type that needs additional arguments to be read.
pub trait ReadArgs {
    type Args: Copy;
}

/// A trait for types that require external data in order to be constructed.
///
/// Any type that requires external arguments also has a custom `read`
/// constructor where you can pass those arguments like normal.
pub trait FontReadWithArgs<'a>: Sized + ReadArgs {
    /// read an item, using the provided args.
    ///
    /// If a type requires multiple arguments, they will be passed as a tuple.
    fn read_with_args(data: FontData<'a>, args: &Self::Args) -> Result<Self, ReadError>;
}

// a blanket impl of ReadArgs/FontReadWithArgs for general FontRead types.
//
// This gives validated reads a common interface regardless of whether a type
// has args.
impl<'a, T: FontRead<'a>> ReadArgs for T {
    type Args = ();
}

impl<'a, T: FontRead<'a>> FontReadWithArgs<'a> for T {
    fn read_with_args(data: FontData<'a>, _: &Self::Args) -> Result<Self, ReadError> {
        Self::read(data)
    }
}

/// An error that occurs when reading table data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Fewer bytes remain than a fixed-size read requires.
    ///
    /// Nothing is consumed when this is returned.
    InsufficientData { requested: usize, available: usize },
    /// An offset or position was past the end of the data.
    OutOfBounds,
    // i64 is flexible enough to store any value we might encounter
    InvalidFormat(i64),
    InvalidArrayLen,
    NullOffset,
    MalformedData(&'static str),
    /// A lookup segment (or single-glyph record) breaks the ordering rules.
    MalformedSegment {
        index: usize,
        reason: &'static str,
    },
    /// A state array cell refers to an entry past the end of the entry table.
    UnresolvedEntryIndex { index: usize, n_entries: usize },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::InsufficientData {
                requested,
                available,
            } => write!(
                f,
                "Insufficient data: requested {requested} bytes, {available} available"
            ),
            ReadError::OutOfBounds => write!(f, "An offset was out of bounds"),
            ReadError::InvalidFormat(x) => write!(f, "Invalid format '{x}'"),
            ReadError::InvalidArrayLen => {
                write!(f, "Specified array length not a multiple of item size")
            }
            ReadError::NullOffset => write!(f, "An offset was unexpectedly null"),
            ReadError::MalformedData(msg) => write!(f, "Malformed data: '{msg}'"),
            ReadError::MalformedSegment { index, reason } => {
                write!(f, "Malformed segment {index}: {reason}")
            }
            ReadError::UnresolvedEntryIndex { index, n_entries } => write!(
                f,
                "Entry index {index} is past the end of the entry table ({n_entries} entries)"
            ),
        }
    }
}

impl std::error::Error for ReadError {}

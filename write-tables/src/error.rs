//! Errors that occur during writing

use crate::validate::ValidationReport;
use crate::write::Stake;

/// An error occured while writing a table
#[derive(Clone, Debug)]
pub enum Error {
    ValidationFailed(ValidationReport),
    /// A resolved offset does not fit in its field.
    OffsetOverflow { value: i64, bits: u32 },
    /// An offset refers to a stake that was never placed.
    UnresolvedStake(Stake),
    /// An offset refers to a stake that is not on a byte boundary.
    UnalignedStake(Stake),
    /// An offset resolved to a negative value without permission.
    NegativeOffset(i64),
    /// The distance between two stakes is not a multiple of the divisor.
    InexactOffset { distance: i64, divisor: u32 },
    /// A number does not fit in the requested bit count.
    BitsOverflow { value: i64, bits: u32 },
    /// A state row does not have an entry for a class other rows have.
    InconsistentClassSet { state: String, class: String },
    /// A state is referred to but never defined.
    UnknownState(String),
    TooManyClasses(usize),
    TooManyEntries(usize),
    /// Glyph 0xFFFF cannot be a lookup key; it marks the guard record.
    InvalidLookupKey(u16),
    /// A lookup format that does not exist, or cannot hold the values.
    UnsupportedLookupFormat(u16),
    /// An offset-valued lookup in a format that would need gap filling.
    GapInOffsetLookup { format: u16, glyph: u16 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ValidationFailed(report) => report.fmt(f),
            Error::OffsetOverflow { value, bits } => {
                write!(f, "Offset {value} does not fit in {bits} bits")
            }
            Error::UnresolvedStake(stake) => write!(f, "{stake:?} was never placed"),
            Error::UnalignedStake(stake) => write!(f, "{stake:?} is not on a byte boundary"),
            Error::NegativeOffset(value) => {
                write!(f, "Offset resolved to {value}, but negative offsets are not allowed")
            }
            Error::InexactOffset { distance, divisor } => {
                write!(f, "Distance {distance} is not a multiple of {divisor}")
            }
            Error::BitsOverflow { value, bits } => {
                write!(f, "Value {value} does not fit in {bits} bits")
            }
            Error::InconsistentClassSet { state, class } => {
                write!(f, "State '{state}' has no entry for class '{class}'")
            }
            Error::UnknownState(name) => write!(f, "Unknown state '{name}'"),
            Error::TooManyClasses(count) => write!(f, "Too many classes ({count})"),
            Error::TooManyEntries(count) => write!(f, "Too many entries ({count})"),
            Error::InvalidLookupKey(glyph) => write!(f, "Glyph {glyph} cannot be a lookup key"),
            Error::UnsupportedLookupFormat(format) => {
                write!(f, "Lookup format {format} is not supported here")
            }
            Error::GapInOffsetLookup { format, glyph } => write!(
                f,
                "Offset lookup in format {format} has no value for glyph {glyph}"
            ),
        }
    }
}

impl From<ValidationReport> for Error {
    fn from(report: ValidationReport) -> Self {
        Error::ValidationFailed(report)
    }
}

impl std::error::Error for Error {}

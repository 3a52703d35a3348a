//! Traits for converting from parsed table views to their owned equivalents

use read::ReadError;

/// A trait for owned types that can be built from a parsed view.
///
/// Views check their structure lazily, so converting one can still find
/// malformed data (for instance a state entry whose next state cannot be
/// decoded); that is reported as an error. The owned result can be checked
/// further by calling [`validate`][crate::validate::Validate::validate].
pub trait FromTableRef<T>: Sized {
    fn from_table_ref(from: &T) -> Result<Self, ReadError>;
}

/// A conversion from a parsed table view to an owned version.
///
/// You should avoid implementing this trait manually. Like [`std::convert::Into`],
/// it is provided as a blanket impl when you implement [`FromTableRef<T>`].
pub trait ToOwnedTable<T> {
    fn to_owned_table(&self) -> Result<T, ReadError>;
}

impl<U, T> ToOwnedTable<U> for T
where
    U: FromTableRef<T>,
{
    fn to_owned_table(&self) -> Result<U, ReadError> {
        U::from_table_ref(self)
    }
}

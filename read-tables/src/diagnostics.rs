//! Collecting problems found while decoding.
//!
//! The plain [`FontRead`](crate::FontRead) entry points stop at the first
//! error. Validated reads instead record every anomaly they find in a
//! [`Diagnostics`] sink and keep going where they can, so that one pass over
//! a table surfaces as many problems as possible.

use std::fmt::Display;

use crate::font_data::FontData;
use crate::read::ReadArgs;

/// How serious a reported problem is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A single message, along with where it was reported.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    /// A path like `StateTable.state_array[3]`.
    pub location: String,
    pub message: String,
}

/// A sink for messages produced by validated reads.
///
/// The current location is tracked the same way as the write-side validation
/// context: callers wrap work in [`in_table`][Self::in_table],
/// [`in_field`][Self::in_field] and [`at_index`][Self::at_index].
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    glyph_count: Option<u16>,
    cur_location: Vec<LocationElem>,
    messages: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
enum LocationElem {
    Table(&'static str),
    Field(&'static str),
    Index(usize),
}

/// A type that can be read while reporting problems to a [`Diagnostics`].
pub trait ReadValidated<'a>: ReadArgs + Sized {
    /// Read `Self`, reporting every anomaly found.
    ///
    /// Returns `None` if any error-level message was recorded while reading.
    fn read_validated(
        data: FontData<'a>,
        args: &Self::Args,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self>;
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Glyph ids at or past `count` will be reported as errors.
    pub fn with_glyph_count(mut self, count: u16) -> Self {
        self.glyph_count = Some(count);
        self
    }

    pub fn glyph_count(&self) -> Option<u16> {
        self.glyph_count
    }

    /// Run the closure in the context of a new table.
    pub fn in_table<R>(&mut self, name: &'static str, f: impl FnOnce(&mut Diagnostics) -> R) -> R {
        self.with_elem(LocationElem::Table(name), f)
    }

    /// Run the closure in the context of a field.
    pub fn in_field<R>(&mut self, name: &'static str, f: impl FnOnce(&mut Diagnostics) -> R) -> R {
        self.with_elem(LocationElem::Field(name), f)
    }

    /// Run the closure in the context of an array item.
    pub fn at_index<R>(&mut self, index: usize, f: impl FnOnce(&mut Diagnostics) -> R) -> R {
        self.with_elem(LocationElem::Index(index), f)
    }

    pub fn report(&mut self, severity: Severity, msg: impl Display) {
        self.messages.push(Diagnostic {
            severity,
            location: self.location(),
            message: msg.to_string(),
        });
    }

    pub fn debug(&mut self, msg: impl Display) {
        self.report(Severity::Debug, msg)
    }

    pub fn info(&mut self, msg: impl Display) {
        self.report(Severity::Info, msg)
    }

    pub fn warning(&mut self, msg: impl Display) {
        self.report(Severity::Warning, msg)
    }

    pub fn error(&mut self, msg: impl Display) {
        self.report(Severity::Error, msg)
    }

    /// Report an error if `glyph` is not below the known glyph count.
    pub fn check_glyph(&mut self, glyph: u16) {
        if let Some(count) = self.glyph_count.filter(|count| glyph >= *count) {
            self.error(format!(
                "glyph {glyph} is past the end of the font ({count} glyphs)"
            ));
        }
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|msg| msg.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.at_least(Severity::Error).count()
    }

    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }

    /// Messages at or above the given severity.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.messages
            .iter()
            .filter(move |msg| msg.severity >= severity)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn with_elem<R>(&mut self, elem: LocationElem, f: impl FnOnce(&mut Diagnostics) -> R) -> R {
        self.cur_location.push(elem);
        let result = f(self);
        self.cur_location.pop();
        result
    }

    fn location(&self) -> String {
        let mut out = String::new();
        for elem in &self.cur_location {
            match elem {
                LocationElem::Table(name) if out.is_empty() => out.push_str(name),
                LocationElem::Table(name) => {
                    out.push('/');
                    out.push_str(name);
                }
                LocationElem::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                LocationElem::Index(idx) => out.push_str(&format!("[{idx}]")),
            }
        }
        out
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: ", self.severity)?;
        if !self.location.is_empty() {
            write!(f, "{}: ", self.location)?;
        }
        write!(f, "{}", self.message)
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for msg in &self.messages {
            writeln!(f, "{msg}")?;
        }
        Ok(())
    }
}

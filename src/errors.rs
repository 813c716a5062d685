//! Error records shared by the scanner and parser.
//!
//! Errors carry an expanded `Position` so they stay printable after the
//! originating `FileSet` is gone. `ErrorList` keeps them in source order and
//! drops exact duplicates so cascading recovery noise stays readable.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::token::Position;

/// Failure kinds produced while scanning raw tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
pub enum LexErrorKind {
    #[default]
    #[error("illegal character")]
    InvalidToken,
    #[error("comment not terminated")]
    UnterminatedComment,
    #[error("string literal not terminated")]
    UnterminatedString,
    #[error("raw string literal not terminated")]
    UnterminatedRawString,
    #[error("rune literal not terminated")]
    UnterminatedChar,
    #[error("illegal rune literal")]
    IllegalChar,
    #[error("unknown escape sequence")]
    UnknownEscape,
    #[error("illegal character in escape sequence")]
    IllegalEscape,
}

/// A single diagnostic with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub filename: String,
    pub pos: Position,
    pub msg: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.is_valid() {
            let name = if self.filename.is_empty() { "<input>" } else { &self.filename };
            write!(f, "{}:{}:{}: {}", name, self.pos.line, self.pos.column, self.msg)
        } else {
            f.write_str(&self.msg)
        }
    }
}

impl std::error::Error for Error {}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    list: Vec<Error>,
}

impl ErrorList {
    pub fn new() -> ErrorList {
        ErrorList::default()
    }

    pub fn add(&mut self, filename: impl Into<String>, pos: Position, msg: impl Into<String>) {
        self.list.push(Error { filename: filename.into(), pos, msg: msg.into() });
    }

    pub fn push(&mut self, err: Error) {
        self.list.push(err);
    }

    pub fn append(&mut self, mut other: ErrorList) {
        self.list.append(&mut other.list);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.list.iter()
    }

    pub fn last(&self) -> Option<&Error> {
        self.list.last()
    }

    /// Sorts by filename, then source offset, then message.
    pub fn sort(&mut self) {
        self.list.sort_by(|a, b| {
            (&a.filename, a.pos.offset, &a.msg).cmp(&(&b.filename, b.pos.offset, &b.msg))
        });
    }

    /// Removes adjacent entries with the same position and message.
    /// Call after `sort`.
    pub fn dedup(&mut self) {
        self.list
            .dedup_by(|a, b| a.filename == b.filename && a.pos.offset == b.pos.offset && a.msg == b.msg);
    }

    /// Converts a non-empty list into an error value.
    pub fn err(self) -> Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.list.len() {
            0 => f.write_str("no errors"),
            1 => self.list[0].fmt(f),
            n => write!(f, "{} (and {} more errors)", self.list[0], n - 1),
        }
    }
}

impl std::error::Error for ErrorList {}

/// Writes `err` to `w`, one line per diagnostic when the error is an
/// `ErrorList`.
pub fn print_error<W: Write>(w: &mut W, err: &anyhow::Error) -> io::Result<()> {
    if let Some(list) = err.downcast_ref::<ErrorList>() {
        for e in list {
            writeln!(w, "{e}")?;
        }
        Ok(())
    } else {
        writeln!(w, "{err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: usize, line: usize, column: usize) -> Position {
        Position { offset, line, column }
    }

    #[test]
    fn sort_orders_by_offset() {
        let mut list = ErrorList::new();
        list.add("a.api", at(30, 3, 1), "third");
        list.add("a.api", at(5, 1, 6), "first");
        list.add("a.api", at(12, 2, 2), "second");
        list.sort();
        let msgs: Vec<_> = list.iter().map(|e| e.msg.as_str()).collect();
        assert_eq!(msgs, ["first", "second", "third"]);
    }

    #[test]
    fn dedup_drops_exact_duplicates_only() {
        let mut list = ErrorList::new();
        list.add("a.api", at(5, 1, 6), "expected ';'");
        list.add("a.api", at(5, 1, 6), "expected ';'");
        list.add("a.api", at(5, 1, 6), "expected declaration");
        list.sort();
        list.dedup();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn display_summarizes_overflow() {
        let mut list = ErrorList::new();
        list.add("a.api", at(0, 1, 1), "bad thing");
        list.add("a.api", at(9, 2, 1), "worse thing");
        assert_eq!(list.to_string(), "a.api:1:1: bad thing (and 1 more errors)");
    }
}

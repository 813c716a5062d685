//! Token kinds and the position model shared by the scanner, parser, and
//! printer.
//!
//! Positions are compact `u32` values that stay meaningful across a whole
//! `FileSet`: each file claims a contiguous base range, and line starts are
//! recorded incrementally while scanning so that offset → line/column lookups
//! are a binary search away.

use std::fmt;

/// Token kind produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Illegal,
    Eof,
    Comment,

    // Literals.
    Ident,
    Int,
    Float,
    String,
    Char,

    // Operators and delimiters.
    Assign,    // =
    Eql,       // ==
    Colon,     // :
    Define,    // :=
    Comma,     // ,
    Semicolon, // ;
    Period,    // .
    Ellipsis,  // ...
    Add,       // +
    Sub,       // -
    Mul,       // *
    Quo,       // /
    Rem,       // %
    Inc,       // ++
    Dec,       // --
    Lparen,    // (
    Rparen,    // )
    Lbrack,    // [
    Rbrack,    // ]
    Lbrace,    // {
    Rbrace,    // }

    // Keywords.
    Syntax,
    Info,
    Import,
    Type,
    Struct,
    Map,
    Service,
    Returns,

    // Annotation keywords.
    AtServer,
    AtDoc,
    AtHandler,
}

impl Token {
    /// Maps identifier text (including `@`-prefixed text) to its keyword
    /// token, or `Ident` if the text is not a keyword.
    pub fn lookup(ident: &str) -> Token {
        match ident {
            "syntax" => Token::Syntax,
            "info" => Token::Info,
            "import" => Token::Import,
            "type" => Token::Type,
            "struct" => Token::Struct,
            "map" => Token::Map,
            "service" => Token::Service,
            "returns" => Token::Returns,
            "@server" => Token::AtServer,
            "@doc" => Token::AtDoc,
            "@handler" => Token::AtHandler,
            _ => Token::Ident,
        }
    }

    /// True for tokens that carry literal text from the source.
    #[inline]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Token::Ident | Token::Int | Token::Float | Token::String | Token::Char
        )
    }

    /// Canonical spelling used by the printer and in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Token::Illegal => "ILLEGAL",
            Token::Eof => "EOF",
            Token::Comment => "COMMENT",
            Token::Ident => "IDENT",
            Token::Int => "INT",
            Token::Float => "FLOAT",
            Token::String => "STRING",
            Token::Char => "CHAR",
            Token::Assign => "=",
            Token::Eql => "==",
            Token::Colon => ":",
            Token::Define => ":=",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Period => ".",
            Token::Ellipsis => "...",
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Quo => "/",
            Token::Rem => "%",
            Token::Inc => "++",
            Token::Dec => "--",
            Token::Lparen => "(",
            Token::Rparen => ")",
            Token::Lbrack => "[",
            Token::Rbrack => "]",
            Token::Lbrace => "{",
            Token::Rbrace => "}",
            Token::Syntax => "syntax",
            Token::Info => "info",
            Token::Import => "import",
            Token::Type => "type",
            Token::Struct => "struct",
            Token::Map => "map",
            Token::Service => "service",
            Token::Returns => "returns",
            Token::AtServer => "@server",
            Token::AtDoc => "@doc",
            Token::AtHandler => "@handler",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compact position, unique within a `FileSet`. `Pos(0)` is the invalid
/// sentinel (`NO_POS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(pub u32);

/// The invalid position.
pub const NO_POS: Pos = Pos(0);

impl Pos {
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Expanded position: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single source file inside a `FileSet`.
#[derive(Debug)]
pub struct File {
    name: String,
    base: u32,
    size: u32,
    // Byte offsets of line starts; lines[0] == 0 always.
    lines: Vec<u32>,
}

impl File {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Records the start offset of a new line. Offsets must be handed in
    /// increasing order; anything else is silently ignored.
    pub fn add_line(&mut self, offset: usize) {
        let offset = offset as u32;
        if offset <= self.size {
            if let Some(&last) = self.lines.last() {
                if offset <= last {
                    return;
                }
            }
            self.lines.push(offset);
        }
    }

    /// Converts a byte offset in this file to a `Pos`.
    #[inline]
    pub fn pos(&self, offset: usize) -> Pos {
        debug_assert!(offset <= self.size as usize);
        Pos(self.base + offset as u32)
    }

    /// Converts a `Pos` belonging to this file back to a byte offset.
    #[inline]
    pub fn offset(&self, pos: Pos) -> usize {
        debug_assert!(pos.0 >= self.base && pos.0 <= self.base + self.size);
        (pos.0 - self.base) as usize
    }

    /// Line number (1-based) for a position.
    pub fn line(&self, pos: Pos) -> usize {
        self.position(pos).line
    }

    /// Expands a `Pos` into offset/line/column.
    pub fn position(&self, pos: Pos) -> Position {
        if !pos.is_valid() {
            return Position::default();
        }
        let offset = self.offset(pos);
        let line = self.lines.partition_point(|&start| start as usize <= offset);
        // line >= 1 because lines[0] == 0.
        let column = offset - self.lines[line - 1] as usize + 1;
        Position { offset, line, column }
    }
}

/// A set of source files sharing a single `Pos` space.
#[derive(Debug, Default)]
pub struct FileSet {
    base: u32,
    files: Vec<File>,
}

impl FileSet {
    pub fn new() -> FileSet {
        FileSet { base: 1, files: Vec::new() }
    }

    /// Registers a file of `size` bytes and returns it for line bookkeeping.
    /// Sizes the `Pos` space cannot hold are clamped to what remains, so
    /// bases never wrap.
    pub fn add_file(&mut self, name: impl Into<String>, size: usize) -> &mut File {
        let base = self.base;
        let room = (u32::MAX - base).saturating_sub(1);
        let size = u32::try_from(size).unwrap_or(u32::MAX).min(room);
        self.base = base.saturating_add(size).saturating_add(1);
        self.files.push(File {
            name: name.into(),
            base,
            size,
            lines: vec![0],
        });
        self.files.last_mut().unwrap()
    }

    /// Finds the file containing `pos`, if any.
    pub fn file(&self, pos: Pos) -> Option<&File> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self.files.partition_point(|f| f.base <= pos.0);
        if idx == 0 {
            return None;
        }
        let f = &self.files[idx - 1];
        (pos.0 <= f.base + f.size).then_some(f)
    }

    /// Expands a position, falling back to the default for unknown ones.
    pub fn position(&self, pos: Pos) -> Position {
        self.file(pos).map(|f| f.position(pos)).unwrap_or_default()
    }

    /// The most recently added file.
    pub fn last(&self) -> Option<&File> {
        self.files.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(Token::lookup("service"), Token::Service);
        assert_eq!(Token::lookup("@server"), Token::AtServer);
        assert_eq!(Token::lookup("@handler"), Token::AtHandler);
        assert_eq!(Token::lookup("handler"), Token::Ident);
        assert_eq!(Token::lookup("@metrics"), Token::Ident);
    }

    #[test]
    fn position_mapping() {
        let mut fset = FileSet::new();
        let file = fset.add_file("a.api", 20);
        file.add_line(6); // after "hello\n"
        file.add_line(12);

        let p = file.position(file.pos(0));
        assert_eq!((p.line, p.column), (1, 1));
        let p = file.position(file.pos(5));
        assert_eq!((p.line, p.column), (1, 6));
        let p = file.position(file.pos(6));
        assert_eq!((p.line, p.column), (2, 1));
        let p = file.position(file.pos(13));
        assert_eq!((p.line, p.column), (3, 2));
    }

    #[test]
    fn fileset_bases_do_not_overlap() {
        let mut fset = FileSet::new();
        let (b1, p1) = {
            let f = fset.add_file("a.api", 10);
            (f.base(), f.pos(10))
        };
        let b2 = fset.add_file("b.api", 5).base();
        assert_eq!(b1, 1);
        assert_eq!(b2, 12);
        assert_eq!(fset.file(p1).map(|f| f.name()), Some("a.api"));
        assert_eq!(fset.file(Pos(12)).map(|f| f.name()), Some("b.api"));
    }

    #[test]
    fn add_file_clamps_sizes_past_the_pos_space() {
        let mut fset = FileSet::new();
        let b1 = fset.add_file("big.api", u32::MAX as usize + 123).base();
        let b2 = fset.add_file("next.api", 10).base();
        assert_eq!(b1, 1);
        assert!(b2 > b1, "base wrapped: {b2}");
        // Further registrations keep handing out bases without wrapping.
        let b3 = fset.add_file("more.api", u32::MAX as usize).base();
        assert!(b3 >= b2, "base wrapped: {b3}");
    }
}

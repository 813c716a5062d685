//! Recursive-descent parser with error recovery.
//!
//! The parser never gives up on the first error: `expect` reports and moves
//! on, malformed regions become `Bad*` nodes, and `advance` skips to a
//! synchronizing token set with a forced-progress guard so recovery always
//! terminates. In the default mode, errors on the same line as the previous
//! one are discarded and the parse bails out after more than ten errors; the
//! bailout is an ordinary `Result` threaded through every production.

mod parse;

use crate::ast::{self, CommentGroup, CommentId, ImportSpec};
use crate::errors::ErrorList;
use crate::scanner::{self, Scanner};
use crate::token::{File, FileSet, Pos, Token};

/// Parser configuration bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode(u32);

impl Mode {
    /// Retain comments in the syntax tree.
    pub const PARSE_COMMENTS: Mode = Mode(1 << 0);
    /// Emit a `tracing` event on entry to each production.
    pub const TRACE: Mode = Mode(1 << 1);
    /// Reserved: declaration errors reported by identifier resolution,
    /// which this parser does not perform.
    pub const DECLARATION_ERRORS: Mode = Mode(1 << 2);
    /// Report all errors instead of at most ten on distinct lines.
    pub const ALL_ERRORS: Mode = Mode(1 << 3);
    /// Reserved: identifier resolution is never performed.
    pub const SKIP_OBJECT_RESOLUTION: Mode = Mode(1 << 4);

    #[inline]
    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Mode {
    type Output = Mode;
    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

/// Marker for an abandoned parse (too many errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bailout;

pub(crate) type PResult<T> = Result<T, Bailout>;

pub(crate) struct Parser<'a> {
    scanner: Scanner<'a>,
    mode: Mode,
    trace: bool,
    errors: ErrorList,

    // Current token.
    pos: Pos,
    tok: Token,
    lit: &'a str,

    // Comment bookkeeping.
    comments: Vec<CommentGroup>,
    lead_comment: Option<CommentId>,
    line_comment: Option<CommentId>,

    // Forced-progress guard for advance().
    sync_pos: Pos,
    sync_cnt: usize,

    imports: Vec<ImportSpec>,
}

// Synchronizing sets.

fn is_decl_start(tok: Token) -> bool {
    matches!(
        tok,
        Token::Import | Token::Info | Token::Type | Token::Syntax | Token::AtServer | Token::Service
    )
}

fn is_stmt_start(tok: Token) -> bool {
    matches!(tok, Token::Type)
}

fn is_expr_end(tok: Token) -> bool {
    matches!(
        tok,
        Token::Comma | Token::Colon | Token::Semicolon | Token::Rparen | Token::Rbrack | Token::Rbrace
    )
}

impl<'a> Parser<'a> {
    fn new(file: &'a mut File, src: &'a str, mode: Mode) -> Parser<'a> {
        let mut scan_mode = scanner::Mode::default();
        if mode.contains(Mode::PARSE_COMMENTS) {
            scan_mode = scan_mode | scanner::Mode::SCAN_COMMENTS;
        }
        let mut p = Parser {
            scanner: Scanner::new(file, src, scan_mode),
            mode,
            trace: mode.contains(Mode::TRACE),
            errors: ErrorList::new(),
            pos: Pos(0),
            tok: Token::Eof,
            lit: "",
            comments: Vec::new(),
            lead_comment: None,
            line_comment: None,
            sync_pos: Pos(0),
            sync_cnt: 0,
            imports: Vec::new(),
        };
        p.next();
        p
    }

    fn trace(&self, production: &str) {
        if self.trace {
            let pos = self.scanner.file().position(self.pos);
            tracing::trace!(
                line = pos.line,
                column = pos.column,
                tok = %self.tok,
                production,
            );
        }
    }

    #[inline]
    fn file_line(&self, pos: Pos) -> usize {
        self.scanner.file().line(pos)
    }

    /// Advances to the next raw token, skipping nothing.
    fn next0(&mut self) {
        let (pos, tok, lit) = self.scanner.scan();
        self.pos = pos;
        self.tok = tok;
        self.lit = lit;
    }

    fn consume_comment(&mut self) -> (ast::Comment, usize) {
        let mut endline = self.file_line(self.pos);
        if self.lit.starts_with("/*") {
            endline += self.lit.bytes().filter(|&b| b == b'\n').count();
        }
        let comment = ast::Comment { slash: self.pos, text: self.lit.to_string() };
        self.next0();
        (comment, endline)
    }

    /// Consumes a run of comments with at most `n` empty lines between them
    /// and returns the group's id and the line its last comment ends on.
    fn consume_comment_group(&mut self, n: usize) -> (CommentId, usize) {
        let mut list = Vec::new();
        let mut endline = self.file_line(self.pos);
        while self.tok == Token::Comment && self.file_line(self.pos) <= endline + n {
            let (comment, el) = self.consume_comment();
            endline = el;
            list.push(comment);
        }
        self.comments.push(CommentGroup { list });
        (self.comments.len() - 1, endline)
    }

    /// Advances to the next non-comment token, classifying comment groups on
    /// the way: a group on the same line as the previous token becomes its
    /// line comment, a group ending on the line right before the new token
    /// becomes the pending lead comment.
    fn next(&mut self) {
        self.lead_comment = None;
        self.line_comment = None;
        let prev = self.pos;
        self.next0();

        if self.tok == Token::Comment {
            if self.file_line(self.pos) == self.file_line(prev) {
                let (id, endline) = self.consume_comment_group(0);
                if self.file_line(self.pos) != endline
                    || self.tok == Token::Semicolon
                    || self.tok == Token::Eof
                {
                    // Cannot be a lead comment, but may trail `prev`.
                    self.line_comment = Some(id);
                }
            }

            let mut last = None;
            let mut endline = 0;
            while self.tok == Token::Comment {
                let (id, el) = self.consume_comment_group(1);
                last = Some(id);
                endline = el;
            }
            if last.is_some() && endline + 1 == self.file_line(self.pos) {
                self.lead_comment = last;
            }
        }
    }

    fn total_errors(&self) -> usize {
        self.errors.len() + self.scanner.error_count()
    }

    fn error(&mut self, pos: Pos, msg: impl Into<String>) -> PResult<()> {
        let epos = self.scanner.file().position(pos);
        if !self.mode.contains(Mode::ALL_ERRORS) {
            // Discard errors on the same line as the last one reported;
            // they are usually spurious follow-ups.
            if let Some(last) = self.errors.last() {
                if last.pos.line == epos.line {
                    return Ok(());
                }
            }
            if self.total_errors() > 10 {
                return Err(Bailout);
            }
        }
        let name = self.scanner.file().name().to_string();
        self.errors.add(name, epos, msg);
        Ok(())
    }

    fn error_expected(&mut self, pos: Pos, what: &str) -> PResult<()> {
        let mut msg = format!("expected {what}");
        if pos == self.pos {
            // Make the error message more specific.
            if self.tok == Token::Semicolon && self.lit == "\n" {
                msg.push_str(", found newline");
            } else if self.tok.is_literal() {
                msg.push_str(", found ");
                msg.push_str(self.lit);
            } else {
                msg.push_str(&format!(", found '{}'", self.tok));
            }
        }
        self.error(pos, msg)
    }

    /// Reports a mismatch and advances one token either way.
    fn expect(&mut self, tok: Token) -> PResult<Pos> {
        let pos = self.pos;
        if self.tok != tok {
            self.error_expected(pos, &format!("'{tok}'"))?;
        }
        self.next();
        Ok(pos)
    }

    /// Semicolons are optional before `)` and `}`; a `,` is reported but
    /// consumed as if it were one.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.tok != Token::Rparen && self.tok != Token::Rbrace {
            match self.tok {
                Token::Comma => {
                    self.error_expected(self.pos, "';'")?;
                    self.next();
                }
                Token::Semicolon => self.next(),
                _ => {
                    self.error_expected(self.pos, "';'")?;
                    self.advance(is_stmt_start);
                }
            }
        }
        Ok(())
    }

    /// Skips tokens until one in the synchronizing set. If the same sync
    /// position is reached ten times, one token is consumed unconditionally
    /// so recovery cannot loop.
    fn advance(&mut self, to: fn(Token) -> bool) {
        while self.tok != Token::Eof {
            if to(self.tok) {
                if self.pos == self.sync_pos && self.sync_cnt < 10 {
                    self.sync_cnt += 1;
                    return;
                }
                if self.pos > self.sync_pos {
                    self.sync_pos = self.pos;
                    self.sync_cnt = 0;
                    return;
                }
            }
            self.next();
        }
    }
}

/// Parses a source file.
///
/// Always produces a file value, possibly structurally incomplete when the
/// source is malformed. The error list merges scanner and parser errors,
/// sorted by position and deduplicated by (position, message).
pub fn parse_file(
    fset: &mut FileSet,
    filename: &str,
    src: &str,
    mode: Mode,
) -> (ast::File, ErrorList) {
    let file = fset.add_file(filename, src.len());
    let mut p = Parser::new(file, src, mode);

    let ast_file = match p.parse_source_file() {
        Ok(f) => f,
        Err(Bailout) => ast::File {
            imports: std::mem::take(&mut p.imports),
            comments: std::mem::take(&mut p.comments),
            ..ast::File::default()
        },
    };

    let mut errors = p.scanner.take_errors();
    errors.append(p.errors);
    errors.sort();
    errors.dedup();
    (ast_file, errors)
}

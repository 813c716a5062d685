//! Canonical pretty-printer.
//!
//! The printer walks the syntax tree and emits tokens separated by *pending*
//! whitespace directives (`Ws`). Directives are buffered and only written
//! when the next token forces a flush; the flush first interleaves any
//! comment groups whose position precedes the token, which is what lets
//! comments land where they stood in the source. Runs of newlines clamp at
//! two, so at most one blank line survives.
//!
//! The first stage emits `\v` as an alignment cell separator and `\f` as a
//! hard section break; a tabwriter pass then resolves columns. Literal text
//! that must not confuse that pass travels between 0xFF escape bytes.

mod comment;
mod nodes;

use smallvec::SmallVec;
use thiserror::Error;

use crate::ast;
use crate::tabwriter;
use crate::token::{File, Pos, Position, Token};

const INFINITY: usize = 1 << 30;
const MAX_NEWLINES: usize = 2;

#[inline]
fn nlimit(n: usize) -> usize {
    n.min(MAX_NEWLINES)
}

/// Printer-internal inconsistencies are programming errors; they surface as
/// results, never panics.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("printer: negative indentation")]
    NegativeIndent,
    #[error("printer: {0}")]
    Internal(&'static str),
}

/// Printer configuration bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode(u32);

impl Mode {
    /// Emit the pre-alignment byte stream unchanged (cell separators become
    /// single spaces).
    pub const RAW_FORMAT: Mode = Mode(1 << 0);
    /// Indent with tabs.
    pub const TAB_INDENT: Mode = Mode(1 << 1);
    /// Align columns with spaces.
    pub const USE_SPACES: Mode = Mode(1 << 2);

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

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub tab_width: usize,
    /// Extra indentation applied to every line.
    pub indent: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            mode: Mode::USE_SPACES | Mode::TAB_INDENT,
            tab_width: 8,
            indent: 0,
        }
    }
}

impl Config {
    /// Formats `node` (parsed from `file`) into its canonical byte form.
    pub fn fprint(&self, file: &File, node: &ast::File) -> Result<Vec<u8>, PrintError> {
        let mut p = Printer::new(self, file, &node.comments);
        p.file(node)?;
        let eof = Position { offset: INFINITY, line: INFINITY, column: INFINITY };
        p.flush(eof, Token::Eof)?;

        let raw = p.output;
        if self.mode.contains(Mode::RAW_FORMAT) {
            Ok(tabwriter::raw(&raw))
        } else {
            let padchar = if self.mode.contains(Mode::USE_SPACES) { b' ' } else { b'\t' };
            Ok(tabwriter::format(&raw, padchar))
        }
    }
}

/// Formats with the default configuration (tab indentation, space-aligned
/// columns).
pub fn format(file: &File, node: &ast::File) -> Result<Vec<u8>, PrintError> {
    Config::default().fprint(file, node)
}

/// Pending whitespace directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ws {
    Ignore,
    Blank,
    Vtab,
    Newline,
    Formfeed,
    Indent,
    Unindent,
}

impl Ws {
    fn byte(self) -> u8 {
        match self {
            Ws::Blank => b' ',
            Ws::Vtab => b'\x0b',
            Ws::Newline => b'\n',
            Ws::Formfeed => b'\x0c',
            _ => 0,
        }
    }
}

struct Printer<'a> {
    cfg: &'a Config,
    file: &'a File,
    output: Vec<u8>,

    indent: isize,
    implied_semi: bool,
    last_tok: Token,
    wsbuf: SmallVec<[Ws; 16]>,

    /// Current source position estimate (advanced while writing).
    pos: Position,
    /// Current output position.
    out: Position,
    /// Source position of the last written item.
    last: Position,

    comments: &'a [ast::CommentGroup],
    cindex: usize,
    comment_offset: usize,
    comment_newline: bool,
}

impl<'a> Printer<'a> {
    fn new(cfg: &'a Config, file: &'a File, comments: &'a [ast::CommentGroup]) -> Printer<'a> {
        let origin = Position { offset: 0, line: 1, column: 1 };
        let mut p = Printer {
            cfg,
            file,
            output: Vec::new(),
            indent: 0,
            implied_semi: false,
            last_tok: Token::Illegal,
            wsbuf: SmallVec::new(),
            pos: origin,
            out: origin,
            last: origin,
            comments,
            cindex: 0,
            comment_offset: INFINITY,
            comment_newline: false,
        };
        p.update_comment_info();
        p
    }

    // ------------------------------------------------------------------------
    // Position bookkeeping

    fn set_pos(&mut self, pos: Pos) {
        if pos.is_valid() {
            self.pos = self.file.position(pos);
        }
    }

    fn line_for(&self, pos: Pos) -> usize {
        self.file.line(pos)
    }

    // ------------------------------------------------------------------------
    // Low-level writing

    fn write_indent(&mut self) {
        let n = (self.cfg.indent as isize + self.indent).max(0) as usize;
        for _ in 0..n {
            self.output.push(b'\t');
        }
        self.out.column += n;
    }

    fn write_byte(&mut self, ch: u8, n: usize) {
        if self.out.column == 1 {
            self.write_indent();
        }
        for _ in 0..n {
            self.output.push(ch);
        }
        self.pos.offset += n;
        if ch == b'\n' || ch == b'\x0c' {
            self.pos.line += n;
            self.out.line += n;
            self.pos.column = 1;
            self.out.column = 1;
        } else {
            self.pos.column += n;
            self.out.column += n;
        }
    }

    /// Writes `s`, updating both position trackers. Literal text is wrapped
    /// in escape bytes so the alignment pass leaves it alone.
    fn write_string(&mut self, pos: Position, s: &str, is_lit: bool) {
        if self.out.column == 1 {
            self.write_indent();
        }
        if pos.is_valid() {
            self.pos = pos;
        }
        if is_lit {
            self.output.push(tabwriter::ESCAPE);
        }
        self.output.extend_from_slice(s.as_bytes());
        if is_lit {
            self.output.push(tabwriter::ESCAPE);
        }

        let mut nlines = 0;
        let mut last_nl = 0;
        for (i, b) in s.bytes().enumerate() {
            if b == b'\n' {
                nlines += 1;
                last_nl = i;
            }
        }
        self.pos.offset += s.len();
        if nlines > 0 {
            self.pos.line += nlines;
            self.out.line += nlines;
            let col = s.len() - last_nl;
            self.pos.column = col;
            self.out.column = col;
        } else {
            self.pos.column += s.len();
            self.out.column += s.len();
        }
        self.last = self.pos;
    }

    // ------------------------------------------------------------------------
    // Whitespace buffer

    fn ws(&mut self, w: Ws) {
        if w == Ws::Ignore {
            return;
        }
        if matches!(w, Ws::Newline | Ws::Formfeed) {
            self.implied_semi = false;
        }
        self.wsbuf.push(w);
    }

    /// Writes the first `n` buffered directives. A line break directly
    /// before an unindent is moved after it so closing tokens line up with
    /// their opener.
    fn write_whitespace(&mut self, n: usize) -> Result<(), PrintError> {
        let mut i = 0;
        while i < n {
            match self.wsbuf[i] {
                Ws::Ignore => {}
                Ws::Indent => self.indent += 1,
                Ws::Unindent => {
                    self.indent -= 1;
                    if self.indent < 0 {
                        return Err(PrintError::NegativeIndent);
                    }
                }
                Ws::Newline | Ws::Formfeed => {
                    if i + 1 < n && self.wsbuf[i + 1] == Ws::Unindent {
                        self.wsbuf.swap(i, i + 1);
                        continue; // reprocess the unindent now at i
                    }
                    let ch = self.wsbuf[i].byte();
                    self.write_byte(ch, 1);
                }
                ch => self.write_byte(ch.byte(), 1),
            }
            i += 1;
        }
        self.wsbuf.drain(..n);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Token printing

    /// Prints one token's worth of text. Flushes pending whitespace and
    /// comments first, then preserves up to one blank source line when no
    /// semicolon would be implied at this point.
    fn word(&mut self, data: &str, tok: Token, is_lit: bool) -> Result<(), PrintError> {
        let next = self.pos;
        let (wrote_newline, dropped_ff) = self.flush(next, self.last_tok)?;

        // Intersperse extra source newlines not already accounted for by the
        // flushed whitespace (`pos` advanced past them while writing).
        if !self.implied_semi {
            let mut n = nlimit(next.line.saturating_sub(self.pos.line));
            if wrote_newline && n == MAX_NEWLINES {
                n = MAX_NEWLINES - 1;
            }
            if n > 0 {
                let ch = if dropped_ff { b'\x0c' } else { b'\n' };
                self.write_byte(ch, n);
            }
        }

        self.write_string(next, data, is_lit);
        self.implied_semi = matches!(
            tok,
            Token::Ident
                | Token::Int
                | Token::Float
                | Token::String
                | Token::Char
                | Token::Rparen
                | Token::Rbrack
                | Token::Rbrace
                | Token::Inc
                | Token::Dec
        );
        self.last_tok = tok;
        Ok(())
    }

    fn token(&mut self, pos: Pos, tok: Token) -> Result<(), PrintError> {
        self.set_pos(pos);
        self.word(tok.as_str(), tok, false)
    }

    fn ident(&mut self, id: &ast::Ident) -> Result<(), PrintError> {
        self.set_pos(id.name_pos);
        self.word(&id.name, Token::Ident, false)
    }

    fn lit(&mut self, l: &ast::BasicLit) -> Result<(), PrintError> {
        self.set_pos(l.value_pos);
        self.word(&l.value, l.kind, true)
    }

    /// Pushes the line breaks separating an item on `line` from the current
    /// position: at least `min`, at most the source distance (clamped).
    fn linebreak(&mut self, line: usize, min: usize, ws: Ws, new_section: bool) {
        let mut n = nlimit(line.saturating_sub(self.pos.line)).max(min);
        if n > 0 {
            self.ws(ws);
            if new_section {
                self.ws(Ws::Formfeed);
                n -= 1;
            }
            for _ in 0..n {
                self.ws(Ws::Newline);
            }
        }
    }

    /// Flushes pending whitespace, interleaving comments that belong before
    /// the token at `next`. Returns whether a newline was written and
    /// whether a formfeed was dropped while doing so.
    fn flush(&mut self, next: Position, tok: Token) -> Result<(bool, bool), PrintError> {
        if self.comment_before(next) {
            self.intersperse_comments(next, tok)
        } else {
            let n = self.wsbuf.len();
            self.write_whitespace(n)?;
            Ok((false, false))
        }
    }
}

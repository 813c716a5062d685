//! Lexer for api source text.
//!
//! Raw tokenization is a generated [`logos`] DFA (`RawTok`); the public
//! [`Scanner`] wraps it to perform automatic semicolon insertion, comment
//! handling, line bookkeeping, and error recovery. The wrapper owns a pending
//! slot because a synthetic semicolon must be delivered *before* the comment
//! that triggered it.
//!
//! Semicolon insertion follows the usual rule: a newline terminates a
//! declaration when the last token could legally end one (identifier,
//! literal, `)`, `]`, `}`, `++`, `--`).

use logos::Logos;
use memchr::{memchr, memmem};

use crate::errors::{ErrorList, LexErrorKind};
use crate::token::{File, Pos, Token};

// ============================================================================
// Scanner mode
// ============================================================================

/// Scanner configuration bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode(u32);

impl Mode {
    /// Emit comment tokens instead of skipping them.
    pub const SCAN_COMMENTS: Mode = Mode(1 << 0);

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

// ============================================================================
// Raw tokens
// ============================================================================

fn lex_block_comment(lex: &mut logos::Lexer<RawTok>) -> bool {
    // "/*" already consumed; find the closing "*/" without rescanning.
    match memmem::find(lex.remainder().as_bytes(), b"*/") {
        Some(i) => {
            lex.bump(i + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r]+")]
enum RawTok {
    #[token("\u{feff}")]
    Bom,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,

    // Payload is false when the comment runs to EOF unterminated.
    #[token("/*", lex_block_comment)]
    BlockComment(bool),

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,

    #[regex(r"@[\p{L}_][\p{L}\p{N}_]*")]
    AtIdent,

    #[regex(r"[0-9][0-9_]*|0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+", priority = 4)]
    Int,

    #[regex(
        r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?",
        priority = 5
    )]
    Float,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, priority = 6)]
    Str,
    #[regex(r#""([^"\\\n]|\\[^\n])*"#, priority = 3)]
    UnterminatedStr,

    #[regex(r"`[^`]*`", priority = 6)]
    RawStr,
    #[regex(r"`[^`]*", priority = 3)]
    UnterminatedRawStr,

    #[regex(r"'([^'\\\n]|\\[^\n])+'", priority = 6)]
    CharLit,
    #[regex(r"'([^'\\\n]|\\[^\n])*", priority = 3)]
    UnterminatedChar,

    #[token("==")]
    Eql,
    #[token("=")]
    Assign,
    #[token(":=")]
    Define,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Period,
    #[token("++")]
    Inc,
    #[token("+")]
    Add,
    #[token("--")]
    Dec,
    #[token("-")]
    Sub,
    #[token("*")]
    Mul,
    #[token("/")]
    Quo,
    #[token("%")]
    Rem,
    #[token("(")]
    Lparen,
    #[token(")")]
    Rparen,
    #[token("[")]
    Lbrack,
    #[token("]")]
    Rbrack,
    #[token("{")]
    Lbrace,
    #[token("}")]
    Rbrace,

    #[token("\u{0}", priority = 2)]
    Nul,

    // Catch-all for stray characters; keeps the scanner total.
    #[regex(r".", priority = 0)]
    Unknown,
}

// ============================================================================
// Scanner
// ============================================================================

/// Streaming tokenizer with automatic semicolon insertion.
pub struct Scanner<'a> {
    file: &'a mut File,
    src: &'a str,
    lex: logos::Lexer<'a, RawTok>,
    mode: Mode,
    insert_semi: bool,
    pending: Option<(Pos, Token, &'a str)>,
    /// Lexical errors collected so far.
    pub errors: ErrorList,
}

impl<'a> Scanner<'a> {
    pub fn new(file: &'a mut File, src: &'a str, mode: Mode) -> Scanner<'a> {
        debug_assert_eq!(file.size(), src.len());
        Scanner {
            file,
            src,
            lex: RawTok::lexer(src),
            mode,
            insert_semi: false,
            pending: None,
            errors: ErrorList::new(),
        }
    }

    /// The file whose line table this scanner maintains.
    pub fn file(&self) -> &File {
        self.file
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn take_errors(&mut self) -> ErrorList {
        std::mem::take(&mut self.errors)
    }

    fn error(&mut self, offset: usize, msg: impl Into<String>) {
        let pos = self.file.position(self.file.pos(offset));
        self.errors.add(self.file.name().to_string(), pos, msg);
    }

    /// Returns the next token. Operator tokens carry an empty literal;
    /// identifiers, keywords, literals, comments, and semicolons carry their
    /// source text (`"\n"` for synthetic semicolons). At end of input the
    /// scanner keeps returning `Eof`.
    pub fn scan(&mut self) -> (Pos, Token, &'a str) {
        if let Some(tok) = self.pending.take() {
            return tok;
        }

        loop {
            let Some(res) = self.lex.next() else {
                let pos = self.file.pos(self.src.len());
                if self.insert_semi {
                    self.insert_semi = false;
                    return (pos, Token::Semicolon, "\n");
                }
                return (pos, Token::Eof, "");
            };

            let span = self.lex.span();
            let slice = self.lex.slice();
            let pos = self.file.pos(span.start);

            let raw = match res {
                Ok(raw) => raw,
                Err(kind) => {
                    // insert_semi is left as-is so a bad byte inside a
                    // declaration does not swallow the line's semicolon.
                    self.error(span.start, kind.to_string());
                    return (pos, Token::Illegal, slice);
                }
            };

            match raw {
                RawTok::Bom => {
                    if span.start == 0 {
                        continue;
                    }
                    self.error(span.start, "illegal byte order mark");
                    return (pos, Token::Illegal, slice);
                }
                RawTok::Nul => {
                    self.error(span.start, "illegal character NUL");
                    return (pos, Token::Illegal, slice);
                }
                RawTok::Unknown => {
                    let ch = slice.chars().next().unwrap_or('\u{fffd}');
                    self.error(span.start, format!("illegal character {:?}", ch));
                    return (pos, Token::Illegal, slice);
                }

                RawTok::Newline => {
                    self.file.add_line(span.end);
                    if self.insert_semi {
                        self.insert_semi = false;
                        return (pos, Token::Semicolon, "\n");
                    }
                }

                RawTok::LineComment => {
                    if let Some(tok) = self.handle_comment(span.start, slice, true) {
                        return tok;
                    }
                }
                RawTok::BlockComment(terminated) => {
                    if let Some(tok) = self.handle_comment(span.start, slice, terminated) {
                        return tok;
                    }
                }

                RawTok::Ident => {
                    let tok = Token::lookup(slice);
                    self.insert_semi = tok == Token::Ident;
                    return (pos, tok, slice);
                }
                RawTok::AtIdent => {
                    let tok = Token::lookup(slice);
                    self.insert_semi = tok == Token::Ident;
                    return (pos, tok, slice);
                }

                RawTok::Int => {
                    self.insert_semi = true;
                    return (pos, Token::Int, slice);
                }
                RawTok::Float => {
                    self.insert_semi = true;
                    return (pos, Token::Float, slice);
                }
                RawTok::Str => {
                    self.validate_escapes(span.start, slice, b'"');
                    self.insert_semi = true;
                    return (pos, Token::String, slice);
                }
                RawTok::UnterminatedStr => {
                    self.error(span.start, LexErrorKind::UnterminatedString.to_string());
                    self.insert_semi = true;
                    return (pos, Token::String, slice);
                }
                RawTok::RawStr | RawTok::UnterminatedRawStr => {
                    self.register_newlines(span.start, slice);
                    if raw == RawTok::UnterminatedRawStr {
                        self.error(span.start, LexErrorKind::UnterminatedRawString.to_string());
                    }
                    self.insert_semi = true;
                    return (pos, Token::String, slice);
                }
                RawTok::CharLit => {
                    self.validate_char(span.start, slice);
                    self.insert_semi = true;
                    return (pos, Token::Char, slice);
                }
                RawTok::UnterminatedChar => {
                    self.error(span.start, LexErrorKind::UnterminatedChar.to_string());
                    self.insert_semi = true;
                    return (pos, Token::Char, slice);
                }

                RawTok::Semicolon => {
                    self.insert_semi = false;
                    return (pos, Token::Semicolon, ";");
                }

                _ => {
                    let tok = match raw {
                        RawTok::Eql => Token::Eql,
                        RawTok::Assign => Token::Assign,
                        RawTok::Define => Token::Define,
                        RawTok::Colon => Token::Colon,
                        RawTok::Comma => Token::Comma,
                        RawTok::Ellipsis => Token::Ellipsis,
                        RawTok::Period => Token::Period,
                        RawTok::Inc => Token::Inc,
                        RawTok::Add => Token::Add,
                        RawTok::Dec => Token::Dec,
                        RawTok::Sub => Token::Sub,
                        RawTok::Mul => Token::Mul,
                        RawTok::Quo => Token::Quo,
                        RawTok::Rem => Token::Rem,
                        RawTok::Lparen => Token::Lparen,
                        RawTok::Rparen => Token::Rparen,
                        RawTok::Lbrack => Token::Lbrack,
                        RawTok::Rbrack => Token::Rbrack,
                        RawTok::Lbrace => Token::Lbrace,
                        RawTok::Rbrace => Token::Rbrace,
                        _ => unreachable!("handled above"),
                    };
                    self.insert_semi = matches!(
                        tok,
                        Token::Rparen | Token::Rbrack | Token::Rbrace | Token::Inc | Token::Dec
                    );
                    return (pos, tok, "");
                }
            }
        }
    }

    /// Handles a comment token. When a semicolon is due and the comment is
    /// the last non-trivia on its line, the semicolon is returned first (at
    /// the comment's position) and the comment parked in the pending slot.
    /// Returns `None` when the comment is skipped entirely.
    fn handle_comment(
        &mut self,
        offset: usize,
        slice: &'a str,
        terminated: bool,
    ) -> Option<(Pos, Token, &'a str)> {
        self.register_newlines(offset, slice);
        if !terminated {
            self.error(offset, LexErrorKind::UnterminatedComment.to_string());
        }

        let pos = self.file.pos(offset);
        let at_line_end = slice.starts_with("//")
            || memchr(b'\n', slice.as_bytes()).is_some()
            || self.rest_of_line_is_trivia();

        let scan_comments = self.mode.contains(Mode::SCAN_COMMENTS);
        if self.insert_semi && at_line_end {
            self.insert_semi = false;
            if scan_comments {
                self.pending = Some((pos, Token::Comment, slice));
            }
            return Some((pos, Token::Semicolon, "\n"));
        }

        self.insert_semi = false;
        scan_comments.then_some((pos, Token::Comment, slice))
    }

    /// True if only whitespace and comments remain before the next newline
    /// (or EOF). Mirrors the lookahead deciding whether a comment closes its
    /// line for semicolon-insertion purposes.
    fn rest_of_line_is_trivia(&self) -> bool {
        let mut rest = self.lex.remainder().as_bytes();
        loop {
            match rest.first() {
                None | Some(b'\n') => return true,
                Some(b' ' | b'\t' | b'\r') => rest = &rest[1..],
                Some(b'/') if rest.get(1) == Some(&b'/') => return true,
                Some(b'/') if rest.get(1) == Some(&b'*') => {
                    match memmem::find(&rest[2..], b"*/") {
                        Some(i) => {
                            if memchr(b'\n', &rest[2..2 + i]).is_some() {
                                return true;
                            }
                            rest = &rest[2 + i + 2..];
                        }
                        None => return true,
                    }
                }
                _ => return false,
            }
        }
    }

    fn register_newlines(&mut self, offset: usize, slice: &str) {
        for nl in memchr::memchr_iter(b'\n', slice.as_bytes()) {
            self.file.add_line(offset + nl + 1);
        }
    }

    fn validate_escapes(&mut self, offset: usize, slice: &str, quote: u8) {
        let b = slice.as_bytes();
        let end = b.len().saturating_sub(1); // closing quote
        let mut i = 1;
        while i < end {
            if b[i] != b'\\' {
                i += 1;
                continue;
            }
            let esc = i;
            i += 1;
            if i >= end {
                self.error(offset + esc, "escape sequence not terminated");
                return;
            }
            let digits = match b[i] {
                b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\\' => 0,
                c if c == quote => 0,
                b'x' => 2,
                b'u' => 4,
                b'U' => 8,
                b'0'..=b'7' => {
                    // Octal: two more octal digits follow the first.
                    let ok = b.get(i + 1).is_some_and(|c| c.is_ascii_digit() && *c < b'8')
                        && b.get(i + 2).is_some_and(|c| c.is_ascii_digit() && *c < b'8');
                    if !ok {
                        self.error(offset + esc, LexErrorKind::IllegalEscape.to_string());
                        return;
                    }
                    i += 3;
                    continue;
                }
                _ => {
                    self.error(offset + esc, LexErrorKind::UnknownEscape.to_string());
                    i += 1;
                    continue;
                }
            };
            i += 1;
            for _ in 0..digits {
                if !b.get(i).is_some_and(u8::is_ascii_hexdigit) {
                    self.error(offset + esc, LexErrorKind::IllegalEscape.to_string());
                    return;
                }
                i += 1;
            }
        }
    }

    fn validate_char(&mut self, offset: usize, slice: &str) {
        self.validate_escapes(offset, slice, b'\'');
        let body = &slice[1..slice.len() - 1];
        let ok = if body.starts_with('\\') {
            true // shape already checked by validate_escapes
        } else {
            body.chars().count() == 1
        };
        if !ok {
            self.error(offset, LexErrorKind::IllegalChar.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::FileSet;

    fn scan_all(src: &str) -> (Vec<(Token, String)>, ErrorList) {
        let mut fset = FileSet::new();
        let file = fset.add_file("test.api", src.len());
        let mut s = Scanner::new(file, src, Mode::SCAN_COMMENTS);
        let mut out = Vec::new();
        loop {
            let (_, tok, lit) = s.scan();
            if tok == Token::Eof {
                break;
            }
            out.push((tok, lit.to_string()));
        }
        (out, s.take_errors())
    }

    #[test]
    fn keywords_and_annotations() {
        let (toks, errs) = scan_all("service foo-api { @handler ping }");
        assert!(errs.is_empty());
        let kinds: Vec<Token> = toks.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Service,
                Token::Ident,
                Token::Sub,
                Token::Ident,
                Token::Lbrace,
                Token::AtHandler,
                Token::Ident,
                Token::Rbrace,
                Token::Semicolon, // inserted at EOF after '}'
            ]
        );
    }

    #[test]
    fn semicolon_precedes_trailing_comment() {
        let (toks, _) = scan_all("ping // trailing\n");
        let kinds: Vec<Token> = toks.iter().map(|(t, _)| *t).collect();
        assert_eq!(kinds, vec![Token::Ident, Token::Semicolon, Token::Comment]);
        // The synthetic semicolon sits at the comment's position.
    }

    #[test]
    fn unterminated_string_still_yields_token() {
        let (toks, errs) = scan_all("\"abc");
        assert_eq!(toks[0].0, Token::String);
        assert_eq!(errs.len(), 1);
        assert!(errs.iter().next().unwrap().msg.contains("not terminated"));
    }

    #[test]
    fn raw_string_newlines_update_line_table() {
        let mut fset = FileSet::new();
        let src = "`a\nb`\nx";
        let file = fset.add_file("test.api", src.len());
        let mut s = Scanner::new(file, src, Mode::default());
        let (_, tok, _) = s.scan();
        assert_eq!(tok, Token::String);
        let (_, tok, _) = s.scan();
        assert_eq!(tok, Token::Semicolon);
        let (pos, tok, _) = s.scan();
        assert_eq!(tok, Token::Ident);
        assert_eq!(s.file().position(pos).line, 3);
    }

    #[test]
    fn bom_ignored_at_start_only() {
        let (toks, errs) = scan_all("\u{feff}syntax");
        assert_eq!(toks[0].0, Token::Syntax);
        assert!(errs.is_empty());

        let (_, errs) = scan_all("a \u{feff}b");
        assert_eq!(errs.len(), 1);
    }
}

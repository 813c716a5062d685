//! Comment interleaving.
//!
//! Comments are not attached to the nodes being printed; they are drained
//! from the file's flat, position-ordered list whenever the printer is about
//! to emit a token whose position lies beyond the next pending group.

use super::{nlimit, PrintError, Printer, Ws, INFINITY};
use crate::ast::{Comment, CommentGroup};
use crate::token::{Position, Token};

fn is_line_comment(c: &Comment) -> bool {
    c.text.starts_with("//")
}

impl Printer<'_> {
    /// Positions `comment_offset`/`comment_newline` on the next non-empty
    /// pending group, or `INFINITY` when none remain.
    pub(super) fn update_comment_info(&mut self) {
        while self.cindex < self.comments.len() && self.comments[self.cindex].list.is_empty() {
            self.cindex += 1;
        }
        if self.cindex < self.comments.len() {
            let g = &self.comments[self.cindex];
            self.comment_offset = self.file.position(g.pos()).offset;
            self.comment_newline = self.group_spans_lines(g);
        } else {
            self.comment_offset = INFINITY;
        }
    }

    fn group_spans_lines(&self, g: &CommentGroup) -> bool {
        if self.file.line(g.pos()) != self.file.line(g.end()) {
            return true;
        }
        g.list.iter().any(|c| is_line_comment(c) || c.text.contains('\n'))
    }

    /// A pending comment goes before the token at `next` when its offset
    /// precedes it, unless a semicolon is implied and the comment would pull
    /// the line apart.
    pub(super) fn comment_before(&self, next: Position) -> bool {
        self.comment_offset < next.offset && (!self.implied_semi || !self.comment_newline)
    }

    pub(super) fn intersperse_comments(
        &mut self,
        next: Position,
        tok: Token,
    ) -> Result<(bool, bool), PrintError> {
        let mut last: Option<(Position, bool)> = None;
        while self.comment_before(next) {
            let group = self.comments[self.cindex].clone();
            for c in &group.list {
                let pos = self.file.position(c.pos());
                self.write_comment_prefix(pos, next, last.map(|(_, line)| line), tok)?;
                self.write_comment(c);
                last = Some((pos, is_line_comment(c)));
            }
            self.cindex += 1;
            self.update_comment_info();
        }

        let Some((pos, line_comment)) = last else {
            return Err(PrintError::Internal("comment flush without pending comments"));
        };

        // A block comment followed on the same line needs a blank.
        if !line_comment && pos.line == next.line && next.line < INFINITY {
            self.write_byte(b' ', 1);
        }
        // Line comments, EOF, and a closing brace all force a line break.
        let needs_break = line_comment || tok == Token::Rbrace || tok == Token::Eof;
        self.write_comment_suffix(needs_break)
    }

    /// Whitespace between the previous item and a comment.
    fn write_comment_prefix(
        &mut self,
        pos: Position,
        next: Position,
        prev_is_line: Option<bool>,
        tok: Token,
    ) -> Result<(), PrintError> {
        if self.output.is_empty() {
            // The comment is first; no separation needed.
            return Ok(());
        }

        if pos.is_valid() && pos.line == self.last.line && prev_is_line != Some(true) {
            // Trailing comment on the same line: drop pending blanks and
            // separate with a blank, or an alignment cell when the next
            // item is on another line (so trailing comments column up).
            let mut has_sep = false;
            if prev_is_line.is_none() {
                let mut j = 0;
                for i in 0..self.wsbuf.len() {
                    match self.wsbuf[i] {
                        Ws::Blank => {
                            self.wsbuf[i] = Ws::Ignore;
                            continue;
                        }
                        Ws::Vtab => {
                            has_sep = true;
                            continue;
                        }
                        Ws::Indent => continue,
                        _ => {}
                    }
                    j = i;
                    break;
                }
                self.write_whitespace(j)?;
            }
            if !has_sep {
                let sep = if pos.line == next.line { b' ' } else { b'\x0b' };
                self.write_byte(sep, 1);
            }
        } else {
            // Comment on its own line: neutralize pending horizontal
            // whitespace, drop at most one pending line break, and rebuild
            // the separation from source line distances.
            let mut dropped_linebreak = false;
            let mut j = 0;
            for i in 0..self.wsbuf.len() {
                match self.wsbuf[i] {
                    Ws::Blank | Ws::Vtab => {
                        self.wsbuf[i] = Ws::Ignore;
                        continue;
                    }
                    Ws::Indent => continue,
                    Ws::Unindent => {
                        if i + 1 < self.wsbuf.len() && self.wsbuf[i + 1] == Ws::Unindent {
                            continue;
                        }
                        // Keep the unindent pending when the comment is
                        // aligned with the next token rather than the
                        // closing brace.
                        if tok != Token::Rbrace && pos.column == next.column {
                            continue;
                        }
                    }
                    Ws::Newline | Ws::Formfeed => {
                        self.wsbuf[i] = Ws::Ignore;
                        dropped_linebreak = prev_is_line.is_none();
                    }
                    _ => {}
                }
                j = i;
                break;
            }
            self.write_whitespace(j)?;

            let mut n = 0;
            if pos.is_valid() && self.last.is_valid() {
                n = pos.line.saturating_sub(self.last.line);
            }
            // At top level, restore the line break we dropped; this keeps a
            // blank line above documentation comments.
            if self.indent == 0 && dropped_linebreak {
                n += 1;
            }
            if n == 0 && prev_is_line == Some(true) {
                n = 1;
            }
            if n > 0 {
                self.write_byte(b'\x0c', nlimit(n));
            }
        }
        Ok(())
    }

    fn write_comment(&mut self, c: &Comment) {
        let pos = self.file.position(c.pos());
        if is_line_comment(c) {
            self.write_string(pos, c.text.trim_end(), true);
            return;
        }

        // Block comments print line by line so the output tracker stays
        // honest; continuation lines are re-anchored at the current indent,
        // with `*`-led lines shifted one blank to stay under the opener.
        let mut first = true;
        for line in c.text.split('\n') {
            if !first {
                self.write_byte(b'\x0c', 1);
            }
            let body = if first { line.trim_end() } else { line.trim() };
            if !body.is_empty() {
                let cur = self.pos;
                if !first && body.starts_with('*') {
                    self.write_string(cur, &format!(" {body}"), true);
                } else {
                    self.write_string(cur, body, true);
                }
            }
            first = false;
        }
    }

    /// Whitespace after the last interleaved comment: trailing blanks are
    /// dropped, and at most one pending line break survives (exactly one
    /// when `needs_break` demands it).
    fn write_comment_suffix(&mut self, mut needs_break: bool) -> Result<(bool, bool), PrintError> {
        let mut wrote_newline = false;
        let mut dropped_ff = false;
        for i in 0..self.wsbuf.len() {
            match self.wsbuf[i] {
                Ws::Blank | Ws::Vtab => self.wsbuf[i] = Ws::Ignore,
                Ws::Indent | Ws::Unindent => {}
                Ws::Newline | Ws::Formfeed => {
                    if needs_break {
                        needs_break = false;
                        wrote_newline = true;
                    } else {
                        if self.wsbuf[i] == Ws::Formfeed {
                            dropped_ff = true;
                        }
                        self.wsbuf[i] = Ws::Ignore;
                    }
                }
                Ws::Ignore => {}
            }
        }
        let n = self.wsbuf.len();
        self.write_whitespace(n)?;

        if needs_break {
            self.write_byte(b'\n', 1);
            wrote_newline = true;
        }
        Ok((wrote_newline, dropped_ff))
    }
}

//! Automatic semicolon insertion, exercised through the public scanner.

use api_ast::scanner::{Mode, Scanner};
use api_ast::token::{FileSet, Token};

fn scan(src: &str, mode: Mode) -> (Vec<Token>, Vec<String>) {
    let mut fset = FileSet::new();
    let file = fset.add_file("semi.api", src.len());
    let mut s = Scanner::new(file, src, mode);
    let mut toks = Vec::new();
    let mut lits = Vec::new();
    loop {
        let (_, tok, lit) = s.scan();
        if tok == Token::Eof {
            break;
        }
        toks.push(tok);
        lits.push(lit.to_string());
    }
    (toks, lits)
}

struct SemiCase {
    src: &'static str,
    want: &'static [Token],
}

#[test]
fn semicolon_insertion() {
    use Token::*;

    let cases = [
        SemiCase { src: "foo\n", want: &[Ident, Semicolon] },
        // EOF behaves like a final newline.
        SemiCase { src: "foo", want: &[Ident, Semicolon] },
        SemiCase { src: "123", want: &[Int, Semicolon] },
        SemiCase { src: "1.5", want: &[Float, Semicolon] },
        SemiCase { src: "\"s\"", want: &[String, Semicolon] },
        SemiCase { src: "'c'", want: &[Char, Semicolon] },
        SemiCase { src: ")\n", want: &[Rparen, Semicolon] },
        SemiCase { src: "]\n", want: &[Rbrack, Semicolon] },
        SemiCase { src: "}\n", want: &[Rbrace, Semicolon] },
        SemiCase { src: "i++\n", want: &[Ident, Inc, Semicolon] },
        SemiCase { src: "i--\n", want: &[Ident, Dec, Semicolon] },
        // No insertion after operators or keywords that cannot end a line.
        SemiCase { src: "=\n", want: &[Assign] },
        SemiCase { src: ",\n", want: &[Comma] },
        SemiCase { src: "(\n", want: &[Lparen] },
        SemiCase { src: "map\n", want: &[Map] },
        SemiCase { src: "foo;bar", want: &[Ident, Semicolon, Ident, Semicolon] },
        // A blank line inserts at most one semicolon.
        SemiCase { src: "foo\n\nbar", want: &[Ident, Semicolon, Ident, Semicolon] },
    ];

    for c in &cases {
        let (toks, _) = scan(c.src, Mode::default());
        assert_eq!(toks, c.want, "source {:?}", c.src);

        // EOF must behave exactly like a final newline.
        if let Some(stripped) = c.src.strip_suffix('\n') {
            let (toks, _) = scan(stripped, Mode::default());
            assert_eq!(toks, c.want, "source {:?} (newline stripped)", stripped);
        }
    }
}

#[test]
fn comments_do_not_hide_insertion() {
    use Token::*;

    // The semicolon lands before a trailing comment, never after it.
    let (toks, lits) = scan("foo // bar\n", Mode::SCAN_COMMENTS);
    assert_eq!(toks, vec![Ident, Semicolon, Comment]);
    assert_eq!(lits[1], "\n");
    assert_eq!(lits[2], "// bar");

    // Same source with comments skipped.
    let (toks, _) = scan("foo // bar\n", Mode::default());
    assert_eq!(toks, vec![Ident, Semicolon]);

    // A block comment in mid-line neither inserts nor suppresses.
    let (toks, _) = scan("foo /* x */ bar\n", Mode::SCAN_COMMENTS);
    assert_eq!(toks, vec![Ident, Comment, Ident, Semicolon]);

    // A block comment that runs to the line end counts as the line end.
    let (toks, _) = scan("foo /* x */\nbar", Mode::default());
    assert_eq!(toks, vec![Ident, Semicolon, Ident, Semicolon]);

    // A block comment containing a newline counts as a line end even when
    // more tokens follow it, so the semicolon is inserted before it.
    let (toks, _) = scan("foo /* a\nb */ bar\n", Mode::default());
    assert_eq!(toks, vec![Ident, Semicolon, Ident, Semicolon]);
}

#[test]
fn synthetic_semicolons_carry_newline_literal() {
    let (toks, lits) = scan("foo\nbar;", Mode::default());
    assert_eq!(toks, vec![Token::Ident, Token::Semicolon, Token::Ident, Token::Semicolon]);
    assert_eq!(lits, vec!["foo", "\n", "bar", ";"]);
}

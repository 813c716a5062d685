//! Canonical formatting: golden outputs, idempotence, and comment survival.

use api_ast::parser::{self, Mode};
use api_ast::printer;
use api_ast::token::FileSet;

fn format(src: &str) -> String {
    let mut fset = FileSet::new();
    let (file, errors) = parser::parse_file(&mut fset, "test.api", src, Mode::PARSE_COMMENTS);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    let out = printer::format(fset.last().unwrap(), &file).expect("printer failed");
    String::from_utf8(out).expect("formatter produced invalid utf-8")
}

const MESSY: &str = "syntax=\"v1\"
info(
author : \"dylan\"
)
import \"a/b.api\"
type (
User {
Name   string
}
)
service foo-api {
@handler ping
get /ping
}
";

const CANONICAL: &str = "syntax = \"v1\"

info (
	author: \"dylan\"
)

import \"a/b.api\"

type (
	User {
		Name string
	}
)

service foo-api {
	@handler ping
	get /ping
}
";

#[test]
fn canonical_layout() {
    assert_eq!(format(MESSY), CANONICAL);
}

#[test]
fn formatting_is_idempotent() {
    let once = format(MESSY);
    assert_eq!(format(&once), once);

    let greet = "\
syntax = \"v1\"

type Request {
	Name string `path:\"name\"`
	Id   int64
}

service greet-api {
	get /greet/from/:name (Request)
}
";
    let once = format(greet);
    assert_eq!(format(&once), once);
}

#[test]
fn struct_fields_align() {
    let src = "type User {\nName string\nId int64 `json:\"id\"`\nAvatarUrl string\n}\n";
    let want = "\
type User {
	Name      string
	Id        int64 `json:\"id\"`
	AvatarUrl string
}
";
    assert_eq!(format(src), want);
}

#[test]
fn comments_survive_formatting() {
    let src = "\
// User models an account.
type User {
	// internal
	Name string // display name
}
";
    let want = "\
// User models an account.
type User {
	// internal
	Name string // display name
}
";
    assert_eq!(format(src), want);
    assert_eq!(format(want), want);
}

#[test]
fn blank_lines_clamp_to_one() {
    let src = "import \"a.api\"\n\n\n\nimport \"b.api\"\n";
    assert_eq!(format(src), "import \"a.api\"\n\nimport \"b.api\"\n");
}

#[test]
fn struct_keyword_is_dropped() {
    let src = "type User struct {\n\tName string\n}\n";
    assert_eq!(format(src), "type User {\n\tName string\n}\n");
}

fn parse_clean(src: &str) -> api_ast::ast::File {
    let mut fset = FileSet::new();
    let (file, errs) = parser::parse_file(&mut fset, "test.api", src, Mode::default());
    assert!(errs.is_empty(), "unexpected errors: {errs}");
    file
}

/// Renders the tree with every valid `Pos(n)` payload blanked, so trees
/// parsed from differently laid-out sources compare equal when their
/// structure does. `Pos(0)` marks an absent position and stays as is.
fn scrubbed(file: &api_ast::ast::File) -> String {
    let dbg = format!("{file:?}");
    let mut out = String::with_capacity(dbg.len());
    let mut rest = dbg.as_str();
    while let Some(i) = rest.find("Pos(") {
        out.push_str(&rest[..i]);
        rest = &rest[i + 4..];
        let close = rest.find(')').unwrap_or(rest.len());
        if &rest[..close] == "0" {
            out.push_str("Pos(0)");
        } else {
            out.push_str("Pos(_)");
        }
        rest = &rest[close..];
        if let Some(stripped) = rest.strip_prefix(')') {
            rest = stripped;
        }
    }
    out.push_str(rest);
    out
}

#[test]
fn reformatting_preserves_semantics() {
    let routes = "\
service ping-api {
	@handler a
	get /a (Req) returns (Resp)
	@handler b
	get /b returns (Resp)
	@handler c
	get /c (Req) returns
	@handler d
	get /d (Req) (Resp)
	@handler e
	get /e
}
";
    for src in [MESSY, routes] {
        let out = format(src);
        let before = parse_clean(src);
        let after = parse_clean(&out);
        assert_eq!(scrubbed(&before), scrubbed(&after), "source:\n{src}");
    }
}

#[test]
fn empty_file_formats_to_nothing() {
    assert_eq!(format(""), "");
    assert_eq!(format("\n\n"), "");
}

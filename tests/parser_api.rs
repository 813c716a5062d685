//! End-to-end parses of whole source files.

use api_ast::ast::{Decl, Expr, Spec};
use api_ast::errors::ErrorList;
use api_ast::parser::{parse_file, Mode};
use api_ast::token::FileSet;

fn parse(src: &str, mode: Mode) -> (api_ast::ast::File, ErrorList) {
    let mut fset = FileSet::new();
    parse_file(&mut fset, "test.api", src, mode)
}

const GREET: &str = r#"syntax = "v1"

import "base.api"

type Request {
	Name string `path:"name,options=you|me"`
}

type Response {
	Message string `json:"message"`
}

@server (
	group: greet
)
service greet-api {
	@doc "returns a greeting"
	@handler GreetHandler
	get /greet/from/:name (Request) returns (Response)
}
"#;

#[test]
fn greet_service() {
    let (file, errors) = parse(GREET, Mode::default());
    assert!(errors.is_empty(), "unexpected errors: {errors}");

    let syntax = file.syntax.as_ref().expect("syntax clause");
    assert_eq!(syntax.name.value, "\"v1\"");

    assert_eq!(file.decls.len(), 4);
    assert_eq!(file.imports.len(), 1);
    assert_eq!(file.imports[0].path.value, "\"base.api\"");

    let Decl::Gen(req) = &file.decls[1] else { panic!("expected type decl") };
    let Spec::Type(spec) = &req.specs[0] else { panic!("expected type spec") };
    assert_eq!(spec.name.name, "Request");
    let Expr::Struct(st) = &spec.typ else { panic!("expected struct type") };
    assert_eq!(st.fields.list.len(), 1);
    let field = &st.fields.list[0];
    assert_eq!(field.names[0].name, "Name");
    assert_eq!(
        field.tag.as_ref().map(|t| t.value.as_str()),
        Some("`path:\"name,options=you|me\"`")
    );

    let Decl::Service(svc) = &file.decls[3] else { panic!("expected service decl") };
    let at_server = svc.at_server.as_ref().expect("@server block");
    assert_eq!(at_server.kvs.len(), 1);
    assert_eq!(at_server.kvs[0].key.name, "group");

    assert_eq!(svc.api.name.name, "greet-api");
    assert_eq!(svc.api.routes.len(), 1);
    let route = &svc.api.routes[0];
    assert_eq!(route.at_doc.as_ref().unwrap().key.name, "@doc");
    assert_eq!(route.at_handler.as_ref().unwrap().key.name, "@handler");
    assert_eq!(route.route.method.name, "get");
    assert_eq!(route.route.path.name, "/greet/from/:name");
    assert!(route.route.req.is_some());
    assert!(route.route.returns_pos.is_valid());
    assert!(route.route.resp.is_some());
}

#[test]
fn route_request_returns_and_response_are_each_optional() {
    // (method, path, [req], ["returns"], [resp]) in every combination the
    // grammar allows; none of them is an error.
    let cases: &[(&str, bool, bool, bool)] = &[
        ("get /ping", false, false, false),
        ("get /ping (Req)", true, false, false),
        ("get /ping returns", false, true, false),
        ("get /ping returns (Resp)", false, true, true),
        ("get /ping (Req) returns", true, true, false),
        ("get /ping (Req) (Resp)", true, false, true),
        ("get /ping (Req) returns (Resp)", true, true, true),
    ];

    for &(line, want_req, want_returns, want_resp) in cases {
        let src = format!("service ping-api {{\n\t@handler Ping\n\t{line}\n}}\n");
        let (file, errors) = parse(&src, Mode::default());
        assert!(errors.is_empty(), "route {line:?}: unexpected errors: {errors}");

        let Decl::Service(svc) = &file.decls[0] else { panic!("expected service decl") };
        let route = &svc.api.routes[0].route;
        assert_eq!(route.req.is_some(), want_req, "route {line:?}");
        assert_eq!(route.returns_pos.is_valid(), want_returns, "route {line:?}");
        assert_eq!(route.resp.is_some(), want_resp, "route {line:?}");
    }
}

#[test]
fn syntax_clause_is_optional() {
    let (file, errors) = parse("type T {\n\tA int64\n}\n", Mode::default());
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert!(file.syntax.is_none());
    assert_eq!(file.decls.len(), 1);
}

#[test]
fn invalid_import_path_is_reported_but_kept() {
    let (file, errors) = parse("syntax = \"v1\"\n\nimport \"a b.api\"\n", Mode::default());
    assert_eq!(errors.len(), 1);
    let msg = errors.iter().next().unwrap().to_string();
    assert!(msg.contains("invalid import path"), "got {msg:?}");
    // The spec survives so tooling can still see what was written.
    assert_eq!(file.imports.len(), 1);
    assert_eq!(file.imports[0].path.value, "\"a b.api\"");
}

#[test]
fn garbage_produces_bad_decls_not_panics() {
    let (file, errors) = parse(")(][ =\n}{ returns\n", Mode::default());
    assert!(!errors.is_empty());
    assert!(file.decls.iter().any(|d| matches!(d, Decl::Bad(_))));
}

#[test]
fn errors_are_sorted_and_deduplicated() {
    let src = "bogus\n\ntype T {\n\tName unknown! tag\n}\nalso bad\n";
    let (_, errors) = parse(src, Mode::ALL_ERRORS);
    let offsets: Vec<usize> = errors.iter().map(|e| e.pos.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);

    let mut keys: Vec<(usize, String)> =
        errors.iter().map(|e| (e.pos.offset, e.msg.clone())).collect();
    let before = keys.len();
    keys.dedup();
    assert_eq!(keys.len(), before, "duplicate diagnostics survived");
}

#[test]
fn all_errors_mode_reports_at_least_as_much() {
    let src = "type T {\n\tA ! ! !\n\tB ! ! !\n}\n";
    let (_, dflt) = parse(src, Mode::default());
    let (_, all) = parse(src, Mode::ALL_ERRORS);
    assert!(all.len() >= dflt.len());
    assert!(!dflt.is_empty());
}

#[test]
fn comments_attach_when_requested() {
    let src = "// doc\ntype T {\n\tA int64 // trailing\n}\n";
    let (file, errors) = parse(src, Mode::PARSE_COMMENTS);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(file.comments.len(), 2);
    assert!(file.doc.is_some());

    // Without the flag the tree stays comment-free.
    let (file, _) = parse(src, Mode::default());
    assert!(file.comments.is_empty());
    assert!(file.doc.is_none());
}

mod termination {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Recovery must terminate and hand back a file for any input.
        #[test]
        fn parser_always_returns(src in "\\PC{0,120}") {
            let _ = parse(&src, Mode::default());
        }

        #[test]
        fn parser_always_returns_with_all_errors(src in "[a-z@(){}\\-/:= \n\"`]{0,120}") {
            let _ = parse(&src, Mode::ALL_ERRORS);
        }
    }
}

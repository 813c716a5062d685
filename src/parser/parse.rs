//! Grammar productions.
//!
//! One method per production, top-down. Every method leaves the parser on
//! the token after its construct, reporting and recovering along the way.

use super::{is_decl_start, is_expr_end, Parser, PResult};
use crate::ast::*;
use crate::token::{Token, NO_POS};

impl<'a> Parser<'a> {
    pub(super) fn parse_source_file(&mut self) -> PResult<File> {
        self.trace("File");

        // Scanning the first token may already have failed; don't bother.
        if self.total_errors() > 0 {
            return Err(super::Bailout);
        }

        let doc = self.lead_comment;
        let syntax = if self.tok == Token::Syntax {
            Some(self.parse_syntax()?)
        } else {
            None
        };

        let mut decls = Vec::new();
        while self.tok != Token::Eof {
            decls.push(self.parse_decl()?);
        }

        Ok(File {
            doc,
            syntax,
            decls,
            imports: std::mem::take(&mut self.imports),
            comments: std::mem::take(&mut self.comments),
        })
    }

    fn parse_syntax(&mut self) -> PResult<SyntaxSpec> {
        self.trace("Syntax");
        let tok_pos = self.expect(Token::Syntax)?;
        let assign = self.expect(Token::Assign)?;
        let name = if self.tok == Token::String {
            let lit = BasicLit {
                value_pos: self.pos,
                kind: Token::String,
                value: self.lit.to_string(),
            };
            self.next();
            lit
        } else {
            let pos = self.pos;
            self.expect(Token::String)?;
            BasicLit { value_pos: pos, kind: Token::String, value: String::new() }
        };
        self.expect_semi()?;
        Ok(SyntaxSpec { tok_pos, assign, name })
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        self.trace("Declaration");
        match self.tok {
            Token::Import | Token::Type => Ok(Decl::Gen(self.parse_gen_decl(self.tok)?)),
            Token::Info => Ok(Decl::Info(self.parse_info()?)),
            Token::AtServer | Token::Service => Ok(Decl::Service(self.parse_service()?)),
            _ => {
                let pos = self.pos;
                self.error_expected(pos, "declaration")?;
                self.advance(is_decl_start);
                Ok(Decl::Bad(BadDecl { from: pos, to: self.pos }))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Import and type declarations

    fn parse_gen_decl(&mut self, keyword: Token) -> PResult<GenDecl> {
        self.trace("GenDecl");
        let doc = self.lead_comment;
        let tok_pos = self.expect(keyword)?;

        let mut lparen = NO_POS;
        let mut rparen = NO_POS;
        let mut specs = Vec::new();
        if self.tok == Token::Lparen {
            lparen = self.pos;
            self.next();
            while self.tok != Token::Rparen && self.tok != Token::Eof {
                let spec_doc = self.lead_comment;
                specs.push(self.parse_spec(keyword, spec_doc)?);
            }
            rparen = self.expect(Token::Rparen)?;
            self.expect_semi()?;
        } else {
            specs.push(self.parse_spec(keyword, doc)?);
        }

        Ok(GenDecl { doc, tok_pos, tok: keyword, lparen, specs, rparen })
    }

    fn parse_spec(&mut self, keyword: Token, doc: Option<CommentId>) -> PResult<Spec> {
        match keyword {
            Token::Import => self.parse_import_spec(doc),
            _ => self.parse_type_spec(doc),
        }
    }

    fn parse_import_spec(&mut self, doc: Option<CommentId>) -> PResult<Spec> {
        self.trace("ImportSpec");
        let pos = self.pos;
        let mut path = String::new();
        if self.tok == Token::String {
            path = self.lit.to_string();
            if !is_valid_import(&path) {
                self.error(pos, format!("invalid import path: {path}"))?;
            }
            self.next();
        } else {
            self.expect(Token::String)?;
        }
        self.expect_semi()?;

        let spec = ImportSpec {
            doc,
            path: BasicLit { value_pos: pos, kind: Token::String, value: path },
            comment: self.line_comment,
            end_pos: NO_POS,
        };
        self.imports.push(spec.clone());
        Ok(Spec::Import(spec))
    }

    fn parse_type_spec(&mut self, doc: Option<CommentId>) -> PResult<Spec> {
        self.trace("TypeSpec");
        let name = self.parse_ident()?;
        let typ = self.parse_type()?;
        self.expect_semi()?;
        Ok(Spec::Type(TypeSpec { doc, name, typ, comment: self.line_comment }))
    }

    // ------------------------------------------------------------------------
    // Identifiers

    fn parse_ident(&mut self) -> PResult<Ident> {
        let pos = self.pos;
        let name = if self.tok == Token::Ident {
            let name = self.lit.to_string();
            self.next();
            name
        } else {
            self.expect(Token::Ident)?;
            "_".to_string()
        };
        Ok(Ident::new(pos, name))
    }

    /// Parses the extended identifiers of the api language: plain names,
    /// annotation keywords used as keys, dash-joined names (`foo-api`), and
    /// route paths (`/greet/from/:name`).
    fn parse_api_ident(&mut self) -> PResult<Ident> {
        let pos = self.pos;
        let mut name = String::from("_");
        match self.tok {
            Token::Ident | Token::AtDoc | Token::AtHandler | Token::AtServer => {
                name = self.lit.to_string();
                self.next();
                while self.tok == Token::Sub {
                    name.push('-');
                    self.next();
                    if self.tok == Token::Ident {
                        name.push_str(self.lit);
                        self.next();
                    } else {
                        self.expect(Token::Ident)?;
                    }
                }
            }
            Token::Quo | Token::Colon => {
                name.clear();
                loop {
                    let mut ident_seen = false;
                    match self.tok {
                        Token::Quo => name.push('/'),
                        Token::Colon => name.push(':'),
                        Token::Sub => name.push('-'),
                        Token::Ident => {
                            name.push_str(self.lit);
                            ident_seen = true;
                        }
                        _ => break,
                    }
                    self.next();
                    if ident_seen
                        && !matches!(self.tok, Token::Quo | Token::Colon | Token::Sub)
                    {
                        break;
                    }
                }
            }
            _ => {
                self.expect(Token::Ident)?;
            }
        }
        Ok(Ident::new(pos, name))
    }

    // ------------------------------------------------------------------------
    // Types

    fn parse_type(&mut self) -> PResult<Expr> {
        self.trace("Type");
        match self.try_ident_or_type()? {
            Some(typ) => Ok(typ),
            None => {
                let pos = self.pos;
                self.error_expected(pos, "type")?;
                self.advance(is_expr_end);
                Ok(Expr::Bad(BadExpr { from: pos, to: self.pos }))
            }
        }
    }

    fn try_ident_or_type(&mut self) -> PResult<Option<Expr>> {
        match self.tok {
            Token::Ident => Ok(Some(self.parse_type_name()?)),
            Token::Lbrack => Ok(Some(self.parse_array_type()?)),
            Token::Struct | Token::Lbrace => Ok(Some(self.parse_struct_type()?)),
            Token::Mul => Ok(Some(self.parse_pointer_type()?)),
            Token::Map => Ok(Some(self.parse_map_type()?)),
            Token::Lparen => {
                let lparen = self.pos;
                self.next();
                let typ = self.parse_type()?;
                let rparen = self.expect(Token::Rparen)?;
                Ok(Some(Expr::Paren(ParenExpr { lparen, x: Box::new(typ), rparen })))
            }
            _ => Ok(None),
        }
    }

    fn parse_type_name(&mut self) -> PResult<Expr> {
        let ident = self.parse_ident()?;
        if self.tok == Token::Period {
            self.next();
            let sel = self.parse_ident()?;
            return Ok(Expr::Selector(SelectorExpr { x: Box::new(Expr::Ident(ident)), sel }));
        }
        Ok(Expr::Ident(ident))
    }

    fn parse_array_type(&mut self) -> PResult<Expr> {
        let lbrack = self.expect(Token::Lbrack)?;
        self.expect(Token::Rbrack)?;
        let elt = self.parse_type()?;
        Ok(Expr::Array(ArrayType { lbrack, elt: Box::new(elt) }))
    }

    fn parse_pointer_type(&mut self) -> PResult<Expr> {
        let star = self.expect(Token::Mul)?;
        let x = self.parse_type()?;
        Ok(Expr::Star(StarExpr { star, x: Box::new(x) }))
    }

    fn parse_map_type(&mut self) -> PResult<Expr> {
        let map_pos = self.expect(Token::Map)?;
        self.expect(Token::Lbrack)?;
        let key = self.parse_type()?;
        self.expect(Token::Rbrack)?;
        let value = self.parse_type()?;
        Ok(Expr::Map(MapType { map_pos, key: Box::new(key), value: Box::new(value) }))
    }

    /// The `struct` keyword is optional: both `type User struct { ... }` and
    /// `type User { ... }` are accepted.
    fn parse_struct_type(&mut self) -> PResult<Expr> {
        self.trace("StructType");
        let struct_pos = if self.tok == Token::Struct {
            let pos = self.pos;
            self.next();
            pos
        } else {
            NO_POS
        };
        let lbrace = self.expect(Token::Lbrace)?;
        let mut list = Vec::new();
        while matches!(self.tok, Token::Ident | Token::Mul | Token::Lparen) {
            list.push(self.parse_field_decl()?);
        }
        let rbrace = self.expect(Token::Rbrace)?;
        Ok(Expr::Struct(StructType {
            struct_pos,
            fields: FieldList { opening: lbrace, list, closing: rbrace },
        }))
    }

    fn parse_field_decl(&mut self) -> PResult<Field> {
        self.trace("FieldDecl");
        let doc = self.lead_comment;

        let mut names = Vec::new();
        let typ;
        if self.tok == Token::Ident {
            let name = self.parse_ident()?;
            if matches!(self.tok, Token::Period | Token::String | Token::Semicolon | Token::Rbrace)
            {
                // Embedded type, possibly qualified.
                let mut x = Expr::Ident(name);
                if self.tok == Token::Period {
                    self.next();
                    let sel = self.parse_ident()?;
                    x = Expr::Selector(SelectorExpr { x: Box::new(x), sel });
                }
                typ = x;
            } else {
                names.push(name);
                while self.tok == Token::Comma {
                    self.next();
                    names.push(self.parse_ident()?);
                }
                typ = self.parse_type()?;
            }
        } else {
            // Embedded type, possibly a pointer.
            typ = self.parse_type()?;
        }

        let tag = if self.tok == Token::String {
            let tag = BasicLit {
                value_pos: self.pos,
                kind: Token::String,
                value: self.lit.to_string(),
            };
            self.next();
            Some(tag)
        } else {
            None
        };

        self.expect_semi()?;
        Ok(Field { doc, names, typ, tag, comment: self.line_comment })
    }

    // ------------------------------------------------------------------------
    // Info blocks

    fn parse_info(&mut self) -> PResult<InfoType> {
        self.trace("Info");
        let tok_pos = self.expect(Token::Info)?;
        let lparen = self.expect(Token::Lparen)?;
        let kvs = self.parse_element_list(true)?;
        let rparen = self.expect(Token::Rparen)?;
        self.expect_semi()?;
        Ok(InfoType { tok_pos, lparen, kvs, rparen })
    }

    fn parse_element_list(&mut self, expect_colon: bool) -> PResult<Vec<KeyValueExpr>> {
        let mut kvs = Vec::new();
        while self.tok != Token::Rparen && self.tok != Token::Eof {
            kvs.push(self.parse_element(expect_colon)?);
        }
        Ok(kvs)
    }

    /// `key: value` (or `key value` when `expect_colon` is false, as in
    /// `@handler ping`). Values are literals or api identifiers.
    fn parse_element(&mut self, expect_colon: bool) -> PResult<KeyValueExpr> {
        self.trace("Element");
        let key = self.parse_api_ident()?;
        let colon = if expect_colon {
            self.expect(Token::Colon)?
        } else if self.tok == Token::Colon {
            let pos = self.pos;
            self.next();
            pos
        } else {
            NO_POS
        };

        let value = match self.tok {
            Token::String | Token::Int | Token::Float | Token::Char => {
                let lit = BasicLit {
                    value_pos: self.pos,
                    kind: self.tok,
                    value: self.lit.to_string(),
                };
                self.next();
                Expr::BasicLit(lit)
            }
            _ => Expr::Ident(self.parse_api_ident()?),
        };
        self.expect_semi()?;
        Ok(KeyValueExpr { key, colon, value })
    }

    // ------------------------------------------------------------------------
    // Services

    fn parse_service(&mut self) -> PResult<Service> {
        self.trace("Service");
        let at_server = if self.tok == Token::AtServer {
            Some(self.parse_at_server()?)
        } else {
            None
        };
        let api = self.parse_service_api()?;
        Ok(Service { at_server, api })
    }

    fn parse_at_server(&mut self) -> PResult<AtServer> {
        self.trace("AtServer");
        let tok_pos = self.expect(Token::AtServer)?;
        let lparen = self.expect(Token::Lparen)?;
        let kvs = self.parse_element_list(true)?;
        let rparen = self.expect(Token::Rparen)?;
        self.expect_semi()?;
        Ok(AtServer { tok_pos, lparen, kvs, rparen })
    }

    fn parse_service_api(&mut self) -> PResult<ServiceApi> {
        self.trace("ServiceApi");
        let tok_pos = self.expect(Token::Service)?;
        let name = self.parse_api_ident()?;
        let lbrace = self.expect(Token::Lbrace)?;
        let mut routes = Vec::new();
        while self.tok != Token::Rbrace && self.tok != Token::Eof {
            routes.push(self.parse_service_route()?);
        }
        let rbrace = self.expect(Token::Rbrace)?;
        self.expect_semi()?;
        Ok(ServiceApi { tok_pos, name, lbrace, routes, rbrace })
    }

    fn parse_service_route(&mut self) -> PResult<ServiceRoute> {
        self.trace("ServiceRoute");
        let tok_pos = self.pos;
        let mut at_doc = None;
        let mut at_handler = None;
        while matches!(self.tok, Token::AtDoc | Token::AtHandler) {
            let kind = self.tok;
            let kv = self.parse_element(false)?;
            if kind == Token::AtDoc {
                at_doc = Some(kv);
            } else {
                at_handler = Some(kv);
            }
        }
        let route = self.parse_route()?;
        Ok(ServiceRoute { tok_pos, at_doc, at_handler, route })
    }

    fn parse_route(&mut self) -> PResult<Route> {
        self.trace("Route");
        let method = self.parse_ident()?;
        let path = self.parse_api_ident()?;

        let req = if self.tok == Token::Lparen {
            Some(self.parse_paren_type()?)
        } else {
            None
        };

        let returns_pos = if self.tok == Token::Returns {
            let pos = self.pos;
            self.next();
            pos
        } else {
            NO_POS
        };

        // `returns` and the response type are each optional on their own:
        // `get /p (Req) (Resp)` and `get /p (Req) returns` are both valid.
        let resp = if self.tok == Token::Lparen {
            Some(self.parse_paren_type()?)
        } else {
            None
        };

        self.expect_semi()?;
        Ok(Route { method, path, req, returns_pos, resp })
    }

    fn parse_paren_type(&mut self) -> PResult<ParenExpr> {
        let lparen = self.expect(Token::Lparen)?;
        let x = self.parse_type()?;
        let rparen = self.expect(Token::Rparen)?;
        Ok(ParenExpr { lparen, x: Box::new(x), rparen })
    }
}

// ----------------------------------------------------------------------------

/// Decodes a quoted path literal, handling only the escapes a path could
/// reasonably contain. Anything fancier rejects the path.
fn unquote(lit: &str) -> Option<String> {
    if lit.len() >= 2 && lit.starts_with('`') && lit.ends_with('`') {
        return Some(lit[1..lit.len() - 1].to_string());
    }
    if lit.len() >= 2 && lit.starts_with('"') && lit.ends_with('"') {
        let body = &lit[1..lit.len() - 1];
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                _ => return None,
            }
        }
        return Some(out);
    }
    None
}

/// An import path must be a non-empty string of graphic, non-space
/// characters outside the excluded set.
fn is_valid_import(lit: &str) -> bool {
    const ILLEGAL: &str = "!\"#$%&'()*,:;<=>?[\\]^{|}`\u{fffd}";
    match unquote(lit) {
        Some(path) if !path.is_empty() => path
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && !ILLEGAL.contains(c)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_path_validity() {
        assert!(is_valid_import("\"a/b.api\""));
        assert!(is_valid_import("\"user.api\""));
        assert!(!is_valid_import("\"a b.api\""));
        assert!(!is_valid_import("\"\""));
        assert!(!is_valid_import("\"a;b\""));
        assert!(!is_valid_import("not-quoted"));
    }
}

//! Node formatting: the canonical shape of each construct.

use super::{PrintError, Printer, Ws};
use crate::ast::*;
use crate::token::{Token, NO_POS};

fn decl_token(d: &Decl) -> Token {
    match d {
        Decl::Bad(_) => Token::Illegal,
        Decl::Gen(g) => g.tok,
        Decl::Info(_) => Token::Info,
        Decl::Service(_) => Token::Service,
    }
}

fn decl_doc(d: &Decl) -> Option<CommentId> {
    match d {
        Decl::Gen(g) => g.doc,
        _ => None,
    }
}

impl Printer<'_> {
    pub(super) fn file(&mut self, f: &File) -> Result<(), PrintError> {
        if let Some(s) = &f.syntax {
            self.syntax_spec(s)?;
        }
        self.decl_list(&f.decls, f.syntax.is_some())?;
        if f.syntax.is_some() || !f.decls.is_empty() {
            self.ws(Ws::Newline);
        }
        Ok(())
    }

    fn syntax_spec(&mut self, s: &SyntaxSpec) -> Result<(), PrintError> {
        self.token(s.tok_pos, Token::Syntax)?;
        self.ws(Ws::Blank);
        self.token(s.assign, Token::Assign)?;
        self.ws(Ws::Blank);
        self.lit(&s.name)
    }

    /// Declarations are separated by a blank line when the declaration kind
    /// changes or the next one carries a doc comment; otherwise source blank
    /// lines are preserved (at most one).
    fn decl_list(&mut self, decls: &[Decl], mut printed: bool) -> Result<(), PrintError> {
        let mut prev = Token::Illegal;
        for d in decls {
            let tok = decl_token(d);
            if printed {
                let min = if prev != tok || decl_doc(d).is_some() { 2 } else { 1 };
                let line = self.line_for(d.pos());
                self.linebreak(line, min, Ws::Ignore, false);
            }
            self.decl(d)?;
            prev = tok;
            printed = true;
        }
        Ok(())
    }

    fn decl(&mut self, d: &Decl) -> Result<(), PrintError> {
        match d {
            Decl::Bad(b) => {
                self.set_pos(b.from);
                self.word("BadDecl", Token::Illegal, false)
            }
            Decl::Gen(g) => self.gen_decl(g),
            Decl::Info(i) => self.info_decl(i),
            Decl::Service(s) => self.service_decl(s),
        }
    }

    // ------------------------------------------------------------------------
    // Import and type declarations

    fn gen_decl(&mut self, d: &GenDecl) -> Result<(), PrintError> {
        self.token(d.tok_pos, d.tok)?;
        if d.lparen.is_valid() || d.specs.len() > 1 {
            self.ws(Ws::Blank);
            self.token(d.lparen, Token::Lparen)?;
            if !d.specs.is_empty() {
                self.ws(Ws::Indent);
                self.ws(Ws::Formfeed);
                for (i, s) in d.specs.iter().enumerate() {
                    if i > 0 {
                        let line = self.line_for(s.pos());
                        self.linebreak(line, 1, Ws::Ignore, false);
                    }
                    self.spec(s, d.specs.len())?;
                }
                self.ws(Ws::Unindent);
                self.ws(Ws::Formfeed);
            }
            self.token(d.rparen, Token::Rparen)?;
        } else if let Some(s) = d.specs.first() {
            self.ws(Ws::Blank);
            self.spec(s, 1)?;
        }
        Ok(())
    }

    fn spec(&mut self, s: &Spec, n: usize) -> Result<(), PrintError> {
        match s {
            Spec::Import(i) => self.lit(&i.path),
            Spec::Type(t) => {
                self.ident(&t.name)?;
                self.ws(if n == 1 { Ws::Blank } else { Ws::Vtab });
                self.expr(&t.typ)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Types

    fn expr(&mut self, x: &Expr) -> Result<(), PrintError> {
        match x {
            Expr::Bad(b) => {
                self.set_pos(b.from);
                self.word("BadExpr", Token::Illegal, false)
            }
            Expr::Ident(id) => self.ident(id),
            Expr::BasicLit(l) => self.lit(l),
            Expr::Selector(s) => {
                self.expr(&s.x)?;
                self.token(NO_POS, Token::Period)?;
                self.ident(&s.sel)
            }
            Expr::Star(s) => {
                self.token(s.star, Token::Mul)?;
                self.expr(&s.x)
            }
            Expr::Paren(p) => self.paren_expr(p),
            Expr::Array(a) => {
                self.token(a.lbrack, Token::Lbrack)?;
                self.token(NO_POS, Token::Rbrack)?;
                self.expr(&a.elt)
            }
            Expr::Map(m) => {
                self.token(m.map_pos, Token::Map)?;
                self.token(NO_POS, Token::Lbrack)?;
                self.expr(&m.key)?;
                self.token(NO_POS, Token::Rbrack)?;
                self.expr(&m.value)
            }
            Expr::Struct(s) => self.struct_type(s),
        }
    }

    fn paren_expr(&mut self, p: &ParenExpr) -> Result<(), PrintError> {
        self.token(p.lparen, Token::Lparen)?;
        self.expr(&p.x)?;
        self.token(p.rparen, Token::Rparen)
    }

    /// The optional `struct` keyword is dropped in canonical form.
    fn struct_type(&mut self, s: &StructType) -> Result<(), PrintError> {
        self.token(s.fields.opening, Token::Lbrace)?;
        if s.fields.list.is_empty() {
            return self.token(s.fields.closing, Token::Rbrace);
        }
        self.ws(Ws::Indent);
        for f in &s.fields.list {
            let line = self.line_for(f.pos());
            self.linebreak(line, 1, Ws::Ignore, false);
            self.field(f)?;
        }
        self.ws(Ws::Unindent);
        self.ws(Ws::Formfeed);
        self.token(s.fields.closing, Token::Rbrace)
    }

    fn field(&mut self, f: &Field) -> Result<(), PrintError> {
        for (i, name) in f.names.iter().enumerate() {
            if i > 0 {
                self.token(NO_POS, Token::Comma)?;
                self.ws(Ws::Blank);
            }
            self.ident(name)?;
        }
        if !f.names.is_empty() {
            self.ws(Ws::Vtab);
        }
        self.expr(&f.typ)?;
        if let Some(tag) = &f.tag {
            self.ws(Ws::Vtab);
            self.lit(tag)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Info blocks

    fn info_decl(&mut self, d: &InfoType) -> Result<(), PrintError> {
        self.token(d.tok_pos, Token::Info)?;
        self.ws(Ws::Blank);
        self.token(d.lparen, Token::Lparen)?;
        self.kv_block(&d.kvs)?;
        self.token(d.rparen, Token::Rparen)
    }

    fn kv_block(&mut self, kvs: &[KeyValueExpr]) -> Result<(), PrintError> {
        if kvs.is_empty() {
            return Ok(());
        }
        self.ws(Ws::Indent);
        self.ws(Ws::Formfeed);
        for (i, kv) in kvs.iter().enumerate() {
            if i > 0 {
                let line = self.line_for(kv.pos());
                self.linebreak(line, 1, Ws::Ignore, false);
            }
            self.key_value(kv, true)?;
        }
        self.ws(Ws::Unindent);
        self.ws(Ws::Formfeed);
        Ok(())
    }

    /// `key:` + aligned value in block form, `key value` in annotation form
    /// (keeping an explicit colon when the source had one).
    fn key_value(&mut self, kv: &KeyValueExpr, aligned: bool) -> Result<(), PrintError> {
        self.ident(&kv.key)?;
        if aligned || kv.colon.is_valid() {
            self.token(kv.colon, Token::Colon)?;
        }
        self.ws(if aligned { Ws::Vtab } else { Ws::Blank });
        self.expr(&kv.value)
    }

    // ------------------------------------------------------------------------
    // Services

    fn service_decl(&mut self, s: &Service) -> Result<(), PrintError> {
        if let Some(at) = &s.at_server {
            self.token(at.tok_pos, Token::AtServer)?;
            self.ws(Ws::Blank);
            self.token(at.lparen, Token::Lparen)?;
            self.kv_block(&at.kvs)?;
            self.token(at.rparen, Token::Rparen)?;
            let line = self.line_for(s.api.pos());
            self.linebreak(line, 1, Ws::Ignore, false);
        }

        let api = &s.api;
        self.token(api.tok_pos, Token::Service)?;
        self.ws(Ws::Blank);
        self.ident(&api.name)?;
        self.ws(Ws::Blank);
        self.token(api.lbrace, Token::Lbrace)?;
        if api.routes.is_empty() {
            return self.token(api.rbrace, Token::Rbrace);
        }
        self.ws(Ws::Indent);
        for r in &api.routes {
            let line = self.line_for(r.pos());
            self.linebreak(line, 1, Ws::Ignore, false);
            self.service_route(r)?;
        }
        self.ws(Ws::Unindent);
        self.ws(Ws::Formfeed);
        self.token(api.rbrace, Token::Rbrace)
    }

    fn service_route(&mut self, r: &ServiceRoute) -> Result<(), PrintError> {
        if let Some(doc) = &r.at_doc {
            self.key_value(doc, false)?;
            let next = r.at_handler.as_ref().map_or(r.route.pos(), KeyValueExpr::pos);
            let line = self.line_for(next);
            self.linebreak(line, 1, Ws::Ignore, false);
        }
        if let Some(handler) = &r.at_handler {
            self.key_value(handler, false)?;
            let line = self.line_for(r.route.pos());
            self.linebreak(line, 1, Ws::Ignore, false);
        }
        self.route(&r.route)
    }

    fn route(&mut self, r: &Route) -> Result<(), PrintError> {
        self.ident(&r.method)?;
        self.ws(Ws::Blank);
        self.ident(&r.path)?;
        if let Some(req) = &r.req {
            self.ws(Ws::Blank);
            self.paren_expr(req)?;
        }
        if r.returns_pos.is_valid() {
            self.ws(Ws::Blank);
            self.token(r.returns_pos, Token::Returns)?;
        }
        if let Some(resp) = &r.resp {
            self.ws(Ws::Blank);
            self.paren_expr(resp)?;
        }
        Ok(())
    }
}

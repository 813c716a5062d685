//! Syntax tree for api source files.
//!
//! Every node answers `pos()` and `end()`: the position of its first
//! character and the position one past its last. Malformed regions are
//! represented by `Bad*` placeholder nodes spanning the skipped source so a
//! partial tree still covers the whole file.
//!
//! Comments live in the flat, source-ordered `File::comments` list; nodes
//! refer to their doc and trailing comments by index into that list.

use crate::token::{Pos, Token, NO_POS};

/// Index of a `CommentGroup` in `File::comments`.
pub type CommentId = usize;

/// A single `//` or `/* */` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub slash: Pos,
    pub text: String,
}

impl Comment {
    pub fn pos(&self) -> Pos {
        self.slash
    }

    pub fn end(&self) -> Pos {
        Pos(self.slash.0 + self.text.len() as u32)
    }
}

/// A run of comments with no other tokens and at most one empty line
/// between them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentGroup {
    pub list: Vec<Comment>,
}

impl CommentGroup {
    pub fn pos(&self) -> Pos {
        self.list.first().map_or(NO_POS, Comment::pos)
    }

    pub fn end(&self) -> Pos {
        self.list.last().map_or(NO_POS, Comment::end)
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name_pos: Pos,
    pub name: String,
}

impl Ident {
    pub fn new(name_pos: Pos, name: impl Into<String>) -> Ident {
        Ident { name_pos, name: name.into() }
    }

    pub fn pos(&self) -> Pos {
        self.name_pos
    }

    pub fn end(&self) -> Pos {
        Pos(self.name_pos.0 + self.name.len() as u32)
    }
}

/// A literal token: string, int, float, or char.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub value_pos: Pos,
    pub kind: Token,
    pub value: String,
}

impl BasicLit {
    pub fn pos(&self) -> Pos {
        self.value_pos
    }

    pub fn end(&self) -> Pos {
        Pos(self.value_pos.0 + self.value.len() as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpr {
    pub x: Box<Expr>,
    pub sel: Ident,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarExpr {
    pub star: Pos,
    pub x: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParenExpr {
    pub lparen: Pos,
    pub x: Box<Expr>,
    pub rparen: Pos,
}

impl ParenExpr {
    pub fn pos(&self) -> Pos {
        self.lparen
    }

    pub fn end(&self) -> Pos {
        Pos(self.rparen.0 + 1)
    }
}

/// Slice type `[]T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub lbrack: Pos,
    pub elt: Box<Expr>,
}

/// `map[K]V`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapType {
    pub map_pos: Pos,
    pub key: Box<Expr>,
    pub value: Box<Expr>,
}

/// A struct body. `struct_pos` is valid only when the optional `struct`
/// keyword appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub struct_pos: Pos,
    pub fields: FieldList,
}

/// Placeholder spanning source that could not be parsed as an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadExpr {
    pub from: Pos,
    pub to: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Bad(BadExpr),
    Ident(Ident),
    BasicLit(BasicLit),
    Selector(SelectorExpr),
    Star(StarExpr),
    Paren(ParenExpr),
    Array(ArrayType),
    Map(MapType),
    Struct(StructType),
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Bad(x) => x.from,
            Expr::Ident(x) => x.pos(),
            Expr::BasicLit(x) => x.pos(),
            Expr::Selector(x) => x.x.pos(),
            Expr::Star(x) => x.star,
            Expr::Paren(x) => x.lparen,
            Expr::Array(x) => x.lbrack,
            Expr::Map(x) => x.map_pos,
            Expr::Struct(x) => {
                if x.struct_pos.is_valid() {
                    x.struct_pos
                } else {
                    x.fields.pos()
                }
            }
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Expr::Bad(x) => x.to,
            Expr::Ident(x) => x.end(),
            Expr::BasicLit(x) => x.end(),
            Expr::Selector(x) => x.sel.end(),
            Expr::Star(x) => x.x.end(),
            Expr::Paren(x) => Pos(x.rparen.0 + 1),
            Expr::Array(x) => x.elt.end(),
            Expr::Map(x) => x.value.end(),
            Expr::Struct(x) => x.fields.end(),
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

/// A field declaration inside a struct: named (`Name Type tag?`) or
/// embedded (`Type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub doc: Option<CommentId>,
    pub names: Vec<Ident>,
    pub typ: Expr,
    pub tag: Option<BasicLit>,
    pub comment: Option<CommentId>,
}

impl Field {
    pub fn pos(&self) -> Pos {
        match self.names.first() {
            Some(name) => name.pos(),
            None => self.typ.pos(),
        }
    }

    pub fn end(&self) -> Pos {
        match &self.tag {
            Some(tag) => tag.end(),
            None => self.typ.end(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList {
    pub opening: Pos,
    pub list: Vec<Field>,
    pub closing: Pos,
}

impl FieldList {
    pub fn pos(&self) -> Pos {
        if self.opening.is_valid() {
            self.opening
        } else {
            self.list.first().map_or(NO_POS, Field::pos)
        }
    }

    pub fn end(&self) -> Pos {
        if self.closing.is_valid() {
            Pos(self.closing.0 + 1)
        } else {
            self.list.last().map_or(NO_POS, Field::end)
        }
    }
}

// ============================================================================
// Specs and declarations
// ============================================================================

/// `syntax = "v1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxSpec {
    pub tok_pos: Pos,
    pub assign: Pos,
    pub name: BasicLit,
}

impl SyntaxSpec {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        self.name.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub doc: Option<CommentId>,
    pub path: BasicLit,
    pub comment: Option<CommentId>,
    /// End of the spec (used when the path literal is malformed).
    pub end_pos: Pos,
}

impl ImportSpec {
    pub fn pos(&self) -> Pos {
        self.path.pos()
    }

    pub fn end(&self) -> Pos {
        if self.end_pos.is_valid() {
            self.end_pos
        } else {
            self.path.end()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub doc: Option<CommentId>,
    pub name: Ident,
    pub typ: Expr,
    pub comment: Option<CommentId>,
}

impl TypeSpec {
    pub fn pos(&self) -> Pos {
        self.name.pos()
    }

    pub fn end(&self) -> Pos {
        self.typ.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Import(ImportSpec),
    Type(TypeSpec),
}

impl Spec {
    pub fn pos(&self) -> Pos {
        match self {
            Spec::Import(s) => s.pos(),
            Spec::Type(s) => s.pos(),
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Spec::Import(s) => s.end(),
            Spec::Type(s) => s.end(),
        }
    }
}

/// An `import` or `type` declaration, possibly a parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenDecl {
    pub doc: Option<CommentId>,
    pub tok_pos: Pos,
    pub tok: Token,
    pub lparen: Pos,
    pub specs: Vec<Spec>,
    pub rparen: Pos,
}

impl GenDecl {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        if self.rparen.is_valid() {
            Pos(self.rparen.0 + 1)
        } else {
            self.specs.first().map_or(self.tok_pos, Spec::end)
        }
    }
}

/// `key: value` inside `info`, `@server`, `@doc`, and `@handler` clauses.
/// `colon` is invalid when the form has no colon (`@handler name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueExpr {
    pub key: Ident,
    pub colon: Pos,
    pub value: Expr,
}

impl KeyValueExpr {
    pub fn pos(&self) -> Pos {
        self.key.pos()
    }

    pub fn end(&self) -> Pos {
        self.value.end()
    }
}

/// `info ( key: value ... )`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoType {
    pub tok_pos: Pos,
    pub lparen: Pos,
    pub kvs: Vec<KeyValueExpr>,
    pub rparen: Pos,
}

impl InfoType {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        Pos(self.rparen.0 + 1)
    }
}

/// `@server ( key: value ... )`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtServer {
    pub tok_pos: Pos,
    pub lparen: Pos,
    pub kvs: Vec<KeyValueExpr>,
    pub rparen: Pos,
}

impl AtServer {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        Pos(self.rparen.0 + 1)
    }
}

/// `method /path (Req) returns (Resp)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Ident,
    pub path: Ident,
    pub req: Option<ParenExpr>,
    pub returns_pos: Pos,
    pub resp: Option<ParenExpr>,
}

impl Route {
    pub fn pos(&self) -> Pos {
        self.method.pos()
    }

    pub fn end(&self) -> Pos {
        if let Some(resp) = &self.resp {
            resp.end()
        } else if self.returns_pos.is_valid() {
            Pos(self.returns_pos.0 + Token::Returns.as_str().len() as u32)
        } else if let Some(req) = &self.req {
            req.end()
        } else {
            self.path.end()
        }
    }
}

/// One route with its optional `@doc` and `@handler` annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    pub tok_pos: Pos,
    pub at_doc: Option<KeyValueExpr>,
    pub at_handler: Option<KeyValueExpr>,
    pub route: Route,
}

impl ServiceRoute {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        self.route.end()
    }
}

/// `service name { routes }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceApi {
    pub tok_pos: Pos,
    pub name: Ident,
    pub lbrace: Pos,
    pub routes: Vec<ServiceRoute>,
    pub rbrace: Pos,
}

impl ServiceApi {
    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    pub fn end(&self) -> Pos {
        Pos(self.rbrace.0 + 1)
    }
}

/// A service declaration with its optional `@server` annotation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub at_server: Option<AtServer>,
    pub api: ServiceApi,
}

impl Service {
    pub fn pos(&self) -> Pos {
        match &self.at_server {
            Some(s) => s.pos(),
            None => self.api.pos(),
        }
    }

    pub fn end(&self) -> Pos {
        self.api.end()
    }
}

/// Placeholder spanning source that could not be parsed as a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadDecl {
    pub from: Pos,
    pub to: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Bad(BadDecl),
    Gen(GenDecl),
    Info(InfoType),
    Service(Service),
}

impl Decl {
    pub fn pos(&self) -> Pos {
        match self {
            Decl::Bad(d) => d.from,
            Decl::Gen(d) => d.pos(),
            Decl::Info(d) => d.pos(),
            Decl::Service(d) => d.pos(),
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Decl::Bad(d) => d.to,
            Decl::Gen(d) => d.end(),
            Decl::Info(d) => d.end(),
            Decl::Service(d) => d.end(),
        }
    }
}

// ============================================================================
// File
// ============================================================================

/// A parsed source file. Possibly structurally incomplete after errors, but
/// never absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct File {
    pub doc: Option<CommentId>,
    pub syntax: Option<SyntaxSpec>,
    pub decls: Vec<Decl>,
    /// All import specs, in source order, regardless of grouping.
    pub imports: Vec<ImportSpec>,
    /// All comment groups, in source order.
    pub comments: Vec<CommentGroup>,
}

impl File {
    pub fn pos(&self) -> Pos {
        if let Some(s) = &self.syntax {
            s.pos()
        } else {
            self.decls.first().map_or(NO_POS, Decl::pos)
        }
    }

    pub fn end(&self) -> Pos {
        self.decls.last().map_or_else(
            || self.syntax.as_ref().map_or(NO_POS, SyntaxSpec::end),
            Decl::end,
        )
    }
}

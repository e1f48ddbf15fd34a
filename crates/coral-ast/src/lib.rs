//! Abstract syntax tree for the Coral language.
//!
//! This crate is the contract between the parser and the semantic analysis
//! core: the parser produces a [`Module`] (or [`Script`]) of owned AST
//! nodes, and the checker walks it. Every expression, pattern, type
//! annotation, and declaration node carries a process-unique [`NodeId`] and
//! a [`Span`]; the checker records inferred types and binding sources in
//! side tables keyed by `NodeId` rather than mutating the tree.
//!
//! The [`builder`] module provides an ergonomic way to construct ASTs
//! programmatically, used by the checker's test suite and by embedders that
//! generate code.

pub mod builder;
pub mod decl;
pub mod expr;
pub mod pat;
pub mod ty_ann;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use coral_common::{SourceId, Span};

pub use builder::AstBuilder;
pub use decl::{
    ClassDecl, ClassMember, Decl, DeclKind, EnumDecl, EnumVariant, FnDecl, InterfaceDecl,
    NamespaceDecl, TypeAliasDecl, VarDecl,
};
pub use expr::{
    Block, ElseBranch, Expr, ExprKind, FuncBody, FuncExpr, JsxAttr, JsxAttrValue, JsxChild,
    JsxElement, Lit, MatchArm, ObjProp, Param, PropKey, SelfParam, Stmt, StmtKind,
};
pub use pat::{ObjPatProp, PatKind, Pattern};
pub use ty_ann::{
    FuncAnn, FuncAnnParam, MappedAnn, ObjAnnElem, PrimKind, PropName, TypeAnn, TypeAnnKind,
    TypeParamDecl,
};

/// A process-unique identifier for one AST node.
///
/// The checker's side tables (inferred types, binding sources) are keyed by
/// `NodeId`, so ids must not repeat within one checker run. The parser (or
/// [`AstBuilder`]) allocates them sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

/// A dotted qualified name, e.g. `Foo.Bar.baz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualName {
    pub parts: Vec<String>,
}

impl QualName {
    pub fn new(parts: Vec<String>) -> Self {
        debug_assert!(!parts.is_empty(), "qualified name must have at least one part");
        QualName { parts }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        QualName { parts: vec![name.into()] }
    }

    /// Whether this name is a single unqualified identifier.
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// The last path segment.
    pub fn last(&self) -> &str {
        self.parts.last().expect("qualified name is never empty")
    }

    /// The first path segment.
    pub fn head(&self) -> &str {
        &self.parts[0]
    }
}

impl fmt::Display for QualName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

// ── Modules and files ────────────────────────────────────────────────────

/// A parsed compilation unit: one or more files checked together.
#[derive(Debug, Clone)]
pub struct Module {
    pub files: Vec<File>,
}

/// One source file: imports first, then declarations.
#[derive(Debug, Clone)]
pub struct File {
    pub source: SourceId,
    pub path: PathBuf,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

/// A script: a flat declaration list evaluated top to bottom, without
/// imports. Scripts get the same inference pipeline as modules but also
/// surface their scope to the caller (REPL-style embedding).
#[derive(Debug, Clone)]
pub struct Script {
    pub source: SourceId,
    pub decls: Vec<Decl>,
}

/// An `import` statement.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub id: NodeId,
    pub span: Span,
    /// The package specifier, e.g. `"react"`.
    pub package: String,
    pub specifiers: ImportSpecifiers,
}

/// What an import statement binds into the file scope.
#[derive(Debug, Clone)]
pub enum ImportSpecifiers {
    /// `import * as A from "pkg"`.
    Namespace { alias: String },
    /// `import {a, b as c} from "pkg"`.
    Named(Vec<ImportSpecifier>),
}

/// One `{name}` or `{name as alias}` specifier.
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

//! Top-level declaration nodes: functions, value bindings, type aliases,
//! classes, enums, interfaces, and namespaces.

use coral_common::Span;

use crate::expr::{Expr, FuncExpr, Param, PropKey};
use crate::pat::Pattern;
use crate::ty_ann::{ObjAnnElem, TypeAnn, TypeParamDecl};
use crate::{NodeId, QualName};

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub span: Span,
    pub exported: bool,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Fn(FnDecl),
    Var(VarDecl),
    TypeAlias(TypeAliasDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Interface(InterfaceDecl),
    Namespace(NamespaceDecl),
}

/// `fn name(...) { ... }`. Repeated declarations of the same name are
/// overloads and merge into an intersection binding.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub func: FuncExpr,
}

/// `val pat = init` / `var pat = init`, optionally annotated. `init` is
/// absent only in ambient declarations (type definition files).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub pattern: Pattern,
    pub ann: Option<TypeAnn>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub ann: TypeAnn,
}

/// `class Name(params) extends Base { members }`.
///
/// Constructor parameters live on the class head; a bare-identifier member
/// promotes the parameter of the same name to an instance field.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<Param>,
    pub extends: Option<ExtendsClause>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub struct ExtendsClause {
    pub span: Span,
    pub name: QualName,
    pub type_args: Vec<TypeAnn>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    /// Bare identifier promoting a constructor parameter to a field.
    FieldShorthand { span: Span, name: String },
    Field {
        span: Span,
        key: PropKey,
        ann: Option<TypeAnn>,
        init: Option<Expr>,
        is_static: bool,
        readonly: bool,
    },
    /// Instance methods take `self`; members without a receiver are static.
    Method {
        span: Span,
        key: PropKey,
        func: FuncExpr,
    },
    Getter {
        span: Span,
        key: PropKey,
        func: FuncExpr,
    },
    Setter {
        span: Span,
        key: PropKey,
        func: FuncExpr,
    },
}

/// `enum Name<T> { Variant(T), ... }`. Each variant becomes a nominal
/// object type with a `Symbol.customMatcher` method, and the enum type is
/// the union of its variants.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub span: Span,
    pub name: String,
    /// Positional payload types; empty for unit variants.
    pub fields: Vec<TypeAnn>,
}

/// Multiple interface declarations with one name in one namespace merge
/// their elements into a single object type.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub elems: Vec<ObjAnnElem>,
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub decls: Vec<Decl>,
}

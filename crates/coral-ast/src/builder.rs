//! Programmatic AST construction.
//!
//! The builder allocates node ids sequentially and synthesizes distinct
//! one-byte spans so diagnostics produced from built trees still point at
//! distinguishable locations. Used heavily by the checker's test suite.

use std::path::PathBuf;

use coral_common::{SourceId, Span};

use crate::decl::*;
use crate::expr::*;
use crate::pat::*;
use crate::ty_ann::*;
use crate::{File, ImportDecl, ImportSpecifier, ImportSpecifiers, Module, NodeId, QualName, Script};

pub struct AstBuilder {
    source: SourceId,
    next_id: u32,
    next_offset: u32,
}

impl AstBuilder {
    pub fn new(source: SourceId) -> Self {
        AstBuilder { source, next_id: 0, next_offset: 0 }
    }

    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 1;
        Span::new(self.source, start, start + 1)
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr { id: self.id(), span: self.span(), kind }
    }

    fn pat(&mut self, kind: PatKind) -> Pattern {
        Pattern { id: self.id(), span: self.span(), kind }
    }

    fn ann(&mut self, kind: TypeAnnKind) -> TypeAnn {
        TypeAnn { id: self.id(), span: self.span(), kind }
    }

    fn decl(&mut self, kind: DeclKind) -> Decl {
        Decl { id: self.id(), span: self.span(), exported: false, kind }
    }

    // ── Literals and simple expressions ──────────────────────────────────

    pub fn num(&mut self, text: &str) -> Expr {
        self.expr(ExprKind::Lit(Lit::Num(text.into())))
    }

    pub fn str_(&mut self, text: &str) -> Expr {
        self.expr(ExprKind::Lit(Lit::Str(text.into())))
    }

    pub fn bool_(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Lit(Lit::Bool(value)))
    }

    pub fn undefined(&mut self) -> Expr {
        self.expr(ExprKind::Lit(Lit::Undefined))
    }

    pub fn null(&mut self) -> Expr {
        self.expr(ExprKind::Lit(Lit::Null))
    }

    pub fn regex(&mut self, pattern: &str, flags: &str) -> Expr {
        self.expr(ExprKind::Lit(Lit::Regex { pattern: pattern.into(), flags: flags.into() }))
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.into()))
    }

    pub fn bin(&mut self, op: &str, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary { op: op.into(), lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    pub fn unary(&mut self, op: &str, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary { op: op.into(), operand: Box::new(operand) })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign { target: Box::new(target), value: Box::new(value) })
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call { callee: Box::new(callee), args, opt_chain: false })
    }

    pub fn member(&mut self, object: Expr, property: &str) -> Expr {
        self.expr(ExprKind::Member {
            object: Box::new(object),
            property: property.into(),
            opt_chain: false,
        })
    }

    pub fn index(&mut self, object: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            object: Box::new(object),
            index: Box::new(index),
            opt_chain: false,
        })
    }

    pub fn tuple(&mut self, elems: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Tuple(elems))
    }

    pub fn spread(&mut self, inner: Expr) -> Expr {
        self.expr(ExprKind::Spread(Box::new(inner)))
    }

    pub fn object(&mut self, props: Vec<ObjProp>) -> Expr {
        self.expr(ExprKind::Object(props))
    }

    pub fn prop(&mut self, key: &str, value: Expr) -> ObjProp {
        ObjProp::KeyValue { key: PropKey::Ident(key.into()), value }
    }

    pub fn shorthand(&mut self, name: &str) -> ObjProp {
        ObjProp::Shorthand { name: name.into(), id: self.id(), span: self.span() }
    }

    pub fn method(&mut self, key: &str, func: FuncExpr) -> ObjProp {
        ObjProp::Method { key: PropKey::Ident(key.into()), func }
    }

    pub fn cast(&mut self, expr: Expr, ann: TypeAnn) -> Expr {
        self.expr(ExprKind::Cast { expr: Box::new(expr), ann })
    }

    pub fn throw_(&mut self, value: Expr) -> Expr {
        self.expr(ExprKind::Throw(Box::new(value)))
    }

    pub fn await_(&mut self, value: Expr) -> Expr {
        self.expr(ExprKind::Await(Box::new(value)))
    }

    pub fn template(&mut self, quasis: Vec<&str>, exprs: Vec<Expr>) -> Expr {
        self.expr(ExprKind::TemplateLit {
            quasis: quasis.into_iter().map(String::from).collect(),
            exprs,
        })
    }

    pub fn tagged(&mut self, tag: Expr, quasis: Vec<&str>, exprs: Vec<Expr>) -> Expr {
        self.expr(ExprKind::TaggedTemplate {
            tag: Box::new(tag),
            quasis: quasis.into_iter().map(String::from).collect(),
            exprs,
        })
    }

    pub fn jsx(&mut self, element: JsxElement) -> Expr {
        self.expr(ExprKind::Jsx(element))
    }

    pub fn jsx_element(
        &mut self,
        name: &str,
        attrs: Vec<JsxAttr>,
        children: Vec<JsxChild>,
    ) -> JsxElement {
        JsxElement { span: self.span(), name: name.into(), attrs, children }
    }

    pub fn jsx_attr(&mut self, name: &str, value: Expr) -> JsxAttr {
        JsxAttr { span: self.span(), name: name.into(), value: Some(JsxAttrValue::Expr(value)) }
    }

    // ── Control flow ─────────────────────────────────────────────────────

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        Block { span: self.span(), stmts }
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        Stmt { id: self.id(), span: expr.span, kind: StmtKind::Expr(expr) }
    }

    pub fn let_stmt(&mut self, pattern: Pattern, ann: Option<TypeAnn>, init: Expr) -> Stmt {
        Stmt { id: self.id(), span: self.span(), kind: StmtKind::Let { pattern, ann, init } }
    }

    pub fn return_stmt(&mut self, value: Option<Expr>) -> Stmt {
        Stmt { id: self.id(), span: self.span(), kind: StmtKind::Return(value) }
    }

    pub fn if_(&mut self, cond: Expr, then_block: Block, else_block: Option<Block>) -> Expr {
        self.expr(ExprKind::If {
            cond: Box::new(cond),
            then_block,
            else_branch: else_block.map(ElseBranch::Block),
        })
    }

    pub fn match_(&mut self, target: Expr, arms: Vec<MatchArm>) -> Expr {
        self.expr(ExprKind::Match { target: Box::new(target), arms })
    }

    pub fn arm(&mut self, pat: Pattern, guard: Option<Expr>, body: Expr) -> MatchArm {
        MatchArm { span: self.span(), pat, guard, body }
    }

    pub fn do_(&mut self, block: Block) -> Expr {
        self.expr(ExprKind::Do(block))
    }

    // ── Functions ────────────────────────────────────────────────────────

    pub fn param(&mut self, name: &str, ann: Option<TypeAnn>) -> Param {
        let pat = self.pat_ident(name);
        Param { pat, ann, optional: false }
    }

    pub fn opt_param(&mut self, name: &str, ann: Option<TypeAnn>) -> Param {
        let pat = self.pat_ident(name);
        Param { pat, ann, optional: true }
    }

    pub fn rest_param(&mut self, name: &str, ann: Option<TypeAnn>) -> Param {
        let inner = self.pat_ident(name);
        let pat = self.pat(PatKind::Rest(Box::new(inner)));
        Param { pat, ann, optional: false }
    }

    pub fn func(
        &mut self,
        params: Vec<Param>,
        ret: Option<TypeAnn>,
        body: FuncBody,
    ) -> FuncExpr {
        FuncExpr {
            type_params: Vec::new(),
            self_param: None,
            params,
            ret,
            throws: None,
            body: Some(body),
            is_async: false,
        }
    }

    pub fn func_expr(&mut self, params: Vec<Param>, ret: Option<TypeAnn>, body: Expr) -> Expr {
        let func = self.func(params, ret, FuncBody::Expr(Box::new(body)));
        self.expr(ExprKind::Func(func))
    }

    pub fn method_func(
        &mut self,
        mutable_self: bool,
        params: Vec<Param>,
        ret: Option<TypeAnn>,
        body: FuncBody,
    ) -> FuncExpr {
        let mut func = self.func(params, ret, body);
        func.self_param = Some(SelfParam { mutable: mutable_self });
        func
    }

    // ── Patterns ─────────────────────────────────────────────────────────

    pub fn pat_ident(&mut self, name: &str) -> Pattern {
        self.pat(PatKind::Ident { name: name.into(), ann: None, default: None, mutable: false })
    }

    pub fn pat_ident_full(
        &mut self,
        name: &str,
        ann: Option<TypeAnn>,
        default: Option<Expr>,
        mutable: bool,
    ) -> Pattern {
        self.pat(PatKind::Ident {
            name: name.into(),
            ann,
            default: default.map(Box::new),
            mutable,
        })
    }

    pub fn pat_lit(&mut self, lit: Lit) -> Pattern {
        self.pat(PatKind::Lit(lit))
    }

    pub fn pat_tuple(&mut self, elems: Vec<Pattern>) -> Pattern {
        self.pat(PatKind::Tuple(elems))
    }

    pub fn pat_object(&mut self, props: Vec<ObjPatProp>) -> Pattern {
        self.pat(PatKind::Object(props))
    }

    pub fn pat_shorthand(&mut self, name: &str) -> ObjPatProp {
        ObjPatProp::Shorthand {
            id: self.id(),
            span: self.span(),
            name: name.into(),
            ann: None,
            default: None,
        }
    }

    pub fn pat_shorthand_default(&mut self, name: &str, default: Expr) -> ObjPatProp {
        ObjPatProp::Shorthand {
            id: self.id(),
            span: self.span(),
            name: name.into(),
            ann: None,
            default: Some(Box::new(default)),
        }
    }

    pub fn pat_extractor(&mut self, name: &str, args: Vec<Pattern>) -> Pattern {
        self.pat(PatKind::Extractor { name: QualName::simple(name), args })
    }

    pub fn pat_extractor_qual(&mut self, parts: Vec<&str>, args: Vec<Pattern>) -> Pattern {
        let name = QualName::new(parts.into_iter().map(String::from).collect());
        self.pat(PatKind::Extractor { name, args })
    }

    pub fn pat_rest(&mut self, inner: Pattern) -> Pattern {
        self.pat(PatKind::Rest(Box::new(inner)))
    }

    pub fn pat_wild(&mut self) -> Pattern {
        self.pat(PatKind::Wildcard)
    }

    // ── Type annotations ─────────────────────────────────────────────────

    pub fn ann_number(&mut self) -> TypeAnn {
        self.ann(TypeAnnKind::Prim(PrimKind::Number))
    }

    pub fn ann_string(&mut self) -> TypeAnn {
        self.ann(TypeAnnKind::Prim(PrimKind::String))
    }

    pub fn ann_boolean(&mut self) -> TypeAnn {
        self.ann(TypeAnnKind::Prim(PrimKind::Boolean))
    }

    pub fn ann_lit(&mut self, lit: Lit) -> TypeAnn {
        self.ann(TypeAnnKind::Lit(lit))
    }

    pub fn ann_ref(&mut self, name: &str, args: Vec<TypeAnn>) -> TypeAnn {
        self.ann(TypeAnnKind::Ref { name: QualName::simple(name), args })
    }

    pub fn ann_qual_ref(&mut self, parts: Vec<&str>, args: Vec<TypeAnn>) -> TypeAnn {
        let name = QualName::new(parts.into_iter().map(String::from).collect());
        self.ann(TypeAnnKind::Ref { name, args })
    }

    pub fn ann_object(&mut self, elems: Vec<ObjAnnElem>) -> TypeAnn {
        self.ann(TypeAnnKind::Object(elems))
    }

    pub fn ann_prop(&mut self, key: &str, ann: TypeAnn) -> ObjAnnElem {
        ObjAnnElem::Prop { key: PropName::Ident(key.into()), ann, optional: false, readonly: false }
    }

    pub fn ann_opt_prop(&mut self, key: &str, ann: TypeAnn) -> ObjAnnElem {
        ObjAnnElem::Prop { key: PropName::Ident(key.into()), ann, optional: true, readonly: false }
    }

    pub fn ann_readonly_prop(&mut self, key: &str, ann: TypeAnn) -> ObjAnnElem {
        ObjAnnElem::Prop { key: PropName::Ident(key.into()), ann, optional: false, readonly: true }
    }

    pub fn ann_tuple(&mut self, elems: Vec<TypeAnn>) -> TypeAnn {
        self.ann(TypeAnnKind::Tuple(elems))
    }

    pub fn ann_union(&mut self, members: Vec<TypeAnn>) -> TypeAnn {
        self.ann(TypeAnnKind::Union(members))
    }

    pub fn ann_mut(&mut self, inner: TypeAnn) -> TypeAnn {
        self.ann(TypeAnnKind::Mutable(Box::new(inner)))
    }

    pub fn ann_func(&mut self, params: Vec<FuncAnnParam>, ret: TypeAnn) -> TypeAnn {
        self.ann(TypeAnnKind::Func(FuncAnn {
            type_params: Vec::new(),
            params,
            ret: Box::new(ret),
            throws: None,
        }))
    }

    pub fn ann_func_param(&mut self, name: &str, ann: TypeAnn) -> FuncAnnParam {
        FuncAnnParam { name: name.into(), rest: false, ann, optional: false }
    }

    pub fn ann_never(&mut self) -> TypeAnn {
        self.ann(TypeAnnKind::Never)
    }

    pub fn ann_any(&mut self) -> TypeAnn {
        self.ann(TypeAnnKind::Any)
    }

    pub fn ann_keyof(&mut self, inner: TypeAnn) -> TypeAnn {
        self.ann(TypeAnnKind::KeyOf(Box::new(inner)))
    }

    pub fn type_param(&mut self, name: &str) -> TypeParamDecl {
        TypeParamDecl { name: name.into(), constraint: None, default: None }
    }

    // ── Declarations ─────────────────────────────────────────────────────

    /// `val name = init`.
    pub fn val(&mut self, name: &str, init: Expr) -> Decl {
        let pattern = self.pat_ident(name);
        self.decl(DeclKind::Var(VarDecl { pattern, ann: None, init: Some(init) }))
    }

    /// `val name: ann = init`.
    pub fn val_ann(&mut self, name: &str, ann: TypeAnn, init: Expr) -> Decl {
        let pattern = self.pat_ident(name);
        self.decl(DeclKind::Var(VarDecl { pattern, ann: Some(ann), init: Some(init) }))
    }

    pub fn var_decl(&mut self, pattern: Pattern, ann: Option<TypeAnn>, init: Option<Expr>) -> Decl {
        self.decl(DeclKind::Var(VarDecl { pattern, ann, init }))
    }

    pub fn fn_decl(&mut self, name: &str, func: FuncExpr) -> Decl {
        self.decl(DeclKind::Fn(FnDecl { name: name.into(), func }))
    }

    pub fn type_alias(&mut self, name: &str, type_params: Vec<TypeParamDecl>, ann: TypeAnn) -> Decl {
        self.decl(DeclKind::TypeAlias(TypeAliasDecl { name: name.into(), type_params, ann }))
    }

    pub fn class(
        &mut self,
        name: &str,
        params: Vec<Param>,
        members: Vec<ClassMember>,
    ) -> Decl {
        self.decl(DeclKind::Class(ClassDecl {
            name: name.into(),
            type_params: Vec::new(),
            params,
            extends: None,
            members,
        }))
    }

    pub fn field_shorthand(&mut self, name: &str) -> ClassMember {
        ClassMember::FieldShorthand { span: self.span(), name: name.into() }
    }

    pub fn class_method(&mut self, name: &str, func: FuncExpr) -> ClassMember {
        ClassMember::Method { span: self.span(), key: PropKey::Ident(name.into()), func }
    }

    pub fn enum_(&mut self, name: &str, variants: Vec<EnumVariant>) -> Decl {
        self.decl(DeclKind::Enum(EnumDecl {
            name: name.into(),
            type_params: Vec::new(),
            variants,
        }))
    }

    pub fn variant(&mut self, name: &str, fields: Vec<TypeAnn>) -> EnumVariant {
        EnumVariant { span: self.span(), name: name.into(), fields }
    }

    pub fn interface(&mut self, name: &str, elems: Vec<ObjAnnElem>) -> Decl {
        self.decl(DeclKind::Interface(InterfaceDecl {
            name: name.into(),
            type_params: Vec::new(),
            elems,
        }))
    }

    pub fn namespace(&mut self, name: &str, decls: Vec<Decl>) -> Decl {
        self.decl(DeclKind::Namespace(NamespaceDecl { name: name.into(), decls }))
    }

    pub fn exported(&mut self, mut decl: Decl) -> Decl {
        decl.exported = true;
        decl
    }

    pub fn import_namespace(&mut self, package: &str, alias: &str) -> ImportDecl {
        ImportDecl {
            id: self.id(),
            span: self.span(),
            package: package.into(),
            specifiers: ImportSpecifiers::Namespace { alias: alias.into() },
        }
    }

    pub fn import_named(&mut self, package: &str, names: Vec<(&str, Option<&str>)>) -> ImportDecl {
        let specifiers = names
            .into_iter()
            .map(|(name, alias)| ImportSpecifier {
                name: name.into(),
                alias: alias.map(String::from),
                span: self.span(),
            })
            .collect();
        ImportDecl {
            id: self.id(),
            span: self.span(),
            package: package.into(),
            specifiers: ImportSpecifiers::Named(specifiers),
        }
    }

    // ── Modules ──────────────────────────────────────────────────────────

    pub fn file(&mut self, path: &str, imports: Vec<ImportDecl>, decls: Vec<Decl>) -> File {
        File { source: self.source(), path: PathBuf::from(path), imports, decls }
    }

    pub fn module(&mut self, files: Vec<File>) -> Module {
        Module { files }
    }

    /// A single-file module with no imports.
    pub fn simple_module(&mut self, decls: Vec<Decl>) -> Module {
        let file = self.file("main.co", Vec::new(), decls);
        Module { files: vec![file] }
    }

    pub fn script(&mut self, decls: Vec<Decl>) -> Script {
        Script { source: self.source(), decls }
    }

    fn source(&self) -> SourceId {
        self.source
    }
}

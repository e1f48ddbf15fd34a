//! Type representation for the Coral type system.
//!
//! Defines the core [`Type`] sum, object element kinds, type aliases, and
//! value bindings. Every type carries an optional [`Provenance`] linking it
//! back to the AST node or upstream type it originated from; provenance is
//! used only for error reporting and never participates in equality.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use coral_ast::{Lit, NodeId, QualName};
use coral_common::Span;

/// A type variable, identified by a `u32` index into the unification table.
///
/// Type variables are created during inference and unified with concrete
/// types or other variables. The `ena` crate handles the union-find
/// mechanics; constraints, defaults, and the from-binding flag live in a
/// side table on the checker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeVar(pub u32);

/// Where a type came from: the AST node that produced it, or the upstream
/// type it was derived from (e.g. by copying a binding's type to a use
/// site).
///
/// Intentionally excluded from `PartialEq`: two types are equal regardless
/// of where they were created.
#[derive(Clone, Debug)]
pub enum Provenance {
    Span(Span),
    Type(Type),
}

/// A Coral type: a [`TypeKind`] plus optional provenance.
#[derive(Clone, Debug)]
pub struct Type {
    pub kind: TypeKind,
    pub provenance: Option<Box<Provenance>>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind // provenance intentionally excluded
    }
}

impl Eq for Type {}

/// The type constructors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// An inference variable (resolved through the union-find table).
    Var(TypeVar),
    /// A primitive: `number`, `string`, `boolean`, `bigint`, `symbol`.
    Prim(Primitive),
    /// A literal type, subtype of the matching primitive.
    Lit(Lit),
    /// A regex type with named capture groups. Unifying a string literal
    /// against it executes the pattern.
    Regex(RegexType),
    /// Top and bottom at once: unifies in both directions.
    Any,
    /// Top only.
    Unknown,
    /// Bottom only.
    Never,
    /// Matches anything; produced by `_` annotations and wildcard patterns.
    Wildcard,
    /// An ordered tuple. At most one `RestSpread` element, and only last.
    Tuple(Vec<Type>),
    /// `...T` inside tuples and parameter lists.
    RestSpread(Box<Type>),
    Func(FuncType),
    Object(ObjectType),
    /// `mut T` -- an invariant site.
    Mutable(Box<Type>),
    /// A value literal whose mutability is determined by context.
    MutUncertain(Box<Type>),
    /// Flattened, deduplicated members in deterministic order.
    Union(Vec<Type>),
    /// Used for function overload sets.
    Intersection(Vec<Type>),
    /// A reference to a named alias; the alias slot is filled lazily and
    /// shared across clones.
    Ref(TypeRefType),
    /// A custom-match pattern type: the matched object plus argument types.
    Extractor(ExtractorType),
    /// `` `a-${T}` `` -- alternating quasis and embedded types.
    TemplateLit(TemplateLitType),
    /// Compared by identity only.
    UniqueSymbol(u32),
    /// `keyof T` -- expanded on demand.
    KeyOf(Box<Type>),
    /// `O[K]` -- expanded on demand.
    Index(IndexType),
    /// `typeof name` -- the slot is filled by deferred resolution.
    TypeOf(TypeOfType),
    /// A conditional type -- expanded on demand.
    Cond(CondType),
    /// A mapped type -- expanded on demand.
    Mapped(MappedType),
    /// `infer T` inside a conditional's extends clause.
    Infer(String),
}

/// Primitive kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::BigInt => "bigint",
            Primitive::Symbol => "symbol",
        };
        write!(f, "{s}")
    }
}

/// A regex type: the source pattern plus the declared types of its named
/// capture groups (normally `string`, or `infer` variables inside
/// conditional types).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexType {
    pub pattern: String,
    pub flags: String,
    pub groups: Vec<(String, Type)>,
}

/// A function type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncType {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<FuncParam>,
    pub ret: Box<Type>,
    pub throws: Box<Type>,
}

impl FuncType {
    /// Index of the rest parameter, if any.
    pub fn rest_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.rest)
    }

    /// Number of parameters that must be supplied at a call site.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional && !p.rest).count()
    }
}

/// One function parameter. The rest flag mirrors the parameter's pattern
/// being a rest pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncParam {
    pub name: String,
    pub rest: bool,
    pub ty: Type,
    pub optional: bool,
}

/// A declared type parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<Type>,
    pub default: Option<Type>,
}

/// An object type: ordered elements, optionally nominal, optionally an
/// interface (interfaces may gain elements through declaration merging).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectType {
    pub elems: Vec<ObjElem>,
    /// Two nominal objects are compatible only when their ids match.
    pub nominal_id: Option<u32>,
    pub interface: bool,
}

/// One element of an object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjElem {
    Prop {
        key: ObjKey,
        ty: Type,
        optional: bool,
        readonly: bool,
    },
    Method {
        key: ObjKey,
        func: FuncType,
        mut_self: bool,
    },
    Getter {
        key: ObjKey,
        func: FuncType,
    },
    Setter {
        key: ObjKey,
        func: FuncType,
    },
    Constructor(FuncType),
    Callable(FuncType),
    RestSpread(Type),
    Mapped(MappedType),
}

impl ObjElem {
    /// The member key, if this element kind has one.
    pub fn key(&self) -> Option<&ObjKey> {
        match self {
            ObjElem::Prop { key, .. }
            | ObjElem::Method { key, .. }
            | ObjElem::Getter { key, .. }
            | ObjElem::Setter { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// An object member key: string, number, or unique-symbol identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjKey {
    Str(String),
    Num(String),
    Sym(u32),
}

impl fmt::Display for ObjKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjKey::Str(s) => write!(f, "{s}"),
            ObjKey::Num(n) => write!(f, "{n}"),
            ObjKey::Sym(id) => write!(f, "[symbol #{id}]"),
        }
    }
}

/// A named type reference. Equality considers the name and arguments; the
/// alias slot is shared state filled in lazily (deferred resolution,
/// interface merging visibility).
#[derive(Clone)]
pub struct TypeRefType {
    pub name: QualName,
    pub type_args: Vec<Type>,
    pub alias: AliasSlot,
}

impl PartialEq for TypeRefType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_args == other.type_args
    }
}

impl Eq for TypeRefType {}

// The slot may point back at an alias whose body references this very
// type (recursive aliases), so Debug must not descend into it.
impl fmt::Debug for TypeRefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRefType")
            .field("name", &self.name)
            .field("type_args", &self.type_args)
            .field("resolved", &self.alias.borrow().is_some())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractorType {
    pub obj: Box<Type>,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateLitType {
    /// `quasis.len() == types.len() + 1`.
    pub quasis: Vec<String>,
    pub types: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexType {
    pub obj: Box<Type>,
    pub index: Box<Type>,
}

/// `typeof name`. The slot is filled with the binding's type by deferred
/// resolution; equality is by name.
#[derive(Clone)]
pub struct TypeOfType {
    pub name: QualName,
    pub slot: Rc<RefCell<Option<Type>>>,
}

impl PartialEq for TypeOfType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeOfType {}

impl fmt::Debug for TypeOfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeOfType")
            .field("name", &self.name)
            .field("resolved", &self.slot.borrow().is_some())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondType {
    pub check: Box<Type>,
    pub extends: Box<Type>,
    pub then_ty: Box<Type>,
    pub else_ty: Box<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedType {
    pub param: String,
    pub constraint: Box<Type>,
    pub value: Box<Type>,
    pub optional: bool,
    pub readonly: bool,
}

// ── Aliases, bindings, namespaces ────────────────────────────────────────

/// A named type alias: the aliased type plus its parameter list.
#[derive(Clone, Debug)]
pub struct TypeAlias {
    pub ty: Type,
    pub type_params: Vec<TypeParam>,
    pub exported: bool,
}

/// Shared handle to an alias. Interface merging mutates the alias in
/// place, so every outstanding reference observes merged elements.
pub type AliasRef = Rc<RefCell<TypeAlias>>;

/// The lazily-filled alias slot inside a [`TypeRefType`]. Clones of the
/// reference share the slot, so deferred resolution reaches all of them.
pub type AliasSlot = Rc<RefCell<Option<AliasRef>>>;

/// Create an empty alias slot.
pub fn empty_alias_slot() -> AliasSlot {
    Rc::new(RefCell::new(None))
}

/// Create a slot already pointing at an alias.
pub fn filled_alias_slot(alias: AliasRef) -> AliasSlot {
    Rc::new(RefCell::new(Some(alias)))
}

/// A value slot in a namespace.
#[derive(Clone, Debug)]
pub struct Binding {
    /// The declaration node this binding came from, recorded on identifier
    /// uses for the downstream code generator.
    pub source: Option<NodeId>,
    pub ty: Type,
    pub mutable: bool,
    pub exported: bool,
}

impl Binding {
    pub fn new(ty: Type) -> Self {
        Binding { source: None, ty, mutable: false, exported: false }
    }
}

// ── Constructors ─────────────────────────────────────────────────────────

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type { kind, provenance: None }
    }

    pub fn with_provenance(kind: TypeKind, provenance: Provenance) -> Self {
        Type { kind, provenance: Some(Box::new(provenance)) }
    }

    /// Attach provenance, replacing any existing link.
    pub fn provenanced(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(Box::new(provenance));
        self
    }

    /// Follow the provenance chain to a source span, if any link in the
    /// chain has one.
    pub fn span(&self) -> Option<Span> {
        match self.provenance.as_deref() {
            Some(Provenance::Span(span)) => Some(*span),
            Some(Provenance::Type(ty)) => ty.span(),
            None => None,
        }
    }

    pub fn var(v: TypeVar) -> Type {
        Type::new(TypeKind::Var(v))
    }

    pub fn number() -> Type {
        Type::new(TypeKind::Prim(Primitive::Number))
    }

    pub fn string() -> Type {
        Type::new(TypeKind::Prim(Primitive::String))
    }

    pub fn boolean() -> Type {
        Type::new(TypeKind::Prim(Primitive::Boolean))
    }

    pub fn bigint() -> Type {
        Type::new(TypeKind::Prim(Primitive::BigInt))
    }

    pub fn symbol() -> Type {
        Type::new(TypeKind::Prim(Primitive::Symbol))
    }

    pub fn any() -> Type {
        Type::new(TypeKind::Any)
    }

    pub fn unknown() -> Type {
        Type::new(TypeKind::Unknown)
    }

    pub fn never() -> Type {
        Type::new(TypeKind::Never)
    }

    pub fn wildcard() -> Type {
        Type::new(TypeKind::Wildcard)
    }

    pub fn lit(lit: Lit) -> Type {
        Type::new(TypeKind::Lit(lit))
    }

    pub fn lit_num(text: &str) -> Type {
        Type::lit(Lit::Num(text.into()))
    }

    pub fn lit_str(text: &str) -> Type {
        Type::lit(Lit::Str(text.into()))
    }

    pub fn undefined() -> Type {
        Type::lit(Lit::Undefined)
    }

    pub fn null() -> Type {
        Type::lit(Lit::Null)
    }

    pub fn tuple(elems: Vec<Type>) -> Type {
        Type::new(TypeKind::Tuple(elems))
    }

    pub fn rest(inner: Type) -> Type {
        Type::new(TypeKind::RestSpread(Box::new(inner)))
    }

    pub fn mutable(inner: Type) -> Type {
        Type::new(TypeKind::Mutable(Box::new(inner)))
    }

    pub fn mut_uncertain(inner: Type) -> Type {
        Type::new(TypeKind::MutUncertain(Box::new(inner)))
    }

    pub fn func(params: Vec<FuncParam>, ret: Type) -> Type {
        Type::new(TypeKind::Func(FuncType {
            type_params: Vec::new(),
            params,
            ret: Box::new(ret),
            throws: Box::new(Type::never()),
        }))
    }

    pub fn object(elems: Vec<ObjElem>) -> Type {
        Type::new(TypeKind::Object(ObjectType { elems, nominal_id: None, interface: false }))
    }

    /// A reference to a named alias with an unfilled slot.
    pub fn reference(name: QualName, type_args: Vec<Type>) -> Type {
        Type::new(TypeKind::Ref(TypeRefType { name, type_args, alias: empty_alias_slot() }))
    }

    /// `Array<elem>`.
    pub fn array(elem: Type) -> Type {
        Type::reference(QualName::simple("Array"), vec![elem])
    }

    /// `Promise<value, err>`.
    pub fn promise(value: Type, err: Type) -> Type {
        Type::reference(QualName::simple("Promise"), vec![value, err])
    }

    /// Whether this type is a reference to the named alias (any argument
    /// count).
    pub fn is_ref_named(&self, name: &str) -> bool {
        matches!(&self.kind, TypeKind::Ref(r) if r.name.is_simple() && r.name.head() == name)
    }

    /// The element type if this is an `Array<E>` reference.
    pub fn array_elem(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Ref(r) if r.name.is_simple() && r.name.head() == "Array" => {
                r.type_args.first()
            }
            _ => None,
        }
    }
}

/// Literal/primitive relationships used by the unifier.
pub trait LitExt {
    /// Whether this literal is a subtype of the given primitive.
    fn matches_prim(&self, prim: Primitive) -> bool;
}

impl LitExt for Lit {
    fn matches_prim(&self, prim: Primitive) -> bool {
        matches!(
            (self, prim),
            (Lit::Num(_), Primitive::Number)
                | (Lit::Str(_), Primitive::String)
                | (Lit::Bool(_), Primitive::Boolean)
                | (Lit::BigInt(_), Primitive::BigInt)
        )
    }
}

/// Compile a regex type's pattern, translating the surface flags that have
/// an equivalent here (`i`, `m`, `s`); the rest only affect runtime
/// matching semantics the checker does not model.
pub fn compile_regex(re: &RegexType) -> Result<regex::Regex, regex::Error> {
    let mut inline = String::new();
    for flag in re.flags.chars() {
        if matches!(flag, 'i' | 'm' | 's') {
            inline.push(flag);
        }
    }
    let pattern = if inline.is_empty() {
        re.pattern.clone()
    } else {
        format!("(?{inline}){}", re.pattern)
    };
    regex::Regex::new(&pattern)
}

/// Build a union: flatten nested unions, drop `never` members, and
/// deduplicate while preserving first-occurrence order. A single surviving
/// member is returned unwrapped; an empty set collapses to `never`.
pub fn union_of(members: Vec<Type>) -> Type {
    let mut flat: Vec<Type> = Vec::new();
    let mut push = |ty: Type, flat: &mut Vec<Type>| {
        if matches!(ty.kind, TypeKind::Never) {
            return;
        }
        if !flat.contains(&ty) {
            flat.push(ty);
        }
    };
    for member in members {
        match member.kind {
            TypeKind::Union(inner) => {
                for m in inner {
                    push(m, &mut flat);
                }
            }
            _ => push(member, &mut flat),
        }
    }
    match flat.len() {
        0 => Type::never(),
        1 => flat.into_iter().next().expect("length checked"),
        _ => Type::new(TypeKind::Union(flat)),
    }
}

/// Build an intersection, flattening nested intersections.
pub fn intersection_of(members: Vec<Type>) -> Type {
    let mut flat: Vec<Type> = Vec::new();
    for member in members {
        match member.kind {
            TypeKind::Intersection(inner) => flat.extend(inner),
            _ => flat.push(member),
        }
    }
    match flat.len() {
        1 => flat.into_iter().next().expect("length checked"),
        _ => Type::new(TypeKind::Intersection(flat)),
    }
}

// ── Display ──────────────────────────────────────────────────────────────

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_lit(f: &mut fmt::Formatter<'_>, lit: &Lit) -> fmt::Result {
    match lit {
        Lit::Num(n) => write!(f, "{n}"),
        Lit::Str(s) => write!(f, "\"{s}\""),
        Lit::Bool(b) => write!(f, "{b}"),
        Lit::BigInt(n) => write!(f, "{n}n"),
        Lit::Null => write!(f, "null"),
        Lit::Undefined => write!(f, "undefined"),
        Lit::Regex { pattern, flags } => write!(f, "/{pattern}/{flags}"),
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn ")?;
        if !self.type_params.is_empty() {
            write!(f, "<")?;
            for (i, tp) in self.type_params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", tp.name)?;
                if let Some(c) = &tp.constraint {
                    write!(f, ": {c}")?;
                }
            }
            write!(f, ">")?;
        }
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if p.rest {
                write!(f, "...")?;
            }
            write!(f, "{}", p.name)?;
            if p.optional {
                write!(f, "?")?;
            }
            write!(f, ": {}", p.ty)?;
        }
        write!(f, ") -> {}", self.ret)?;
        if !matches!(self.throws.kind, TypeKind::Never) {
            write!(f, " throws {}", self.throws)?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Var(v) => write!(f, "?{}", v.0),
            TypeKind::Prim(p) => write!(f, "{p}"),
            TypeKind::Lit(lit) => write_lit(f, lit),
            TypeKind::Regex(re) => write!(f, "/{}/{}", re.pattern, re.flags),
            TypeKind::Any => write!(f, "any"),
            TypeKind::Unknown => write!(f, "unknown"),
            TypeKind::Never => write!(f, "never"),
            TypeKind::Wildcard => write!(f, "_"),
            TypeKind::Tuple(elems) => {
                write!(f, "[")?;
                write_list(f, elems, ", ")?;
                write!(f, "]")
            }
            TypeKind::RestSpread(inner) => write!(f, "...{inner}"),
            TypeKind::Func(func) => write!(f, "{func}"),
            TypeKind::Object(obj) => {
                write!(f, "{{")?;
                for (i, elem) in obj.elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match elem {
                        ObjElem::Prop { key, ty, optional, readonly } => {
                            if *readonly {
                                write!(f, "readonly ")?;
                            }
                            write!(f, "{key}")?;
                            if *optional {
                                write!(f, "?")?;
                            }
                            write!(f, ": {ty}")?;
                        }
                        ObjElem::Method { key, func, .. } => write!(f, "{key}{}", FnSig(func))?,
                        ObjElem::Getter { key, func } => {
                            write!(f, "get {key}() -> {}", func.ret)?
                        }
                        ObjElem::Setter { key, func } => {
                            let param = func
                                .params
                                .first()
                                .map(|p| p.ty.to_string())
                                .unwrap_or_else(|| "_".into());
                            write!(f, "set {key}({param})")?
                        }
                        ObjElem::Constructor(func) => write!(f, "new{}", FnSig(func))?,
                        ObjElem::Callable(func) => write!(f, "{}", FnSig(func))?,
                        ObjElem::RestSpread(ty) => write!(f, "...{ty}")?,
                        ObjElem::Mapped(m) => {
                            write!(f, "[{} in {}]: {}", m.param, m.constraint, m.value)?
                        }
                    }
                }
                write!(f, "}}")
            }
            TypeKind::Mutable(inner) => write!(f, "mut {inner}"),
            TypeKind::MutUncertain(inner) => write!(f, "{inner}"),
            TypeKind::Union(members) => write_list(f, members, " | "),
            TypeKind::Intersection(members) => write_list(f, members, " & "),
            TypeKind::Ref(r) => {
                write!(f, "{}", r.name)?;
                if !r.type_args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, &r.type_args, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeKind::Extractor(e) => {
                write!(f, "{}(", e.obj)?;
                write_list(f, &e.args, ", ")?;
                write!(f, ")")
            }
            TypeKind::TemplateLit(t) => {
                write!(f, "`")?;
                for (i, quasi) in t.quasis.iter().enumerate() {
                    write!(f, "{quasi}")?;
                    if let Some(ty) = t.types.get(i) {
                        write!(f, "${{{ty}}}")?;
                    }
                }
                write!(f, "`")
            }
            TypeKind::UniqueSymbol(id) => write!(f, "unique symbol #{id}"),
            TypeKind::KeyOf(inner) => write!(f, "keyof {inner}"),
            TypeKind::Index(idx) => write!(f, "{}[{}]", idx.obj, idx.index),
            TypeKind::TypeOf(t) => write!(f, "typeof {}", t.name),
            TypeKind::Cond(c) => write!(
                f,
                "{} extends {} ? {} : {}",
                c.check, c.extends, c.then_ty, c.else_ty
            ),
            TypeKind::Mapped(m) => write!(f, "{{[{} in {}]: {}}}", m.param, m.constraint, m.value),
            TypeKind::Infer(name) => write!(f, "infer {name}"),
        }
    }
}

/// Method-style signature rendering: parameter list and return without the
/// leading `fn`.
struct FnSig<'a>(&'a FuncType);

impl fmt::Display for FnSig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.0.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if p.rest {
                write!(f, "...")?;
            }
            write!(f, "{}: {}", p.name, p.ty)?;
        }
        write!(f, ") -> {}", self.0.ret)
    }
}

// ── ena trait implementations ────────────────────────────────────────────

impl ena::unify::UnifyKey for TypeVar {
    type Value = Option<Type>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TypeVar(u)
    }

    fn tag() -> &'static str {
        "TypeVar"
    }
}

impl ena::unify::EqUnifyValue for Type {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_excluded_from_equality() {
        let sid = coral_common::SourceId(0);
        let a = Type::number();
        let b = Type::number().provenanced(Provenance::Span(Span::new(sid, 3, 7)));
        assert_eq!(a, b);
        assert_eq!(b.span(), Some(Span::new(sid, 3, 7)));
    }

    #[test]
    fn union_flattens_and_dedups() {
        let u = union_of(vec![
            Type::number(),
            union_of(vec![Type::string(), Type::number()]),
            Type::never(),
        ]);
        match u.kind {
            TypeKind::Union(members) => {
                assert_eq!(members, vec![Type::number(), Type::string()]);
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn union_of_one_unwraps() {
        assert_eq!(union_of(vec![Type::number(), Type::number()]), Type::number());
        assert_eq!(union_of(vec![]), Type::never());
    }

    #[test]
    fn type_ref_equality_ignores_slot() {
        let a = Type::array(Type::number());
        let b = Type::array(Type::number());
        assert_eq!(a, b);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::number().to_string(), "number");
        assert_eq!(Type::lit_str("hi").to_string(), "\"hi\"");
        assert_eq!(
            Type::tuple(vec![Type::number(), Type::string()]).to_string(),
            "[number, string]"
        );
        assert_eq!(Type::array(Type::number()).to_string(), "Array<number>");
        assert_eq!(Type::mutable(Type::number()).to_string(), "mut number");
        assert_eq!(
            union_of(vec![Type::number(), Type::undefined()]).to_string(),
            "number | undefined"
        );
        let f = Type::func(
            vec![FuncParam { name: "x".into(), rest: false, ty: Type::number(), optional: false }],
            Type::string(),
        );
        assert_eq!(f.to_string(), "fn (x: number) -> string");
    }
}

//! The checker state and the unification engine.
//!
//! [`Checker`] owns the union-find table (`ena`), per-variable metadata,
//! the unique-symbol and nominal-id counters, the accumulated diagnostics,
//! and the node-type side tables. `unify(a, b)` means "every value of `a`
//! is assignable to `b`" -- it is asymmetric, works case-by-case over
//! pruned inputs, and returns a list of errors instead of throwing.

use std::time::Instant;

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use coral_ast::{Lit, NodeId};
use coral_common::{SourceId, Span};

use crate::error::TypeError;
use crate::expand::{expand_type, substitute_named};
use crate::imports::{PackageHost, PackageRegistry};
use crate::ty::{
    union_of, ExtractorType, FuncParam, FuncType, LitExt, ObjElem, ObjKey, ObjectType, Primitive,
    Type, TypeKind, TypeVar,
};
use crate::GraphqlValidator;

/// Per-variable metadata kept outside the union-find table.
#[derive(Clone, Debug, Default)]
pub(crate) struct VarMeta {
    pub constraint: Option<Type>,
    pub default: Option<Type>,
    /// Whether the variable was introduced by a binding pattern.
    pub from_binding: bool,
}

/// How deep mutual expansion may go before unification gives up. Bounds
/// divergence on recursive computed types.
const MAX_EXPANSION_DEPTH: u32 = 64;

/// One enclosing function body during inference: accumulates thrown types
/// and remembers whether `await` is legal.
#[derive(Debug, Default)]
pub(crate) struct FnFrame {
    pub throws: Vec<Type>,
    pub is_async: bool,
}

/// Well-known unique symbols installed by the prelude.
#[derive(Clone, Copy, Debug)]
pub struct WellKnownSymbols {
    pub iterator: u32,
    pub custom_matcher: u32,
}

/// The semantic analysis context. One `Checker` per run; instances share
/// nothing.
pub struct Checker {
    table: InPlaceUnificationTable<TypeVar>,
    var_meta: Vec<VarMeta>,
    next_symbol_id: u32,
    next_nominal_id: u32,
    /// Diagnostics in inference order.
    pub errors: Vec<TypeError>,
    /// Inferred type per AST node, written exactly once per node.
    pub node_types: FxHashMap<NodeId, Type>,
    /// Identifier use -> declaration node, for the downstream code
    /// generator.
    pub binding_sources: FxHashMap<NodeId, NodeId>,
    pub(crate) registry: PackageRegistry,
    pub(crate) host: Option<Box<dyn PackageHost>>,
    pub(crate) graphql: Option<Box<dyn GraphqlValidator>>,
    pub(crate) graphql_schema: Option<String>,
    /// Checked between dependency components; exceeding it aborts the run
    /// with a timeout diagnostic.
    pub deadline: Option<Instant>,
    pub(crate) fn_frames: Vec<FnFrame>,
    pub well_known: WellKnownSymbols,
    /// Type references whose alias was unknown when lowered; resolved
    /// after the enclosing dependency component completes.
    pub(crate) deferred_refs: Vec<crate::annotation::DeferredRef>,
    /// `typeof` references whose binding was unknown when lowered.
    pub(crate) deferred_typeofs: Vec<crate::annotation::DeferredTypeOf>,
}

impl Checker {
    pub fn new() -> Self {
        Checker {
            table: InPlaceUnificationTable::new(),
            var_meta: Vec::new(),
            // ids 0 and 1 are reserved for the prelude's well-known symbols
            next_symbol_id: 2,
            next_nominal_id: 0,
            errors: Vec::new(),
            node_types: FxHashMap::default(),
            binding_sources: FxHashMap::default(),
            registry: PackageRegistry::new(),
            host: None,
            graphql: None,
            graphql_schema: None,
            deadline: None,
            fn_frames: Vec::new(),
            well_known: WellKnownSymbols { iterator: 0, custom_matcher: 1 },
            deferred_refs: Vec::new(),
            deferred_typeofs: Vec::new(),
        }
    }

    /// Attach the filesystem/package collaborator used by import
    /// resolution.
    pub fn with_host(mut self, host: Box<dyn PackageHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach the external GraphQL validator and the ambient schema used
    /// for `gql` tagged templates.
    pub fn with_graphql(mut self, validator: Box<dyn GraphqlValidator>, schema: String) -> Self {
        self.graphql = Some(validator);
        self.graphql_schema = Some(schema);
        self
    }

    // ── Variable creation ────────────────────────────────────────────────

    pub fn fresh_var(&mut self) -> Type {
        self.fresh_var_with(VarMeta::default())
    }

    pub(crate) fn fresh_var_with(&mut self, meta: VarMeta) -> Type {
        let var = self.table.new_key(None);
        let idx = var.0 as usize;
        // Snapshot rollback can shrink the table, so ids may be reissued;
        // the metadata slot is overwritten rather than pushed blindly.
        if idx < self.var_meta.len() {
            self.var_meta[idx] = meta;
        } else {
            while self.var_meta.len() < idx {
                self.var_meta.push(VarMeta::default());
            }
            self.var_meta.push(meta);
        }
        Type::var(var)
    }

    pub fn fresh_constrained_var(&mut self, constraint: Option<Type>, default: Option<Type>) -> Type {
        self.fresh_var_with(VarMeta { constraint, default, from_binding: false })
    }

    pub fn fresh_binding_var(&mut self, constraint: Option<Type>, default: Option<Type>) -> Type {
        self.fresh_var_with(VarMeta { constraint, default, from_binding: true })
    }

    pub(crate) fn var_meta(&self, var: TypeVar) -> VarMeta {
        self.var_meta.get(var.0 as usize).cloned().unwrap_or_default()
    }

    pub fn fresh_unique_symbol(&mut self) -> u32 {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        id
    }

    pub fn fresh_nominal_id(&mut self) -> u32 {
        let id = self.next_nominal_id;
        self.next_nominal_id += 1;
        id
    }

    // ── Pruning and resolution ───────────────────────────────────────────

    /// Follow instance pointers until reaching a non-variable or an
    /// unresolved variable. Idempotent: `prune(prune(t)) == prune(t)`.
    pub fn prune(&mut self, ty: &Type) -> Type {
        match ty.kind {
            TypeKind::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.prune(&inner),
                None => {
                    // Normalize to the root key so two unified-but-unbound
                    // variables prune to the same representative.
                    let root = self.table.find(v);
                    Type { kind: TypeKind::Var(root), provenance: ty.provenance.clone() }
                }
            },
            _ => ty.clone(),
        }
    }

    /// Resolve a type deeply, replacing every bound variable by its
    /// representative throughout the structure.
    pub fn resolve(&mut self, ty: &Type) -> Type {
        let pruned = self.prune(ty);
        let kind = match pruned.kind {
            TypeKind::Var(_) => pruned.kind,
            TypeKind::Tuple(elems) => {
                TypeKind::Tuple(elems.iter().map(|e| self.resolve(e)).collect())
            }
            TypeKind::RestSpread(inner) => TypeKind::RestSpread(Box::new(self.resolve(&inner))),
            TypeKind::Func(func) => TypeKind::Func(self.resolve_func(&func)),
            TypeKind::Object(obj) => TypeKind::Object(self.resolve_object(&obj)),
            TypeKind::Mutable(inner) => TypeKind::Mutable(Box::new(self.resolve(&inner))),
            TypeKind::MutUncertain(inner) => {
                TypeKind::MutUncertain(Box::new(self.resolve(&inner)))
            }
            TypeKind::Union(members) => {
                return union_of(members.iter().map(|m| self.resolve(m)).collect())
            }
            TypeKind::Intersection(members) => {
                TypeKind::Intersection(members.iter().map(|m| self.resolve(m)).collect())
            }
            TypeKind::Ref(mut r) => {
                r.type_args = r.type_args.iter().map(|a| self.resolve(a)).collect();
                TypeKind::Ref(r)
            }
            TypeKind::Extractor(e) => TypeKind::Extractor(ExtractorType {
                obj: Box::new(self.resolve(&e.obj)),
                args: e.args.iter().map(|a| self.resolve(a)).collect(),
            }),
            TypeKind::TemplateLit(mut t) => {
                t.types = t.types.iter().map(|x| self.resolve(x)).collect();
                TypeKind::TemplateLit(t)
            }
            TypeKind::KeyOf(inner) => TypeKind::KeyOf(Box::new(self.resolve(&inner))),
            TypeKind::Index(mut idx) => {
                idx.obj = Box::new(self.resolve(&idx.obj));
                idx.index = Box::new(self.resolve(&idx.index));
                TypeKind::Index(idx)
            }
            TypeKind::Cond(mut c) => {
                c.check = Box::new(self.resolve(&c.check));
                c.extends = Box::new(self.resolve(&c.extends));
                c.then_ty = Box::new(self.resolve(&c.then_ty));
                c.else_ty = Box::new(self.resolve(&c.else_ty));
                TypeKind::Cond(c)
            }
            TypeKind::Mapped(mut m) => {
                m.constraint = Box::new(self.resolve(&m.constraint));
                m.value = Box::new(self.resolve(&m.value));
                TypeKind::Mapped(m)
            }
            TypeKind::Regex(mut re) => {
                re.groups = re
                    .groups
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.resolve(ty)))
                    .collect();
                TypeKind::Regex(re)
            }
            other @ (TypeKind::Prim(_)
            | TypeKind::Lit(_)
            | TypeKind::Any
            | TypeKind::Unknown
            | TypeKind::Never
            | TypeKind::Wildcard
            | TypeKind::UniqueSymbol(_)
            | TypeKind::TypeOf(_)
            | TypeKind::Infer(_)) => other,
        };
        Type { kind, provenance: pruned.provenance }
    }

    fn resolve_func(&mut self, func: &FuncType) -> FuncType {
        FuncType {
            type_params: func.type_params.clone(),
            params: func
                .params
                .iter()
                .map(|p| FuncParam {
                    name: p.name.clone(),
                    rest: p.rest,
                    ty: self.resolve(&p.ty),
                    optional: p.optional,
                })
                .collect(),
            ret: Box::new(self.resolve(&func.ret)),
            throws: Box::new(self.resolve(&func.throws)),
        }
    }

    fn resolve_object(&mut self, obj: &ObjectType) -> ObjectType {
        let elems = obj
            .elems
            .iter()
            .map(|elem| match elem {
                ObjElem::Prop { key, ty, optional, readonly } => ObjElem::Prop {
                    key: key.clone(),
                    ty: self.resolve(ty),
                    optional: *optional,
                    readonly: *readonly,
                },
                ObjElem::Method { key, func, mut_self } => ObjElem::Method {
                    key: key.clone(),
                    func: self.resolve_func(func),
                    mut_self: *mut_self,
                },
                ObjElem::Getter { key, func } => {
                    ObjElem::Getter { key: key.clone(), func: self.resolve_func(func) }
                }
                ObjElem::Setter { key, func } => {
                    ObjElem::Setter { key: key.clone(), func: self.resolve_func(func) }
                }
                ObjElem::Constructor(func) => ObjElem::Constructor(self.resolve_func(func)),
                ObjElem::Callable(func) => ObjElem::Callable(self.resolve_func(func)),
                ObjElem::RestSpread(ty) => ObjElem::RestSpread(self.resolve(ty)),
                ObjElem::Mapped(m) => ObjElem::Mapped(m.clone()),
            })
            .collect();
        ObjectType { elems, nominal_id: obj.nominal_id, interface: obj.interface }
    }

    /// Structural equality after deep resolution.
    pub fn equals(&mut self, a: &Type, b: &Type) -> bool {
        self.resolve(a) == self.resolve(b)
    }

    // ── Occurs check ─────────────────────────────────────────────────────

    /// Whether `var` occurs anywhere inside `ty`. Walks through bound
    /// variables and, guardedly, through referenced alias bodies.
    pub fn occurs_in(&mut self, var: TypeVar, ty: &Type) -> bool {
        let mut seen_aliases: Vec<*const ()> = Vec::new();
        self.occurs_in_guarded(var, ty, &mut seen_aliases)
    }

    fn occurs_in_guarded(&mut self, var: TypeVar, ty: &Type, seen: &mut Vec<*const ()>) -> bool {
        match &ty.kind {
            TypeKind::Var(v) => {
                if self.table.unioned(*v, var) {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in_guarded(var, &inner, seen),
                    None => false,
                }
            }
            TypeKind::Prim(_)
            | TypeKind::Lit(_)
            | TypeKind::Any
            | TypeKind::Unknown
            | TypeKind::Never
            | TypeKind::Wildcard
            | TypeKind::UniqueSymbol(_)
            | TypeKind::Infer(_) => false,
            TypeKind::Regex(re) => re
                .groups
                .iter()
                .any(|(_, g)| self.occurs_in_guarded(var, g, seen)),
            TypeKind::Tuple(elems) => {
                elems.iter().any(|e| self.occurs_in_guarded(var, e, seen))
            }
            TypeKind::RestSpread(inner)
            | TypeKind::Mutable(inner)
            | TypeKind::MutUncertain(inner)
            | TypeKind::KeyOf(inner) => self.occurs_in_guarded(var, inner, seen),
            TypeKind::Func(func) => self.occurs_in_func(var, func, seen),
            TypeKind::Object(obj) => obj.elems.iter().any(|elem| match elem {
                ObjElem::Prop { ty, .. } => self.occurs_in_guarded(var, ty, seen),
                ObjElem::Method { func, .. }
                | ObjElem::Getter { func, .. }
                | ObjElem::Setter { func, .. }
                | ObjElem::Constructor(func)
                | ObjElem::Callable(func) => self.occurs_in_func(var, func, seen),
                ObjElem::RestSpread(ty) => self.occurs_in_guarded(var, ty, seen),
                ObjElem::Mapped(m) => {
                    self.occurs_in_guarded(var, &m.constraint, seen)
                        || self.occurs_in_guarded(var, &m.value, seen)
                }
            }),
            TypeKind::Union(members) | TypeKind::Intersection(members) => {
                members.iter().any(|m| self.occurs_in_guarded(var, m, seen))
            }
            TypeKind::Ref(r) => {
                if r.type_args.iter().any(|a| self.occurs_in_guarded(var, a, seen)) {
                    return true;
                }
                // Descend into the alias body only when the alias is
                // resolved, guarding against recursive aliases.
                let alias = r.alias.borrow().clone();
                if let Some(alias) = alias {
                    let ptr = std::rc::Rc::as_ptr(&alias) as *const ();
                    if seen.contains(&ptr) {
                        return false;
                    }
                    seen.push(ptr);
                    let body = alias.borrow().ty.clone();
                    return self.occurs_in_guarded(var, &body, seen);
                }
                false
            }
            TypeKind::Extractor(e) => {
                self.occurs_in_guarded(var, &e.obj, seen)
                    || e.args.iter().any(|a| self.occurs_in_guarded(var, a, seen))
            }
            TypeKind::TemplateLit(t) => {
                t.types.iter().any(|x| self.occurs_in_guarded(var, x, seen))
            }
            TypeKind::Index(idx) => {
                self.occurs_in_guarded(var, &idx.obj, seen)
                    || self.occurs_in_guarded(var, &idx.index, seen)
            }
            TypeKind::TypeOf(t) => {
                let filled = t.slot.borrow().clone();
                match filled {
                    Some(inner) => self.occurs_in_guarded(var, &inner, seen),
                    None => false,
                }
            }
            TypeKind::Cond(c) => {
                self.occurs_in_guarded(var, &c.check, seen)
                    || self.occurs_in_guarded(var, &c.extends, seen)
                    || self.occurs_in_guarded(var, &c.then_ty, seen)
                    || self.occurs_in_guarded(var, &c.else_ty, seen)
            }
            TypeKind::Mapped(m) => {
                self.occurs_in_guarded(var, &m.constraint, seen)
                    || self.occurs_in_guarded(var, &m.value, seen)
            }
        }
    }

    fn occurs_in_func(&mut self, var: TypeVar, func: &FuncType, seen: &mut Vec<*const ()>) -> bool {
        func.params
            .iter()
            .any(|p| self.occurs_in_guarded(var, &p.ty, seen))
            || self.occurs_in_guarded(var, &func.ret, seen)
            || self.occurs_in_guarded(var, &func.throws, seen)
    }

    // ── Binding ──────────────────────────────────────────────────────────

    /// Point a variable's instance link at a target type.
    pub(crate) fn bind(&mut self, var: TypeVar, target: &Type, origin: Span) -> Vec<TypeError> {
        let target = self.prune(target);

        // Already the same representative: nothing to do.
        if let TypeKind::Var(w) = target.kind {
            if self.table.unioned(var, w) {
                return Vec::new();
            }
        }

        if self.occurs_in(var, &target) {
            let resolved = self.resolve(&target);
            let span = target.span().unwrap_or(origin);
            let err = TypeError::RecursiveUnification { ty: resolved, span };
            return vec![err];
        }

        let meta = self.var_meta(var);
        let mut errors = Vec::new();

        if let TypeKind::Var(w) = target.kind {
            // Variable-to-variable: unify constraints when both carry one,
            // then union the equivalence classes.
            let other_meta = self.var_meta(w);
            if let (Some(c1), Some(c2)) = (&meta.constraint, &other_meta.constraint) {
                errors.extend(self.unify_at_depth(c1, c2, origin, 0));
            }
            self.table
                .unify_var_var(var, w)
                .expect("two unbound variables always union");
            return errors;
        }

        // Pattern-default handling: a defaulted binding matched against an
        // optional member sees `T | undefined`; the default's type stands
        // in for the absent cases.
        let mut target = target;
        if let Some(default) = &meta.default {
            if let TypeKind::Union(members) = &target.kind {
                let has_absent = members.iter().any(|m| {
                    matches!(&m.kind, TypeKind::Lit(Lit::Null) | TypeKind::Lit(Lit::Undefined))
                });
                if has_absent {
                    let defined: Vec<Type> = members
                        .iter()
                        .filter(|m| {
                            !matches!(
                                &m.kind,
                                TypeKind::Lit(Lit::Null) | TypeKind::Lit(Lit::Undefined)
                            )
                        })
                        .cloned()
                        .collect();
                    if !defined.is_empty() {
                        let mut adjusted = defined;
                        adjusted.push(default.clone());
                        target = union_of(adjusted);
                    }
                }
            }
        }

        if let Some(constraint) = &meta.constraint {
            errors.extend(self.unify_at_depth(&target, &constraint.clone(), origin, 0));
        }

        if errors.is_empty() {
            self.table
                .unify_var_value(var, Some(target))
                .expect("binding an unbound variable after the occurs check");
        }
        errors
    }

    // ── Unification ──────────────────────────────────────────────────────

    /// Check that every value of `a` is assignable to `b`, binding type
    /// variables along the way. Returns the (possibly empty) error list.
    ///
    /// `origin` anchors diagnostics that have no better span from type
    /// provenance.
    pub fn unify(&mut self, a: &Type, b: &Type, origin: Span) -> Vec<TypeError> {
        self.unify_at_depth(a, b, origin, 0)
    }

    /// Run a unification transactionally: variable bindings are rolled
    /// back unless it fully succeeds. Used for overload resolution and
    /// conditional-type evaluation.
    pub(crate) fn try_unify(&mut self, a: &Type, b: &Type, origin: Span) -> Vec<TypeError> {
        self.transaction(|ck| ck.unify_at_depth(a, b, origin, 0))
    }

    /// Run a closure transactionally against the union-find table: its
    /// bindings are kept only when it reports no errors.
    pub(crate) fn transaction(
        &mut self,
        run: impl FnOnce(&mut Checker) -> Vec<TypeError>,
    ) -> Vec<TypeError> {
        let snapshot = self.table.snapshot();
        let errors = run(self);
        if errors.is_empty() {
            self.table.commit(snapshot);
        } else {
            self.table.rollback_to(snapshot);
        }
        errors
    }

    fn mismatch(&mut self, a: &Type, b: &Type, origin: Span) -> Vec<TypeError> {
        let span = a.span().or_else(|| b.span()).unwrap_or(origin);
        let source = self.resolve(a);
        let target = self.resolve(b);
        vec![TypeError::CannotUnifyTypes { source, target, span }]
    }

    pub(crate) fn unify_at_depth(
        &mut self,
        a: &Type,
        b: &Type,
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        let a = self.prune(a);
        let b = self.prune(b);

        // Reflexivity fast path. Provenance is excluded from equality, so
        // this also covers identical computed types without expanding them.
        if a == b {
            return Vec::new();
        }

        match (&a.kind, &b.kind) {
            // 1. Variable on either side.
            (TypeKind::Var(v), _) => self.bind(*v, &b, origin),
            (_, TypeKind::Var(v)) => self.bind(*v, &a, origin),

            // 2. Mutable on both sides: invariant.
            (TypeKind::Mutable(ia), TypeKind::Mutable(ib)) => {
                let (ia, ib) = (ia.as_ref().clone(), ib.as_ref().clone());
                self.unify_mut(&ia, &ib, origin, depth)
            }

            // Context-determined mutability wrappers dissolve.
            (TypeKind::MutUncertain(inner), _) => {
                let inner = inner.as_ref().clone();
                self.unify_at_depth(&inner, &b, origin, depth)
            }
            (_, TypeKind::MutUncertain(inner)) => {
                let inner = inner.as_ref().clone();
                self.unify_at_depth(&a, &inner, origin, depth)
            }

            // 3. Mutable on one side only: strip and re-unify. Whether an
            // immutable target may be written through is the assignment
            // checker's concern, not unification's.
            (TypeKind::Mutable(inner), _) => {
                let inner = inner.as_ref().clone();
                self.unify_at_depth(&inner, &b, origin, depth)
            }
            (_, TypeKind::Mutable(inner)) => {
                let inner = inner.as_ref().clone();
                self.unify_at_depth(&a, &inner, origin, depth)
            }

            // 4. Primitives.
            (TypeKind::Prim(p1), TypeKind::Prim(p2)) => {
                if p1 == p2 {
                    Vec::new()
                } else {
                    self.mismatch(&a, &b, origin)
                }
            }

            // 5-6. Any and Wildcard absorb both directions.
            (TypeKind::Any, _) | (_, TypeKind::Any) => Vec::new(),
            (TypeKind::Wildcard, _) | (_, TypeKind::Wildcard) => Vec::new(),

            // 7-8. Unknown is top only.
            (_, TypeKind::Unknown) => Vec::new(),
            (TypeKind::Unknown, _) => self.mismatch(&a, &b, origin),

            // 9. Never is bottom only.
            (TypeKind::Never, _) => Vec::new(),
            (_, TypeKind::Never) => self.mismatch(&a, &b, origin),

            // 10. Tuples.
            (TypeKind::Tuple(ea), TypeKind::Tuple(eb)) => {
                let (ea, eb) = (ea.clone(), eb.clone());
                self.unify_tuples(&ea, &eb, origin, depth)
            }

            // 11. Tuple vs Array<E>, both directions.
            (TypeKind::Tuple(elems), _) if b.array_elem().is_some() => {
                let elem = b.array_elem().expect("checked").clone();
                let elems = elems.clone();
                let mut errors = Vec::new();
                for e in &elems {
                    match &e.kind {
                        TypeKind::RestSpread(inner) => {
                            let arr = Type::array(elem.clone());
                            errors.extend(self.unify_at_depth(inner, &arr, origin, depth));
                        }
                        _ => errors.extend(self.unify_at_depth(e, &elem, origin, depth)),
                    }
                }
                errors
            }
            (_, TypeKind::Tuple(elems)) if a.array_elem().is_some() => {
                let elem = a.array_elem().expect("checked").clone();
                let elems = elems.clone();
                let mut errors = Vec::new();
                for e in &elems {
                    match &e.kind {
                        TypeKind::RestSpread(inner) => {
                            let arr = Type::array(elem.clone());
                            errors.extend(self.unify_at_depth(&arr, inner, origin, depth));
                        }
                        _ => errors.extend(self.unify_at_depth(&elem, e, origin, depth)),
                    }
                }
                errors
            }

            // 12. Arrays are covariant.
            _ if a.array_elem().is_some() && b.array_elem().is_some() => {
                let ea = a.array_elem().expect("checked").clone();
                let eb = b.array_elem().expect("checked").clone();
                self.unify_at_depth(&ea, &eb, origin, depth)
            }

            // 13. A rest spread against an array unifies its inner type
            // with the whole array; two rest spreads unify their inner
            // types.
            (TypeKind::RestSpread(inner), _) if b.array_elem().is_some() => {
                let inner = inner.as_ref().clone();
                self.unify_at_depth(&inner, &b, origin, depth)
            }
            (TypeKind::RestSpread(ia), TypeKind::RestSpread(ib)) => {
                let (ia, ib) = (ia.as_ref().clone(), ib.as_ref().clone());
                self.unify_at_depth(&ia, &ib, origin, depth)
            }

            // 14. Functions.
            (TypeKind::Func(fa), TypeKind::Func(fb)) => {
                let (fa, fb) = (fa.clone(), fb.clone());
                self.unify_funcs(&fa, &fb, origin, depth)
            }

            // 15. Same-name type references.
            (TypeKind::Ref(ra), TypeKind::Ref(rb)) if ra.name == rb.name => {
                if ra.type_args.is_empty() && rb.type_args.is_empty() {
                    let mut errors = Vec::new();
                    for r in [ra, rb] {
                        if r.alias.borrow().is_none() {
                            errors.push(TypeError::UnknownType {
                                name: r.name.to_string(),
                                span: a.span().or_else(|| b.span()).unwrap_or(origin),
                            });
                        }
                    }
                    errors
                } else if ra.type_args.len() != rb.type_args.len() {
                    vec![TypeError::TypeParamMismatch {
                        expected: rb.type_args.len(),
                        found: ra.type_args.len(),
                        span: a.span().or_else(|| b.span()).unwrap_or(origin),
                    }]
                } else {
                    // Substitute the arguments into the alias body on both
                    // sides and recurse.
                    match (expand_type(self, &a), expand_type(self, &b)) {
                        (Some(ea), Some(eb)) => {
                            self.unify_at_depth(&ea, &eb, origin, depth + 1)
                        }
                        _ => {
                            vec![TypeError::UnknownType {
                                name: ra.name.to_string(),
                                span: a.span().or_else(|| b.span()).unwrap_or(origin),
                            }]
                        }
                    }
                }
            }

            // 16. Literal against its primitive.
            (TypeKind::Lit(lit), TypeKind::Prim(prim)) => {
                if lit.matches_prim(*prim) {
                    Vec::new()
                } else {
                    self.mismatch(&a, &b, origin)
                }
            }

            // A template-literal type is always a subtype of string.
            (TypeKind::TemplateLit(_), TypeKind::Prim(Primitive::String)) => Vec::new(),

            // 17. Two literals: structural equality (handled by the fast
            // path above when equal).
            (TypeKind::Lit(_), TypeKind::Lit(_)) => self.mismatch(&a, &b, origin),

            // 18. String literal against a regex: run the pattern.
            (TypeKind::Lit(Lit::Str(text)), TypeKind::Regex(re)) => {
                let text = text.clone();
                let re = re.clone();
                match crate::ty::compile_regex(&re) {
                    Ok(compiled) => match compiled.captures(&text) {
                        Some(caps) => {
                            let mut errors = Vec::new();
                            for (group, group_ty) in &re.groups {
                                if let Some(m) = caps.name(group) {
                                    let captured = Type::lit_str(m.as_str());
                                    errors.extend(self.unify_at_depth(
                                        &captured, group_ty, origin, depth,
                                    ));
                                }
                            }
                            errors
                        }
                        None => self.mismatch(&a, &b, origin),
                    },
                    Err(_) => self.mismatch(&a, &b, origin),
                }
            }

            // 19. Unique symbols compare by identity (covered by the fast
            // path when equal).
            (TypeKind::UniqueSymbol(_), TypeKind::UniqueSymbol(_)) => {
                self.mismatch(&a, &b, origin)
            }

            // 20. Extractors dispatch through Symbol.customMatcher; the
            // non-extractor side is the scrutinee whichever side the
            // pattern type landed on.
            (_, TypeKind::Extractor(extractor)) => {
                let extractor = extractor.clone();
                self.unify_extractor(&a, &extractor, origin, depth)
            }
            (TypeKind::Extractor(extractor), _) => {
                let extractor = extractor.clone();
                self.unify_extractor(&b, &extractor, origin, depth)
            }

            // 21. Objects.
            (TypeKind::Object(oa), TypeKind::Object(ob)) => {
                let (oa, ob) = (oa.clone(), ob.clone());
                self.unify_objects(&oa, &ob, origin, depth)
            }

            // 22. A union source: every member must be assignable.
            (TypeKind::Union(members), _) => {
                let members = members.clone();
                let mut errors = Vec::new();
                for member in &members {
                    errors.extend(self.unify_at_depth(member, &b, origin, depth));
                }
                errors
            }

            // 23. A union target: some member must accept the source.
            (_, TypeKind::Union(members)) => {
                let members = members.clone();
                for member in &members {
                    if self.try_unify_at_depth(&a, member, origin, depth).is_empty() {
                        return Vec::new();
                    }
                }
                self.mismatch(&a, &b, origin)
            }

            // 24. Expand one step and retry; fail once nothing changes.
            _ => {
                if depth >= MAX_EXPANSION_DEPTH {
                    return self.mismatch(&a, &b, origin);
                }
                if let Some(expanded) = expand_type(self, &a) {
                    return self.unify_at_depth(&expanded, &b, origin, depth + 1);
                }
                if let Some(expanded) = expand_type(self, &b) {
                    return self.unify_at_depth(&a, &expanded, origin, depth + 1);
                }
                self.mismatch(&a, &b, origin)
            }
        }
    }

    fn try_unify_at_depth(
        &mut self,
        a: &Type,
        b: &Type,
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        let snapshot = self.table.snapshot();
        let errors = self.unify_at_depth(a, b, origin, depth);
        if errors.is_empty() {
            self.table.commit(snapshot);
        } else {
            self.table.rollback_to(snapshot);
        }
        errors
    }

    // ── Mutable unification (invariant) ──────────────────────────────────

    /// `mut T` against `mut U` requires the two to be equal; there is no
    /// subtyping across mutable references, because mutable aliasing under
    /// covariance is unsound.
    fn unify_mut(&mut self, a: &Type, b: &Type, origin: Span, depth: u32) -> Vec<TypeError> {
        let a = self.prune(a);
        let b = self.prune(b);
        // Unresolved variables still bind; invariance constrains only
        // already-concrete sides.
        if matches!(a.kind, TypeKind::Var(_)) || matches!(b.kind, TypeKind::Var(_)) {
            return self.unify_at_depth(&a, &b, origin, depth);
        }
        if self.equals(&a, &b) {
            return Vec::new();
        }
        if depth < MAX_EXPANSION_DEPTH {
            if let Some(expanded) = expand_type(self, &a) {
                return self.unify_mut(&expanded, &b, origin, depth + 1);
            }
            if let Some(expanded) = expand_type(self, &b) {
                return self.unify_mut(&a, &expanded, origin, depth + 1);
            }
        }
        let span = a.span().or_else(|| b.span()).unwrap_or(origin);
        let source = Type::mutable(self.resolve(&a));
        let target = Type::mutable(self.resolve(&b));
        vec![TypeError::CannotUnifyTypes { source, target, span }]
    }

    // ── Tuple unification ────────────────────────────────────────────────

    fn unify_tuples(
        &mut self,
        source: &[Type],
        target: &[Type],
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        let src_rest = source
            .last()
            .filter(|t| matches!(t.kind, TypeKind::RestSpread(_)));
        let tgt_rest = target
            .last()
            .filter(|t| matches!(t.kind, TypeKind::RestSpread(_)));

        let mut errors = Vec::new();

        if let Some(rest) = tgt_rest {
            // Target ends with a rest: pair the fixed prefix, pack the
            // source tail into a tuple, and unify it with the rest type.
            let fixed = target.len() - 1;
            if source.len() < fixed {
                let span = origin;
                errors.push(TypeError::NotEnoughElementsToUnpack {
                    expected: fixed,
                    found: source.len(),
                    span,
                });
                return errors;
            }
            for (s, t) in source.iter().zip(target[..fixed].iter()) {
                errors.extend(self.unify_at_depth(s, t, origin, depth));
            }
            let tail = Type::tuple(source[fixed..].to_vec());
            let rest_inner = match &rest.kind {
                TypeKind::RestSpread(inner) => inner.as_ref().clone(),
                _ => unreachable!("filtered above"),
            };
            errors.extend(self.unify_at_depth(&tail, &rest_inner, origin, depth));
            return errors;
        }

        if let Some(rest) = src_rest {
            // Source ends with a rest: its inner type must cover the
            // target's remaining elements.
            let fixed = source.len() - 1;
            for (s, t) in source[..fixed].iter().zip(target.iter()) {
                errors.extend(self.unify_at_depth(s, t, origin, depth));
            }
            if target.len() >= fixed {
                let tail = Type::tuple(target[fixed..].to_vec());
                let rest_inner = match &rest.kind {
                    TypeKind::RestSpread(inner) => inner.as_ref().clone(),
                    _ => unreachable!("filtered above"),
                };
                errors.extend(self.unify_at_depth(&rest_inner, &tail, origin, depth));
            }
            return errors;
        }

        if target.len() > source.len() {
            // Destructuring more elements than the source provides: the
            // extras become `undefined`, with one diagnostic spanning them.
            for (s, t) in source.iter().zip(target.iter()) {
                errors.extend(self.unify_at_depth(s, t, origin, depth));
            }
            let undefined = Type::undefined();
            for t in &target[source.len()..] {
                errors.extend(self.unify_at_depth(&undefined, t, origin, depth));
            }
            let extras_span = target[source.len()..]
                .iter()
                .filter_map(|t| t.span())
                .reduce(Span::merge)
                .unwrap_or(origin);
            errors.push(TypeError::NotEnoughElementsToUnpack {
                expected: target.len(),
                found: source.len(),
                span: extras_span,
            });
            return errors;
        }

        if source.len() != target.len() {
            return self.mismatch(
                &Type::tuple(source.to_vec()),
                &Type::tuple(target.to_vec()),
                origin,
            );
        }

        for (s, t) in source.iter().zip(target.iter()) {
            errors.extend(self.unify_at_depth(s, t, origin, depth));
        }
        errors
    }

    // ── Function unification ─────────────────────────────────────────────

    /// Parameters are contravariant; return and throws are covariant. Rest
    /// parameters are recognized by the parameter's pattern.
    fn unify_funcs(
        &mut self,
        source: &FuncType,
        target: &FuncType,
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        // Generalized functions must agree on type-parameter count; the
        // call-site path instantiates before ever reaching here.
        if source.type_params.len() != target.type_params.len() {
            return vec![TypeError::TypeParamMismatch {
                expected: target.type_params.len(),
                found: source.type_params.len(),
                span: origin,
            }];
        }

        let mut errors = Vec::new();
        let r1 = source.rest_index();
        let r2 = target.rest_index();

        match (r1, r2) {
            (Some(r1), Some(r2)) => {
                if r1 != r2 {
                    return self.func_mismatch(source, target, origin);
                }
                for i in 0..r1 {
                    errors.extend(self.unify_param(source, target, i, origin, depth));
                    errors.extend(self.unify_at_depth(
                        &target.params[i].ty.clone(),
                        &source.params[i].ty.clone(),
                        origin,
                        depth,
                    ));
                }
                errors.extend(self.unify_at_depth(
                    &target.params[r2].ty.clone(),
                    &source.params[r1].ty.clone(),
                    origin,
                    depth,
                ));
            }
            (None, Some(r2)) => {
                // Target has a rest: the source must supply at least the
                // fixed prefix; its excess parameters union into the rest's
                // element type.
                if source.params.len() < r2 {
                    return self.func_mismatch(source, target, origin);
                }
                for i in 0..r2 {
                    errors.extend(self.unify_param(source, target, i, origin, depth));
                    errors.extend(self.unify_at_depth(
                        &target.params[i].ty.clone(),
                        &source.params[i].ty.clone(),
                        origin,
                        depth,
                    ));
                }
                let excess: Vec<Type> = source.params[r2..]
                    .iter()
                    .map(|p| p.ty.clone())
                    .collect();
                let elem = union_of(excess);
                let arr = Type::array(elem);
                errors.extend(self.unify_at_depth(
                    &target.params[r2].ty.clone(),
                    &arr,
                    origin,
                    depth,
                ));
            }
            (Some(r1), None) => {
                // Source has a rest: fixed target parameters beyond it are
                // absorbed by the rest's array element type.
                let src_elem = source.params[r1]
                    .ty
                    .array_elem()
                    .cloned()
                    .unwrap_or_else(Type::any);
                for (i, tparam) in target.params.iter().enumerate() {
                    if i < r1 {
                        errors.extend(self.unify_param(source, target, i, origin, depth));
                        errors.extend(self.unify_at_depth(
                            &tparam.ty.clone(),
                            &source.params[i].ty.clone(),
                            origin,
                            depth,
                        ));
                    } else {
                        errors.extend(self.unify_at_depth(
                            &tparam.ty.clone(),
                            &src_elem,
                            origin,
                            depth,
                        ));
                    }
                }
            }
            (None, None) => {
                if target.params.len() > source.params.len() {
                    return self.func_mismatch(source, target, origin);
                }
                for i in 0..target.params.len() {
                    errors.extend(self.unify_param(source, target, i, origin, depth));
                    errors.extend(self.unify_at_depth(
                        &target.params[i].ty.clone(),
                        &source.params[i].ty.clone(),
                        origin,
                        depth,
                    ));
                }
            }
        }

        errors.extend(self.unify_at_depth(&source.ret.clone(), &target.ret.clone(), origin, depth));
        errors.extend(self.unify_at_depth(
            &source.throws.clone(),
            &target.throws.clone(),
            origin,
            depth,
        ));
        errors
    }

    /// The optional-parameter rule: a required source parameter cannot
    /// stand in for an optional target parameter (the target's callers may
    /// omit the argument).
    fn unify_param(
        &mut self,
        source: &FuncType,
        target: &FuncType,
        index: usize,
        origin: Span,
        _depth: u32,
    ) -> Vec<TypeError> {
        let sp = &source.params[index];
        let tp = &target.params[index];
        if !sp.optional && tp.optional {
            return self.func_mismatch(source, target, origin);
        }
        Vec::new()
    }

    fn func_mismatch(
        &mut self,
        source: &FuncType,
        target: &FuncType,
        origin: Span,
    ) -> Vec<TypeError> {
        self.mismatch(
            &Type::new(TypeKind::Func(source.clone())),
            &Type::new(TypeKind::Func(target.clone())),
            origin,
        )
    }

    // ── Object unification ───────────────────────────────────────────────

    /// Flatten an object's members into a key -> type map in insertion
    /// order. Optional properties contribute `T | undefined`; getters
    /// contribute their return type and setters their parameter type into
    /// the same key space.
    pub(crate) fn object_member_map(&mut self, obj: &ObjectType) -> Vec<(ObjKey, Type)> {
        let mut out: Vec<(ObjKey, Type)> = Vec::new();
        let mut push = |key: &ObjKey, ty: Type, out: &mut Vec<(ObjKey, Type)>| {
            if !out.iter().any(|(k, _)| k == key) {
                out.push((key.clone(), ty));
            }
        };
        for elem in &obj.elems {
            match elem {
                ObjElem::Prop { key, ty, optional, .. } => {
                    let ty = if *optional {
                        union_of(vec![ty.clone(), Type::undefined()])
                    } else {
                        ty.clone()
                    };
                    push(key, ty, &mut out);
                }
                ObjElem::Method { key, func, .. } => {
                    push(key, Type::new(TypeKind::Func(func.clone())), &mut out);
                }
                ObjElem::Getter { key, func } => {
                    push(key, func.ret.as_ref().clone(), &mut out);
                }
                ObjElem::Setter { key, func } => {
                    let ty = func
                        .params
                        .first()
                        .map(|p| p.ty.clone())
                        .unwrap_or_else(Type::any);
                    push(key, ty, &mut out);
                }
                ObjElem::Constructor(_) | ObjElem::Callable(_) | ObjElem::Mapped(_) => {}
                ObjElem::RestSpread(_) => {}
            }
        }
        out
    }

    fn object_rest(&self, obj: &ObjectType) -> Option<Type> {
        obj.elems.iter().find_map(|elem| match elem {
            ObjElem::RestSpread(ty) => Some(ty.clone()),
            _ => None,
        })
    }

    fn unify_objects(
        &mut self,
        source: &ObjectType,
        target: &ObjectType,
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        // Nominal identity dominates structure: mismatched ids are
        // incompatible regardless of shape, matching ids continue
        // structurally (binding any pattern variables in the members).
        if let (Some(ia), Some(ib)) = (source.nominal_id, target.nominal_id) {
            if ia != ib {
                return self.mismatch(
                    &Type::new(TypeKind::Object(source.clone())),
                    &Type::new(TypeKind::Object(target.clone())),
                    origin,
                );
            }
        } else if target.nominal_id.is_some() {
            return self.mismatch(
                &Type::new(TypeKind::Object(source.clone())),
                &Type::new(TypeKind::Object(target.clone())),
                origin,
            );
        }

        let src_members = self.object_member_map(source);
        let tgt_members = self.object_member_map(target);
        let src_rest = self.object_rest(source);
        let tgt_rest = self.object_rest(target);

        let mut errors = Vec::new();

        match (&src_rest, &tgt_rest) {
            (Some(_), Some(_)) => {
                errors.push(TypeError::Unimplemented {
                    feature: "unifying two objects that both have rest spreads".into(),
                    span: origin,
                });
            }
            (None, None) => {
                for (key, tgt_ty) in &tgt_members {
                    match src_members.iter().find(|(k, _)| k == key) {
                        Some((_, src_ty)) => {
                            errors.extend(self.unify_at_depth(src_ty, tgt_ty, origin, depth));
                        }
                        None => {
                            let span = tgt_ty.span().unwrap_or(origin);
                            let ty = Type::new(TypeKind::Object(source.clone()));
                            let ty = self.resolve(&ty);
                            errors.push(TypeError::KeyNotFound {
                                key: key.to_string(),
                                ty,
                                span,
                            });
                        }
                    }
                }
            }
            (Some(rest), None) => {
                // Destructuring shape: matched keys unify pairwise, the
                // unmatched remainder of the target packs into the rest.
                let mut remainder = Vec::new();
                for (key, tgt_ty) in &tgt_members {
                    match src_members.iter().find(|(k, _)| k == key) {
                        Some((_, src_ty)) => {
                            errors.extend(self.unify_at_depth(src_ty, tgt_ty, origin, depth));
                        }
                        None => remainder.push(ObjElem::Prop {
                            key: key.clone(),
                            ty: tgt_ty.clone(),
                            optional: false,
                            readonly: false,
                        }),
                    }
                }
                for (key, src_ty) in &src_members {
                    if !tgt_members.iter().any(|(k, _)| k == key) {
                        let span = src_ty.span().unwrap_or(origin);
                        let ty = Type::new(TypeKind::Object(target.clone()));
                        let ty = self.resolve(&ty);
                        errors.push(TypeError::KeyNotFound { key: key.to_string(), ty, span });
                    }
                }
                let packed = Type::object(remainder);
                errors.extend(self.unify_at_depth(&packed, &rest.clone(), origin, depth));
            }
            (None, Some(rest)) => {
                let mut remainder = Vec::new();
                for (key, src_ty) in &src_members {
                    match tgt_members.iter().find(|(k, _)| k == key) {
                        Some((_, tgt_ty)) => {
                            errors.extend(self.unify_at_depth(src_ty, tgt_ty, origin, depth));
                        }
                        None => remainder.push(ObjElem::Prop {
                            key: key.clone(),
                            ty: src_ty.clone(),
                            optional: false,
                            readonly: false,
                        }),
                    }
                }
                for (key, tgt_ty) in &tgt_members {
                    if !src_members.iter().any(|(k, _)| k == key) {
                        let span = tgt_ty.span().unwrap_or(origin);
                        let ty = Type::new(TypeKind::Object(source.clone()));
                        let ty = self.resolve(&ty);
                        errors.push(TypeError::KeyNotFound { key: key.to_string(), ty, span });
                    }
                }
                let packed = Type::object(remainder);
                errors.extend(self.unify_at_depth(&packed, &rest.clone(), origin, depth));
            }
        }

        errors
    }

    // ── Extractor unification ────────────────────────────────────────────

    /// `source` matched against `Extractor{obj, args}`: the object must
    /// expose a single-parameter `Symbol.customMatcher` method whose tuple
    /// return covers the extractor's argument patterns.
    fn unify_extractor(
        &mut self,
        source: &Type,
        extractor: &ExtractorType,
        origin: Span,
        depth: u32,
    ) -> Vec<TypeError> {
        let mut obj_ty = self.prune(&extractor.obj);
        let mut steps = 0;
        let obj = loop {
            match &obj_ty.kind {
                TypeKind::Object(obj) => break obj.clone(),
                _ => match expand_type(self, &obj_ty) {
                    Some(next) if steps < MAX_EXPANSION_DEPTH => {
                        obj_ty = next;
                        steps += 1;
                    }
                    _ => {
                        let ty = self.resolve(&obj_ty);
                        return vec![TypeError::InvalidExtractorType { ty, span: origin }];
                    }
                },
            }
        };

        let matcher_key = ObjKey::Sym(self.well_known.custom_matcher);
        let matcher = obj.elems.iter().find_map(|elem| match elem {
            ObjElem::Method { key, func, .. } if *key == matcher_key => Some(func.clone()),
            _ => None,
        });
        let matcher = match matcher {
            Some(func) => func,
            None => {
                let ty = self.resolve(&Type::new(TypeKind::Object(obj)));
                return vec![TypeError::MissingCustomMatcher { ty, span: origin }];
            }
        };

        if matcher.params.len() != 1 {
            return vec![TypeError::IncorrectParamCountForCustomMatcher {
                expected: 1,
                found: matcher.params.len(),
                span: origin,
            }];
        }

        let mut errors = self.unify_at_depth(source, &matcher.params[0].ty.clone(), origin, depth);

        let ret = self.prune(&matcher.ret);
        match &ret.kind {
            TypeKind::Tuple(elems) => {
                let elems = elems.clone();
                let unpack =
                    self.unify_tuples(&elems, &extractor.args.clone(), origin, depth);
                if !unpack.is_empty() {
                    errors.push(TypeError::ExtractorReturnTypeMismatch { span: origin });
                    errors.extend(unpack);
                }
            }
            _ => {
                let found = self.resolve(&ret);
                errors.push(TypeError::ExtractorMustReturnTuple { found, span: origin });
            }
        }
        errors
    }

    // ── Generic instantiation ────────────────────────────────────────────

    /// Replace a generalized function's type parameters with fresh
    /// variables (inheriting constraints) so a call site can solve for
    /// them. Inner generic functions shadow outer parameters of the same
    /// name and are left untouched.
    pub(crate) fn instantiate_func(&mut self, func: &FuncType) -> FuncType {
        if func.type_params.is_empty() {
            return func.clone();
        }
        let mut mapping: FxHashMap<String, Type> = FxHashMap::default();
        for tp in &func.type_params {
            let var = self.fresh_constrained_var(tp.constraint.clone(), tp.default.clone());
            mapping.insert(tp.name.clone(), var);
        }
        let stripped = FuncType {
            type_params: Vec::new(),
            params: func.params.clone(),
            ret: func.ret.clone(),
            throws: func.throws.clone(),
        };
        let substituted =
            substitute_named(&Type::new(TypeKind::Func(stripped)), &mapping);
        match substituted.kind {
            TypeKind::Func(f) => f,
            _ => unreachable!("substitution preserves the constructor"),
        }
    }

    // ── Diagnostics plumbing ─────────────────────────────────────────────

    /// Record a node's inferred type. Each node is finalized exactly once.
    pub(crate) fn set_node_type(&mut self, node: NodeId, ty: Type) {
        let prev = self.node_types.insert(node, ty);
        debug_assert!(prev.is_none(), "inferred type for node {node:?} set twice");
    }

    /// Fallback span for errors with no AST anchor (prelude constraints).
    pub(crate) fn builtin_span() -> Span {
        Span::empty(SourceId(u32::MAX))
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_ast::Lit;

    fn origin() -> Span {
        Checker::builtin_span()
    }

    #[test]
    fn unify_two_fresh_vars() {
        let mut ck = Checker::new();
        let a = ck.fresh_var();
        let b = ck.fresh_var();
        assert!(ck.unify(&a, &b, origin()).is_empty());
        assert!(ck.unify(&a, &Type::number(), origin()).is_empty());
        assert_eq!(ck.resolve(&a), Type::number());
        assert_eq!(ck.resolve(&b), Type::number());
    }

    #[test]
    fn prune_is_idempotent() {
        let mut ck = Checker::new();
        let a = ck.fresh_var();
        let b = ck.fresh_var();
        assert!(ck.unify(&a, &b, origin()).is_empty());
        assert!(ck.unify(&b, &Type::string(), origin()).is_empty());
        let once = ck.prune(&a);
        let twice = ck.prune(&once);
        assert_eq!(once, twice);
        assert_eq!(once, Type::string());
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut ck = Checker::new();
        let a = ck.fresh_var();
        let fun = Type::func(
            vec![FuncParam { name: "x".into(), rest: false, ty: a.clone(), optional: false }],
            Type::number(),
        );
        let errors = ck.unify(&a, &fun, origin());
        assert!(matches!(errors[0], TypeError::RecursiveUnification { .. }));
        // The variable stays unbound.
        assert_eq!(ck.resolve(&a), ck.prune(&a));
    }

    #[test]
    fn prim_mismatch_reports() {
        let mut ck = Checker::new();
        let errors = ck.unify(&Type::number(), &Type::string(), origin());
        assert!(matches!(errors[0], TypeError::CannotUnifyTypes { .. }));
    }

    #[test]
    fn any_absorbs_both_directions() {
        let mut ck = Checker::new();
        assert!(ck.unify(&Type::any(), &Type::number(), origin()).is_empty());
        assert!(ck.unify(&Type::number(), &Type::any(), origin()).is_empty());
    }

    #[test]
    fn unknown_is_top_only() {
        let mut ck = Checker::new();
        assert!(ck.unify(&Type::number(), &Type::unknown(), origin()).is_empty());
        assert!(!ck.unify(&Type::unknown(), &Type::number(), origin()).is_empty());
    }

    #[test]
    fn never_is_bottom_only() {
        let mut ck = Checker::new();
        assert!(ck.unify(&Type::never(), &Type::number(), origin()).is_empty());
        assert!(!ck.unify(&Type::number(), &Type::never(), origin()).is_empty());
    }

    #[test]
    fn literal_subtypes_its_primitive() {
        let mut ck = Checker::new();
        assert!(ck.unify(&Type::lit_num("5"), &Type::number(), origin()).is_empty());
        assert!(!ck.unify(&Type::lit_num("5"), &Type::string(), origin()).is_empty());
        assert!(!ck.unify(&Type::number(), &Type::lit_num("5"), origin()).is_empty());
    }

    #[test]
    fn union_target_accepts_member() {
        let mut ck = Checker::new();
        let target = union_of(vec![Type::number(), Type::undefined()]);
        assert!(ck.unify(&Type::lit_num("1"), &target, origin()).is_empty());
        assert!(!ck.unify(&Type::lit_str("x"), &target, origin()).is_empty());
    }

    #[test]
    fn union_source_requires_every_member() {
        let mut ck = Checker::new();
        let source = union_of(vec![Type::lit_num("1"), Type::lit_str("x")]);
        assert!(!ck.unify(&source, &Type::number(), origin()).is_empty());
        let wide = union_of(vec![Type::number(), Type::string()]);
        assert!(ck.unify(&source, &wide, origin()).is_empty());
    }

    #[test]
    fn tuple_pairwise_and_arity() {
        let mut ck = Checker::new();
        let a = Type::tuple(vec![Type::lit_num("1"), Type::lit_str("x")]);
        let b = Type::tuple(vec![Type::number(), Type::string()]);
        assert!(ck.unify(&a, &b, origin()).is_empty());

        let short = Type::tuple(vec![Type::number()]);
        let long = Type::tuple(vec![Type::number(), Type::string(), Type::boolean()]);
        let errors = ck.unify(&short, &long, origin());
        assert!(errors
            .iter()
            .any(|e| matches!(e, TypeError::NotEnoughElementsToUnpack { .. })));
    }

    #[test]
    fn tuple_target_rest_packs_tail() {
        let mut ck = Checker::new();
        let source = Type::tuple(vec![Type::number(), Type::string(), Type::string()]);
        let rest_elem = ck.fresh_var();
        let target = Type::tuple(vec![Type::number(), Type::rest(rest_elem.clone())]);
        assert!(ck.unify(&source, &target, origin()).is_empty());
        let packed = ck.resolve(&rest_elem);
        assert_eq!(packed, Type::tuple(vec![Type::string(), Type::string()]));
    }

    #[test]
    fn tuple_unifies_with_array() {
        let mut ck = Checker::new();
        let tup = Type::tuple(vec![Type::lit_num("1"), Type::lit_num("2")]);
        let arr = Type::array(Type::number());
        assert!(ck.unify(&tup, &arr, origin()).is_empty());
        let bad = Type::tuple(vec![Type::lit_str("x")]);
        assert!(!ck.unify(&bad, &arr, origin()).is_empty());
    }

    #[test]
    fn array_covariance() {
        let mut ck = Checker::new();
        let a = Type::array(Type::lit_num("1"));
        let b = Type::array(Type::number());
        assert!(ck.unify(&a, &b, origin()).is_empty());
        assert!(!ck.unify(&b, &a, origin()).is_empty());
    }

    #[test]
    fn mutable_is_invariant() {
        let mut ck = Checker::new();
        let a = Type::mutable(Type::number());
        let b = Type::mutable(Type::number());
        assert!(ck.unify(&a, &b, origin()).is_empty());

        let narrower = Type::mutable(Type::lit_num("1"));
        assert!(!ck.unify(&narrower, &a, origin()).is_empty());

        let any_side = Type::mutable(Type::any());
        assert!(!ck.unify(&a, &any_side, origin()).is_empty());
        assert!(!ck.unify(&any_side, &a, origin()).is_empty());
    }

    #[test]
    fn mutable_to_immutable_strips() {
        let mut ck = Checker::new();
        let a = Type::mutable(Type::lit_num("1"));
        assert!(ck.unify(&a, &Type::number(), origin()).is_empty());
    }

    #[test]
    fn function_params_contravariant_return_covariant() {
        let mut ck = Checker::new();
        let source = Type::func(
            vec![FuncParam { name: "x".into(), rest: false, ty: Type::number(), optional: false }],
            Type::lit_num("1"),
        );
        let target = Type::func(
            vec![FuncParam {
                name: "x".into(),
                rest: false,
                ty: Type::lit_num("5"),
                optional: false,
            }],
            Type::number(),
        );
        assert!(ck.unify(&source, &target, origin()).is_empty());
        assert!(!ck.unify(&target, &source, origin()).is_empty());
    }

    #[test]
    fn required_source_param_rejects_optional_target() {
        let mut ck = Checker::new();
        let source = Type::func(
            vec![FuncParam { name: "x".into(), rest: false, ty: Type::number(), optional: false }],
            Type::number(),
        );
        let target = Type::func(
            vec![FuncParam { name: "x".into(), rest: false, ty: Type::number(), optional: true }],
            Type::number(),
        );
        assert!(!ck.unify(&source, &target, origin()).is_empty());
        assert!(ck.unify(&target, &source, origin()).is_empty());
    }

    #[test]
    fn object_width_subtyping_and_missing_key() {
        let mut ck = Checker::new();
        let source = Type::object(vec![
            ObjElem::Prop {
                key: ObjKey::Str("x".into()),
                ty: Type::number(),
                optional: false,
                readonly: false,
            },
            ObjElem::Prop {
                key: ObjKey::Str("y".into()),
                ty: Type::string(),
                optional: false,
                readonly: false,
            },
        ]);
        let narrow = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("x".into()),
            ty: Type::number(),
            optional: false,
            readonly: false,
        }]);
        assert!(ck.unify(&source, &narrow, origin()).is_empty());

        let errors = ck.unify(&narrow, &source, origin());
        assert!(errors
            .iter()
            .any(|e| matches!(e, TypeError::KeyNotFound { key, .. } if key == "y")));
    }

    #[test]
    fn optional_property_becomes_union_with_undefined() {
        let mut ck = Checker::new();
        let target = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("a".into()),
            ty: Type::number(),
            optional: true,
            readonly: false,
        }]);
        let source = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("a".into()),
            ty: Type::undefined(),
            optional: false,
            readonly: false,
        }]);
        assert!(ck.unify(&source, &target, origin()).is_empty());
    }

    #[test]
    fn nominal_objects_compare_by_id() {
        let mut ck = Checker::new();
        let make = |id: u32| {
            Type::new(TypeKind::Object(ObjectType {
                elems: vec![ObjElem::Prop {
                    key: ObjKey::Str("x".into()),
                    ty: Type::number(),
                    optional: false,
                    readonly: false,
                }],
                nominal_id: Some(id),
                interface: false,
            }))
        };
        assert!(ck.unify(&make(7), &make(7), origin()).is_empty());
        assert!(!ck.unify(&make(7), &make(8), origin()).is_empty());
        // Structurally identical but non-nominal source is rejected by a
        // nominal target.
        let structural = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("x".into()),
            ty: Type::number(),
            optional: false,
            readonly: false,
        }]);
        assert!(!ck.unify(&structural, &make(7), origin()).is_empty());
        assert!(ck.unify(&make(7), &structural, origin()).is_empty());
    }

    #[test]
    fn string_literal_matches_regex_groups() {
        let mut ck = Checker::new();
        let group_var = ck.fresh_var();
        let re = Type::new(TypeKind::Regex(crate::ty::RegexType {
            pattern: r"(?<year>\d{4})-(?<month>\d{2})".into(),
            flags: String::new(),
            groups: vec![("year".into(), group_var.clone()), ("month".into(), Type::string())],
        }));
        assert!(ck.unify(&Type::lit_str("2024-06"), &re, origin()).is_empty());
        assert_eq!(ck.resolve(&group_var), Type::lit_str("2024"));

        assert!(!ck.unify(&Type::lit_str("nope"), &re, origin()).is_empty());
    }

    #[test]
    fn unique_symbols_by_identity() {
        let mut ck = Checker::new();
        let s1 = Type::new(TypeKind::UniqueSymbol(ck.fresh_unique_symbol()));
        let s2 = Type::new(TypeKind::UniqueSymbol(ck.fresh_unique_symbol()));
        assert!(ck.unify(&s1, &s1.clone(), origin()).is_empty());
        assert!(!ck.unify(&s1, &s2, origin()).is_empty());
    }

    #[test]
    fn reflexive_for_concrete_types() {
        let mut ck = Checker::new();
        let samples = vec![
            Type::number(),
            Type::lit_str("a"),
            Type::tuple(vec![Type::number(), Type::string()]),
            Type::array(Type::boolean()),
            union_of(vec![Type::number(), Type::string()]),
            Type::object(vec![ObjElem::Prop {
                key: ObjKey::Str("x".into()),
                ty: Type::number(),
                optional: false,
                readonly: false,
            }]),
        ];
        for ty in samples {
            assert!(ck.unify(&ty, &ty.clone(), origin()).is_empty(), "not reflexive: {ty}");
        }
    }

    #[test]
    fn instantiate_replaces_type_params_fresh() {
        let mut ck = Checker::new();
        let generic = FuncType {
            type_params: vec![crate::ty::TypeParam {
                name: "T".into(),
                constraint: None,
                default: None,
            }],
            params: vec![FuncParam {
                name: "x".into(),
                rest: false,
                ty: Type::reference(coral_ast::QualName::simple("T"), vec![]),
                optional: false,
            }],
            ret: Box::new(Type::reference(coral_ast::QualName::simple("T"), vec![])),
            throws: Box::new(Type::never()),
        };
        let inst1 = ck.instantiate_func(&generic);
        let inst2 = ck.instantiate_func(&generic);
        assert!(inst1.type_params.is_empty());
        assert!(matches!(inst1.params[0].ty.kind, TypeKind::Var(_)));
        assert_ne!(inst1.params[0].ty, inst2.params[0].ty);
        // Param and return share the same fresh variable.
        assert_eq!(inst1.params[0].ty, *inst1.ret);
    }
}

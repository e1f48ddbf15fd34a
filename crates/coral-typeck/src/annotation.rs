//! Lowering of surface type annotations into checker types.
//!
//! References to aliases that are not yet known (forward references within
//! a dependency component) produce a `Ref` with an empty shared slot and a
//! deferred-resolution record; the orchestrator fills the slots once the
//! component finishes and reports `UnknownType` for the rest.

use std::cell::RefCell;
use std::rc::Rc;

use coral_ast::{
    FuncAnn, FuncAnnParam, MappedAnn, ObjAnnElem, PrimKind, PropName, QualName, TypeAnn,
    TypeAnnKind, TypeParamDecl,
};
use coral_common::Span;

use crate::error::TypeError;
use crate::scope::Scope;
use crate::ty::{
    empty_alias_slot, intersection_of, union_of, AliasSlot, CondType, FuncParam, FuncType,
    IndexType, MappedType, ObjElem, ObjKey, Provenance, TemplateLitType, Type, TypeKind,
    TypeOfType, TypeParam, TypeRefType,
};
use crate::unify::Checker;

/// A recorded forward type reference.
pub(crate) struct DeferredRef {
    pub name: QualName,
    pub slot: AliasSlot,
    pub scope: Rc<Scope>,
    pub span: Span,
}

/// A recorded forward `typeof` reference.
pub(crate) struct DeferredTypeOf {
    pub name: QualName,
    pub slot: Rc<RefCell<Option<Type>>>,
    pub scope: Rc<Scope>,
    pub span: Span,
}

/// Lower a type annotation into a checker type.
pub(crate) fn lower_type_ann(ck: &mut Checker, scope: &Rc<Scope>, ann: &TypeAnn) -> Type {
    let mut bound = Vec::new();
    lower(ck, scope, ann, &mut bound)
}

/// Lower an annotation with a set of already-bound type-parameter names
/// (a generic declaration's parameters stay symbolic for later
/// instantiation).
pub(crate) fn lower_type_ann_bound(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    ann: &TypeAnn,
    bound: &mut Vec<String>,
) -> Type {
    lower(ck, scope, ann, bound)
}

/// Lower one object-annotation element (used directly by interface
/// declaration processing).
pub(crate) fn lower_obj_ann_elem(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    elem: &ObjAnnElem,
    bound: &mut Vec<String>,
) -> ObjElem {
    lower_obj_elem(ck, scope, elem, bound)
}

fn lower(ck: &mut Checker, scope: &Rc<Scope>, ann: &TypeAnn, bound: &mut Vec<String>) -> Type {
    let span = ann.span;
    let ty = match &ann.kind {
        TypeAnnKind::Ref { name, args } => lower_ref(ck, scope, name, args, span, bound),
        TypeAnnKind::Prim(prim) => match prim {
            PrimKind::Number => Type::number(),
            PrimKind::String => Type::string(),
            PrimKind::Boolean => Type::boolean(),
            PrimKind::BigInt => Type::bigint(),
            PrimKind::Symbol => Type::symbol(),
        },
        TypeAnnKind::Lit(lit) => Type::lit(lit.clone()),
        TypeAnnKind::Any => Type::any(),
        TypeAnnKind::Unknown => Type::unknown(),
        TypeAnnKind::Never => Type::never(),
        TypeAnnKind::Wildcard => Type::wildcard(),
        TypeAnnKind::Object(elems) => {
            let elems = elems
                .iter()
                .map(|elem| lower_obj_elem(ck, scope, elem, bound))
                .collect();
            Type::object(elems)
        }
        TypeAnnKind::Tuple(elems) => {
            Type::tuple(elems.iter().map(|e| lower(ck, scope, e, bound)).collect())
        }
        TypeAnnKind::Rest(inner) => Type::rest(lower(ck, scope, inner, bound)),
        TypeAnnKind::Union(members) => {
            union_of(members.iter().map(|m| lower(ck, scope, m, bound)).collect())
        }
        TypeAnnKind::Intersection(members) => {
            intersection_of(members.iter().map(|m| lower(ck, scope, m, bound)).collect())
        }
        TypeAnnKind::Func(func) => Type::new(TypeKind::Func(lower_func(ck, scope, func, bound))),
        TypeAnnKind::Mutable(inner) => Type::mutable(lower(ck, scope, inner, bound)),
        TypeAnnKind::KeyOf(inner) => {
            Type::new(TypeKind::KeyOf(Box::new(lower(ck, scope, inner, bound))))
        }
        TypeAnnKind::TypeOf(name) => {
            let slot = Rc::new(RefCell::new(None));
            match scope.lookup_qualified_value(name) {
                Some(binding) => *slot.borrow_mut() = Some(binding.ty),
                None => ck.deferred_typeofs.push(DeferredTypeOf {
                    name: name.clone(),
                    slot: slot.clone(),
                    scope: scope.clone(),
                    span,
                }),
            }
            Type::new(TypeKind::TypeOf(TypeOfType { name: name.clone(), slot }))
        }
        TypeAnnKind::Index { obj, index } => Type::new(TypeKind::Index(IndexType {
            obj: Box::new(lower(ck, scope, obj, bound)),
            index: Box::new(lower(ck, scope, index, bound)),
        })),
        TypeAnnKind::Cond { check, extends, then_ann, else_ann } => {
            // Names introduced by `infer` are visible in the extends
            // clause and the then-branch.
            let mut infer_names = Vec::new();
            collect_infer_names(extends, &mut infer_names);
            let check = lower(ck, scope, check, bound);
            let before = bound.len();
            bound.extend(infer_names);
            let extends = lower(ck, scope, extends, bound);
            let then_ty = lower(ck, scope, then_ann, bound);
            bound.truncate(before);
            let else_ty = lower(ck, scope, else_ann, bound);
            Type::new(TypeKind::Cond(CondType {
                check: Box::new(check),
                extends: Box::new(extends),
                then_ty: Box::new(then_ty),
                else_ty: Box::new(else_ty),
            }))
        }
        TypeAnnKind::Infer(name) => Type::new(TypeKind::Infer(name.clone())),
        TypeAnnKind::Mapped(mapped) => {
            Type::new(TypeKind::Mapped(lower_mapped(ck, scope, mapped, bound)))
        }
        TypeAnnKind::TemplateLit { quasis, types } => {
            let embeddable = union_of(vec![Type::string(), Type::number()]);
            let types: Vec<Type> = types.iter().map(|t| lower(ck, scope, t, bound)).collect();
            for ty in &types {
                // Infer placeholders are checked when the conditional
                // resolves them.
                if matches!(ty.kind, TypeKind::Infer(_)) {
                    continue;
                }
                let errors = ck.unify(ty, &embeddable, span);
                ck.errors.extend(errors);
            }
            Type::new(TypeKind::TemplateLit(TemplateLitType { quasis: quasis.clone(), types }))
        }
    };
    ty.provenanced(Provenance::Span(span))
}

fn lower_ref(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    name: &QualName,
    args: &[TypeAnn],
    span: Span,
    bound: &mut Vec<String>,
) -> Type {
    let lowered_args: Vec<Type> = args.iter().map(|a| lower(ck, scope, a, bound)).collect();

    // A bare name bound by an enclosing generic or mapped construct is a
    // substitution target, not an alias reference.
    if name.is_simple() && args.is_empty() && bound.iter().any(|b| b == name.head()) {
        return Type::new(TypeKind::Ref(TypeRefType {
            name: name.clone(),
            type_args: Vec::new(),
            alias: empty_alias_slot(),
        }));
    }

    let slot = empty_alias_slot();
    match scope.lookup_qualified_type(name) {
        Some(alias) => {
            let param_count = alias.borrow().type_params.len();
            let required = alias
                .borrow()
                .type_params
                .iter()
                .filter(|tp| tp.default.is_none())
                .count();
            if lowered_args.len() > param_count || lowered_args.len() < required {
                ck.errors.push(TypeError::TypeParamMismatch {
                    expected: param_count,
                    found: lowered_args.len(),
                    span,
                });
            }
            *slot.borrow_mut() = Some(alias);
        }
        None => ck.deferred_refs.push(DeferredRef {
            name: name.clone(),
            slot: slot.clone(),
            scope: scope.clone(),
            span,
        }),
    }
    Type::new(TypeKind::Ref(TypeRefType { name: name.clone(), type_args: lowered_args, alias: slot }))
}

fn lower_obj_elem(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    elem: &ObjAnnElem,
    bound: &mut Vec<String>,
) -> ObjElem {
    match elem {
        ObjAnnElem::Prop { key, ann, optional, readonly } => ObjElem::Prop {
            key: prop_key(key),
            ty: lower(ck, scope, ann, bound),
            optional: *optional,
            readonly: *readonly,
        },
        ObjAnnElem::Method { key, func, mut_self } => ObjElem::Method {
            key: prop_key(key),
            func: lower_func(ck, scope, func, bound),
            mut_self: *mut_self,
        },
        ObjAnnElem::Getter { key, ret } => ObjElem::Getter {
            key: prop_key(key),
            func: FuncType {
                type_params: Vec::new(),
                params: Vec::new(),
                ret: Box::new(lower(ck, scope, ret, bound)),
                throws: Box::new(Type::never()),
            },
        },
        ObjAnnElem::Setter { key, param } => ObjElem::Setter {
            key: prop_key(key),
            func: FuncType {
                type_params: Vec::new(),
                params: vec![lower_func_param(ck, scope, param, bound)],
                ret: Box::new(Type::undefined()),
                throws: Box::new(Type::never()),
            },
        },
        ObjAnnElem::Constructor(func) => ObjElem::Constructor(lower_func(ck, scope, func, bound)),
        ObjAnnElem::Callable(func) => ObjElem::Callable(lower_func(ck, scope, func, bound)),
        ObjAnnElem::Rest(ann) => ObjElem::RestSpread(lower(ck, scope, ann, bound)),
        ObjAnnElem::Mapped(mapped) => ObjElem::Mapped(lower_mapped(ck, scope, mapped, bound)),
    }
}

pub(crate) fn prop_key(key: &PropName) -> ObjKey {
    match key {
        PropName::Ident(name) | PropName::Str(name) => ObjKey::Str(name.clone()),
        PropName::Num(n) => ObjKey::Num(n.clone()),
    }
}

fn lower_func(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    func: &FuncAnn,
    bound: &mut Vec<String>,
) -> FuncType {
    let before = bound.len();
    bound.extend(func.type_params.iter().map(|tp| tp.name.clone()));
    let type_params = func
        .type_params
        .iter()
        .map(|tp| lower_type_param(ck, scope, tp, bound))
        .collect();
    let params = func
        .params
        .iter()
        .map(|p| lower_func_param(ck, scope, p, bound))
        .collect();
    let ret = lower(ck, scope, &func.ret, bound);
    let throws = func
        .throws
        .as_ref()
        .map(|t| lower(ck, scope, t, bound))
        .unwrap_or_else(Type::never);
    bound.truncate(before);
    FuncType { type_params, params, ret: Box::new(ret), throws: Box::new(throws) }
}

fn lower_func_param(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    param: &FuncAnnParam,
    bound: &mut Vec<String>,
) -> FuncParam {
    FuncParam {
        name: param.name.clone(),
        rest: param.rest,
        ty: lower(ck, scope, &param.ann, bound),
        optional: param.optional,
    }
}

pub(crate) fn lower_type_param(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    tp: &TypeParamDecl,
    bound: &mut Vec<String>,
) -> TypeParam {
    TypeParam {
        name: tp.name.clone(),
        constraint: tp.constraint.as_ref().map(|c| lower(ck, scope, c, bound)),
        default: tp.default.as_ref().map(|d| lower(ck, scope, d, bound)),
    }
}

/// Lower a declaration's type parameter list, returning both the lowered
/// parameters and the name list for substitution scoping.
pub(crate) fn lower_type_params(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    params: &[TypeParamDecl],
) -> Vec<TypeParam> {
    let mut bound: Vec<String> = params.iter().map(|tp| tp.name.clone()).collect();
    params
        .iter()
        .map(|tp| lower_type_param(ck, scope, tp, &mut bound))
        .collect()
}

fn lower_mapped(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    mapped: &MappedAnn,
    bound: &mut Vec<String>,
) -> MappedType {
    let constraint = lower(ck, scope, &mapped.constraint, bound);
    bound.push(mapped.param.clone());
    let value = lower(ck, scope, &mapped.value, bound);
    bound.pop();
    MappedType {
        param: mapped.param.clone(),
        constraint: Box::new(constraint),
        value: Box::new(value),
        optional: mapped.optional,
        readonly: mapped.readonly,
    }
}

fn collect_infer_names(ann: &TypeAnn, out: &mut Vec<String>) {
    match &ann.kind {
        TypeAnnKind::Infer(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        TypeAnnKind::Ref { args, .. } => {
            for a in args {
                collect_infer_names(a, out);
            }
        }
        TypeAnnKind::Object(elems) => {
            for elem in elems {
                if let ObjAnnElem::Prop { ann, .. } = elem {
                    collect_infer_names(ann, out);
                }
            }
        }
        TypeAnnKind::Tuple(elems) | TypeAnnKind::Union(elems) | TypeAnnKind::Intersection(elems) => {
            for e in elems {
                collect_infer_names(e, out);
            }
        }
        TypeAnnKind::Rest(inner)
        | TypeAnnKind::Mutable(inner)
        | TypeAnnKind::KeyOf(inner) => collect_infer_names(inner, out),
        TypeAnnKind::Func(func) => {
            for p in &func.params {
                collect_infer_names(&p.ann, out);
            }
            collect_infer_names(&func.ret, out);
        }
        TypeAnnKind::Index { obj, index } => {
            collect_infer_names(obj, out);
            collect_infer_names(index, out);
        }
        TypeAnnKind::TemplateLit { types, .. } => {
            for t in types {
                collect_infer_names(t, out);
            }
        }
        _ => {}
    }
}

/// Fill in the deferred references accumulated while a dependency
/// component was being inferred, reporting the ones that never resolved.
pub(crate) fn resolve_deferred(ck: &mut Checker) {
    let refs = std::mem::take(&mut ck.deferred_refs);
    for deferred in refs {
        match deferred.scope.lookup_qualified_type(&deferred.name) {
            Some(alias) => *deferred.slot.borrow_mut() = Some(alias),
            None => ck.errors.push(TypeError::UnknownType {
                name: deferred.name.to_string(),
                span: deferred.span,
            }),
        }
    }
    let typeofs = std::mem::take(&mut ck.deferred_typeofs);
    for deferred in typeofs {
        match deferred.scope.lookup_qualified_value(&deferred.name) {
            Some(binding) => *deferred.slot.borrow_mut() = Some(binding.ty),
            None => ck.errors.push(TypeError::UnknownIdentifier {
                name: deferred.name.to_string(),
                span: deferred.span,
            }),
        }
    }
}

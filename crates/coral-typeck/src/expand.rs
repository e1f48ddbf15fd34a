//! On-demand expansion of computed type forms.
//!
//! `Ref`, `KeyOf`, `Index`, `TypeOf`, `Cond`, and `Mapped` types are not
//! immediately structural. [`expand_type`] performs one expansion step;
//! the unifier calls it only after its direct case list fails, and bounds
//! the number of mutual retries.

use rustc_hash::FxHashMap;

use coral_ast::Lit;

use crate::error::TypeError;
use crate::ty::{
    union_of, FuncParam, FuncType, MappedType, ObjElem, ObjKey, Provenance, Type, TypeKind,
    TypeParam,
};
use crate::unify::Checker;

/// Expand `ty` by one step. Returns `None` when the type is already
/// structural or cannot make progress (e.g. an unresolved alias).
pub(crate) fn expand_type(ck: &mut Checker, ty: &Type) -> Option<Type> {
    match &ty.kind {
        TypeKind::Ref(r) => {
            let alias = r.alias.borrow().clone()?;
            let (body, type_params) = {
                let alias = alias.borrow();
                (alias.ty.clone(), alias.type_params.clone())
            };
            let mut map: FxHashMap<String, Type> = FxHashMap::default();
            for (i, tp) in type_params.iter().enumerate() {
                let arg = r
                    .type_args
                    .get(i)
                    .cloned()
                    .or_else(|| tp.default.clone())
                    .unwrap_or_else(Type::any);
                map.insert(tp.name.clone(), arg);
            }
            let expanded = if map.is_empty() { body } else { substitute_named(&body, &map) };
            Some(expanded.provenanced(Provenance::Type(ty.clone())))
        }

        TypeKind::KeyOf(inner) => {
            let inner = ck.prune(inner);
            match &inner.kind {
                TypeKind::Object(obj) => {
                    let keys = ck
                        .object_member_map(obj)
                        .into_iter()
                        .map(|(key, _)| key_type(&key))
                        .collect();
                    Some(union_of(keys))
                }
                TypeKind::Tuple(elems) => {
                    let keys = (0..elems.len())
                        .map(|i| Type::lit(Lit::Num(i.to_string())))
                        .collect();
                    Some(union_of(keys))
                }
                _ => expand_type(ck, &inner)
                    .map(|e| Type::new(TypeKind::KeyOf(Box::new(e)))),
            }
        }

        TypeKind::Index(idx) => {
            let obj = ck.prune(&idx.obj);
            let index = ck.prune(&idx.index);
            match (&obj.kind, &index.kind) {
                (TypeKind::Object(o), TypeKind::Lit(lit @ (Lit::Str(_) | Lit::Num(_)))) => {
                    let key = match lit {
                        Lit::Str(s) => ObjKey::Str(s.clone()),
                        Lit::Num(n) => ObjKey::Num(n.clone()),
                        _ => unreachable!("filtered above"),
                    };
                    let members = ck.object_member_map(o);
                    match members.into_iter().find(|(k, _)| *k == key) {
                        Some((_, member)) => Some(member),
                        None => {
                            let span = index.span().or_else(|| ty.span());
                            ck.errors.push(TypeError::KeyNotFound {
                                key: key.to_string(),
                                ty: obj.clone(),
                                span: span.unwrap_or(Checker::builtin_span()),
                            });
                            Some(Type::never())
                        }
                    }
                }
                (TypeKind::Tuple(elems), TypeKind::Lit(Lit::Num(n))) => {
                    match n.parse::<usize>().ok().and_then(|i| elems.get(i)) {
                        Some(elem) => Some(elem.clone()),
                        None => {
                            let span = index.span().or_else(|| ty.span());
                            ck.errors.push(TypeError::OutOfBounds {
                                index: n.parse().unwrap_or(0),
                                length: elems.len(),
                                span: span.unwrap_or(Checker::builtin_span()),
                            });
                            Some(Type::never())
                        }
                    }
                }
                (TypeKind::Object(_) | TypeKind::Tuple(_), _) => {
                    // The key itself may still need a step (e.g. a keyof).
                    expand_type(ck, &index).map(|e| {
                        Type::new(TypeKind::Index(crate::ty::IndexType {
                            obj: Box::new(obj.clone()),
                            index: Box::new(e),
                        }))
                    })
                }
                _ => expand_type(ck, &obj).map(|e| {
                    Type::new(TypeKind::Index(crate::ty::IndexType {
                        obj: Box::new(e),
                        index: Box::new(index.clone()),
                    }))
                }),
            }
        }

        TypeKind::TypeOf(t) => t.slot.borrow().clone(),

        TypeKind::Cond(cond) => {
            // Bring `infer` placeholders into scope as fresh variables,
            // then decide the branch by trial unification.
            let mut infer_names = Vec::new();
            collect_infer_names(&cond.extends, &mut infer_names);
            let mut map: FxHashMap<String, Type> = FxHashMap::default();
            for name in &infer_names {
                map.insert(name.clone(), ck.fresh_var());
            }
            let extends = if map.is_empty() {
                cond.extends.as_ref().clone()
            } else {
                substitute_named(&cond.extends, &map)
            };
            let check = cond.check.as_ref().clone();
            let origin = check.span().unwrap_or(Checker::builtin_span());
            if ck.try_unify(&check, &extends, origin).is_empty() {
                let mut resolved: FxHashMap<String, Type> = FxHashMap::default();
                for (name, var) in &map {
                    resolved.insert(name.clone(), ck.resolve(var));
                }
                let then = if resolved.is_empty() {
                    cond.then_ty.as_ref().clone()
                } else {
                    substitute_named(&cond.then_ty, &resolved)
                };
                Some(then)
            } else {
                Some(cond.else_ty.as_ref().clone())
            }
        }

        TypeKind::Mapped(mapped) => expand_mapped(ck, mapped),

        _ => None,
    }
}

/// Materialize a mapped type into an object by enumerating its
/// constraint's keys, or advance the constraint by one step.
fn expand_mapped(ck: &mut Checker, mapped: &MappedType) -> Option<Type> {
    let constraint = ck.prune(&mapped.constraint);
    let keys: Vec<Type> = match &constraint.kind {
        TypeKind::Union(members) => members.clone(),
        TypeKind::Lit(_) | TypeKind::UniqueSymbol(_) => vec![constraint.clone()],
        _ => {
            return expand_type(ck, &constraint).map(|e| {
                Type::new(TypeKind::Mapped(MappedType {
                    param: mapped.param.clone(),
                    constraint: Box::new(e),
                    value: mapped.value.clone(),
                    optional: mapped.optional,
                    readonly: mapped.readonly,
                }))
            })
        }
    };

    let mut elems = Vec::new();
    for key_ty in keys {
        let key = match &key_ty.kind {
            TypeKind::Lit(Lit::Str(s)) => ObjKey::Str(s.clone()),
            TypeKind::Lit(Lit::Num(n)) => ObjKey::Num(n.clone()),
            TypeKind::UniqueSymbol(id) => ObjKey::Sym(*id),
            _ => return None,
        };
        let mut map: FxHashMap<String, Type> = FxHashMap::default();
        map.insert(mapped.param.clone(), key_ty.clone());
        let value = substitute_named(&mapped.value, &map);
        elems.push(ObjElem::Prop {
            key,
            ty: value,
            optional: mapped.optional,
            readonly: mapped.readonly,
        });
    }
    Some(Type::object(elems))
}

fn key_type(key: &ObjKey) -> Type {
    match key {
        ObjKey::Str(s) => Type::lit_str(s),
        ObjKey::Num(n) => Type::lit(Lit::Num(n.clone())),
        ObjKey::Sym(id) => Type::new(TypeKind::UniqueSymbol(*id)),
    }
}

fn collect_infer_names(ty: &Type, out: &mut Vec<String>) {
    walk(ty, &mut |t| {
        if let TypeKind::Infer(name) = &t.kind {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
    });
}

/// Call `visit` on `ty` and every type nested inside it. Alias slots are
/// not followed.
fn walk(ty: &Type, visit: &mut dyn FnMut(&Type)) {
    visit(ty);
    match &ty.kind {
        TypeKind::Var(_)
        | TypeKind::Prim(_)
        | TypeKind::Lit(_)
        | TypeKind::Any
        | TypeKind::Unknown
        | TypeKind::Never
        | TypeKind::Wildcard
        | TypeKind::UniqueSymbol(_)
        | TypeKind::TypeOf(_)
        | TypeKind::Infer(_) => {}
        TypeKind::Regex(re) => {
            for (_, g) in &re.groups {
                walk(g, visit);
            }
        }
        TypeKind::Tuple(elems) => {
            for e in elems {
                walk(e, visit);
            }
        }
        TypeKind::RestSpread(inner)
        | TypeKind::Mutable(inner)
        | TypeKind::MutUncertain(inner)
        | TypeKind::KeyOf(inner) => walk(inner, visit),
        TypeKind::Func(func) => walk_func(func, visit),
        TypeKind::Object(obj) => {
            for elem in &obj.elems {
                match elem {
                    ObjElem::Prop { ty, .. } => walk(ty, visit),
                    ObjElem::Method { func, .. }
                    | ObjElem::Getter { func, .. }
                    | ObjElem::Setter { func, .. }
                    | ObjElem::Constructor(func)
                    | ObjElem::Callable(func) => walk_func(func, visit),
                    ObjElem::RestSpread(ty) => walk(ty, visit),
                    ObjElem::Mapped(m) => {
                        walk(&m.constraint, visit);
                        walk(&m.value, visit);
                    }
                }
            }
        }
        TypeKind::Union(members) | TypeKind::Intersection(members) => {
            for m in members {
                walk(m, visit);
            }
        }
        TypeKind::Ref(r) => {
            for a in &r.type_args {
                walk(a, visit);
            }
        }
        TypeKind::Extractor(e) => {
            walk(&e.obj, visit);
            for a in &e.args {
                walk(a, visit);
            }
        }
        TypeKind::TemplateLit(t) => {
            for x in &t.types {
                walk(x, visit);
            }
        }
        TypeKind::Index(idx) => {
            walk(&idx.obj, visit);
            walk(&idx.index, visit);
        }
        TypeKind::Cond(c) => {
            walk(&c.check, visit);
            walk(&c.extends, visit);
            walk(&c.then_ty, visit);
            walk(&c.else_ty, visit);
        }
        TypeKind::Mapped(m) => {
            walk(&m.constraint, visit);
            walk(&m.value, visit);
        }
    }
}

fn walk_func(func: &FuncType, visit: &mut dyn FnMut(&Type)) {
    for p in &func.params {
        walk(&p.ty, visit);
    }
    walk(&func.ret, visit);
    walk(&func.throws, visit);
}

/// Substitute named type-parameter references (`Ref` with a bare matching
/// name and no arguments, or `Infer` of the name) throughout a type.
///
/// Respects shadowing: inside an inner generic function or a mapped type
/// whose parameter re-declares a name, that name is not substituted.
pub(crate) fn substitute_named(ty: &Type, map: &FxHashMap<String, Type>) -> Type {
    if map.is_empty() {
        return ty.clone();
    }
    let kind = match &ty.kind {
        TypeKind::Ref(r) => {
            if r.name.is_simple() && r.type_args.is_empty() {
                if let Some(replacement) = map.get(r.name.head()) {
                    return replacement.clone();
                }
            }
            let mut r = r.clone();
            r.type_args = r.type_args.iter().map(|a| substitute_named(a, map)).collect();
            TypeKind::Ref(r)
        }
        TypeKind::Infer(name) => {
            if let Some(replacement) = map.get(name) {
                return replacement.clone();
            }
            TypeKind::Infer(name.clone())
        }
        TypeKind::Var(_)
        | TypeKind::Prim(_)
        | TypeKind::Lit(_)
        | TypeKind::Any
        | TypeKind::Unknown
        | TypeKind::Never
        | TypeKind::Wildcard
        | TypeKind::UniqueSymbol(_)
        | TypeKind::TypeOf(_) => ty.kind.clone(),
        TypeKind::Regex(re) => {
            let mut re = re.clone();
            re.groups = re
                .groups
                .iter()
                .map(|(name, g)| (name.clone(), substitute_named(g, map)))
                .collect();
            TypeKind::Regex(re)
        }
        TypeKind::Tuple(elems) => {
            TypeKind::Tuple(elems.iter().map(|e| substitute_named(e, map)).collect())
        }
        TypeKind::RestSpread(inner) => {
            TypeKind::RestSpread(Box::new(substitute_named(inner, map)))
        }
        TypeKind::Mutable(inner) => TypeKind::Mutable(Box::new(substitute_named(inner, map))),
        TypeKind::MutUncertain(inner) => {
            TypeKind::MutUncertain(Box::new(substitute_named(inner, map)))
        }
        TypeKind::KeyOf(inner) => TypeKind::KeyOf(Box::new(substitute_named(inner, map))),
        TypeKind::Func(func) => TypeKind::Func(substitute_func(func, map)),
        TypeKind::Object(obj) => {
            let mut obj = obj.clone();
            obj.elems = obj
                .elems
                .iter()
                .map(|elem| match elem {
                    ObjElem::Prop { key, ty, optional, readonly } => ObjElem::Prop {
                        key: key.clone(),
                        ty: substitute_named(ty, map),
                        optional: *optional,
                        readonly: *readonly,
                    },
                    ObjElem::Method { key, func, mut_self } => ObjElem::Method {
                        key: key.clone(),
                        func: substitute_func(func, map),
                        mut_self: *mut_self,
                    },
                    ObjElem::Getter { key, func } => {
                        ObjElem::Getter { key: key.clone(), func: substitute_func(func, map) }
                    }
                    ObjElem::Setter { key, func } => {
                        ObjElem::Setter { key: key.clone(), func: substitute_func(func, map) }
                    }
                    ObjElem::Constructor(func) => {
                        ObjElem::Constructor(substitute_func(func, map))
                    }
                    ObjElem::Callable(func) => ObjElem::Callable(substitute_func(func, map)),
                    ObjElem::RestSpread(ty) => ObjElem::RestSpread(substitute_named(ty, map)),
                    ObjElem::Mapped(m) => ObjElem::Mapped(substitute_mapped(m, map)),
                })
                .collect();
            TypeKind::Object(obj)
        }
        TypeKind::Union(members) => {
            return union_of(members.iter().map(|m| substitute_named(m, map)).collect())
        }
        TypeKind::Intersection(members) => TypeKind::Intersection(
            members.iter().map(|m| substitute_named(m, map)).collect(),
        ),
        TypeKind::Extractor(e) => TypeKind::Extractor(crate::ty::ExtractorType {
            obj: Box::new(substitute_named(&e.obj, map)),
            args: e.args.iter().map(|a| substitute_named(a, map)).collect(),
        }),
        TypeKind::TemplateLit(t) => {
            let mut t = t.clone();
            t.types = t.types.iter().map(|x| substitute_named(x, map)).collect();
            TypeKind::TemplateLit(t)
        }
        TypeKind::Index(idx) => TypeKind::Index(crate::ty::IndexType {
            obj: Box::new(substitute_named(&idx.obj, map)),
            index: Box::new(substitute_named(&idx.index, map)),
        }),
        TypeKind::Cond(c) => TypeKind::Cond(crate::ty::CondType {
            check: Box::new(substitute_named(&c.check, map)),
            extends: Box::new(substitute_named(&c.extends, map)),
            then_ty: Box::new(substitute_named(&c.then_ty, map)),
            else_ty: Box::new(substitute_named(&c.else_ty, map)),
        }),
        TypeKind::Mapped(m) => TypeKind::Mapped(substitute_mapped(m, map)),
    };
    Type { kind, provenance: ty.provenance.clone() }
}

fn substitute_func(func: &FuncType, map: &FxHashMap<String, Type>) -> FuncType {
    // An inner generic function shadows outer parameters of the same name.
    let shadowed: Vec<&str> = func
        .type_params
        .iter()
        .map(|tp| tp.name.as_str())
        .filter(|name| map.contains_key(*name))
        .collect();
    let narrowed;
    let map = if shadowed.is_empty() {
        map
    } else {
        narrowed = map
            .iter()
            .filter(|(name, _)| !shadowed.contains(&name.as_str()))
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect::<FxHashMap<_, _>>();
        &narrowed
    };
    FuncType {
        type_params: func
            .type_params
            .iter()
            .map(|tp| TypeParam {
                name: tp.name.clone(),
                constraint: tp.constraint.as_ref().map(|c| substitute_named(c, map)),
                default: tp.default.as_ref().map(|d| substitute_named(d, map)),
            })
            .collect(),
        params: func
            .params
            .iter()
            .map(|p| FuncParam {
                name: p.name.clone(),
                rest: p.rest,
                ty: substitute_named(&p.ty, map),
                optional: p.optional,
            })
            .collect(),
        ret: Box::new(substitute_named(&func.ret, map)),
        throws: Box::new(substitute_named(&func.throws, map)),
    }
}

fn substitute_mapped(mapped: &MappedType, map: &FxHashMap<String, Type>) -> MappedType {
    // The mapped parameter shadows an outer name.
    let narrowed;
    let map = if map.contains_key(&mapped.param) {
        narrowed = map
            .iter()
            .filter(|(name, _)| **name != mapped.param)
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect::<FxHashMap<_, _>>();
        &narrowed
    } else {
        map
    };
    MappedType {
        param: mapped.param.clone(),
        constraint: Box::new(substitute_named(&mapped.constraint, map)),
        value: Box::new(substitute_named(&mapped.value, map)),
        optional: mapped.optional,
        readonly: mapped.readonly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{filled_alias_slot, TypeAlias, TypeRefType};
    use coral_ast::QualName;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn alias_of(ty: Type, params: Vec<TypeParam>) -> crate::ty::AliasRef {
        Rc::new(RefCell::new(TypeAlias { ty, type_params: params, exported: false }))
    }

    #[test]
    fn ref_expansion_substitutes_args() {
        let mut ck = Checker::new();
        // type Box<T> = [T]
        let body = Type::tuple(vec![Type::reference(QualName::simple("T"), vec![])]);
        let alias = alias_of(
            body,
            vec![TypeParam { name: "T".into(), constraint: None, default: None }],
        );
        let reference = Type::new(TypeKind::Ref(TypeRefType {
            name: QualName::simple("Box"),
            type_args: vec![Type::number()],
            alias: filled_alias_slot(alias),
        }));
        let expanded = expand_type(&mut ck, &reference).expect("expands");
        assert_eq!(expanded, Type::tuple(vec![Type::number()]));
    }

    #[test]
    fn keyof_object_is_union_of_key_literals() {
        let mut ck = Checker::new();
        let obj = Type::object(vec![
            ObjElem::Prop {
                key: ObjKey::Str("a".into()),
                ty: Type::number(),
                optional: false,
                readonly: false,
            },
            ObjElem::Prop {
                key: ObjKey::Str("b".into()),
                ty: Type::string(),
                optional: false,
                readonly: false,
            },
        ]);
        let keyof = Type::new(TypeKind::KeyOf(Box::new(obj)));
        let expanded = expand_type(&mut ck, &keyof).expect("expands");
        assert_eq!(expanded, union_of(vec![Type::lit_str("a"), Type::lit_str("b")]));
    }

    #[test]
    fn index_looks_up_member() {
        let mut ck = Checker::new();
        let obj = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("a".into()),
            ty: Type::number(),
            optional: false,
            readonly: false,
        }]);
        let index = Type::new(TypeKind::Index(crate::ty::IndexType {
            obj: Box::new(obj),
            index: Box::new(Type::lit_str("a")),
        }));
        assert_eq!(expand_type(&mut ck, &index), Some(Type::number()));
    }

    #[test]
    fn cond_picks_branch_by_trial_unification() {
        let mut ck = Checker::new();
        let cond = Type::new(TypeKind::Cond(crate::ty::CondType {
            check: Box::new(Type::lit_num("5")),
            extends: Box::new(Type::number()),
            then_ty: Box::new(Type::lit_str("yes")),
            else_ty: Box::new(Type::lit_str("no")),
        }));
        assert_eq!(expand_type(&mut ck, &cond), Some(Type::lit_str("yes")));

        let cond = Type::new(TypeKind::Cond(crate::ty::CondType {
            check: Box::new(Type::lit_str("x")),
            extends: Box::new(Type::number()),
            then_ty: Box::new(Type::lit_str("yes")),
            else_ty: Box::new(Type::lit_str("no")),
        }));
        assert_eq!(expand_type(&mut ck, &cond), Some(Type::lit_str("no")));
    }

    #[test]
    fn cond_infer_captures_into_then_branch() {
        let mut ck = Checker::new();
        // [5, "x"] extends [infer A, string] ? A : never
        let cond = Type::new(TypeKind::Cond(crate::ty::CondType {
            check: Box::new(Type::tuple(vec![Type::lit_num("5"), Type::lit_str("x")])),
            extends: Box::new(Type::tuple(vec![
                Type::new(TypeKind::Infer("A".into())),
                Type::string(),
            ])),
            then_ty: Box::new(Type::reference(QualName::simple("A"), vec![])),
            else_ty: Box::new(Type::never()),
        }));
        assert_eq!(expand_type(&mut ck, &cond), Some(Type::lit_num("5")));
    }

    #[test]
    fn mapped_materializes_object() {
        let mut ck = Checker::new();
        let mapped = Type::new(TypeKind::Mapped(MappedType {
            param: "K".into(),
            constraint: Box::new(union_of(vec![Type::lit_str("a"), Type::lit_str("b")])),
            value: Box::new(Type::number()),
            optional: true,
            readonly: false,
        }));
        let expanded = expand_type(&mut ck, &mapped).expect("expands");
        match expanded.kind {
            TypeKind::Object(obj) => {
                assert_eq!(obj.elems.len(), 2);
                assert!(matches!(
                    &obj.elems[0],
                    ObjElem::Prop { key: ObjKey::Str(k), optional: true, .. } if k == "a"
                ));
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn substitution_respects_inner_shadowing() {
        let mut map = FxHashMap::default();
        map.insert("T".into(), Type::number());
        // fn <T>(x: T) -> T keeps its own T.
        let inner = Type::new(TypeKind::Func(FuncType {
            type_params: vec![TypeParam { name: "T".into(), constraint: None, default: None }],
            params: vec![FuncParam {
                name: "x".into(),
                rest: false,
                ty: Type::reference(QualName::simple("T"), vec![]),
                optional: false,
            }],
            ret: Box::new(Type::reference(QualName::simple("T"), vec![])),
            throws: Box::new(Type::never()),
        }));
        let substituted = substitute_named(&inner, &map);
        match substituted.kind {
            TypeKind::Func(f) => {
                assert_eq!(f.params[0].ty, Type::reference(QualName::simple("T"), vec![]));
            }
            other => panic!("expected func, got {other:?}"),
        }
    }
}

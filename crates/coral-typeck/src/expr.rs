//! Expression inference.
//!
//! Walks expressions producing a type, records every node's inferred type,
//! and accumulates diagnostics on the checker. Handles call dispatch
//! (including overload sets), member and index access, object literals
//! with `Self`, match expressions, JSX elements, and tagged templates.

use std::rc::Rc;

use coral_ast::{
    Block, ElseBranch, Expr, ExprKind, FuncBody, FuncExpr, JsxAttrValue, JsxChild, JsxElement,
    Lit, ObjProp, Param, PatKind, PropKey, QualName, StmtKind,
};
use coral_common::Span;

use crate::annotation::{lower_type_ann, lower_type_ann_bound, lower_type_params};
use crate::error::TypeError;
use crate::expand::expand_type;
use crate::pattern::infer_pattern;
use crate::scope::{NamespaceRef, Scope};
use crate::ty::{
    union_of, Binding, FuncParam, FuncType, ObjElem, ObjKey, ObjectType, Provenance, RegexType,
    Type, TypeKind,
};
use crate::unify::{Checker, FnFrame};

/// How many expansion steps member/callee resolution may take before
/// giving up on a computed type.
const MAX_RESOLVE_STEPS: u32 = 16;

/// Infer an expression's type, recording it on the node.
pub(crate) fn infer_expr(ck: &mut Checker, scope: &Rc<Scope>, expr: &Expr) -> Type {
    let ty = infer_kind(ck, scope, expr);
    let ty = ty.provenanced(Provenance::Span(expr.span));
    ck.set_node_type(expr.id, ty.clone());
    ty
}

fn infer_kind(ck: &mut Checker, scope: &Rc<Scope>, expr: &Expr) -> Type {
    let span = expr.span;
    match &expr.kind {
        ExprKind::Lit(lit) => infer_lit(lit),

        ExprKind::Ident(name) => match scope.lookup_value(name) {
            Some(binding) => {
                if let Some(source) = binding.source {
                    ck.binding_sources.insert(expr.id, source);
                }
                // A fresh copy whose provenance points at the use site, so
                // downstream errors blame the use, not the declaration.
                binding.ty
            }
            None => {
                ck.errors
                    .push(TypeError::UnknownIdentifier { name: name.clone(), span });
                Type::never()
            }
        },

        ExprKind::Binary { op, lhs, rhs } => {
            let lhs_ty = infer_expr(ck, scope, lhs);
            let rhs_ty = infer_expr(ck, scope, rhs);
            match scope.lookup_value(op) {
                Some(binding) => {
                    let args = vec![(lhs_ty, lhs.span), (rhs_ty, rhs.span)];
                    dispatch_call(ck, &binding.ty, &args, span)
                }
                None => {
                    ck.errors
                        .push(TypeError::UnknownOperator { op: op.clone(), span });
                    Type::any()
                }
            }
        }

        ExprKind::Unary { op, operand } => {
            let operand_ty = infer_expr(ck, scope, operand);
            if op == "-" {
                // A negated numeric literal stays a literal type.
                let pruned = ck.prune(&operand_ty);
                let inner = match &pruned.kind {
                    TypeKind::MutUncertain(inner) => inner.as_ref().clone(),
                    _ => pruned.clone(),
                };
                if let TypeKind::Lit(Lit::Num(text)) = &inner.kind {
                    let negated = if let Some(stripped) = text.strip_prefix('-') {
                        stripped.to_string()
                    } else {
                        format!("-{text}")
                    };
                    return Type::mut_uncertain(Type::lit(Lit::Num(negated)));
                }
                ck.errors.push(TypeError::Unimplemented {
                    feature: "unary minus on a non-literal operand".into(),
                    span,
                });
                return Type::any();
            }
            match scope.lookup_value(op) {
                Some(binding) => {
                    let args = vec![(operand_ty, operand.span)];
                    dispatch_call(ck, &binding.ty, &args, span)
                }
                None => {
                    ck.errors
                        .push(TypeError::UnknownOperator { op: op.clone(), span });
                    Type::any()
                }
            }
        }

        ExprKind::Assign { target, value } => infer_assignment(ck, scope, target, value, span),

        ExprKind::Call { callee, args, opt_chain: _ } => {
            let callee_ty = infer_expr(ck, scope, callee);
            let arg_types: Vec<(Type, Span)> = args
                .iter()
                .map(|arg| (infer_expr(ck, scope, arg), arg.span))
                .collect();
            dispatch_call(ck, &callee_ty, &arg_types, span)
        }

        ExprKind::Member { object, property, opt_chain } => {
            // A dotted path rooted at a namespace resolves to the
            // namespace member, not a property of a value.
            if let Some(ty) = resolve_namespace_member(ck, scope, expr) {
                return ty;
            }
            let object_ty = infer_expr(ck, scope, object);
            member_access(ck, &object_ty, property, *opt_chain, span)
        }

        ExprKind::Index { object, index, opt_chain: _ } => {
            let object_ty = infer_expr(ck, scope, object);
            let index_ty = infer_expr(ck, scope, index);
            index_access(ck, &object_ty, &index_ty, span)
        }

        ExprKind::Tuple(elems) => {
            let elems = elems
                .iter()
                .map(|e| match &e.kind {
                    ExprKind::Spread(inner) => {
                        let inner_ty = infer_expr(ck, scope, inner);
                        let ty = Type::rest(strip_uncertain(ck, &inner_ty));
                        ck.set_node_type(e.id, ty.clone());
                        ty
                    }
                    _ => strip_uncertain_shallow(infer_expr(ck, scope, e)),
                })
                .collect();
            Type::mut_uncertain(Type::tuple(elems))
        }

        ExprKind::Spread(inner) => {
            let inner_ty = infer_expr(ck, scope, inner);
            Type::rest(inner_ty)
        }

        ExprKind::Object(props) => infer_object_literal(ck, scope, props, span),

        ExprKind::Func(func) => {
            let func_ty = infer_func_expr(ck, scope, func, None);
            Type::new(TypeKind::Func(func_ty))
        }

        ExprKind::If { cond, then_block, else_branch } => {
            let cond_ty = infer_expr(ck, scope, cond);
            let errors = ck.unify(&cond_ty, &Type::boolean(), cond.span);
            ck.errors.extend(errors);
            let then_ty = infer_block(ck, scope, then_block).0;
            let else_ty = match else_branch {
                Some(ElseBranch::Block(block)) => infer_block(ck, scope, block).0,
                Some(ElseBranch::If(nested)) => infer_expr(ck, scope, nested),
                None => Type::undefined(),
            };
            union_of(vec![then_ty, else_ty])
        }

        ExprKind::Match { target, arms } => {
            let target_ty = infer_expr(ck, scope, target);
            let mut body_types = Vec::new();
            for arm in arms {
                let arm_scope = Scope::child(scope);
                let (pattern_ty, bindings) = infer_pattern(ck, &arm_scope, &arm.pat);
                install_bindings(ck, &arm_scope.namespace, bindings, arm.pat.span);
                // The pattern describes a subset of the scrutinee.
                let errors = ck.unify(&pattern_ty, &target_ty, arm.pat.span);
                ck.errors.extend(errors);
                if let Some(guard) = &arm.guard {
                    let guard_ty = infer_expr(ck, &arm_scope, guard);
                    let errors = ck.unify(&guard_ty, &Type::boolean(), guard.span);
                    ck.errors.extend(errors);
                }
                body_types.push(infer_expr(ck, &arm_scope, &arm.body));
            }
            union_of(body_types)
        }

        ExprKind::Do(block) => infer_block(ck, scope, block).0,

        ExprKind::Throw(value) => {
            let thrown = infer_expr(ck, scope, value);
            if let Some(frame) = ck.fn_frames.last_mut() {
                frame.throws.push(thrown);
            }
            Type::never()
        }

        ExprKind::Await(value) => {
            let value_ty = infer_expr(ck, scope, value);
            let is_async = ck.fn_frames.last().map(|f| f.is_async).unwrap_or(false);
            if !is_async {
                ck.errors.push(TypeError::Generic {
                    message: "`await` is only allowed inside an async function".into(),
                    span,
                });
            }
            let value_var = ck.fresh_var();
            let err_var = ck.fresh_var();
            let promise = Type::promise(value_var.clone(), err_var.clone());
            let errors = ck.unify(&value_ty, &promise, value.span);
            ck.errors.extend(errors);
            if let Some(frame) = ck.fn_frames.last_mut() {
                frame.throws.push(err_var);
            }
            value_var
        }

        ExprKind::Cast { expr: inner, ann } => {
            let inner_ty = infer_expr(ck, scope, inner);
            let target = lower_type_ann(ck, scope, ann);
            let errors = ck.unify(&inner_ty, &target, span);
            ck.errors.extend(errors);
            target
        }

        ExprKind::TemplateLit { exprs, .. } => {
            for e in exprs {
                infer_expr(ck, scope, e);
            }
            Type::string()
        }

        ExprKind::TaggedTemplate { tag, quasis, exprs } => {
            infer_tagged_template(ck, scope, tag, quasis, exprs, span)
        }

        ExprKind::Jsx(element) => infer_jsx(ck, scope, element),
    }
}

fn infer_lit(lit: &Lit) -> Type {
    match lit {
        Lit::Regex { pattern, flags } => {
            // Named capture groups become string-typed entries.
            let re = RegexType { pattern: pattern.clone(), flags: flags.clone(), groups: Vec::new() };
            let groups = match crate::ty::compile_regex(&re) {
                Ok(compiled) => compiled
                    .capture_names()
                    .flatten()
                    .map(|name| (name.to_string(), Type::string()))
                    .collect(),
                Err(_) => Vec::new(),
            };
            Type::new(TypeKind::Regex(RegexType {
                pattern: pattern.clone(),
                flags: flags.clone(),
                groups,
            }))
        }
        _ => Type::mut_uncertain(Type::lit(lit.clone())),
    }
}

/// Strip a `MutUncertain` wrapper after pruning.
fn strip_uncertain(ck: &mut Checker, ty: &Type) -> Type {
    let pruned = ck.prune(ty);
    match pruned.kind {
        TypeKind::MutUncertain(inner) => *inner,
        _ => pruned,
    }
}

fn strip_uncertain_shallow(ty: Type) -> Type {
    match ty.kind {
        TypeKind::MutUncertain(inner) => *inner,
        _ => ty,
    }
}

// ── Assignment and mutation checking ─────────────────────────────────────

fn infer_assignment(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    target: &Expr,
    value: &Expr,
    span: Span,
) -> Type {
    let value_ty = infer_expr(ck, scope, value);
    match &target.kind {
        ExprKind::Ident(name) => {
            let target_ty = infer_expr(ck, scope, target);
            // An unknown identifier was already reported by the lookup.
            if let Some(binding) = scope.lookup_value(name) {
                if !binding.mutable {
                    ck.errors
                        .push(TypeError::CannotMutateImmutable { span: target.span });
                }
                let errors = ck.unify(&value_ty, &target_ty, span);
                ck.errors.extend(errors);
            }
            value_ty
        }
        ExprKind::Member { object, property, .. } => {
            let object_ty = infer_expr(ck, scope, object);
            ck.set_node_type(target.id, value_ty.clone());
            check_member_mutation(ck, &object_ty, property, &value_ty, target.span);
            value_ty
        }
        ExprKind::Index { object, index, .. } => {
            let object_ty = infer_expr(ck, scope, object);
            let index_ty = infer_expr(ck, scope, index);
            ck.set_node_type(target.id, value_ty.clone());
            let pruned_index = ck.prune(&index_ty);
            let pruned_index = strip_uncertain_shallow(pruned_index);
            match &pruned_index.kind {
                TypeKind::Lit(Lit::Str(name)) => {
                    let name = name.clone();
                    check_member_mutation(ck, &object_ty, &name, &value_ty, target.span);
                }
                _ => {
                    // Index writes without a literal key still require a
                    // mutable base.
                    let base = strip_uncertain(ck, &object_ty);
                    if !matches!(base.kind, TypeKind::Mutable(_)) {
                        ck.errors
                            .push(TypeError::CannotMutateImmutable { span: target.span });
                    } else if let Some(elem) = resolve_to_array_elem(ck, &base) {
                        let errors = ck.unify(&value_ty, &elem, span);
                        ck.errors.extend(errors);
                    }
                }
            }
            value_ty
        }
        _ => {
            ck.errors.push(TypeError::Generic {
                message: "assignment target must be an identifier, member, or index".into(),
                span: target.span,
            });
            value_ty
        }
    }
}

/// The §-mutation rules for a member write: a readonly property wins over
/// everything; otherwise the base must be `mut`.
fn check_member_mutation(
    ck: &mut Checker,
    object_ty: &Type,
    property: &str,
    value_ty: &Type,
    span: Span,
) {
    let base = strip_uncertain(ck, object_ty);
    // A base that already failed to infer produces no cascade.
    if matches!(base.kind, TypeKind::Never | TypeKind::Any) {
        return;
    }
    let is_mutable_base = matches!(base.kind, TypeKind::Mutable(_));

    // Search for the property, iterating expansion as needed.
    let mut current = match &base.kind {
        TypeKind::Mutable(inner) => inner.as_ref().clone(),
        _ => base.clone(),
    };
    let mut found: Option<(Type, bool)> = None;
    for _ in 0..MAX_RESOLVE_STEPS {
        let pruned = ck.prune(&current);
        match &pruned.kind {
            TypeKind::Object(obj) => {
                for elem in &obj.elems {
                    match elem {
                        ObjElem::Prop { key: ObjKey::Str(k), ty, readonly, .. }
                            if k == property =>
                        {
                            found = Some((ty.clone(), *readonly));
                        }
                        ObjElem::Setter { key: ObjKey::Str(k), func } if k == property => {
                            let ty = func
                                .params
                                .first()
                                .map(|p| p.ty.clone())
                                .unwrap_or_else(Type::any);
                            found = Some((ty, false));
                        }
                        _ => {}
                    }
                }
                break;
            }
            _ => match expand_type(ck, &pruned) {
                Some(next) => current = next,
                None => break,
            },
        }
    }

    match found {
        Some((_, true)) => {
            ck.errors.push(TypeError::CannotMutateReadonlyProperty {
                name: property.to_string(),
                span,
            });
        }
        Some((prop_ty, false)) => {
            if !is_mutable_base {
                ck.errors.push(TypeError::CannotMutateImmutable { span });
            }
            let errors = ck.unify(value_ty, &prop_ty, span);
            ck.errors.extend(errors);
        }
        None => {
            let ty = ck.resolve(&base);
            ck.errors.push(TypeError::UnknownProperty {
                ty,
                name: property.to_string(),
                span,
            });
        }
    }
}

fn resolve_to_array_elem(ck: &mut Checker, ty: &Type) -> Option<Type> {
    let inner = match &ty.kind {
        TypeKind::Mutable(inner) => inner.as_ref().clone(),
        _ => ty.clone(),
    };
    let pruned = ck.prune(&inner);
    pruned.array_elem().cloned()
}

// ── Call dispatch ────────────────────────────────────────────────────────

/// Dispatch a call: resolve the callee to something callable, check
/// arity, unify arguments, and produce a fresh copy of the return type
/// with call-site provenance.
pub(crate) fn dispatch_call(
    ck: &mut Checker,
    callee_ty: &Type,
    args: &[(Type, Span)],
    span: Span,
) -> Type {
    let mut current = strip_uncertain(ck, callee_ty);
    for _ in 0..MAX_RESOLVE_STEPS {
        let pruned = ck.prune(&current);
        match &pruned.kind {
            TypeKind::Func(func) => {
                let func = ck.instantiate_func(&func.clone());
                let errors = unify_call_args(ck, &func, args, span);
                ck.errors.extend(errors);
                return func.ret.as_ref().clone().provenanced(Provenance::Span(span));
            }
            TypeKind::Object(obj) => {
                let callable = obj.elems.iter().find_map(|elem| match elem {
                    ObjElem::Constructor(func) | ObjElem::Callable(func) => Some(func.clone()),
                    _ => None,
                });
                match callable {
                    Some(func) => {
                        let func = ck.instantiate_func(&func);
                        let errors = unify_call_args(ck, &func, args, span);
                        ck.errors.extend(errors);
                        return func.ret.as_ref().clone().provenanced(Provenance::Span(span));
                    }
                    None => {
                        let ty = ck.resolve(&pruned);
                        ck.errors.push(TypeError::CalleeIsNotCallable { ty, span });
                        return Type::any();
                    }
                }
            }
            TypeKind::Intersection(members) => {
                // Overload resolution: first member whose arguments unify
                // without errors wins; otherwise report every attempt.
                let members = members.clone();
                let mut attempts = Vec::new();
                for member in &members {
                    let member = ck.prune(member);
                    let func = match &member.kind {
                        TypeKind::Func(func) => ck.instantiate_func(&func.clone()),
                        _ => continue,
                    };
                    let snapshot_errors = try_unify_call_args(ck, &func, args, span);
                    if snapshot_errors.is_empty() {
                        return func.ret.as_ref().clone().provenanced(Provenance::Span(span));
                    }
                    attempts.push(snapshot_errors);
                }
                ck.errors.push(TypeError::NoMatchingOverload { attempts, span });
                return Type::any();
            }
            TypeKind::Any => return Type::any(),
            // A callee that already failed to infer produces no cascade.
            TypeKind::Never => return Type::any(),
            _ => match expand_type(ck, &pruned) {
                Some(next) => current = next,
                None => {
                    let ty = ck.resolve(&pruned);
                    ck.errors.push(TypeError::CalleeIsNotCallable { ty, span });
                    return Type::any();
                }
            },
        }
    }
    let ty = ck.resolve(&current);
    ck.errors.push(TypeError::CalleeIsNotCallable { ty, span });
    Type::any()
}

/// Probe one overload: the whole argument list commits or rolls back
/// atomically, so a failed candidate leaves no bindings behind.
fn try_unify_call_args(
    ck: &mut Checker,
    func: &FuncType,
    args: &[(Type, Span)],
    span: Span,
) -> Vec<TypeError> {
    ck.transaction(|ck| unify_call_args(ck, func, args, span))
}

fn unify_call_args(
    ck: &mut Checker,
    func: &FuncType,
    args: &[(Type, Span)],
    span: Span,
) -> Vec<TypeError> {
    let mut errors = Vec::new();
    match func.rest_index() {
        Some(rest_idx) => {
            if args.len() < rest_idx {
                errors.push(TypeError::InvalidNumberOfArguments {
                    required: rest_idx,
                    maximum: rest_idx,
                    found: args.len(),
                    span,
                });
                return errors;
            }
            for i in 0..rest_idx {
                let (arg_ty, arg_span) = &args[i];
                errors.extend(ck.unify(arg_ty, &func.params[i].ty.clone(), *arg_span));
            }
            let rest_ty = func.params[rest_idx].ty.clone();
            let elem = rest_ty.array_elem().cloned().unwrap_or_else(Type::any);
            for (arg_ty, arg_span) in &args[rest_idx..] {
                let pruned = ck.prune(arg_ty);
                match &pruned.kind {
                    // A spread argument covers the rest of the list.
                    TypeKind::RestSpread(inner) => {
                        errors.extend(ck.unify(&inner.clone(), &rest_ty, *arg_span));
                    }
                    _ => errors.extend(ck.unify(arg_ty, &elem, *arg_span)),
                }
            }
        }
        None => {
            let required = func.required_count();
            let maximum = func.params.len();
            if args.len() < required || args.len() > maximum {
                errors.push(TypeError::InvalidNumberOfArguments {
                    required,
                    maximum,
                    found: args.len(),
                    span,
                });
                return errors;
            }
            for (i, (arg_ty, arg_span)) in args.iter().enumerate() {
                errors.extend(ck.unify(arg_ty, &func.params[i].ty.clone(), *arg_span));
            }
        }
    }
    errors
}

// ── Member and index access ──────────────────────────────────────────────

/// Resolve `A.b.c` where `A` (or a prefix) names a namespace rather than
/// a value.
fn resolve_namespace_member(ck: &mut Checker, scope: &Rc<Scope>, expr: &Expr) -> Option<Type> {
    fn collect_path<'a>(expr: &'a Expr, parts: &mut Vec<&'a str>) -> bool {
        match &expr.kind {
            ExprKind::Ident(name) => {
                parts.push(name);
                true
            }
            ExprKind::Member { object, property, .. } => {
                if !collect_path(object, parts) {
                    return false;
                }
                parts.push(property);
                true
            }
            _ => false,
        }
    }
    let mut parts = Vec::new();
    if !collect_path(expr, &mut parts) || parts.len() < 2 {
        return None;
    }
    // Only treat the path as namespace-rooted if the head is not a value.
    if scope.lookup_value(parts[0]).is_some() {
        return None;
    }
    let mut ns: NamespaceRef = scope.lookup_namespace(parts[0])?;
    for part in &parts[1..parts.len() - 1] {
        let next = ns.borrow().namespaces.get(*part).cloned()?;
        ns = next;
    }
    let last = *parts.last().expect("non-empty path");
    let binding = ns.borrow().values.get(last).cloned()?;
    if let Some(source) = binding.source {
        ck.binding_sources.insert(expr.id, source);
    }
    Some(binding.ty)
}

/// Compute the type of `object.property`, expanding computed object types
/// as needed. Methods whose declared return is the pseudo-type `Self`
/// have it rewritten to the receiver type (fluent mutation).
fn member_access(
    ck: &mut Checker,
    object_ty: &Type,
    property: &str,
    opt_chain: bool,
    span: Span,
) -> Type {
    let mut base = strip_uncertain(ck, object_ty);
    if let TypeKind::Mutable(inner) = &base.kind {
        base = inner.as_ref().clone();
    }

    // Optional chaining looks through the absent members of a union.
    let mut absent = false;
    if opt_chain {
        let pruned = ck.prune(&base);
        if let TypeKind::Union(members) = &pruned.kind {
            let defined: Vec<Type> = members
                .iter()
                .filter(|m| {
                    !matches!(&m.kind, TypeKind::Lit(Lit::Null) | TypeKind::Lit(Lit::Undefined))
                })
                .cloned()
                .collect();
            if defined.len() != members.len() {
                absent = true;
            }
            base = union_of(defined);
        }
    }

    let mut current = base.clone();
    for _ in 0..MAX_RESOLVE_STEPS {
        let pruned = ck.prune(&current);
        match &pruned.kind {
            TypeKind::Object(obj) => {
                let member = object_member(obj, &base, property);
                return match member {
                    Some(ty) => {
                        if absent {
                            union_of(vec![ty, Type::undefined()])
                        } else {
                            ty
                        }
                    }
                    None => {
                        let ty = ck.resolve(&pruned);
                        ck.errors.push(TypeError::UnknownProperty {
                            ty,
                            name: property.to_string(),
                            span,
                        });
                        Type::never()
                    }
                };
            }
            TypeKind::Any => return Type::any(),
            TypeKind::Never => return Type::never(),
            _ => match expand_type(ck, &pruned) {
                Some(next) => current = next,
                None => {
                    let ty = ck.resolve(&pruned);
                    ck.errors.push(TypeError::UnknownProperty {
                        ty,
                        name: property.to_string(),
                        span,
                    });
                    return Type::never();
                }
            },
        }
    }
    Type::never()
}

fn object_member(obj: &ObjectType, receiver: &Type, property: &str) -> Option<Type> {
    for elem in &obj.elems {
        match elem {
            ObjElem::Prop { key: ObjKey::Str(k), ty, optional, .. } if k == property => {
                let ty = ty.clone();
                return Some(if *optional {
                    union_of(vec![ty, Type::undefined()])
                } else {
                    ty
                });
            }
            ObjElem::Method { key: ObjKey::Str(k), func, .. } if k == property => {
                let mut func = func.clone();
                if func.ret.is_ref_named("Self") {
                    func.ret = Box::new(receiver.clone());
                }
                return Some(Type::new(TypeKind::Func(func)));
            }
            ObjElem::Getter { key: ObjKey::Str(k), func } if k == property => {
                return Some(func.ret.as_ref().clone());
            }
            ObjElem::Setter { key: ObjKey::Str(k), func } if k == property => {
                return Some(
                    func.params
                        .first()
                        .map(|p| p.ty.clone())
                        .unwrap_or_else(Type::any),
                );
            }
            _ => {}
        }
    }
    None
}

fn index_access(ck: &mut Checker, object_ty: &Type, index_ty: &Type, span: Span) -> Type {
    let base = strip_uncertain(ck, object_ty);
    let base = match base.kind {
        TypeKind::Mutable(inner) => *inner,
        _ => base,
    };
    let index = strip_uncertain(ck, index_ty);

    // Arrays index by number to `E | undefined`.
    if let Some(elem) = {
        let pruned = ck.prune(&base);
        pruned.array_elem().cloned()
    } {
        let errors = ck.unify(&index, &Type::number(), span);
        ck.errors.extend(errors);
        return union_of(vec![elem, Type::undefined()]);
    }

    let mut current = Type::new(TypeKind::Index(crate::ty::IndexType {
        obj: Box::new(base),
        index: Box::new(index),
    }));
    for _ in 0..MAX_RESOLVE_STEPS {
        match expand_type(ck, &current) {
            Some(next) => match next.kind {
                TypeKind::Index(_) => current = next,
                _ => return next,
            },
            None => break,
        }
    }
    let key = ck.resolve(index_ty);
    ck.errors.push(TypeError::InvalidObjectKey { key, span });
    Type::never()
}

// ── Object literals ──────────────────────────────────────────────────────

/// Infer an object literal. A scoped `Self` alias is installed before the
/// members so method signatures may reference the object's own type;
/// signatures are collected first and bodies inferred after the object
/// type is complete.
fn infer_object_literal(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    props: &[ObjProp],
    span: Span,
) -> Type {
    let self_scope = Scope::child(scope);
    let self_var = ck.fresh_var();
    let self_alias = Rc::new(std::cell::RefCell::new(crate::ty::TypeAlias {
        ty: self_var.clone(),
        type_params: Vec::new(),
        exported: false,
    }));
    self_scope
        .namespace
        .borrow_mut()
        .insert_type("Self", self_alias.clone());
    let self_ref = Type::new(TypeKind::Ref(crate::ty::TypeRefType {
        name: QualName::simple("Self"),
        type_args: Vec::new(),
        alias: crate::ty::filled_alias_slot(self_alias),
    }));

    let mut elems = Vec::new();
    // Deferred method bodies: (signature, func expression, body scope).
    let mut bodies: Vec<(FuncType, FuncExpr, Rc<Scope>)> = Vec::new();

    for prop in props {
        match prop {
            ObjProp::KeyValue { key, value } => {
                if let Some(key) = object_key(ck, &self_scope, key) {
                    let ty = infer_expr(ck, &self_scope, value);
                    let ty = strip_uncertain_shallow(ty);
                    elems.push(ObjElem::Prop { key, ty, optional: false, readonly: false });
                }
            }
            ObjProp::Shorthand { name, id, span } => {
                match self_scope.lookup_value(name) {
                    Some(binding) => {
                        if let Some(source) = binding.source {
                            ck.binding_sources.insert(*id, source);
                        }
                        ck.set_node_type(*id, binding.ty.clone());
                        elems.push(ObjElem::Prop {
                            key: ObjKey::Str(name.clone()),
                            ty: binding.ty,
                            optional: false,
                            readonly: false,
                        });
                    }
                    None => {
                        ck.errors.push(TypeError::UnknownIdentifier {
                            name: name.clone(),
                            span: *span,
                        });
                    }
                }
            }
            ObjProp::Method { key, func } => {
                if let Some(key) = object_key(ck, &self_scope, key) {
                    let self_ty = self_ref.clone();
                    let (sig, body_scope) =
                        infer_func_sig(ck, &self_scope, func, Some(self_ty));
                    let mut_self = func.self_param.map(|s| s.mutable).unwrap_or(false);
                    elems.push(ObjElem::Method { key, func: sig.clone(), mut_self });
                    bodies.push((sig, func.clone(), body_scope));
                }
            }
            ObjProp::Getter { key, func } => {
                if let Some(key) = object_key(ck, &self_scope, key) {
                    let self_ty = self_ref.clone();
                    let (sig, body_scope) =
                        infer_func_sig(ck, &self_scope, func, Some(self_ty));
                    elems.push(ObjElem::Getter { key, func: sig.clone() });
                    bodies.push((sig, func.clone(), body_scope));
                }
            }
            ObjProp::Setter { key, func } => {
                if let Some(key) = object_key(ck, &self_scope, key) {
                    let self_ty = self_ref.clone();
                    let (sig, body_scope) =
                        infer_func_sig(ck, &self_scope, func, Some(self_ty));
                    elems.push(ObjElem::Setter { key, func: sig.clone() });
                    bodies.push((sig, func.clone(), body_scope));
                }
            }
            ObjProp::Spread(inner) => {
                let ty = infer_expr(ck, &self_scope, inner);
                let ty = strip_uncertain(ck, &ty);
                elems.push(ObjElem::RestSpread(ty));
            }
        }
    }

    let obj_ty = Type::object(elems).provenanced(Provenance::Span(span));
    let errors = ck.unify(&self_var, &obj_ty, span);
    ck.errors.extend(errors);

    for (sig, func, body_scope) in bodies {
        infer_func_body(ck, &body_scope, &func, &sig);
    }

    Type::mut_uncertain(obj_ty)
}

/// Lower an object literal key, evaluating computed keys down to unique
/// symbols.
fn object_key(ck: &mut Checker, scope: &Rc<Scope>, key: &PropKey) -> Option<ObjKey> {
    match key {
        PropKey::Ident(name) | PropKey::Str(name) => Some(ObjKey::Str(name.clone())),
        PropKey::Num(n) => Some(ObjKey::Num(n.clone())),
        PropKey::Computed(expr) => {
            let ty = infer_expr(ck, scope, expr);
            let pruned = ck.prune(&ty);
            match pruned.kind {
                TypeKind::UniqueSymbol(id) => Some(ObjKey::Sym(id)),
                _ => {
                    let key = ck.resolve(&pruned);
                    ck.errors
                        .push(TypeError::InvalidObjectKey { key, span: expr.span });
                    None
                }
            }
        }
    }
}

// ── Functions ────────────────────────────────────────────────────────────

/// Infer a function's signature: lower annotations, infer parameter
/// patterns, install parameter bindings into a fresh body scope. Returns
/// the signature and the body scope for later body inference.
pub(crate) fn infer_func_sig(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    func: &FuncExpr,
    self_ty: Option<Type>,
) -> (FuncType, Rc<Scope>) {
    let body_scope = Scope::child(scope);
    let mut bound: Vec<String> = func.type_params.iter().map(|tp| tp.name.clone()).collect();
    let type_params = lower_type_params(ck, scope, &func.type_params);

    if let (Some(self_ty), Some(self_param)) = (self_ty, func.self_param) {
        let ty = if self_param.mutable { Type::mutable(self_ty) } else { self_ty };
        body_scope.namespace.borrow_mut().insert_value(
            "self",
            Binding { source: None, ty, mutable: self_param.mutable, exported: false },
        );
    }

    let mut params = Vec::new();
    for param in &func.params {
        params.push(lower_param(ck, scope, &body_scope, param, &mut bound));
    }

    let ret = match &func.ret {
        Some(ann) => lower_type_ann_bound(ck, scope, ann, &mut bound),
        None => ck.fresh_var(),
    };
    let throws = match &func.throws {
        Some(ann) => lower_type_ann_bound(ck, scope, ann, &mut bound),
        None => ck.fresh_var(),
    };

    (
        FuncType { type_params, params, ret: Box::new(ret), throws: Box::new(throws) },
        body_scope,
    )
}

fn lower_param(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    body_scope: &Rc<Scope>,
    param: &Param,
    bound: &mut Vec<String>,
) -> FuncParam {
    let rest = matches!(param.pat.kind, PatKind::Rest(_));
    let (pattern_ty, bindings) = infer_pattern(ck, body_scope, &param.pat);
    let name = param
        .pat
        .binder_names()
        .into_iter()
        .next()
        .unwrap_or_else(|| "_".to_string());

    let ty = match &param.ann {
        Some(ann) => {
            let ann_ty = lower_type_ann_bound(ck, scope, ann, bound);
            // A rest pattern's type is the spread of the annotated array.
            let pattern_target = if rest { Type::rest(ann_ty.clone()) } else { ann_ty.clone() };
            let errors = ck.unify(&pattern_ty, &pattern_target, param.pat.span);
            ck.errors.extend(errors);
            ann_ty
        }
        None => {
            if rest {
                let elem = ck.fresh_var();
                let arr = Type::array(elem);
                let errors = ck.unify(&pattern_ty, &Type::rest(arr.clone()), param.pat.span);
                ck.errors.extend(errors);
                arr
            } else {
                pattern_ty.clone()
            }
        }
    };

    install_bindings(ck, &body_scope.namespace, bindings, param.pat.span);
    FuncParam { name, rest, ty, optional: param.optional }
}

/// Infer a function body against its signature: returns unify with the
/// declared (or placeholder) return type, and accumulated throws unify
/// with the throws slot.
pub(crate) fn infer_func_body(
    ck: &mut Checker,
    body_scope: &Rc<Scope>,
    func: &FuncExpr,
    sig: &FuncType,
) {
    let body = match &func.body {
        Some(body) => body,
        None => return,
    };
    ck.fn_frames.push(FnFrame { throws: Vec::new(), is_async: func.is_async });

    match body {
        FuncBody::Expr(expr) => {
            let ty = infer_expr(ck, body_scope, expr);
            let errors = ck.unify(&ty, &sig.ret, expr.span);
            ck.errors.extend(errors);
        }
        FuncBody::Block(block) => {
            let (value, terminal_return) = infer_block_in(ck, body_scope, block, Some(sig));
            if !terminal_return {
                let errors = ck.unify(&value, &sig.ret, block.span);
                ck.errors.extend(errors);
            }
        }
    }

    let frame = ck.fn_frames.pop().expect("frame pushed above");
    let thrown = union_of(frame.throws);
    let errors = ck.unify(&thrown, &sig.throws, Checker::builtin_span());
    ck.errors.extend(errors);
}

/// Signature + body in one step, for function literals.
pub(crate) fn infer_func_expr(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    func: &FuncExpr,
    self_ty: Option<Type>,
) -> FuncType {
    let (sig, body_scope) = infer_func_sig(ck, scope, func, self_ty);
    infer_func_body(ck, &body_scope, func, &sig);
    sig
}

// ── Blocks ───────────────────────────────────────────────────────────────

/// Infer a block. The value is the last expression statement's type
/// (`undefined` if there is none). Returns whether the block ends in a
/// `return`.
pub(crate) fn infer_block(ck: &mut Checker, scope: &Rc<Scope>, block: &Block) -> (Type, bool) {
    infer_block_in(ck, scope, block, None)
}

fn infer_block_in(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    block: &Block,
    sig: Option<&FuncType>,
) -> (Type, bool) {
    let block_scope = Scope::child(scope);
    let mut value = Type::undefined();
    let mut terminal_return = false;
    for (i, stmt) in block.stmts.iter().enumerate() {
        let last = i + 1 == block.stmts.len();
        terminal_return = false;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                value = infer_expr(ck, &block_scope, expr);
            }
            StmtKind::Let { pattern, ann, init } => {
                let (pattern_ty, bindings) = infer_pattern(ck, &block_scope, pattern);
                if let Some(ann) = ann {
                    let ann_ty = lower_type_ann(ck, &block_scope, ann);
                    let errors = ck.unify(&pattern_ty, &ann_ty, pattern.span);
                    ck.errors.extend(errors);
                }
                let init_ty = infer_expr(ck, &block_scope, init);
                let errors = ck.unify(&init_ty, &pattern_ty, stmt.span);
                ck.errors.extend(errors);
                install_bindings(ck, &block_scope.namespace, bindings, pattern.span);
                value = Type::undefined();
            }
            StmtKind::Return(expr) => {
                let ty = match expr {
                    Some(expr) => infer_expr(ck, &block_scope, expr),
                    None => Type::undefined(),
                };
                if let Some(sig) = sig {
                    let span = expr.as_ref().map(|e| e.span).unwrap_or(stmt.span);
                    let errors = ck.unify(&ty, &sig.ret, span);
                    ck.errors.extend(errors);
                }
                if last {
                    terminal_return = true;
                }
                value = Type::never();
            }
        }
    }
    (value, terminal_return)
}

/// Install pattern bindings into a namespace, reporting duplicates rather
/// than overwriting.
pub(crate) fn install_bindings(
    ck: &mut Checker,
    namespace: &NamespaceRef,
    bindings: Vec<(String, Binding)>,
    span: Span,
) {
    for (name, binding) in bindings {
        let exists = namespace.borrow().values.contains_key(&name);
        if exists {
            ck.errors.push(TypeError::Generic {
                message: format!("`{name}` is bound more than once"),
                span,
            });
        } else {
            namespace.borrow_mut().insert_value(name, binding);
        }
    }
}

// ── Tagged templates ─────────────────────────────────────────────────────

fn infer_tagged_template(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    tag: &Expr,
    quasis: &[String],
    exprs: &[Expr],
    span: Span,
) -> Type {
    let is_gql = matches!(&tag.kind, ExprKind::Ident(name) if name == "gql");
    if is_gql {
        // Record a type for the tag node even though it does not resolve
        // to a value; the node table stays total.
        ck.set_node_type(tag.id, Type::any());
        let expr_types: Vec<Type> = exprs.iter().map(|e| infer_expr(ck, scope, e)).collect();
        let mut query = String::new();
        for (i, quasi) in quasis.iter().enumerate() {
            query.push_str(quasi);
            if let Some(ty) = expr_types.get(i) {
                let resolved = strip_uncertain(ck, ty);
                match &resolved.kind {
                    TypeKind::Lit(Lit::Str(text)) => query.push_str(text),
                    TypeKind::Lit(Lit::Num(text)) => query.push_str(text),
                    _ => {}
                }
            }
        }
        let schema = ck.graphql_schema.clone();
        return match (&ck.graphql, schema) {
            (Some(validator), Some(schema)) => match validator.validate(&schema, &query) {
                Ok(doc) => Type::reference(
                    QualName::simple("TypedDocumentNode"),
                    vec![doc.result, doc.variables],
                ),
                Err(message) => {
                    ck.errors.push(TypeError::Generic { message, span });
                    Type::any()
                }
            },
            _ => {
                ck.errors.push(TypeError::Generic {
                    message: "no GraphQL schema is configured for `gql` templates".into(),
                    span,
                });
                Type::any()
            }
        };
    }

    // Any other tag desugars into a call with the strings array first.
    let tag_ty = infer_expr(ck, scope, tag);
    let strings = Type::tuple(quasis.iter().map(|q| Type::lit_str(q)).collect());
    let mut args = vec![(strings, span)];
    for e in exprs {
        args.push((infer_expr(ck, scope, e), e.span));
    }
    dispatch_call(ck, &tag_ty, &args, span)
}

// ── JSX ──────────────────────────────────────────────────────────────────

fn infer_jsx(ck: &mut Checker, scope: &Rc<Scope>, element: &JsxElement) -> Type {
    let span = element.span;

    // Infer attribute values and build the props object.
    let mut attr_types: Vec<(String, Type, Span)> = Vec::new();
    let mut key_ty: Option<(Type, Span)> = None;
    for attr in &element.attrs {
        let ty = match &attr.value {
            Some(JsxAttrValue::Str(text)) => Type::lit_str(text),
            Some(JsxAttrValue::Expr(expr)) => infer_expr(ck, scope, expr),
            None => Type::lit(Lit::Bool(true)),
        };
        if attr.name == "key" {
            key_ty = Some((ty, attr.span));
        } else {
            attr_types.push((attr.name.clone(), ty, attr.span));
        }
    }

    // `key` never reaches the component; it must be string or number.
    if let Some((ty, key_span)) = key_ty {
        let ok = union_of(vec![Type::string(), Type::number()]);
        if !ck.try_unify(&ty, &ok, key_span).is_empty() {
            ck.errors.push(TypeError::InvalidKeyProp { span: key_span });
        }
    }

    let mut child_types = Vec::new();
    for child in &element.children {
        match child {
            JsxChild::Element(inner) => child_types.push(infer_jsx(ck, scope, inner)),
            JsxChild::Expr(expr) => child_types.push(infer_expr(ck, scope, expr)),
            JsxChild::Text(_) => child_types.push(Type::string()),
        }
    }

    let element_ty = Type::reference(
        QualName::new(vec!["JSX".into(), "Element".into()]),
        vec![],
    );

    let is_component = element
        .name
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false);

    let props_param = if is_component {
        let component = match scope.lookup_value(&element.name) {
            Some(binding) => binding.ty,
            None => {
                ck.errors.push(TypeError::UnknownComponent {
                    name: element.name.clone(),
                    span,
                });
                return element_ty;
            }
        };
        let mut current = strip_uncertain(ck, &component);
        let mut props = None;
        for _ in 0..MAX_RESOLVE_STEPS {
            let pruned = ck.prune(&current);
            match &pruned.kind {
                TypeKind::Func(func) => {
                    let func = ck.instantiate_func(&func.clone());
                    props = func.params.first().map(|p| p.ty.clone());
                    break;
                }
                _ => match expand_type(ck, &pruned) {
                    Some(next) => current = next,
                    None => break,
                },
            }
        }
        match props {
            Some(props) => props,
            None => {
                ck.errors.push(TypeError::UnknownComponent {
                    name: element.name.clone(),
                    span,
                });
                return element_ty;
            }
        }
    } else {
        // Intrinsic elements resolve through `JSX.IntrinsicElements`.
        let intrinsics = scope.lookup_qualified_type(&QualName::new(vec![
            "JSX".into(),
            "IntrinsicElements".into(),
        ]));
        match intrinsics {
            Some(alias) => {
                let table = alias.borrow().ty.clone();
                let mut current = table;
                let mut props = None;
                for _ in 0..MAX_RESOLVE_STEPS {
                    let pruned = ck.prune(&current);
                    match &pruned.kind {
                        TypeKind::Object(obj) => {
                            props = obj.elems.iter().find_map(|elem| match elem {
                                ObjElem::Prop { key: ObjKey::Str(k), ty, .. }
                                    if *k == element.name =>
                                {
                                    Some(ty.clone())
                                }
                                _ => None,
                            });
                            break;
                        }
                        _ => match expand_type(ck, &pruned) {
                            Some(next) => current = next,
                            None => break,
                        },
                    }
                }
                match props {
                    Some(props) => props,
                    None => {
                        ck.errors.push(TypeError::UnknownComponent {
                            name: element.name.clone(),
                            span,
                        });
                        return element_ty;
                    }
                }
            }
            None => {
                ck.errors.push(TypeError::UnknownComponent {
                    name: element.name.clone(),
                    span,
                });
                return element_ty;
            }
        }
    };

    // Resolve the props parameter to an object and check the attributes
    // one by one, so each error lands on its attribute.
    let mut props_obj = None;
    let mut current = props_param.clone();
    for _ in 0..MAX_RESOLVE_STEPS {
        let pruned = ck.prune(&current);
        match &pruned.kind {
            TypeKind::Object(obj) => {
                props_obj = Some(obj.clone());
                break;
            }
            _ => match expand_type(ck, &pruned) {
                Some(next) => current = next,
                None => break,
            },
        }
    }

    if let Some(props_obj) = props_obj {
        let members = ck.object_member_map(&props_obj);
        for (name, ty, attr_span) in &attr_types {
            match members.iter().find(|(k, _)| matches!(k, ObjKey::Str(s) if s == name)) {
                Some((_, prop_ty)) => {
                    let errors = ck.unify(ty, &prop_ty.clone(), *attr_span);
                    ck.errors.extend(errors);
                }
                None => {
                    let ty = Type::new(TypeKind::Object(props_obj.clone()));
                    let resolved = ck.resolve(&ty);
                    ck.errors.push(TypeError::UnknownProperty {
                        ty: resolved,
                        name: name.clone(),
                        span: *attr_span,
                    });
                }
            }
        }
        // Required props the element does not supply.
        for elem in &props_obj.elems {
            if let ObjElem::Prop { key: ObjKey::Str(name), optional: false, .. } = elem {
                let supplied = attr_types.iter().any(|(n, _, _)| n == name)
                    || (name == "children" && !child_types.is_empty());
                if !supplied {
                    ck.errors
                        .push(TypeError::MissingRequiredProp { name: name.clone(), span });
                }
            }
        }
        // Children handed to a component that has no slot for them.
        let accepts_children = members
            .iter()
            .any(|(k, _)| matches!(k, ObjKey::Str(s) if s == "children"));
        if !child_types.is_empty() {
            if accepts_children {
                let slot = members
                    .iter()
                    .find(|(k, _)| matches!(k, ObjKey::Str(s) if s == "children"))
                    .map(|(_, ty)| ty.clone())
                    .expect("checked above");
                for child_ty in &child_types {
                    let errors = ck.try_unify(child_ty, &slot, span);
                    if !errors.is_empty() {
                        let arr = Type::array(slot.clone());
                        let errors = ck.unify(child_ty, &arr, span);
                        ck.errors.extend(errors);
                    }
                }
            } else {
                ck.errors.push(TypeError::UnexpectedChildren { span });
            }
        }
    }

    element_ty
}

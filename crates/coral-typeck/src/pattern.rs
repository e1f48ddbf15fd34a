//! Pattern inference.
//!
//! Produces the pattern's type plus its bindings in binder order, and
//! records the inferred type on every pattern node. Binding collection is
//! additive; duplicate names are detected and reported when bindings are
//! installed into a namespace.

use std::rc::Rc;

use coral_ast::{ObjPatProp, PatKind, Pattern};

use crate::annotation::lower_type_ann;
use crate::error::TypeError;
use crate::expr::infer_expr;
use crate::scope::Scope;
use crate::ty::{Binding, ExtractorType, ObjElem, ObjKey, Provenance, Type, TypeKind};
use crate::unify::Checker;

/// Infer a pattern. Returns its type and the bindings it introduces.
pub(crate) fn infer_pattern(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    pat: &Pattern,
) -> (Type, Vec<(String, Binding)>) {
    let mut bindings = Vec::new();
    let ty = infer(ck, scope, pat, &mut bindings);
    (ty, bindings)
}

fn infer(
    ck: &mut Checker,
    scope: &Rc<Scope>,
    pat: &Pattern,
    bindings: &mut Vec<(String, Binding)>,
) -> Type {
    let ty = match &pat.kind {
        PatKind::Ident { name, ann, default, mutable } => {
            let constraint = ann.as_ref().map(|a| lower_type_ann(ck, scope, a));
            let default_ty = default.as_ref().map(|expr| infer_expr(ck, scope, expr));
            let var = ck.fresh_binding_var(constraint, default_ty);
            bindings.push((
                name.clone(),
                Binding {
                    source: Some(pat.id),
                    ty: var.clone(),
                    mutable: *mutable,
                    exported: false,
                },
            ));
            var
        }
        PatKind::Lit(lit) => Type::lit(lit.clone()),
        PatKind::Tuple(elems) => {
            let elems = elems
                .iter()
                .map(|p| infer(ck, scope, p, bindings))
                .collect();
            Type::tuple(elems)
        }
        PatKind::Object(props) => {
            let mut elems = Vec::new();
            for prop in props {
                match prop {
                    ObjPatProp::KeyValue { key, pat } => {
                        let ty = infer(ck, scope, pat, bindings);
                        elems.push(ObjElem::Prop {
                            key: ObjKey::Str(key.clone()),
                            ty,
                            optional: false,
                            readonly: false,
                        });
                    }
                    ObjPatProp::Shorthand { id, span, name, ann, default } => {
                        let constraint = ann.as_ref().map(|a| lower_type_ann(ck, scope, a));
                        let default_ty =
                            default.as_ref().map(|expr| infer_expr(ck, scope, expr));
                        let var = ck
                            .fresh_binding_var(constraint, default_ty)
                            .provenanced(Provenance::Span(*span));
                        ck.set_node_type(*id, var.clone());
                        bindings.push((
                            name.clone(),
                            Binding {
                                source: Some(*id),
                                ty: var.clone(),
                                mutable: false,
                                exported: false,
                            },
                        ));
                        elems.push(ObjElem::Prop {
                            key: ObjKey::Str(name.clone()),
                            ty: var,
                            optional: false,
                            readonly: false,
                        });
                    }
                    ObjPatProp::Rest(pat) => {
                        let ty = infer(ck, scope, pat, bindings);
                        elems.push(ObjElem::RestSpread(ty));
                    }
                }
            }
            Type::object(elems)
        }
        PatKind::Extractor { name, args } => {
            let arg_types = args
                .iter()
                .map(|p| infer(ck, scope, p, bindings))
                .collect::<Vec<_>>();
            match scope.lookup_qualified_value(name) {
                Some(binding) => {
                    if let Some(source) = binding.source {
                        ck.binding_sources.insert(pat.id, source);
                    }
                    Type::new(TypeKind::Extractor(ExtractorType {
                        obj: Box::new(binding.ty),
                        args: arg_types,
                    }))
                }
                None => {
                    ck.errors.push(TypeError::UnknownIdentifier {
                        name: name.to_string(),
                        span: pat.span,
                    });
                    ck.fresh_var()
                }
            }
        }
        PatKind::Instance { class, inner } => {
            let inner_ty = infer(ck, scope, inner, bindings);
            match scope.lookup_qualified_type(class) {
                Some(alias) => {
                    let instance = alias.borrow().ty.clone();
                    let nominal_id = nominal_id_of(ck, &instance);
                    let marked = match (&inner_ty.kind, nominal_id) {
                        (TypeKind::Object(obj), Some(id)) => {
                            let mut obj = obj.clone();
                            obj.nominal_id = Some(id);
                            Type::new(TypeKind::Object(obj))
                        }
                        _ => inner_ty,
                    };
                    // The pattern is a partial view of the instance, so
                    // only its own keys are required to line up.
                    let errors = ck.unify(&instance, &marked, pat.span);
                    ck.errors.extend(errors);
                    marked
                }
                None => {
                    ck.errors.push(TypeError::UnknownType {
                        name: class.to_string(),
                        span: pat.span,
                    });
                    inner_ty
                }
            }
        }
        PatKind::Rest(inner) => Type::rest(infer(ck, scope, inner, bindings)),
        PatKind::Wildcard => ck.fresh_var(),
    };
    let ty = ty.provenanced(Provenance::Span(pat.span));
    ck.set_node_type(pat.id, ty.clone());
    ty
}

/// Find the nominal id of a class instance type, looking through
/// references and pruning.
fn nominal_id_of(ck: &mut Checker, ty: &Type) -> Option<u32> {
    let mut current = ck.prune(ty);
    for _ in 0..8 {
        match &current.kind {
            TypeKind::Object(obj) => return obj.nominal_id,
            _ => match crate::expand::expand_type(ck, &current) {
                Some(next) => current = next,
                None => return None,
            },
        }
    }
    None
}

//! The prelude scope.
//!
//! Registers the operator function bindings, `console`, `Error`, the
//! generic `Array<T>` and `Promise<T, E = never>` aliases, the `Symbol`
//! object with its well-known unique symbols, and the
//! `TypedDocumentNode<Result, Variables>` alias used by `gql` templates.

use std::cell::RefCell;
use std::rc::Rc;

use coral_ast::QualName;

use crate::scope::Scope;
use crate::ty::{
    filled_alias_slot, intersection_of, union_of, Binding, FuncParam, FuncType, ObjElem, ObjKey,
    Type, TypeAlias, TypeKind, TypeParam, TypeRefType,
};
use crate::unify::Checker;

fn param(name: &str, ty: Type) -> FuncParam {
    FuncParam { name: name.into(), rest: false, ty, optional: false }
}

fn opt_param(name: &str, ty: Type) -> FuncParam {
    FuncParam { name: name.into(), rest: false, ty, optional: true }
}

fn rest_param(name: &str, ty: Type) -> FuncParam {
    FuncParam { name: name.into(), rest: true, ty, optional: false }
}

fn binop(operand: Type, result: Type) -> Type {
    Type::func(vec![param("a", operand.clone()), param("b", operand)], result)
}

fn type_param_ref(name: &str) -> Type {
    Type::reference(QualName::simple(name), vec![])
}

/// Build the prelude scope for a checker.
pub fn prelude(ck: &mut Checker) -> Rc<Scope> {
    let scope = Scope::root();
    let ns = &scope.namespace;

    // ── Operators ────────────────────────────────────────────────────────

    let number_arith = binop(Type::number(), Type::number());
    for op in ["-", "*", "/"] {
        ns.borrow_mut()
            .insert_value(op, Binding::new(number_arith.clone()));
    }
    // `+` is overloaded over numbers and bigints; `++` concatenates
    // strings.
    let plus = intersection_of(vec![
        binop(Type::number(), Type::number()),
        binop(Type::bigint(), Type::bigint()),
    ]);
    ns.borrow_mut().insert_value("+", Binding::new(plus));
    ns.borrow_mut()
        .insert_value("++", Binding::new(binop(Type::string(), Type::string())));

    let comparison = binop(Type::number(), Type::boolean());
    for op in ["<", ">", "<=", ">="] {
        ns.borrow_mut()
            .insert_value(op, Binding::new(comparison.clone()));
    }

    // Equality is generic: both sides must share a type.
    let equality = Type::new(TypeKind::Func(FuncType {
        type_params: vec![TypeParam { name: "T".into(), constraint: None, default: None }],
        params: vec![param("a", type_param_ref("T")), param("b", type_param_ref("T"))],
        ret: Box::new(Type::boolean()),
        throws: Box::new(Type::never()),
    }));
    ns.borrow_mut().insert_value("==", Binding::new(equality.clone()));
    ns.borrow_mut().insert_value("!=", Binding::new(equality));

    let logical = binop(Type::boolean(), Type::boolean());
    ns.borrow_mut().insert_value("&&", Binding::new(logical.clone()));
    ns.borrow_mut().insert_value("||", Binding::new(logical));
    ns.borrow_mut().insert_value(
        "!",
        Binding::new(Type::func(vec![param("value", Type::boolean())], Type::boolean())),
    );

    // ── console ──────────────────────────────────────────────────────────

    let console = Type::object(vec![ObjElem::Method {
        key: ObjKey::Str("log".into()),
        func: FuncType {
            type_params: Vec::new(),
            params: vec![rest_param("values", Type::array(Type::any()))],
            ret: Box::new(Type::undefined()),
            throws: Box::new(Type::never()),
        },
        mut_self: false,
    }]);
    ns.borrow_mut().insert_value("console", Binding::new(console));

    // ── Error ────────────────────────────────────────────────────────────

    let error_object = Type::new(TypeKind::Object(crate::ty::ObjectType {
        elems: vec![
            ObjElem::Prop {
                key: ObjKey::Str("name".into()),
                ty: Type::string(),
                optional: false,
                readonly: false,
            },
            ObjElem::Prop {
                key: ObjKey::Str("message".into()),
                ty: Type::string(),
                optional: false,
                readonly: false,
            },
        ],
        nominal_id: None,
        interface: true,
    }));
    let error_alias = Rc::new(RefCell::new(TypeAlias {
        ty: error_object,
        type_params: Vec::new(),
        exported: false,
    }));
    ns.borrow_mut().insert_type("Error", error_alias.clone());
    let error_ref = Type::new(TypeKind::Ref(TypeRefType {
        name: QualName::simple("Error"),
        type_args: Vec::new(),
        alias: filled_alias_slot(error_alias),
    }));
    let error_ctor = Type::object(vec![ObjElem::Constructor(FuncType {
        type_params: Vec::new(),
        params: vec![opt_param("message", Type::string())],
        ret: Box::new(error_ref),
        throws: Box::new(Type::never()),
    })]);
    ns.borrow_mut().insert_value("Error", Binding::new(error_ctor));

    // ── Array<T> ─────────────────────────────────────────────────────────

    let elem = type_param_ref("T");
    let array_body = Type::object(vec![
        ObjElem::Prop {
            key: ObjKey::Str("length".into()),
            ty: Type::number(),
            optional: false,
            readonly: true,
        },
        ObjElem::Method {
            key: ObjKey::Str("at".into()),
            func: FuncType {
                type_params: Vec::new(),
                params: vec![param("index", Type::number())],
                ret: Box::new(union_of(vec![elem.clone(), Type::undefined()])),
                throws: Box::new(Type::never()),
            },
            mut_self: false,
        },
        ObjElem::Method {
            key: ObjKey::Str("push".into()),
            func: FuncType {
                type_params: Vec::new(),
                params: vec![param("value", elem.clone())],
                ret: Box::new(Type::number()),
                throws: Box::new(Type::never()),
            },
            mut_self: true,
        },
    ]);
    let array_alias = Rc::new(RefCell::new(TypeAlias {
        ty: array_body,
        type_params: vec![TypeParam { name: "T".into(), constraint: None, default: None }],
        exported: false,
    }));
    ns.borrow_mut().insert_type("Array", array_alias);

    // ── Promise<T, E = never> ────────────────────────────────────────────

    // The body is deliberately thin; `await` is the supported interface.
    // `then`/`catch` carry just enough structure that the value and error
    // parameters participate in unification.
    let promise_body = Type::object(vec![
        ObjElem::Method {
            key: ObjKey::Str("then".into()),
            func: FuncType {
                type_params: Vec::new(),
                params: vec![param(
                    "onFulfilled",
                    Type::func(vec![param("value", type_param_ref("T"))], Type::unknown()),
                )],
                ret: Box::new(Type::unknown()),
                throws: Box::new(Type::never()),
            },
            mut_self: false,
        },
        ObjElem::Method {
            key: ObjKey::Str("catch".into()),
            func: FuncType {
                type_params: Vec::new(),
                params: vec![param(
                    "onRejected",
                    Type::func(vec![param("reason", type_param_ref("E"))], Type::unknown()),
                )],
                ret: Box::new(Type::unknown()),
                throws: Box::new(Type::never()),
            },
            mut_self: false,
        },
    ]);
    let promise_alias = Rc::new(RefCell::new(TypeAlias {
        ty: promise_body,
        type_params: vec![
            TypeParam { name: "T".into(), constraint: None, default: None },
            TypeParam { name: "E".into(), constraint: None, default: Some(Type::never()) },
        ],
        exported: false,
    }));
    ns.borrow_mut().insert_type("Promise", promise_alias);

    // ── Symbol ───────────────────────────────────────────────────────────

    let well_known = ck.well_known;
    let symbol = Type::object(vec![
        ObjElem::Prop {
            key: ObjKey::Str("iterator".into()),
            ty: Type::new(TypeKind::UniqueSymbol(well_known.iterator)),
            optional: false,
            readonly: true,
        },
        ObjElem::Prop {
            key: ObjKey::Str("customMatcher".into()),
            ty: Type::new(TypeKind::UniqueSymbol(well_known.custom_matcher)),
            optional: false,
            readonly: true,
        },
    ]);
    ns.borrow_mut().insert_value("Symbol", Binding::new(symbol));

    // ── TypedDocumentNode<Result, Variables> ─────────────────────────────

    let doc_body = Type::object(vec![
        ObjElem::Prop {
            key: ObjKey::Str("result".into()),
            ty: type_param_ref("Result"),
            optional: false,
            readonly: true,
        },
        ObjElem::Prop {
            key: ObjKey::Str("variables".into()),
            ty: type_param_ref("Variables"),
            optional: false,
            readonly: true,
        },
    ]);
    let doc_alias = Rc::new(RefCell::new(TypeAlias {
        ty: doc_body,
        type_params: vec![
            TypeParam { name: "Result".into(), constraint: None, default: None },
            TypeParam { name: "Variables".into(), constraint: None, default: None },
        ],
        exported: false,
    }));
    ns.borrow_mut().insert_type("TypedDocumentNode", doc_alias);

    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_are_function_bindings() {
        let mut ck = Checker::new();
        let scope = prelude(&mut ck);
        for op in ["+", "-", "*", "/", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "!", "++"] {
            assert!(scope.lookup_value(op).is_some(), "missing operator `{op}`");
        }
    }

    #[test]
    fn console_log_is_a_method() {
        let mut ck = Checker::new();
        let scope = prelude(&mut ck);
        let console = scope.lookup_value("console").expect("console");
        match &console.ty.kind {
            TypeKind::Object(obj) => {
                assert!(obj
                    .elems
                    .iter()
                    .any(|e| matches!(e, ObjElem::Method { key: ObjKey::Str(k), .. } if k == "log")));
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn array_and_promise_aliases_exist() {
        let mut ck = Checker::new();
        let scope = prelude(&mut ck);
        let array = scope.lookup_type("Array").expect("Array alias");
        assert_eq!(array.borrow().type_params.len(), 1);
        let promise = scope.lookup_type("Promise").expect("Promise alias");
        assert_eq!(promise.borrow().type_params.len(), 2);
        assert!(promise.borrow().type_params[1].default.is_some());
    }

    #[test]
    fn symbol_exposes_well_known_uniques() {
        let mut ck = Checker::new();
        let scope = prelude(&mut ck);
        let symbol = scope.lookup_value("Symbol").expect("Symbol");
        match &symbol.ty.kind {
            TypeKind::Object(obj) => {
                let matcher = obj.elems.iter().find_map(|e| match e {
                    ObjElem::Prop { key: ObjKey::Str(k), ty, .. } if k == "customMatcher" => {
                        Some(ty.clone())
                    }
                    _ => None,
                });
                assert_eq!(
                    matcher,
                    Some(Type::new(TypeKind::UniqueSymbol(ck.well_known.custom_matcher)))
                );
            }
            other => panic!("expected object, got {other:?}"),
        }
    }
}

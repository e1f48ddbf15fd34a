//! End-to-end inference scenarios over whole programs.
//!
//! Each test builds a small program with the AST builder, runs the
//! checker, and asserts on the resolved binding types and the diagnostic
//! list.

use coral_ast::{AstBuilder, FuncBody};
use coral_common::SourceId;
use coral_typeck::error::TypeError;
use coral_typeck::{infer_script, Checker};

fn builder() -> AstBuilder {
    AstBuilder::new(SourceId(0))
}

/// Run a script and return the checker, scope, and errors.
fn check(
    decls: Vec<coral_ast::Decl>,
    b: &mut AstBuilder,
) -> (Checker, std::rc::Rc<coral_typeck::Scope>, Vec<TypeError>) {
    let script = b.script(decls);
    let mut ck = Checker::new();
    let (scope, errors) = infer_script(&mut ck, &script);
    (ck, scope, errors)
}

/// Resolve a binding's type to its display form.
fn binding_type(ck: &mut Checker, scope: &coral_typeck::Scope, name: &str) -> String {
    let binding = scope
        .lookup_value(name)
        .unwrap_or_else(|| panic!("binding `{name}` not found"));
    ck.resolve(&binding.ty).to_string()
}

#[test]
fn literal_binding_and_widening_cast() {
    // val x = 5; val y = x : number
    let mut b = builder();
    let five = b.num("5");
    let x_decl = b.val("x", five);
    let x_ref = b.ident("x");
    let num_ann = b.ann_number();
    let cast = b.cast(x_ref, num_ann);
    let y_decl = b.val("y", cast);

    let (mut ck, scope, errors) = check(vec![x_decl, y_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "x"), "5");
    assert_eq!(binding_type(&mut ck, &scope, "y"), "number");
}

#[test]
fn bad_cast_reports_cannot_unify() {
    // val x = "hello"; val y = x : number
    let mut b = builder();
    let hello = b.str_("hello");
    let x_decl = b.val("x", hello);
    let x_ref = b.ident("x");
    let num_ann = b.ann_number();
    let cast = b.cast(x_ref, num_ann);
    let y_decl = b.val("y", cast);

    let (_ck, _scope, errors) = check(vec![x_decl, y_decl], &mut b);
    assert_eq!(errors.len(), 1, "expected exactly one error, got: {errors:?}");
    assert!(matches!(errors[0], TypeError::CannotUnifyTypes { .. }));
}

#[test]
fn mutable_object_member_assignment() {
    // val obj: mut {x: number, y: string} = {x: 42, y: "hello"}; obj.x = 100
    let mut b = builder();
    let x_ann = b.ann_number();
    let y_ann = b.ann_string();
    let xp = b.ann_prop("x", x_ann);
    let yp = b.ann_prop("y", y_ann);
    let obj_ann = b.ann_object(vec![xp, yp]);
    let mut_ann = b.ann_mut(obj_ann);

    let forty_two = b.num("42");
    let hello = b.str_("hello");
    let xv = b.prop("x", forty_two);
    let yv = b.prop("y", hello);
    let obj_lit = b.object(vec![xv, yv]);
    let obj_decl = b.val_ann("obj", mut_ann, obj_lit);

    let obj_ref = b.ident("obj");
    let member = b.member(obj_ref, "x");
    let hundred = b.num("100");
    let assign = b.assign(member, hundred);
    let write_decl = b.val("write", assign);

    let (_ck, _scope, errors) = check(vec![obj_decl, write_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
}

#[test]
fn immutable_object_member_assignment_rejected() {
    // val obj: {x: number, y: string} = {x: 42, y: "hello"}; obj.x = 100
    let mut b = builder();
    let x_ann = b.ann_number();
    let y_ann = b.ann_string();
    let xp = b.ann_prop("x", x_ann);
    let yp = b.ann_prop("y", y_ann);
    let obj_ann = b.ann_object(vec![xp, yp]);

    let forty_two = b.num("42");
    let hello = b.str_("hello");
    let xv = b.prop("x", forty_two);
    let yv = b.prop("y", hello);
    let obj_lit = b.object(vec![xv, yv]);
    let obj_decl = b.val_ann("obj", obj_ann, obj_lit);

    let obj_ref = b.ident("obj");
    let member = b.member(obj_ref, "x");
    let hundred = b.num("100");
    let assign = b.assign(member, hundred);
    let write_decl = b.val("write", assign);

    let (_ck, _scope, errors) = check(vec![obj_decl, write_decl], &mut b);
    assert_eq!(errors.len(), 1, "expected exactly one error, got: {errors:?}");
    assert!(matches!(errors[0], TypeError::CannotMutateImmutable { .. }));
}

#[test]
fn class_instance_and_method_call() {
    // class Point(x: number, y: number) {
    //   x, y,
    //   dot(self) { return self.x * self.x + self.y * self.y }
    // }
    // val p = Point(5, 10); val len = p.dot()
    let mut b = builder();
    let xa = b.ann_number();
    let ya = b.ann_number();
    let px = b.param("x", Some(xa));
    let py = b.param("y", Some(ya));

    let sx1 = b.ident("self");
    let sx1 = b.member(sx1, "x");
    let sx2 = b.ident("self");
    let sx2 = b.member(sx2, "x");
    let xx = b.bin("*", sx1, sx2);
    let sy1 = b.ident("self");
    let sy1 = b.member(sy1, "y");
    let sy2 = b.ident("self");
    let sy2 = b.member(sy2, "y");
    let yy = b.bin("*", sy1, sy2);
    let sum = b.bin("+", xx, yy);
    let ret = b.return_stmt(Some(sum));
    let body = b.block(vec![ret]);
    let dot = b.method_func(false, vec![], None, FuncBody::Block(body));

    let fx = b.field_shorthand("x");
    let fy = b.field_shorthand("y");
    let m = b.class_method("dot", dot);
    let class_decl = b.class("Point", vec![px, py], vec![fx, fy, m]);

    let ctor = b.ident("Point");
    let five = b.num("5");
    let ten = b.num("10");
    let call = b.call(ctor, vec![five, ten]);
    let p_decl = b.val("p", call);

    let p_ref = b.ident("p");
    let dot_ref = b.member(p_ref, "dot");
    let dot_call = b.call(dot_ref, vec![]);
    let len_decl = b.val("len", dot_call);

    let (mut ck, scope, errors) = check(vec![class_decl, p_decl, len_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "p"), "Point");
    assert_eq!(binding_type(&mut ck, &scope, "len"), "number");

    // The alias resolves to the structural shape behind the name.
    let alias = scope.lookup_type("Point").expect("Point alias");
    let shape = alias.borrow().ty.clone();
    let shape = ck.resolve(&shape).to_string();
    assert!(shape.contains("x: number"), "got shape: {shape}");
    assert!(shape.contains("y: number"), "got shape: {shape}");
    assert!(shape.contains("dot("), "got shape: {shape}");
}

#[test]
fn overloads_dispatch_and_report() {
    // fn f(x: number) -> string { "a" }
    // fn f(x: string) -> number { 1 }
    // val r1 = f(42); val r2 = f(true)
    let mut b = builder();
    let a1 = b.ann_number();
    let r1a = b.ann_string();
    let p1 = b.param("x", Some(a1));
    let body1 = b.str_("a");
    let f1 = b.func(vec![p1], Some(r1a), FuncBody::Expr(Box::new(body1)));
    let decl1 = b.fn_decl("f", f1);

    let a2 = b.ann_string();
    let r2a = b.ann_number();
    let p2 = b.param("x", Some(a2));
    let body2 = b.num("1");
    let f2 = b.func(vec![p2], Some(r2a), FuncBody::Expr(Box::new(body2)));
    let decl2 = b.fn_decl("f", f2);

    let f_ref = b.ident("f");
    let forty_two = b.num("42");
    let good_call = b.call(f_ref, vec![forty_two]);
    let r1_decl = b.val("r1", good_call);

    let f_ref2 = b.ident("f");
    let t = b.bool_(true);
    let bad_call = b.call(f_ref2, vec![t]);
    let r2_decl = b.val("r2", bad_call);

    let (mut ck, scope, errors) = check(vec![decl1, decl2, r1_decl, r2_decl], &mut b);
    assert_eq!(binding_type(&mut ck, &scope, "r1"), "string");
    assert_eq!(errors.len(), 1, "expected one error, got: {errors:?}");
    match &errors[0] {
        TypeError::NoMatchingOverload { attempts, .. } => {
            assert_eq!(attempts.len(), 2, "both overloads should be reported");
            assert!(attempts.iter().all(|a| !a.is_empty()));
        }
        other => panic!("expected NoMatchingOverload, got {other:?}"),
    }
}

#[test]
fn recursive_type_alias_is_accepted() {
    // type List<T> = {head: T, tail: List<T> | null}
    let mut b = builder();
    let t_head = b.ann_ref("T", vec![]);
    let t_arg = b.ann_ref("T", vec![]);
    let list_ref = b.ann_ref("List", vec![t_arg]);
    let null_ann = b.ann_lit(coral_ast::Lit::Null);
    let tail = b.ann_union(vec![list_ref, null_ann]);
    let head_prop = b.ann_prop("head", t_head);
    let tail_prop = b.ann_prop("tail", tail);
    let body = b.ann_object(vec![head_prop, tail_prop]);
    let tp = b.type_param("T");
    let alias = b.type_alias("List", vec![tp], body);

    let (_ck, scope, errors) = check(vec![alias], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert!(
        !errors
            .iter()
            .any(|e| matches!(e, TypeError::RecursiveUnification { .. })),
        "no recursive-unification diagnostics"
    );
    assert!(scope.lookup_type("List").is_some());
}

#[test]
fn pattern_default_joins_the_union() {
    // val {a = 42}: {a?: number} = ...  -- `a` sees the default instead of
    // the absent case.
    let mut b = builder();
    let num_ann = b.ann_number();
    let a_prop = b.ann_opt_prop("a", num_ann);
    let ann = b.ann_object(vec![a_prop]);

    let default = b.num("42");
    let shorthand = b.pat_shorthand_default("a", default);
    let pattern = b.pat_object(vec![shorthand]);

    let init_val = b.num("1");
    let init_prop = b.prop("a", init_val);
    let init = b.object(vec![init_prop]);
    let decl = b.var_decl(pattern, Some(ann), Some(init));

    let (mut ck, scope, errors) = check(vec![decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let a = binding_type(&mut ck, &scope, "a");
    assert!(a.contains("number"), "got: {a}");
    assert!(!a.contains("undefined"), "the default replaces undefined: {a}");
}

#[test]
fn deterministic_diagnostics_across_runs() {
    fn run() -> Vec<String> {
        let mut b = builder();
        let hello = b.str_("hello");
        let x_decl = b.val("x", hello);
        let x_ref = b.ident("x");
        let num_ann = b.ann_number();
        let cast = b.cast(x_ref, num_ann);
        let y_decl = b.val("y", cast);
        let missing = b.ident("missing");
        let z_decl = b.val("z", missing);
        let (_ck, _scope, errors) = check(vec![x_decl, y_decl, z_decl], &mut b);
        errors.iter().map(|e| e.to_string()).collect()
    }
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

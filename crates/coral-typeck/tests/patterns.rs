//! Pattern inference and match-expression tests: destructuring, enum
//! extractors, guards, and binder-name preservation.

use coral_ast::{AstBuilder, Pattern};
use coral_common::SourceId;
use coral_typeck::error::TypeError;
use coral_typeck::{infer_script, Checker};

fn builder() -> AstBuilder {
    AstBuilder::new(SourceId(0))
}

fn check(
    decls: Vec<coral_ast::Decl>,
    b: &mut AstBuilder,
) -> (Checker, std::rc::Rc<coral_typeck::Scope>, Vec<TypeError>) {
    let script = b.script(decls);
    let mut ck = Checker::new();
    let (scope, errors) = infer_script(&mut ck, &script);
    (ck, scope, errors)
}

fn binding_type(ck: &mut Checker, scope: &coral_typeck::Scope, name: &str) -> String {
    let binding = scope
        .lookup_value(name)
        .unwrap_or_else(|| panic!("binding `{name}` not found"));
    ck.resolve(&binding.ty).to_string()
}

#[test]
fn destructuring_preserves_every_binder() {
    // val [a, {b, c}, ...rest] = [1, {b: 2, c: 3}, 4, 5]
    let mut b = builder();
    let pa = b.pat_ident("a");
    let sb = b.pat_shorthand("b");
    let sc = b.pat_shorthand("c");
    let pobj = b.pat_object(vec![sb, sc]);
    let prest_inner = b.pat_ident("rest");
    let prest = b.pat_rest(prest_inner);
    let pattern = b.pat_tuple(vec![pa, pobj, prest]);

    let binder_names = pattern.binder_names();
    assert_eq!(binder_names, vec!["a", "b", "c", "rest"]);

    let one = b.num("1");
    let two = b.num("2");
    let three = b.num("3");
    let bp = b.prop("b", two);
    let cp = b.prop("c", three);
    let obj = b.object(vec![bp, cp]);
    let four = b.num("4");
    let five = b.num("5");
    let init = b.tuple(vec![one, obj, four, five]);
    let decl = b.var_decl(pattern, None, Some(init));

    let (mut ck, scope, errors) = check(vec![decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    for name in binder_names {
        assert!(scope.lookup_value(&name).is_some(), "binder `{name}` lost");
    }
    assert_eq!(binding_type(&mut ck, &scope, "a"), "1");
    assert_eq!(binding_type(&mut ck, &scope, "b"), "2");
    assert_eq!(binding_type(&mut ck, &scope, "rest"), "[4, 5]");
}

#[test]
fn tuple_pattern_with_missing_elements_reports() {
    // val [a, b, c] = [1, 2]
    let mut b = builder();
    let pa = b.pat_ident("a");
    let pb = b.pat_ident("b");
    let pc = b.pat_ident("c");
    let pattern = b.pat_tuple(vec![pa, pb, pc]);
    let one = b.num("1");
    let two = b.num("2");
    let init = b.tuple(vec![one, two]);
    let decl = b.var_decl(pattern, None, Some(init));

    let (mut ck, scope, errors) = check(vec![decl], &mut b);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeError::NotEnoughElementsToUnpack { expected: 3, found: 2, .. })),
        "got: {errors:?}"
    );
    // The extra binder falls back to undefined.
    assert_eq!(binding_type(&mut ck, &scope, "c"), "undefined");
}

fn option_enum(b: &mut AstBuilder) -> coral_ast::Decl {
    // enum Opt { Some(number), None() }
    let num = b.ann_number();
    let some = b.variant("Some", vec![num]);
    let none = b.variant("None", vec![]);
    b.enum_("Opt", vec![some, none])
}

#[test]
fn enum_variant_construction_and_match() {
    // enum Opt {...}; val o = Opt.Some(5)
    // val r = match o { Opt.Some(x) => x, _ => 0 }
    let mut b = builder();
    let enum_decl = option_enum(&mut b);

    let some_ref = b.ident("Opt");
    let some_ref = b.member(some_ref, "Some");
    let five = b.num("5");
    let o_init = b.call(some_ref, vec![five]);
    let o_decl = b.val("o", o_init);

    let px = b.pat_ident("x");
    let some_pat = b.pat_extractor_qual(vec!["Opt", "Some"], vec![px]);
    let x_ref = b.ident("x");
    let arm1 = b.arm(some_pat, None, x_ref);
    let wild: Pattern = b.pat_wild();
    let zero = b.num("0");
    let arm2 = b.arm(wild, None, zero);
    let o_ref = b.ident("o");
    let m = b.match_(o_ref, vec![arm1, arm2]);
    let r_decl = b.val("r", m);

    let (mut ck, scope, errors) = check(vec![enum_decl, o_decl, r_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let r = binding_type(&mut ck, &scope, "r");
    assert!(r.contains("number"), "extractor should bind x to number, got: {r}");
}

#[test]
fn match_guard_must_be_boolean() {
    let mut b = builder();
    let five = b.num("5");
    let o_decl = b.val("o", five);

    let px = b.pat_ident("x");
    let guard = b.num("1");
    let body = b.num("0");
    let arm = b.arm(px, Some(guard), body);
    let o_ref = b.ident("o");
    let m = b.match_(o_ref, vec![arm]);
    let r_decl = b.val("r", m);

    let (_ck, _scope, errors) = check(vec![o_decl, r_decl], &mut b);
    assert!(
        errors.iter().any(|e| matches!(e, TypeError::CannotUnifyTypes { .. })),
        "non-boolean guard should be rejected, got: {errors:?}"
    );
}

#[test]
fn match_result_is_union_of_arm_bodies() {
    // val n: number = 5; match n { 1 => "one", _ => 0 }
    let mut b = builder();
    let num_ann = b.ann_number();
    let five = b.num("5");
    let n_decl = b.val_ann("n", num_ann, five);
    let target = b.ident("n");
    let one_pat = b.pat_lit(coral_ast::Lit::Num("1".into()));
    let one_body = b.str_("one");
    let arm1 = b.arm(one_pat, None, one_body);
    let wild = b.pat_wild();
    let zero = b.num("0");
    let arm2 = b.arm(wild, None, zero);
    let m = b.match_(target, vec![arm1, arm2]);
    let r_decl = b.val("r", m);

    let (mut ck, scope, errors) = check(vec![n_decl, r_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let r = binding_type(&mut ck, &scope, "r");
    assert!(r.contains("\"one\"") && r.contains('0'), "got: {r}");
}

#[test]
fn extractor_on_non_matcher_value_reports() {
    // val plain = 5; match x { plain(a) => ... } -- `plain` has no custom
    // matcher.
    let mut b = builder();
    let five = b.num("5");
    let plain_decl = b.val("plain", five);
    let target = b.num("1");
    let pa = b.pat_ident("a");
    let pat = b.pat_extractor("plain", vec![pa]);
    let body = b.num("0");
    let arm = b.arm(pat, None, body);
    let m = b.match_(target, vec![arm]);
    let r_decl = b.val("r", m);

    let (_ck, _scope, errors) = check(vec![plain_decl, r_decl], &mut b);
    assert!(
        errors.iter().any(|e| matches!(
            e,
            TypeError::InvalidExtractorType { .. } | TypeError::MissingCustomMatcher { .. }
        )),
        "got: {errors:?}"
    );
}

#[test]
fn wildcard_pattern_matches_anything() {
    let mut b = builder();
    let target = b.str_("anything");
    let wild = b.pat_wild();
    let body = b.bool_(true);
    let arm = b.arm(wild, None, body);
    let m = b.match_(target, vec![arm]);
    let r_decl = b.val("r", m);

    let (mut ck, scope, errors) = check(vec![r_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "r"), "true");
}

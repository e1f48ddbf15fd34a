//! Module-level orchestration tests: declaration ordering, generics,
//! interface merging, namespaces, imports through a mock package host,
//! async/throws accounting, JSX elements, and gql tagged templates.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use coral_ast::{AstBuilder, FuncBody, Module};
use coral_common::SourceId;
use coral_typeck::error::TypeError;
use coral_typeck::imports::{ClassifiedModules, ManifestInfo, PackageHost};
use coral_typeck::ty::{ObjElem, ObjKey, Type};
use coral_typeck::{infer_module, infer_script, Checker, GqlDocumentTypes, GraphqlValidator};

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

// ── Declaration ordering ─────────────────────────────────────────────────

#[test]
fn use_before_declaration_resolves() {
    // val y = f(1); fn f(x: number) -> number { x }
    let mut b = builder();
    let f_ref = b.ident("f");
    let one = b.num("1");
    let call = b.call(f_ref, vec![one]);
    let y_decl = b.val("y", call);

    let ann = b.ann_number();
    let ret = b.ann_number();
    let p = b.param("x", Some(ann));
    let body = b.ident("x");
    let f = b.func(vec![p], Some(ret), FuncBody::Expr(Box::new(body)));
    let f_decl = b.fn_decl("f", f);

    let (mut ck, scope, errors) = check(vec![y_decl, f_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "y"), "number");
}

#[test]
fn mutually_recursive_functions_infer_together() {
    // fn even(n: number) -> boolean { odd(n) }
    // fn odd(n: number) -> boolean { even(n) }
    let mut b = builder();
    let ann1 = b.ann_number();
    let ret1 = b.ann_boolean();
    let p1 = b.param("n", Some(ann1));
    let odd_ref = b.ident("odd");
    let n1 = b.ident("n");
    let call1 = b.call(odd_ref, vec![n1]);
    let even = b.func(vec![p1], Some(ret1), FuncBody::Expr(Box::new(call1)));
    let even_decl = b.fn_decl("even", even);

    let ann2 = b.ann_number();
    let ret2 = b.ann_boolean();
    let p2 = b.param("n", Some(ann2));
    let even_ref = b.ident("even");
    let n2 = b.ident("n");
    let call2 = b.call(even_ref, vec![n2]);
    let odd = b.func(vec![p2], Some(ret2), FuncBody::Expr(Box::new(call2)));
    let odd_decl = b.fn_decl("odd", odd);

    let (mut ck, scope, errors) = check(vec![even_decl, odd_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let even_ty = binding_type(&mut ck, &scope, "even");
    assert!(even_ty.contains("boolean"), "got: {even_ty}");
}

#[test]
fn generic_function_instantiates_per_call() {
    // fn id<T>(x: T) -> T { x }; val a = id(5); val s = id("hi")
    let mut b = builder();
    let ann = b.ann_ref("T", vec![]);
    let ret = b.ann_ref("T", vec![]);
    let p = b.param("x", Some(ann));
    let body = b.ident("x");
    let mut id = b.func(vec![p], Some(ret), FuncBody::Expr(Box::new(body)));
    id.type_params = vec![b.type_param("T")];
    let id_decl = b.fn_decl("id", id);

    let id_ref1 = b.ident("id");
    let five = b.num("5");
    let a_init = b.call(id_ref1, vec![five]);
    let a_decl = b.val("a", a_init);

    let id_ref2 = b.ident("id");
    let hi = b.str_("hi");
    let s_init = b.call(id_ref2, vec![hi]);
    let s_decl = b.val("s", s_init);

    let (mut ck, scope, errors) = check(vec![id_decl, a_decl, s_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "a"), "5");
    assert_eq!(binding_type(&mut ck, &scope, "s"), "\"hi\"");
}

// ── Interface merging ────────────────────────────────────────────────────

#[test]
fn interface_declarations_merge() {
    // interface Shape { area: number }
    // interface Shape { name: string }
    // val s: Shape = {area: 1, name: "circle"}
    let mut b = builder();
    let area_ann = b.ann_number();
    let ap = b.ann_prop("area", area_ann);
    let first = b.interface("Shape", vec![ap]);
    let name_ann = b.ann_string();
    let np = b.ann_prop("name", name_ann);
    let second = b.interface("Shape", vec![np]);

    let shape_ann = b.ann_ref("Shape", vec![]);
    let one = b.num("1");
    let circle = b.str_("circle");
    let area_v = b.prop("area", one);
    let name_v = b.prop("name", circle);
    let obj = b.object(vec![area_v, name_v]);
    let s_decl = b.val_ann("s", shape_ann, obj);

    let (_ck, scope, errors) = check(vec![first, second, s_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert!(scope.lookup_type("Shape").is_some());
}

#[test]
fn conflicting_interface_merge_reports() {
    // interface Shape { area: number }
    // interface Shape { area: string }
    let mut b = builder();
    let first_ann = b.ann_number();
    let ap1 = b.ann_prop("area", first_ann);
    let first = b.interface("Shape", vec![ap1]);
    let second_ann = b.ann_string();
    let ap2 = b.ann_prop("area", second_ann);
    let second = b.interface("Shape", vec![ap2]);

    let (_ck, _scope, errors) = check(vec![first, second], &mut b);
    assert!(
        errors.iter().any(|e| matches!(e, TypeError::InterfaceMerge { .. })),
        "got: {errors:?}"
    );
}

// ── Namespaces ───────────────────────────────────────────────────────────

#[test]
fn namespace_members_resolve_by_path() {
    // namespace Geometry { val pi = 3 }; val x = Geometry.pi
    let mut b = builder();
    let three = b.num("3");
    let pi = b.val("pi", three);
    let ns = b.namespace("Geometry", vec![pi]);
    let geometry = b.ident("Geometry");
    let member = b.member(geometry, "pi");
    let x_decl = b.val("x", member);

    let (mut ck, scope, errors) = check(vec![ns, x_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "x"), "3");
}

// ── Async and throws ─────────────────────────────────────────────────────

#[test]
fn await_unwraps_promise_and_collects_throws() {
    // var p: Promise<number, string>  (ambient)
    // async fn get() -> number { return await p }
    let mut b = builder();
    let num_ann = b.ann_number();
    let str_ann = b.ann_string();
    let promise_ann = b.ann_ref("Promise", vec![num_ann, str_ann]);
    let p_pat = b.pat_ident("p");
    let p_decl = b.var_decl(p_pat, Some(promise_ann), None);

    let p_ref = b.ident("p");
    let awaited = b.await_(p_ref);
    let ret_stmt = b.return_stmt(Some(awaited));
    let body = b.block(vec![ret_stmt]);
    let ret_ann = b.ann_number();
    let mut get = b.func(vec![], Some(ret_ann), FuncBody::Block(body));
    get.is_async = true;
    let get_decl = b.fn_decl("get", get);

    let (mut ck, scope, errors) = check(vec![p_decl, get_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let get_ty = binding_type(&mut ck, &scope, "get");
    assert!(get_ty.contains("-> number"), "got: {get_ty}");
    assert!(get_ty.contains("throws string"), "got: {get_ty}");
}

#[test]
fn await_outside_async_reports() {
    let mut b = builder();
    let num_ann = b.ann_number();
    let str_ann = b.ann_string();
    let promise_ann = b.ann_ref("Promise", vec![num_ann, str_ann]);
    let p_pat = b.pat_ident("p");
    let p_decl = b.var_decl(p_pat, Some(promise_ann), None);

    let p_ref = b.ident("p");
    let awaited = b.await_(p_ref);
    let ret_stmt = b.return_stmt(Some(awaited));
    let body = b.block(vec![ret_stmt]);
    let get = b.func(vec![], None, FuncBody::Block(body));
    let get_decl = b.fn_decl("get", get);

    let (_ck, _scope, errors) = check(vec![p_decl, get_decl], &mut b);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeError::Generic { message, .. } if message.contains("async"))),
        "got: {errors:?}"
    );
}

#[test]
fn throw_feeds_the_throws_clause() {
    // fn fail() -> number { throw "boom" }
    let mut b = builder();
    let boom = b.str_("boom");
    let thrown = b.throw_(boom);
    let stmt = b.expr_stmt(thrown);
    let body = b.block(vec![stmt]);
    let ret_ann = b.ann_number();
    let fail = b.func(vec![], Some(ret_ann), FuncBody::Block(body));
    let fail_decl = b.fn_decl("fail", fail);

    let (mut ck, scope, errors) = check(vec![fail_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let ty = binding_type(&mut ck, &scope, "fail");
    assert!(ty.contains("throws \"boom\""), "got: {ty}");
}

// ── JSX ──────────────────────────────────────────────────────────────────

#[test]
fn jsx_component_props_are_checked() {
    // fn Button(props: {label: string}) -> number { 0 }
    // val el = <Button label="hi" />
    let mut b = builder();
    let label_ann = b.ann_string();
    let lp = b.ann_prop("label", label_ann);
    let props_ann = b.ann_object(vec![lp]);
    let p = b.param("props", Some(props_ann));
    let ret_ann = b.ann_number();
    let zero = b.num("0");
    let button = b.func(vec![p], Some(ret_ann), FuncBody::Expr(Box::new(zero)));
    let button_decl = b.fn_decl("Button", button);

    let hi = b.str_("hi");
    let attr = b.jsx_attr("label", hi);
    let element = b.jsx_element("Button", vec![attr], vec![]);
    let el = b.jsx(element);
    let el_decl = b.val("el", el);

    let (mut ck, scope, errors) = check(vec![button_decl, el_decl], &mut b);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    assert_eq!(binding_type(&mut ck, &scope, "el"), "JSX.Element");
}

#[test]
fn jsx_missing_required_prop_reports() {
    let mut b = builder();
    let label_ann = b.ann_string();
    let lp = b.ann_prop("label", label_ann);
    let props_ann = b.ann_object(vec![lp]);
    let p = b.param("props", Some(props_ann));
    let ret_ann = b.ann_number();
    let zero = b.num("0");
    let button = b.func(vec![p], Some(ret_ann), FuncBody::Expr(Box::new(zero)));
    let button_decl = b.fn_decl("Button", button);

    let element = b.jsx_element("Button", vec![], vec![]);
    let el = b.jsx(element);
    let el_decl = b.val("el", el);

    let (_ck, _scope, errors) = check(vec![button_decl, el_decl], &mut b);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeError::MissingRequiredProp { name, .. } if name == "label")),
        "got: {errors:?}"
    );
}

#[test]
fn jsx_unknown_component_reports() {
    let mut b = builder();
    let element = b.jsx_element("Missing", vec![], vec![]);
    let el = b.jsx(element);
    let el_decl = b.val("el", el);

    let (_ck, _scope, errors) = check(vec![el_decl], &mut b);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeError::UnknownComponent { name, .. } if name == "Missing")),
        "got: {errors:?}"
    );
}

// ── Imports ──────────────────────────────────────────────────────────────

/// An in-memory package host exposing one package, `fancy`, whose type
/// definitions declare `version: string`.
struct MockHost {
    definitions: RefCell<Option<Module>>,
}

impl MockHost {
    fn new() -> MockHost {
        let mut b = AstBuilder::new(SourceId(7));
        let version_pat = b.pat_ident("version");
        let str_ann = b.ann_string();
        let version = b.var_decl(version_pat, Some(str_ann), None);
        let version = b.exported(version);
        let file = b.file("index.d.ts", vec![], vec![version]);
        let module = b.module(vec![file]);
        MockHost { definitions: RefCell::new(Some(module)) }
    }
}

impl PackageHost for MockHost {
    fn find_package_manifest(&self, _dir: &Path) -> Option<PathBuf> {
        Some(PathBuf::from("/proj"))
    }

    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf> {
        if path.ends_with("node_modules/fancy") {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such package"))
        }
    }

    fn read_manifest(&self, _dir: &Path) -> Result<ManifestInfo, String> {
        ManifestInfo::from_json(r#"{"types": "index.d.ts"}"#)
    }

    fn load_classified(&self, path: &Path) -> Result<ClassifiedModules, String> {
        assert!(path.ends_with("index.d.ts"), "unexpected load: {}", path.display());
        let module = self
            .definitions
            .borrow_mut()
            .take()
            .expect("definitions loaded once; later loads hit the registry");
        Ok(ClassifiedModules { global: None, named: Vec::new(), package: Some(module) })
    }
}

#[test]
fn named_import_binds_package_export() {
    // import {version} from "fancy"; val v = version
    let mut b = builder();
    let import = b.import_named("fancy", vec![("version", None)]);
    let version_ref = b.ident("version");
    let version_id = version_ref.id;
    let v_decl = b.val("v", version_ref);
    let file = b.file("src/main.co", vec![import], vec![v_decl]);
    let module = b.module(vec![file]);

    let mut ck = Checker::new().with_host(Box::new(MockHost::new()));
    let errors = infer_module(&mut ck, &module);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let version_ty = ck.node_types.get(&version_id).cloned().expect("version type");
    assert_eq!(ck.resolve(&version_ty).to_string(), "string");
}

#[test]
fn missing_export_reports() {
    // import {nope} from "fancy"
    let mut b = builder();
    let import = b.import_named("fancy", vec![("nope", None)]);
    let file = b.file("src/main.co", vec![import], vec![]);
    let module = b.module(vec![file]);

    let mut ck = Checker::new().with_host(Box::new(MockHost::new()));
    let errors = infer_module(&mut ck, &module);
    assert!(
        errors.iter().any(|e| matches!(
            e,
            TypeError::Generic { message, .. } if message.contains("no export named nope")
        )),
        "got: {errors:?}"
    );
}

#[test]
fn namespace_import_mounts_package() {
    // import * as fancy from "fancy"; val v = fancy.version
    let mut b = builder();
    let import = b.import_namespace("fancy", "fancy");
    let fancy_ref = b.ident("fancy");
    let member = b.member(fancy_ref, "version");
    let member_id = member.id;
    let v_decl = b.val("v", member);
    let file = b.file("src/main.co", vec![import], vec![v_decl]);
    let module = b.module(vec![file]);

    let mut ck = Checker::new().with_host(Box::new(MockHost::new()));
    let errors = infer_module(&mut ck, &module);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let ty = ck.node_types.get(&member_id).cloned().expect("member type");
    assert_eq!(ck.resolve(&ty).to_string(), "string");
}

#[test]
fn import_without_host_reports() {
    let mut b = builder();
    let import = b.import_named("fancy", vec![("version", None)]);
    let file = b.file("src/main.co", vec![import], vec![]);
    let module = b.module(vec![file]);

    let mut ck = Checker::new();
    let errors = infer_module(&mut ck, &module);
    assert!(
        errors.iter().any(|e| matches!(
            e,
            TypeError::Generic { message, .. } if message.contains("no package host")
        )),
        "got: {errors:?}"
    );
}

// ── GraphQL tagged templates ─────────────────────────────────────────────

struct MockValidator;

impl GraphqlValidator for MockValidator {
    fn validate(&self, schema: &str, query: &str) -> Result<GqlDocumentTypes, String> {
        assert!(schema.contains("type Query"));
        if !query.contains("user") {
            return Err(format!("unknown field in query: {query}"));
        }
        let result = Type::object(vec![ObjElem::Prop {
            key: ObjKey::Str("user".into()),
            ty: Type::string(),
            optional: false,
            readonly: false,
        }]);
        Ok(GqlDocumentTypes { result, variables: Type::object(vec![]) })
    }
}

#[test]
fn gql_template_produces_typed_document_node() {
    // val q = gql`query { user }`
    let mut b = builder();
    let tag = b.ident("gql");
    let q = b.tagged(tag, vec!["query { user }"], vec![]);
    let q_decl = b.val("q", q);

    let script = b.script(vec![q_decl]);
    let mut ck = Checker::new()
        .with_graphql(Box::new(MockValidator), "type Query { user: String }".into());
    let (scope, errors) = infer_script(&mut ck, &script);
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    let q_ty = binding_type(&mut ck, &scope, "q");
    assert!(q_ty.starts_with("TypedDocumentNode<"), "got: {q_ty}");
    assert!(q_ty.contains("user"), "got: {q_ty}");
}

#[test]
fn gql_validation_failure_surfaces_as_diagnostic() {
    let mut b = builder();
    let tag = b.ident("gql");
    let q = b.tagged(tag, vec!["query { bogus }"], vec![]);
    let q_decl = b.val("q", q);

    let script = b.script(vec![q_decl]);
    let mut ck = Checker::new()
        .with_graphql(Box::new(MockValidator), "type Query { user: String }".into());
    let (_scope, errors) = infer_script(&mut ck, &script);
    assert!(
        errors.iter().any(|e| matches!(
            e,
            TypeError::Generic { message, .. } if message.contains("unknown field")
        )),
        "got: {errors:?}"
    );
}

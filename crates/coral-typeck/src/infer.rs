//! The module orchestrator.
//!
//! Builds the declaration dependency graph, condenses it into strongly
//! connected components, and runs each component through a two-phase
//! pipeline: a placeholder phase that installs types/bindings with fresh
//! variables for every declared name, then a definition phase that infers
//! bodies and initializers and unifies them with the placeholders.
//! Components are processed dependencies-first; within a component,
//! placeholders complete before any definition work, and var initializers
//! run last so they observe freshly inferred function and class types.

use std::rc::Rc;
use std::time::Instant;

use log::debug;
use rustc_hash::FxHashMap;

use coral_ast::{
    ClassDecl, ClassMember, Decl, DeclKind, ElseBranch, EnumDecl, Expr, ExprKind, File, FuncBody,
    FuncExpr, InterfaceDecl, Module, ObjProp, PropKey, QualName, Script, StmtKind, TypeAnn,
    VarDecl,
};
use coral_common::Span;

use crate::annotation::{
    lower_obj_ann_elem, lower_type_ann, lower_type_ann_bound, lower_type_params, resolve_deferred,
};
use crate::error::TypeError;
use crate::expr::{infer_expr, infer_func_body, infer_func_sig, install_bindings};
use crate::graph::{flatten_decls, DepGraph, FlatDecl};
use crate::imports;
use crate::pattern::infer_pattern;
use crate::scope::{NamespaceRef, Scope};
use crate::ty::{
    filled_alias_slot, intersection_of, union_of, AliasRef, Binding, FuncParam, FuncType, ObjElem,
    ObjKey, ObjectType, Type, TypeAlias, TypeKind, TypeRefType,
};
use crate::unify::Checker;
use crate::builtins;

/// Infer a whole module. Returns the diagnostics in inference order.
pub fn infer_module(ck: &mut Checker, module: &Module) -> Vec<TypeError> {
    let prelude = builtins::prelude(ck);
    let module_scope = Scope::child(&prelude);
    infer_files_into(ck, &module_scope, &module.files);
    std::mem::take(&mut ck.errors)
}

/// Infer a script: the same pipeline over one synthetic file, also
/// surfacing the populated scope to the caller.
pub fn infer_script(ck: &mut Checker, script: &Script) -> (Rc<Scope>, Vec<TypeError>) {
    let prelude = builtins::prelude(ck);
    let script_scope = Scope::child(&prelude);
    let file = File {
        source: script.source,
        path: std::path::PathBuf::from("script"),
        imports: Vec::new(),
        decls: script.decls.clone(),
    };
    infer_files_into(ck, &script_scope, std::slice::from_ref(&file));
    let errors = std::mem::take(&mut ck.errors);
    (script_scope, errors)
}

/// Deferred work carried from the placeholder phase into the definition
/// phase, keyed by flattened-declaration index.
enum Pending<'a> {
    Fn {
        sig: FuncType,
        func: &'a FuncExpr,
        body_scope: Rc<Scope>,
    },
    Var {
        pattern_ty: Type,
        var: &'a VarDecl,
        scope: Rc<Scope>,
    },
    Alias {
        placeholder: Type,
        alias: AliasRef,
        ann: &'a TypeAnn,
        scope: Rc<Scope>,
        param_names: Vec<String>,
    },
    Class {
        bodies: Vec<(FuncType, &'a FuncExpr, Rc<Scope>)>,
        field_inits: Vec<(Type, &'a Expr, Rc<Scope>)>,
    },
    Enum {
        placeholder: Type,
        alias: AliasRef,
        decl: &'a EnumDecl,
        scope: Rc<Scope>,
        namespace: NamespaceRef,
        decl_span: Span,
    },
    Interface {
        decl: &'a InterfaceDecl,
        alias: AliasRef,
        /// Whether this declaration created the alias (first declaration)
        /// or merges into an existing one.
        created: bool,
        placeholder: Option<Type>,
        scope: Rc<Scope>,
        decl_span: Span,
    },
}

/// Infer a list of files whose top-level declarations land in
/// `module_scope`'s namespace. Reused for package type-definition
/// sub-modules, which each get their own namespace.
pub(crate) fn infer_files_into(ck: &mut Checker, module_scope: &Rc<Scope>, files: &[File]) {
    // Phase 1: file scopes and imports.
    let mut file_scopes = Vec::with_capacity(files.len());
    for file in files {
        let file_scope = Scope::child(module_scope);
        for import in &file.imports {
            let dir = file.path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
            imports::process_import(ck, &file_scope, module_scope, import, &dir);
        }
        file_scopes.push(file_scope);
    }

    // Phase 1.5: JSX auto-load. A module that renders JSX needs the React
    // type definitions; failing to find them is fatal for that module.
    if files.iter().any(file_contains_jsx) {
        let dir = files
            .first()
            .and_then(|f| f.path.parent().map(|p| p.to_path_buf()))
            .unwrap_or_default();
        if let Err(message) = imports::load_globals(ck, module_scope, &dir, "react") {
            let span = files
                .first()
                .map(|f| Span::empty(f.source))
                .unwrap_or_else(Checker::builtin_span);
            ck.errors.push(TypeError::Generic {
                message: format!("failed to load React types: {message}"),
                span,
            });
            return;
        }
    }

    // Phase 2: dependency graph over every declaration.
    let mut flats: Vec<FlatDecl<'_>> = Vec::new();
    for (file_idx, file) in files.iter().enumerate() {
        flatten_decls(&file.decls, file_idx, &[], &mut flats);
    }
    let graph = DepGraph::build(&flats);
    let components = graph.condense();
    debug!("inferring {} declarations in {} components", flats.len(), components.len());

    // Scope/namespace chain per (file, namespace path), memoized.
    let mut placement: FxHashMap<(usize, Vec<String>), (Rc<Scope>, NamespaceRef)> =
        FxHashMap::default();
    let place = |flat: &FlatDecl<'_>,
                     placement: &mut FxHashMap<(usize, Vec<String>), (Rc<Scope>, NamespaceRef)>|
     -> (Rc<Scope>, NamespaceRef) {
        let key = (flat.file, flat.ns_path.clone());
        if let Some(found) = placement.get(&key) {
            return found.clone();
        }
        let mut scope = file_scopes[flat.file].clone();
        let mut ns = module_scope.namespace.clone();
        for part in &flat.ns_path {
            let child = ns.borrow_mut().child_namespace(part);
            scope = Scope::child_with(&scope, child.clone());
            ns = child;
        }
        placement.insert(key, (scope.clone(), ns.clone()));
        (scope, ns)
    };

    // Phase 3: component-by-component two-phase inference.
    for component in &components {
        if let Some(deadline) = ck.deadline {
            if Instant::now() > deadline {
                ck.errors.push(TypeError::Generic {
                    message: "type checking timed out".into(),
                    span: Checker::builtin_span(),
                });
                return;
            }
        }

        let mut pending: FxHashMap<usize, Pending<'_>> = FxHashMap::default();

        // Placeholder phase: every declaration gets its name(s) installed
        // before any body is looked at.
        for &idx in component {
            let flat = &flats[idx];
            let (scope, install_ns) = place(flat, &mut placement);
            placeholder_decl(ck, flat.decl, &scope, &install_ns, idx, &mut pending);
        }

        // Definition phase, pass 1: everything except var initializers.
        for &idx in component {
            if let Some(work) = pending.get(&idx) {
                if !matches!(work, Pending::Var { .. }) {
                    let work = pending.remove(&idx).expect("checked above");
                    define_decl(ck, work);
                }
            }
        }

        // Definition phase, pass 2: var initializers see everything pass 1
        // produced.
        for &idx in component {
            if let Some(work) = pending.remove(&idx) {
                define_decl(ck, work);
            }
        }

        // Forward references recorded while this component was being
        // inferred can resolve now.
        resolve_deferred(ck);
    }
}

// ── Placeholder phase ────────────────────────────────────────────────────

fn placeholder_decl<'a>(
    ck: &mut Checker,
    decl: &'a Decl,
    scope: &Rc<Scope>,
    install_ns: &NamespaceRef,
    idx: usize,
    pending: &mut FxHashMap<usize, Pending<'a>>,
) {
    match &decl.kind {
        DeclKind::Fn(f) => {
            let (sig, body_scope) = infer_func_sig(ck, scope, &f.func, None);
            let fn_ty = Type::new(TypeKind::Func(sig.clone()));
            let existing = install_ns.borrow().values.get(&f.name).cloned();
            match existing {
                // A repeated function name is an overload: merge into a
                // flattened intersection.
                Some(prev) => {
                    let merged = intersection_of(vec![prev.ty, fn_ty]);
                    install_ns.borrow_mut().replace_value(
                        f.name.clone(),
                        Binding {
                            source: prev.source,
                            ty: merged,
                            mutable: false,
                            exported: prev.exported || decl.exported,
                        },
                    );
                }
                None => {
                    install_ns.borrow_mut().insert_value(
                        f.name.clone(),
                        Binding {
                            source: Some(decl.id),
                            ty: fn_ty,
                            mutable: false,
                            exported: decl.exported,
                        },
                    );
                }
            }
            pending.insert(idx, Pending::Fn { sig, func: &f.func, body_scope });
        }

        DeclKind::Var(v) => {
            let (pattern_ty, mut bindings) = infer_pattern(ck, scope, &v.pattern);
            if let Some(ann) = &v.ann {
                let ann_ty = lower_type_ann(ck, scope, ann);
                let errors = ck.unify(&pattern_ty, &ann_ty, v.pattern.span);
                ck.errors.extend(errors);
            }
            for (_, binding) in &mut bindings {
                binding.exported = decl.exported;
            }
            install_bindings(ck, install_ns, bindings, v.pattern.span);
            pending.insert(idx, Pending::Var { pattern_ty, var: v, scope: scope.clone() });
        }

        DeclKind::TypeAlias(t) => {
            let placeholder = ck.fresh_var();
            let type_params = lower_type_params(ck, scope, &t.type_params);
            let param_names: Vec<String> = type_params.iter().map(|tp| tp.name.clone()).collect();
            let alias = Rc::new(std::cell::RefCell::new(TypeAlias {
                ty: placeholder.clone(),
                type_params,
                exported: decl.exported,
            }));
            install_ns.borrow_mut().insert_type(t.name.clone(), alias.clone());
            pending.insert(
                idx,
                Pending::Alias {
                    placeholder,
                    alias,
                    ann: &t.ann,
                    scope: scope.clone(),
                    param_names,
                },
            );
        }

        DeclKind::Class(c) => {
            placeholder_class(ck, decl, c, scope, install_ns, idx, pending);
        }

        DeclKind::Enum(e) => {
            let namespace = install_ns.borrow_mut().child_namespace(&e.name);
            let placeholder = ck.fresh_var();
            let type_params = lower_type_params(ck, scope, &e.type_params);
            let alias = Rc::new(std::cell::RefCell::new(TypeAlias {
                ty: placeholder.clone(),
                type_params,
                exported: decl.exported,
            }));
            install_ns.borrow_mut().insert_type(e.name.clone(), alias.clone());
            pending.insert(
                idx,
                Pending::Enum {
                    placeholder,
                    alias,
                    decl: e,
                    scope: scope.clone(),
                    namespace,
                    decl_span: decl.span,
                },
            );
        }

        DeclKind::Interface(i) => {
            let existing = install_ns.borrow().types.get(&i.name).cloned();
            match existing {
                Some(alias) => {
                    pending.insert(
                        idx,
                        Pending::Interface {
                            decl: i,
                            alias,
                            created: false,
                            placeholder: None,
                            scope: scope.clone(),
                            decl_span: decl.span,
                        },
                    );
                }
                None => {
                    let placeholder = ck.fresh_var();
                    let type_params = lower_type_params(ck, scope, &i.type_params);
                    let alias = Rc::new(std::cell::RefCell::new(TypeAlias {
                        ty: placeholder.clone(),
                        type_params,
                        exported: decl.exported,
                    }));
                    install_ns.borrow_mut().insert_type(i.name.clone(), alias.clone());
                    pending.insert(
                        idx,
                        Pending::Interface {
                            decl: i,
                            alias,
                            created: true,
                            placeholder: Some(placeholder),
                            scope: scope.clone(),
                            decl_span: decl.span,
                        },
                    );
                }
            }
        }

        // The namespace itself was materialized while computing placement;
        // its members are separate graph nodes.
        DeclKind::Namespace(_) => {}
    }
}

/// Build a class's instance type, constructor, and static value object.
/// The instance type is nominal; the alias is usable by the time method
/// signatures are lowered, so `Self` and recursive references work.
fn placeholder_class<'a>(
    ck: &mut Checker,
    decl: &'a Decl,
    class: &'a ClassDecl,
    scope: &Rc<Scope>,
    install_ns: &NamespaceRef,
    idx: usize,
    pending: &mut FxHashMap<usize, Pending<'a>>,
) {
    let placeholder = ck.fresh_var();
    let type_params = lower_type_params(ck, scope, &class.type_params);
    let alias = Rc::new(std::cell::RefCell::new(TypeAlias {
        ty: placeholder.clone(),
        type_params,
        exported: decl.exported,
    }));
    install_ns.borrow_mut().insert_type(class.name.clone(), alias.clone());

    // `Self` resolves to the class alias inside the body, and the class's
    // type parameters stay symbolic so the constructor can instantiate
    // them per call site.
    let class_scope = Scope::child(scope);
    class_scope
        .namespace
        .borrow_mut()
        .insert_type("Self", alias.clone());
    for tp in &class.type_params {
        let symbolic = Rc::new(std::cell::RefCell::new(TypeAlias {
            ty: Type::reference(QualName::simple(&tp.name), Vec::new()),
            type_params: Vec::new(),
            exported: false,
        }));
        class_scope
            .namespace
            .borrow_mut()
            .insert_type(tp.name.clone(), symbolic);
    }

    let self_ty = Type::new(TypeKind::Ref(TypeRefType {
        name: QualName::simple(&class.name),
        type_args: Vec::new(),
        alias: filled_alias_slot(alias.clone()),
    }));

    // Constructor parameters.
    let mut bound: Vec<String> = class.type_params.iter().map(|tp| tp.name.clone()).collect();
    let mut ctor_params: Vec<FuncParam> = Vec::new();
    for param in &class.params {
        let name = param
            .pat
            .binder_names()
            .into_iter()
            .next()
            .unwrap_or_else(|| "_".to_string());
        let ty = match &param.ann {
            Some(ann) => lower_type_ann_bound(ck, &class_scope, ann, &mut bound),
            None => ck.fresh_var(),
        };
        ctor_params.push(FuncParam {
            name,
            rest: matches!(param.pat.kind, coral_ast::PatKind::Rest(_)),
            ty,
            optional: param.optional,
        });
    }

    let mut instance_elems: Vec<ObjElem> = Vec::new();
    let mut static_elems: Vec<ObjElem> = Vec::new();
    let mut bodies: Vec<(FuncType, &'a FuncExpr, Rc<Scope>)> = Vec::new();
    let mut field_inits: Vec<(Type, &'a Expr, Rc<Scope>)> = Vec::new();

    for member in &class.members {
        match member {
            ClassMember::FieldShorthand { span, name } => {
                match ctor_params.iter().find(|p| p.name == *name) {
                    Some(param) => instance_elems.push(ObjElem::Prop {
                        key: ObjKey::Str(name.clone()),
                        ty: param.ty.clone(),
                        optional: false,
                        readonly: false,
                    }),
                    None => ck.errors.push(TypeError::Generic {
                        message: format!("`{name}` does not name a constructor parameter"),
                        span: *span,
                    }),
                }
            }
            ClassMember::Field { key, ann, init, is_static, readonly, .. } => {
                let key = match key {
                    PropKey::Ident(name) | PropKey::Str(name) => ObjKey::Str(name.clone()),
                    PropKey::Num(n) => ObjKey::Num(n.clone()),
                    PropKey::Computed(_) => continue,
                };
                let ty = match ann {
                    Some(ann) => lower_type_ann_bound(ck, &class_scope, ann, &mut bound),
                    None => ck.fresh_var(),
                };
                if let Some(init) = init {
                    field_inits.push((ty.clone(), init, class_scope.clone()));
                }
                let elem = ObjElem::Prop { key, ty, optional: false, readonly: *readonly };
                if *is_static {
                    static_elems.push(elem);
                } else {
                    instance_elems.push(elem);
                }
            }
            ClassMember::Method { key, func, .. } => {
                let key = match key {
                    PropKey::Ident(name) | PropKey::Str(name) => ObjKey::Str(name.clone()),
                    PropKey::Num(n) => ObjKey::Num(n.clone()),
                    PropKey::Computed(_) => continue,
                };
                let is_instance = func.self_param.is_some();
                let self_for_sig = is_instance.then(|| self_ty.clone());
                let (sig, body_scope) = infer_func_sig(ck, &class_scope, func, self_for_sig);
                let elem = ObjElem::Method {
                    key,
                    func: sig.clone(),
                    mut_self: func.self_param.map(|s| s.mutable).unwrap_or(false),
                };
                if is_instance {
                    instance_elems.push(elem);
                } else {
                    static_elems.push(elem);
                }
                bodies.push((sig, func, body_scope));
            }
            ClassMember::Getter { key, func, .. } | ClassMember::Setter { key, func, .. } => {
                let obj_key = match key {
                    PropKey::Ident(name) | PropKey::Str(name) => ObjKey::Str(name.clone()),
                    PropKey::Num(n) => ObjKey::Num(n.clone()),
                    PropKey::Computed(_) => continue,
                };
                let (sig, body_scope) =
                    infer_func_sig(ck, &class_scope, func, Some(self_ty.clone()));
                let elem = if matches!(member, ClassMember::Getter { .. }) {
                    ObjElem::Getter { key: obj_key, func: sig.clone() }
                } else {
                    ObjElem::Setter { key: obj_key, func: sig.clone() }
                };
                instance_elems.push(elem);
                bodies.push((sig, func, body_scope));
            }
        }
    }

    // Inherited members come after the class's own.
    if let Some(extends) = &class.extends {
        match scope.lookup_qualified_type(&extends.name) {
            Some(base_alias) => {
                let base = base_alias.borrow().ty.clone();
                let pruned = ck.prune(&base);
                if let TypeKind::Object(base_obj) = &pruned.kind {
                    for elem in &base_obj.elems {
                        let key = elem.key();
                        let already = key
                            .map(|k| {
                                instance_elems.iter().any(|e| e.key() == Some(k))
                            })
                            .unwrap_or(true);
                        if !already {
                            instance_elems.push(elem.clone());
                        }
                    }
                }
            }
            None => ck.errors.push(TypeError::UnknownType {
                name: extends.name.to_string(),
                span: extends.span,
            }),
        }
    }

    let instance = Type::new(TypeKind::Object(ObjectType {
        elems: instance_elems,
        nominal_id: Some(ck.fresh_nominal_id()),
        interface: false,
    }));
    alias.borrow_mut().ty = instance.clone();
    let errors = ck.unify(&placeholder, &instance, decl.span);
    ck.errors.extend(errors);

    // The class value: a constructor returning the instance type, plus the
    // static members.
    let ctor = FuncType {
        type_params: alias.borrow().type_params.clone(),
        params: ctor_params,
        ret: Box::new(self_ty),
        throws: Box::new(Type::never()),
    };
    let mut value_elems = vec![ObjElem::Constructor(ctor)];
    value_elems.extend(static_elems);
    let class_value = Type::object(value_elems);
    install_ns.borrow_mut().insert_value(
        class.name.clone(),
        Binding { source: Some(decl.id), ty: class_value, mutable: false, exported: decl.exported },
    );

    pending.insert(idx, Pending::Class { bodies, field_inits });
}

// ── Definition phase ─────────────────────────────────────────────────────

fn define_decl(ck: &mut Checker, work: Pending<'_>) {
    match work {
        Pending::Fn { sig, func, body_scope } => {
            infer_func_body(ck, &body_scope, func, &sig);
        }

        Pending::Var { pattern_ty, var, scope } => {
            if let Some(init) = &var.init {
                let init_ty = infer_expr(ck, &scope, init);
                let errors = ck.unify(&init_ty, &pattern_ty, init.span);
                ck.errors.extend(errors);
            }
        }

        Pending::Alias { placeholder, alias, ann, scope, param_names } => {
            let mut bound = param_names;
            let body = lower_type_ann_bound(ck, &scope, ann, &mut bound);
            // The alias stores the body itself so argument substitution
            // works; the placeholder is unified for any direct uses.
            alias.borrow_mut().ty = body.clone();
            let errors = ck.unify(&placeholder, &body, ann.span);
            ck.errors.extend(errors);
        }

        Pending::Class { bodies, field_inits } => {
            for (ty, init, scope) in field_inits {
                let init_ty = infer_expr(ck, &scope, init);
                let errors = ck.unify(&init_ty, &ty, init.span);
                ck.errors.extend(errors);
            }
            for (sig, func, body_scope) in bodies {
                infer_func_body(ck, &body_scope, func, &sig);
            }
        }

        Pending::Enum { placeholder, alias, decl, scope, namespace, decl_span } => {
            define_enum(ck, placeholder, alias, decl, &scope, &namespace, decl_span);
        }

        Pending::Interface { decl, alias, created, placeholder, scope, decl_span } => {
            define_interface(ck, decl, alias, created, placeholder, &scope, decl_span);
        }
    }
}

/// Materialize an enum: each variant becomes a nominal object type with a
/// `Symbol.customMatcher` method on its constructor, and the enum type is
/// the union of the variants.
fn define_enum(
    ck: &mut Checker,
    placeholder: Type,
    alias: AliasRef,
    decl: &EnumDecl,
    scope: &Rc<Scope>,
    namespace: &NamespaceRef,
    decl_span: Span,
) {
    let mut bound: Vec<String> = decl.type_params.iter().map(|tp| tp.name.clone()).collect();
    let type_params = alias.borrow().type_params.clone();
    let matcher_key = ObjKey::Sym(ck.well_known.custom_matcher);

    let mut variant_instances = Vec::new();
    for variant in &decl.variants {
        let field_types: Vec<Type> = variant
            .fields
            .iter()
            .map(|f| lower_type_ann_bound(ck, scope, f, &mut bound))
            .collect();

        let mut elems: Vec<ObjElem> = field_types
            .iter()
            .enumerate()
            .map(|(i, ty)| ObjElem::Prop {
                key: ObjKey::Num(i.to_string()),
                ty: ty.clone(),
                optional: false,
                readonly: true,
            })
            .collect();
        elems.push(ObjElem::Prop {
            key: ObjKey::Str("tag".into()),
            ty: Type::lit_str(&variant.name),
            optional: false,
            readonly: true,
        });
        let instance = Type::new(TypeKind::Object(ObjectType {
            elems,
            nominal_id: Some(ck.fresh_nominal_id()),
            interface: false,
        }));

        // Constructor object: builds the variant and destructures it back
        // through the custom matcher.
        let ctor = FuncType {
            type_params: type_params.clone(),
            params: field_types
                .iter()
                .enumerate()
                .map(|(i, ty)| FuncParam {
                    name: format!("field{i}"),
                    rest: false,
                    ty: ty.clone(),
                    optional: false,
                })
                .collect(),
            ret: Box::new(instance.clone()),
            throws: Box::new(Type::never()),
        };
        let matcher = FuncType {
            type_params: type_params.clone(),
            params: vec![FuncParam {
                name: "subject".into(),
                rest: false,
                ty: instance.clone(),
                optional: false,
            }],
            ret: Box::new(Type::tuple(field_types.clone())),
            throws: Box::new(Type::never()),
        };
        let ctor_value = Type::object(vec![
            ObjElem::Constructor(ctor),
            ObjElem::Method { key: matcher_key.clone(), func: matcher, mut_self: false },
        ]);
        let exists = namespace.borrow().values.contains_key(&variant.name);
        if exists {
            ck.errors.push(TypeError::Generic {
                message: format!("duplicate enum variant `{}`", variant.name),
                span: variant.span,
            });
        } else {
            namespace.borrow_mut().insert_value(
                variant.name.clone(),
                Binding { source: None, ty: ctor_value, mutable: false, exported: true },
            );
        }
        variant_instances.push(instance);
    }

    let enum_ty = union_of(variant_instances);
    alias.borrow_mut().ty = enum_ty.clone();
    let errors = ck.unify(&placeholder, &enum_ty, decl_span);
    ck.errors.extend(errors);
}

/// First interface declaration binds the alias to a fresh interface
/// object; later declarations append their elements through the alias so
/// every outstanding reference observes the merge.
fn define_interface(
    ck: &mut Checker,
    decl: &InterfaceDecl,
    alias: AliasRef,
    created: bool,
    placeholder: Option<Type>,
    scope: &Rc<Scope>,
    decl_span: Span,
) {
    let mut bound: Vec<String> = decl.type_params.iter().map(|tp| tp.name.clone()).collect();
    let elems: Vec<ObjElem> = decl
        .elems
        .iter()
        .map(|elem| lower_obj_ann_elem(ck, scope, elem, &mut bound))
        .collect();

    if created {
        let obj = Type::new(TypeKind::Object(ObjectType {
            elems,
            nominal_id: None,
            interface: true,
        }));
        alias.borrow_mut().ty = obj.clone();
        if let Some(placeholder) = placeholder {
            let errors = ck.unify(&placeholder, &obj, decl_span);
            ck.errors.extend(errors);
        }
        return;
    }

    // Merge: append elements, rejecting contradictory re-declarations.
    let mut merge_errors = Vec::new();
    {
        let mut alias_mut = alias.borrow_mut();
        match &mut alias_mut.ty.kind {
            TypeKind::Object(obj) if obj.interface => {
                for elem in elems {
                    let key = elem.key().cloned();
                    match key {
                        Some(key) => {
                            let existing = obj
                                .elems
                                .iter()
                                .find(|e| e.key() == Some(&key))
                                .cloned();
                            match existing {
                                Some(prev) if prev != elem => {
                                    merge_errors.push(TypeError::InterfaceMerge {
                                        name: key.to_string(),
                                        span: decl_span,
                                    });
                                }
                                Some(_) => {}
                                None => obj.elems.push(elem),
                            }
                        }
                        None => obj.elems.push(elem),
                    }
                }
            }
            _ => merge_errors.push(TypeError::Generic {
                message: format!("`{}` is not an interface and cannot be merged", decl.name),
                span: decl_span,
            }),
        }
    }
    ck.errors.extend(merge_errors);
}


// ── JSX detection ────────────────────────────────────────────────────────

fn file_contains_jsx(file: &File) -> bool {
    file.decls.iter().any(decl_contains_jsx)
}

fn decl_contains_jsx(decl: &Decl) -> bool {
    match &decl.kind {
        DeclKind::Fn(f) => func_contains_jsx(&f.func),
        DeclKind::Var(v) => v.init.as_ref().map(expr_contains_jsx).unwrap_or(false),
        DeclKind::Class(c) => c.members.iter().any(|m| match m {
            ClassMember::Field { init, .. } => {
                init.as_ref().map(expr_contains_jsx).unwrap_or(false)
            }
            ClassMember::Method { func, .. }
            | ClassMember::Getter { func, .. }
            | ClassMember::Setter { func, .. } => func_contains_jsx(func),
            ClassMember::FieldShorthand { .. } => false,
        }),
        DeclKind::Namespace(n) => n.decls.iter().any(decl_contains_jsx),
        DeclKind::TypeAlias(_) | DeclKind::Enum(_) | DeclKind::Interface(_) => false,
    }
}

fn func_contains_jsx(func: &FuncExpr) -> bool {
    match &func.body {
        Some(FuncBody::Expr(expr)) => expr_contains_jsx(expr),
        Some(FuncBody::Block(block)) => block.stmts.iter().any(|stmt| match &stmt.kind {
            StmtKind::Expr(expr) => expr_contains_jsx(expr),
            StmtKind::Let { init, .. } => expr_contains_jsx(init),
            StmtKind::Return(expr) => expr.as_ref().map(expr_contains_jsx).unwrap_or(false),
        }),
        None => false,
    }
}

fn expr_contains_jsx(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Jsx(_) => true,
        ExprKind::Lit(_) | ExprKind::Ident(_) => false,
        ExprKind::Binary { lhs, rhs, .. } => expr_contains_jsx(lhs) || expr_contains_jsx(rhs),
        ExprKind::Unary { operand, .. } => expr_contains_jsx(operand),
        ExprKind::Assign { target, value } => {
            expr_contains_jsx(target) || expr_contains_jsx(value)
        }
        ExprKind::Call { callee, args, .. } => {
            expr_contains_jsx(callee) || args.iter().any(expr_contains_jsx)
        }
        ExprKind::Member { object, .. } => expr_contains_jsx(object),
        ExprKind::Index { object, index, .. } => {
            expr_contains_jsx(object) || expr_contains_jsx(index)
        }
        ExprKind::Tuple(elems) => elems.iter().any(expr_contains_jsx),
        ExprKind::Spread(inner) => expr_contains_jsx(inner),
        ExprKind::Object(props) => props.iter().any(|p| match p {
            ObjProp::KeyValue { value, .. } => expr_contains_jsx(value),
            ObjProp::Shorthand { .. } => false,
            ObjProp::Method { func, .. }
            | ObjProp::Getter { func, .. }
            | ObjProp::Setter { func, .. } => func_contains_jsx(func),
            ObjProp::Spread(inner) => expr_contains_jsx(inner),
        }),
        ExprKind::Func(func) => func_contains_jsx(func),
        ExprKind::If { cond, then_block, else_branch } => {
            expr_contains_jsx(cond)
                || then_block.stmts.iter().any(|s| stmt_contains_jsx(&s.kind))
                || match else_branch {
                    Some(ElseBranch::Block(block)) => {
                        block.stmts.iter().any(|s| stmt_contains_jsx(&s.kind))
                    }
                    Some(ElseBranch::If(nested)) => expr_contains_jsx(nested),
                    None => false,
                }
        }
        ExprKind::Match { target, arms } => {
            expr_contains_jsx(target)
                || arms.iter().any(|arm| {
                    arm.guard.as_ref().map(expr_contains_jsx).unwrap_or(false)
                        || expr_contains_jsx(&arm.body)
                })
        }
        ExprKind::Do(block) => block.stmts.iter().any(|s| stmt_contains_jsx(&s.kind)),
        ExprKind::Throw(inner) | ExprKind::Await(inner) => expr_contains_jsx(inner),
        ExprKind::Cast { expr: inner, .. } => expr_contains_jsx(inner),
        ExprKind::TemplateLit { exprs, .. } => exprs.iter().any(expr_contains_jsx),
        ExprKind::TaggedTemplate { tag, exprs, .. } => {
            expr_contains_jsx(tag) || exprs.iter().any(expr_contains_jsx)
        }
    }
}

fn stmt_contains_jsx(kind: &StmtKind) -> bool {
    match kind {
        StmtKind::Expr(expr) => expr_contains_jsx(expr),
        StmtKind::Let { init, .. } => expr_contains_jsx(init),
        StmtKind::Return(expr) => expr.as_ref().map(expr_contains_jsx).unwrap_or(false),
    }
}

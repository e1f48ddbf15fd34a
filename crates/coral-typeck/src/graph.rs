//! The declaration dependency graph.
//!
//! Declarations are keyed by name and kind (value, type, namespace);
//! classes and enums contribute both a type and a value key, and a
//! destructuring `val` contributes one key per bound name, all sharing one
//! node. Edges point from a declaration to the declarations its right-hand
//! side's free names resolve to. Tarjan's algorithm condenses the graph;
//! components come out dependencies-first, with ties broken by declaration
//! order.

use rustc_hash::{FxHashMap, FxHashSet};

use coral_ast::{
    Block, ClassMember, Decl, DeclKind, ElseBranch, Expr, ExprKind, FuncBody, FuncExpr,
    JsxAttrValue, JsxChild, JsxElement, ObjAnnElem, ObjPatProp, ObjProp, PatKind, Pattern,
    PropKey, QualName, StmtKind, TypeAnn, TypeAnnKind, TypeParamDecl,
};

/// The kind half of a binding key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum BindingKind {
    Value,
    Type,
    Namespace,
}

/// A declaration lifted out of its file/namespace nesting.
pub(crate) struct FlatDecl<'a> {
    pub decl: &'a Decl,
    /// Index of the file the declaration came from.
    pub file: usize,
    /// Enclosing namespace path, outermost first.
    pub ns_path: Vec<String>,
}

impl FlatDecl<'_> {
    fn qualified(&self, name: &str) -> String {
        if self.ns_path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.ns_path.join("."))
        }
    }
}

/// Recursively flatten a declaration list, descending into namespace
/// blocks.
pub(crate) fn flatten_decls<'a>(
    decls: &'a [Decl],
    file: usize,
    ns_path: &[String],
    out: &mut Vec<FlatDecl<'a>>,
) {
    for decl in decls {
        out.push(FlatDecl { decl, file, ns_path: ns_path.to_vec() });
        if let DeclKind::Namespace(ns) = &decl.kind {
            let mut path = ns_path.to_vec();
            path.push(ns.name.clone());
            flatten_decls(&ns.decls, file, &path, out);
        }
    }
}

/// The keys a declaration installs, with kinds.
fn defined_keys(flat: &FlatDecl<'_>) -> Vec<(String, BindingKind)> {
    let mut keys = Vec::new();
    match &flat.decl.kind {
        DeclKind::Fn(f) => keys.push((flat.qualified(&f.name), BindingKind::Value)),
        DeclKind::Var(v) => {
            for name in v.pattern.binder_names() {
                keys.push((flat.qualified(&name), BindingKind::Value));
            }
        }
        DeclKind::TypeAlias(t) => keys.push((flat.qualified(&t.name), BindingKind::Type)),
        DeclKind::Class(c) => {
            keys.push((flat.qualified(&c.name), BindingKind::Type));
            keys.push((flat.qualified(&c.name), BindingKind::Value));
        }
        DeclKind::Enum(e) => {
            keys.push((flat.qualified(&e.name), BindingKind::Type));
            keys.push((flat.qualified(&e.name), BindingKind::Value));
            keys.push((flat.qualified(&e.name), BindingKind::Namespace));
        }
        DeclKind::Interface(i) => keys.push((flat.qualified(&i.name), BindingKind::Type)),
        DeclKind::Namespace(n) => {
            keys.push((flat.qualified(&n.name), BindingKind::Namespace))
        }
    }
    keys
}

/// A free-name reference found on a declaration's right-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FreeRef {
    name: String,
    kind: BindingKind,
}

pub(crate) struct DepGraph {
    /// Adjacency: node index -> dependency node indices, deduplicated, in
    /// first-reference order.
    edges: Vec<Vec<usize>>,
}

impl DepGraph {
    /// Build the graph over a flattened declaration list.
    pub(crate) fn build(flats: &[FlatDecl<'_>]) -> DepGraph {
        // Key table: qualified name + kind -> defining node.
        let mut key_to_node: FxHashMap<(String, BindingKind), usize> = FxHashMap::default();
        for (idx, flat) in flats.iter().enumerate() {
            for key in defined_keys(flat) {
                // First declaration wins; merging declarations (overloads,
                // interface merging) share the earliest node so they land
                // in one component.
                key_to_node.entry(key).or_insert(idx);
            }
        }

        let mut edges: Vec<Vec<usize>> = Vec::with_capacity(flats.len());
        for flat in flats {
            let mut refs = Vec::new();
            collect_decl_refs(flat.decl, &mut refs);
            let mut deps: Vec<usize> = Vec::new();
            for free in refs {
                // Resolve against the enclosing namespace path, innermost
                // first, then the module root.
                let mut candidates = Vec::new();
                for depth in (0..=flat.ns_path.len()).rev() {
                    let prefix = flat.ns_path[..depth].join(".");
                    let qualified = if prefix.is_empty() {
                        free.name.clone()
                    } else {
                        format!("{prefix}.{}", free.name)
                    };
                    candidates.push(qualified);
                }
                for candidate in candidates {
                    if let Some(&node) = key_to_node.get(&(candidate, free.kind)) {
                        if !deps.contains(&node) {
                            deps.push(node);
                        }
                        break;
                    }
                }
            }
            edges.push(deps);
        }

        DepGraph { edges }
    }

    /// Condense into strongly connected components, dependencies first.
    /// Tarjan emits a component only after everything it depends on, which
    /// is exactly the inference order.
    pub(crate) fn condense(&self) -> Vec<Vec<usize>> {
        let n = self.edges.len();
        let mut state = TarjanState {
            index: vec![usize::MAX; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        };
        for v in 0..n {
            if state.index[v] == usize::MAX {
                self.strong_connect(v, &mut state);
            }
        }
        for component in &mut state.components {
            component.sort_unstable();
        }
        state.components
    }

    fn strong_connect(&self, v: usize, state: &mut TarjanState) {
        state.index[v] = state.next_index;
        state.lowlink[v] = state.next_index;
        state.next_index += 1;
        state.stack.push(v);
        state.on_stack[v] = true;

        for &w in &self.edges[v] {
            if state.index[w] == usize::MAX {
                self.strong_connect(w, state);
                state.lowlink[v] = state.lowlink[v].min(state.lowlink[w]);
            } else if state.on_stack[w] {
                state.lowlink[v] = state.lowlink[v].min(state.index[w]);
            }
        }

        if state.lowlink[v] == state.index[v] {
            let mut component = Vec::new();
            loop {
                let w = state.stack.pop().expect("stack holds the component");
                state.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            state.components.push(component);
        }
    }
}

struct TarjanState {
    index: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

// ── Free-name collection ─────────────────────────────────────────────────

/// Locally-bound names while walking an expression tree.
struct Locals {
    scopes: Vec<FxHashSet<String>>,
}

impl Locals {
    fn new() -> Self {
        Locals { scopes: vec![FxHashSet::default()] }
    }

    fn push(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name.to_string());
        }
    }

    fn bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }
}

fn collect_decl_refs(decl: &Decl, out: &mut Vec<FreeRef>) {
    let mut locals = Locals::new();
    match &decl.kind {
        DeclKind::Fn(f) => collect_func(&f.func, &mut locals, out),
        DeclKind::Var(v) => {
            collect_pattern(&v.pattern, &mut locals, out);
            if let Some(ann) = &v.ann {
                collect_ann(ann, out);
            }
            if let Some(init) = &v.init {
                collect_expr(init, &mut locals, out);
            }
        }
        DeclKind::TypeAlias(t) => {
            bind_type_params(&t.type_params, &mut locals, out);
            collect_ann_bound(&t.ann, &locals, out);
        }
        DeclKind::Class(c) => {
            bind_type_params(&c.type_params, &mut locals, out);
            if let Some(extends) = &c.extends {
                push_name_refs(&extends.name, BindingKind::Type, out);
                push_name_refs(&extends.name, BindingKind::Value, out);
                for arg in &extends.type_args {
                    collect_ann_bound(arg, &locals, out);
                }
            }
            for param in &c.params {
                collect_pattern(&param.pat, &mut locals, out);
                if let Some(ann) = &param.ann {
                    collect_ann_bound(ann, &locals, out);
                }
            }
            for member in &c.members {
                match member {
                    ClassMember::FieldShorthand { .. } => {}
                    ClassMember::Field { ann, init, .. } => {
                        if let Some(ann) = ann {
                            collect_ann_bound(ann, &locals, out);
                        }
                        if let Some(init) = init {
                            collect_expr(init, &mut locals, out);
                        }
                    }
                    ClassMember::Method { func, .. }
                    | ClassMember::Getter { func, .. }
                    | ClassMember::Setter { func, .. } => collect_func(func, &mut locals, out),
                }
            }
        }
        DeclKind::Enum(e) => {
            bind_type_params(&e.type_params, &mut locals, out);
            for variant in &e.variants {
                for field in &variant.fields {
                    collect_ann_bound(field, &locals, out);
                }
            }
        }
        DeclKind::Interface(i) => {
            bind_type_params(&i.type_params, &mut locals, out);
            for elem in &i.elems {
                collect_obj_ann_elem(elem, &locals, out);
            }
        }
        // A namespace depends on nothing itself; its members are separate
        // nodes.
        DeclKind::Namespace(_) => {}
    }
}

fn bind_type_params(params: &[TypeParamDecl], locals: &mut Locals, out: &mut Vec<FreeRef>) {
    for tp in params {
        locals.bind(&tp.name);
    }
    for tp in params {
        if let Some(c) = &tp.constraint {
            collect_ann_bound(c, locals, out);
        }
        if let Some(d) = &tp.default {
            collect_ann_bound(d, locals, out);
        }
    }
}

fn push_name_refs(name: &QualName, kind: BindingKind, out: &mut Vec<FreeRef>) {
    out.push(FreeRef { name: name.to_string(), kind });
    if !name.is_simple() {
        out.push(FreeRef { name: name.head().to_string(), kind: BindingKind::Namespace });
    }
}

fn collect_func(func: &FuncExpr, locals: &mut Locals, out: &mut Vec<FreeRef>) {
    locals.push();
    for tp in &func.type_params {
        locals.bind(&tp.name);
    }
    for tp in &func.type_params {
        if let Some(c) = &tp.constraint {
            collect_ann_bound(c, locals, out);
        }
        if let Some(d) = &tp.default {
            collect_ann_bound(d, locals, out);
        }
    }
    if func.self_param.is_some() {
        locals.bind("self");
    }
    for param in &func.params {
        collect_pattern(&param.pat, locals, out);
        if let Some(ann) = &param.ann {
            collect_ann_bound(ann, locals, out);
        }
    }
    if let Some(ret) = &func.ret {
        collect_ann_bound(ret, locals, out);
    }
    if let Some(throws) = &func.throws {
        collect_ann_bound(throws, locals, out);
    }
    match &func.body {
        Some(FuncBody::Block(block)) => collect_block(block, locals, out),
        Some(FuncBody::Expr(expr)) => collect_expr(expr, locals, out),
        None => {}
    }
    locals.pop();
}

/// Patterns both reference names (extractors, defaults, annotations) and
/// bind them.
fn collect_pattern(pat: &Pattern, locals: &mut Locals, out: &mut Vec<FreeRef>) {
    match &pat.kind {
        PatKind::Ident { name, ann, default, .. } => {
            if let Some(ann) = ann {
                collect_ann_bound(ann, locals, out);
            }
            if let Some(default) = default {
                collect_expr(default, locals, out);
            }
            locals.bind(name);
        }
        PatKind::Lit(_) | PatKind::Wildcard => {}
        PatKind::Tuple(elems) => {
            for p in elems {
                collect_pattern(p, locals, out);
            }
        }
        PatKind::Object(props) => {
            for prop in props {
                match prop {
                    ObjPatProp::KeyValue { pat, .. } => collect_pattern(pat, locals, out),
                    ObjPatProp::Shorthand { name, ann, default, .. } => {
                        if let Some(ann) = ann {
                            collect_ann_bound(ann, locals, out);
                        }
                        if let Some(default) = default {
                            collect_expr(default, locals, out);
                        }
                        locals.bind(name);
                    }
                    ObjPatProp::Rest(pat) => collect_pattern(pat, locals, out),
                }
            }
        }
        PatKind::Extractor { name, args } => {
            push_name_refs(name, BindingKind::Value, out);
            for p in args {
                collect_pattern(p, locals, out);
            }
        }
        PatKind::Instance { class, inner } => {
            push_name_refs(class, BindingKind::Type, out);
            collect_pattern(inner, locals, out);
        }
        PatKind::Rest(inner) => collect_pattern(inner, locals, out),
    }
}

fn collect_block(block: &Block, locals: &mut Locals, out: &mut Vec<FreeRef>) {
    locals.push();
    for stmt in &block.stmts {
        match &stmt.kind {
            StmtKind::Expr(expr) => collect_expr(expr, locals, out),
            StmtKind::Let { pattern, ann, init } => {
                if let Some(ann) = ann {
                    collect_ann_bound(ann, locals, out);
                }
                collect_expr(init, locals, out);
                collect_pattern(pattern, locals, out);
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    collect_expr(expr, locals, out);
                }
            }
        }
    }
    locals.pop();
}

fn collect_expr(expr: &Expr, locals: &mut Locals, out: &mut Vec<FreeRef>) {
    match &expr.kind {
        ExprKind::Lit(_) => {}
        ExprKind::Ident(name) => {
            if !locals.bound(name) {
                out.push(FreeRef { name: name.clone(), kind: BindingKind::Value });
                out.push(FreeRef { name: name.clone(), kind: BindingKind::Namespace });
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, locals, out);
            collect_expr(rhs, locals, out);
        }
        ExprKind::Unary { operand, .. } => collect_expr(operand, locals, out),
        ExprKind::Assign { target, value } => {
            collect_expr(target, locals, out);
            collect_expr(value, locals, out);
        }
        ExprKind::Call { callee, args, .. } => {
            collect_expr(callee, locals, out);
            for arg in args {
                collect_expr(arg, locals, out);
            }
        }
        ExprKind::Member { object, property, .. } => {
            collect_expr(object, locals, out);
            // `Ns.member` also depends on the member behind the namespace.
            if let ExprKind::Ident(head) = &object.kind {
                if !locals.bound(head) {
                    out.push(FreeRef {
                        name: format!("{head}.{property}"),
                        kind: BindingKind::Value,
                    });
                }
            }
        }
        ExprKind::Index { object, index, .. } => {
            collect_expr(object, locals, out);
            collect_expr(index, locals, out);
        }
        ExprKind::Tuple(elems) => {
            for e in elems {
                collect_expr(e, locals, out);
            }
        }
        ExprKind::Spread(inner) => collect_expr(inner, locals, out),
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    ObjProp::KeyValue { key, value } => {
                        if let PropKey::Computed(key_expr) = key {
                            collect_expr(key_expr, locals, out);
                        }
                        collect_expr(value, locals, out);
                    }
                    ObjProp::Shorthand { name, .. } => {
                        if !locals.bound(name) {
                            out.push(FreeRef { name: name.clone(), kind: BindingKind::Value });
                        }
                    }
                    ObjProp::Method { key, func }
                    | ObjProp::Getter { key, func }
                    | ObjProp::Setter { key, func } => {
                        if let PropKey::Computed(key_expr) = key {
                            collect_expr(key_expr, locals, out);
                        }
                        collect_func(func, locals, out);
                    }
                    ObjProp::Spread(inner) => collect_expr(inner, locals, out),
                }
            }
        }
        ExprKind::Func(func) => collect_func(func, locals, out),
        ExprKind::If { cond, then_block, else_branch } => {
            collect_expr(cond, locals, out);
            collect_block(then_block, locals, out);
            match else_branch {
                Some(ElseBranch::Block(block)) => collect_block(block, locals, out),
                Some(ElseBranch::If(nested)) => collect_expr(nested, locals, out),
                None => {}
            }
        }
        ExprKind::Match { target, arms } => {
            collect_expr(target, locals, out);
            for arm in arms {
                locals.push();
                collect_pattern(&arm.pat, locals, out);
                if let Some(guard) = &arm.guard {
                    collect_expr(guard, locals, out);
                }
                collect_expr(&arm.body, locals, out);
                locals.pop();
            }
        }
        ExprKind::Do(block) => collect_block(block, locals, out),
        ExprKind::Throw(inner) | ExprKind::Await(inner) => collect_expr(inner, locals, out),
        ExprKind::Cast { expr: inner, ann } => {
            collect_expr(inner, locals, out);
            collect_ann_bound(ann, locals, out);
        }
        ExprKind::TemplateLit { exprs, .. } => {
            for e in exprs {
                collect_expr(e, locals, out);
            }
        }
        ExprKind::TaggedTemplate { tag, exprs, .. } => {
            collect_expr(tag, locals, out);
            for e in exprs {
                collect_expr(e, locals, out);
            }
        }
        ExprKind::Jsx(element) => collect_jsx(element, locals, out),
    }
}

fn collect_jsx(element: &JsxElement, locals: &mut Locals, out: &mut Vec<FreeRef>) {
    if element
        .name
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
        && !locals.bound(&element.name)
    {
        out.push(FreeRef { name: element.name.clone(), kind: BindingKind::Value });
    }
    for attr in &element.attrs {
        if let Some(JsxAttrValue::Expr(expr)) = &attr.value {
            collect_expr(expr, locals, out);
        }
    }
    for child in &element.children {
        match child {
            JsxChild::Element(inner) => collect_jsx(inner, locals, out),
            JsxChild::Expr(expr) => collect_expr(expr, locals, out),
            JsxChild::Text(_) => {}
        }
    }
}

fn collect_ann(ann: &TypeAnn, out: &mut Vec<FreeRef>) {
    let locals = Locals::new();
    collect_ann_bound(ann, &locals, out);
}

fn collect_ann_bound(ann: &TypeAnn, locals: &Locals, out: &mut Vec<FreeRef>) {
    match &ann.kind {
        TypeAnnKind::Ref { name, args } => {
            if !(name.is_simple() && locals.bound(name.head())) {
                push_name_refs(name, BindingKind::Type, out);
            }
            for arg in args {
                collect_ann_bound(arg, locals, out);
            }
        }
        TypeAnnKind::TypeOf(name) => {
            push_name_refs(name, BindingKind::Value, out);
        }
        TypeAnnKind::Object(elems) => {
            for elem in elems {
                collect_obj_ann_elem(elem, locals, out);
            }
        }
        TypeAnnKind::Tuple(items)
        | TypeAnnKind::Union(items)
        | TypeAnnKind::Intersection(items) => {
            for item in items {
                collect_ann_bound(item, locals, out);
            }
        }
        TypeAnnKind::Rest(inner)
        | TypeAnnKind::Mutable(inner)
        | TypeAnnKind::KeyOf(inner) => collect_ann_bound(inner, locals, out),
        TypeAnnKind::Func(func) => collect_func_ann(func, locals, out),
        TypeAnnKind::Index { obj, index } => {
            collect_ann_bound(obj, locals, out);
            collect_ann_bound(index, locals, out);
        }
        TypeAnnKind::Cond { check, extends, then_ann, else_ann } => {
            collect_ann_bound(check, locals, out);
            collect_ann_bound(extends, locals, out);
            collect_ann_bound(then_ann, locals, out);
            collect_ann_bound(else_ann, locals, out);
        }
        TypeAnnKind::Mapped(mapped) => {
            collect_ann_bound(&mapped.constraint, locals, out);
            collect_ann_bound(&mapped.value, locals, out);
        }
        TypeAnnKind::TemplateLit { types, .. } => {
            for t in types {
                collect_ann_bound(t, locals, out);
            }
        }
        TypeAnnKind::Prim(_)
        | TypeAnnKind::Lit(_)
        | TypeAnnKind::Any
        | TypeAnnKind::Unknown
        | TypeAnnKind::Never
        | TypeAnnKind::Wildcard
        | TypeAnnKind::Infer(_) => {}
    }
}

fn collect_obj_ann_elem(elem: &ObjAnnElem, locals: &Locals, out: &mut Vec<FreeRef>) {
    match elem {
        ObjAnnElem::Prop { ann, .. } => collect_ann_bound(ann, locals, out),
        ObjAnnElem::Method { func, .. }
        | ObjAnnElem::Constructor(func)
        | ObjAnnElem::Callable(func) => collect_func_ann(func, locals, out),
        ObjAnnElem::Getter { ret, .. } => collect_ann_bound(ret, locals, out),
        ObjAnnElem::Setter { param, .. } => collect_ann_bound(&param.ann, locals, out),
        ObjAnnElem::Rest(ann) => collect_ann_bound(ann, locals, out),
        ObjAnnElem::Mapped(mapped) => {
            collect_ann_bound(&mapped.constraint, locals, out);
            collect_ann_bound(&mapped.value, locals, out);
        }
    }
}

fn collect_func_ann(func: &coral_ast::FuncAnn, locals: &Locals, out: &mut Vec<FreeRef>) {
    // Type-parameter shadowing inside annotations is handled at lowering
    // time; for dependency purposes shadowed names simply resolve to
    // nothing.
    for p in &func.params {
        collect_ann_bound(&p.ann, locals, out);
    }
    collect_ann_bound(&func.ret, locals, out);
    if let Some(throws) = &func.throws {
        collect_ann_bound(throws, locals, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_ast::AstBuilder;
    use coral_common::SourceId;

    fn flats(decls: &[Decl]) -> Vec<FlatDecl<'_>> {
        let mut out = Vec::new();
        flatten_decls(decls, 0, &[], &mut out);
        out
    }

    #[test]
    fn independent_decls_form_singleton_components() {
        let mut b = AstBuilder::new(SourceId(0));
        let five = b.num("5");
        let hello = b.str_("hello");
        let decls = vec![b.val("a", five), b.val("b", hello)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        let sccs = graph.condense();
        assert_eq!(sccs, vec![vec![0], vec![1]]);
    }

    #[test]
    fn dependency_orders_components() {
        // val b = a; val a = 5  => a's component first.
        let mut b = AstBuilder::new(SourceId(0));
        let a_ref = b.ident("a");
        let five = b.num("5");
        let decls = vec![b.val("b", a_ref), b.val("a", five)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        let sccs = graph.condense();
        assert_eq!(sccs, vec![vec![1], vec![0]]);
    }

    #[test]
    fn mutual_recursion_shares_a_component() {
        // fn even(n) = odd(n); fn odd(n) = even(n)
        let mut b = AstBuilder::new(SourceId(0));
        let odd_ref = b.ident("odd");
        let n1 = b.ident("n");
        let call_odd = b.call(odd_ref, vec![n1]);
        let p1 = b.param("n", None);
        let even = b.func(vec![p1], None, FuncBody::Expr(Box::new(call_odd)));

        let even_ref = b.ident("even");
        let n2 = b.ident("n");
        let call_even = b.call(even_ref, vec![n2]);
        let p2 = b.param("n", None);
        let odd = b.func(vec![p2], None, FuncBody::Expr(Box::new(call_even)));

        let decls = vec![b.fn_decl("even", even), b.fn_decl("odd", odd)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        let sccs = graph.condense();
        assert_eq!(sccs, vec![vec![0, 1]]);
    }

    #[test]
    fn local_bindings_are_not_dependencies() {
        // fn f(x) = x  -- `x` is a parameter, not a module reference.
        let mut b = AstBuilder::new(SourceId(0));
        let x_ref = b.ident("x");
        let p = b.param("x", None);
        let f = b.func(vec![p], None, FuncBody::Expr(Box::new(x_ref)));
        let decls = vec![b.fn_decl("f", f)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        assert!(graph.edges[0].is_empty());
    }

    #[test]
    fn type_annotation_references_are_edges() {
        // type Id = number; val x: Id = 1
        let mut b = AstBuilder::new(SourceId(0));
        let num_ann = b.ann_number();
        let alias = b.type_alias("Id", vec![], num_ann);
        let id_ref = b.ann_ref("Id", vec![]);
        let one = b.num("1");
        let decls = vec![alias, b.val_ann("x", id_ref, one)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        assert_eq!(graph.edges[1], vec![0]);
        let sccs = graph.condense();
        assert_eq!(sccs, vec![vec![0], vec![1]]);
    }

    #[test]
    fn destructuring_var_defines_every_binder() {
        // val [a, b] = t; val c = a
        let mut b = AstBuilder::new(SourceId(0));
        let pa = b.pat_ident("a");
        let pb = b.pat_ident("b");
        let tuple_pat = b.pat_tuple(vec![pa, pb]);
        let t_ref = b.ident("t");
        let tuple_decl = b.var_decl(tuple_pat, None, Some(t_ref));
        let a_ref = b.ident("a");
        let decls = vec![tuple_decl, b.val("c", a_ref)];
        let flat = flats(&decls);
        let graph = DepGraph::build(&flat);
        assert_eq!(graph.edges[1], vec![0]);
    }
}

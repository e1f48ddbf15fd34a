//! Scopes and namespaces.
//!
//! A [`Namespace`] is three name-unique mappings (values, type aliases,
//! child namespaces). A [`Scope`] is a parent-linked chain of namespaces;
//! lookup walks up the chain. File scopes are children of the module scope,
//! and imports write into the file scope's namespace.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use coral_ast::QualName;

use crate::ty::{AliasRef, Binding};

/// Shared handle to a namespace. Shared because a namespace installed as a
/// child (e.g. an imported package mounted under an alias) must observe
/// later additions to the original.
pub type NamespaceRef = Rc<RefCell<Namespace>>;

#[derive(Debug, Default)]
pub struct Namespace {
    pub values: FxHashMap<String, Binding>,
    pub types: FxHashMap<String, AliasRef>,
    pub namespaces: FxHashMap<String, NamespaceRef>,
}

impl Namespace {
    pub fn new() -> NamespaceRef {
        Rc::new(RefCell::new(Namespace::default()))
    }

    /// Install a value binding. Re-binding an existing name is a programmer
    /// error; the documented merge cases (function overloads) go through
    /// [`Namespace::replace_value`].
    pub fn insert_value(&mut self, name: impl Into<String>, binding: Binding) {
        let name = name.into();
        debug_assert!(
            !self.values.contains_key(&name),
            "value `{name}` installed twice in one namespace"
        );
        self.values.insert(name, binding);
    }

    /// Overwrite a value binding. Used by overload merging, where repeated
    /// function declarations collapse into one intersection binding.
    pub fn replace_value(&mut self, name: impl Into<String>, binding: Binding) {
        self.values.insert(name.into(), binding);
    }

    pub fn insert_type(&mut self, name: impl Into<String>, alias: AliasRef) {
        let name = name.into();
        debug_assert!(
            !self.types.contains_key(&name),
            "type `{name}` installed twice in one namespace"
        );
        self.types.insert(name, alias);
    }

    pub fn insert_namespace(&mut self, name: impl Into<String>, ns: NamespaceRef) {
        let name = name.into();
        debug_assert!(
            !self.namespaces.contains_key(&name),
            "namespace `{name}` installed twice in one namespace"
        );
        self.namespaces.insert(name, ns);
    }

    /// Fetch or create a child namespace, for nested namespace declarations
    /// spread over several blocks.
    pub fn child_namespace(&mut self, name: &str) -> NamespaceRef {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(Namespace::new)
            .clone()
    }
}

/// A parent-linked scope chain node.
#[derive(Debug)]
pub struct Scope {
    pub namespace: NamespaceRef,
    pub parent: Option<Rc<Scope>>,
}

impl Scope {
    /// A root scope with a fresh namespace.
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope { namespace: Namespace::new(), parent: None })
    }

    /// A child scope with a fresh namespace.
    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope { namespace: Namespace::new(), parent: Some(parent.clone()) })
    }

    /// A child scope backed by an existing namespace (e.g. a declared
    /// namespace block whose bindings must land in the namespace tree).
    pub fn child_with(parent: &Rc<Scope>, namespace: NamespaceRef) -> Rc<Scope> {
        Rc::new(Scope { namespace, parent: Some(parent.clone()) })
    }

    /// Look up a value binding, walking up the chain.
    pub fn lookup_value(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.namespace.borrow().values.get(name) {
            return Some(binding.clone());
        }
        self.parent.as_ref()?.lookup_value(name)
    }

    /// Look up a type alias, walking up the chain.
    pub fn lookup_type(&self, name: &str) -> Option<AliasRef> {
        if let Some(alias) = self.namespace.borrow().types.get(name) {
            return Some(alias.clone());
        }
        self.parent.as_ref()?.lookup_type(name)
    }

    /// Look up a child namespace, walking up the chain.
    pub fn lookup_namespace(&self, name: &str) -> Option<NamespaceRef> {
        if let Some(ns) = self.namespace.borrow().namespaces.get(name) {
            return Some(ns.clone());
        }
        self.parent.as_ref()?.lookup_namespace(name)
    }

    /// Resolve the namespace containing the final segment of a qualified
    /// name: `A.B.c` resolves `A` up the chain, then `B` inside it.
    fn resolve_prefix(&self, name: &QualName) -> Option<NamespaceRef> {
        let mut ns = self.lookup_namespace(name.head())?;
        for part in &name.parts[1..name.parts.len() - 1] {
            let next = ns.borrow().namespaces.get(part.as_str()).cloned()?;
            ns = next;
        }
        Some(ns)
    }

    /// Look up a possibly-qualified value binding.
    pub fn lookup_qualified_value(&self, name: &QualName) -> Option<Binding> {
        if name.is_simple() {
            return self.lookup_value(name.head());
        }
        let ns = self.resolve_prefix(name)?;
        let binding = ns.borrow().values.get(name.last()).cloned();
        binding
    }

    /// Look up a possibly-qualified type alias.
    pub fn lookup_qualified_type(&self, name: &QualName) -> Option<AliasRef> {
        if name.is_simple() {
            return self.lookup_type(name.head());
        }
        let ns = self.resolve_prefix(name)?;
        let alias = ns.borrow().types.get(name.last()).cloned();
        alias
    }

    /// Look up a possibly-qualified namespace.
    pub fn lookup_qualified_namespace(&self, name: &QualName) -> Option<NamespaceRef> {
        let mut ns = self.lookup_namespace(name.head())?;
        for part in &name.parts[1..] {
            let next = ns.borrow().namespaces.get(part.as_str()).cloned()?;
            ns = next;
        }
        Some(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Type;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Scope::root();
        root.namespace
            .borrow_mut()
            .insert_value("x", Binding::new(Type::number()));
        let child = Scope::child(&root);
        let binding = child.lookup_value("x").expect("x visible from child");
        assert_eq!(binding.ty, Type::number());
        assert!(child.lookup_value("y").is_none());
    }

    #[test]
    fn child_shadows_parent() {
        let root = Scope::root();
        root.namespace
            .borrow_mut()
            .insert_value("x", Binding::new(Type::number()));
        let child = Scope::child(&root);
        child
            .namespace
            .borrow_mut()
            .insert_value("x", Binding::new(Type::string()));
        assert_eq!(child.lookup_value("x").expect("shadowed").ty, Type::string());
        assert_eq!(root.lookup_value("x").expect("original").ty, Type::number());
    }

    #[test]
    fn qualified_lookup_through_namespaces() {
        let root = Scope::root();
        let inner = Namespace::new();
        inner
            .borrow_mut()
            .insert_value("pi", Binding::new(Type::number()));
        root.namespace.borrow_mut().insert_namespace("Math", inner);

        let name = QualName::new(vec!["Math".into(), "pi".into()]);
        let binding = root.lookup_qualified_value(&name).expect("Math.pi");
        assert_eq!(binding.ty, Type::number());
        assert!(root
            .lookup_qualified_value(&QualName::new(vec!["Math".into(), "e".into()]))
            .is_none());
    }
}

//! Imports and the package registry.
//!
//! The registry maps resolved type-definition file paths (not package
//! names) to inferred namespaces, so a monorepo where two packages pin
//! different versions of one dependency keeps them apart. Filesystem
//! access goes through the [`PackageHost`] collaborator; the checker only
//! sees parsed modules.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use coral_ast::{ImportDecl, ImportSpecifiers, Module};

use crate::error::TypeError;
use crate::scope::{Namespace, NamespaceRef, Scope};
use crate::ty::Binding;
use crate::unify::Checker;

/// The relevant slice of a `package.json` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestInfo {
    /// The `types` field: the entry-point type definition file.
    pub types: Option<String>,
}

impl ManifestInfo {
    /// Parse a manifest from its JSON text.
    pub fn from_json(text: &str) -> Result<ManifestInfo, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid package manifest: {e}"))
    }
}

/// A type-definition file split into its three sub-modules: global
/// augmentations, `declare module "name"` blocks, and top-level exports.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedModules {
    pub global: Option<Module>,
    pub named: Vec<(String, Module)>,
    pub package: Option<Module>,
}

/// Filesystem and loader collaborator for import resolution.
pub trait PackageHost {
    /// The nearest ancestor of `dir` containing a package manifest.
    fn find_package_manifest(&self, dir: &Path) -> Option<PathBuf>;

    /// Resolve a directory, following one level of symlink.
    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf>;

    /// Read and parse the manifest in `dir`.
    fn read_manifest(&self, dir: &Path) -> Result<ManifestInfo, String>;

    /// Load and classify the type definitions at `path`.
    fn load_classified(&self, path: &Path) -> Result<ClassifiedModules, String>;
}

/// A loaded package: its sub-module namespaces.
#[derive(Clone, Default)]
pub struct PackageModules {
    pub global: Option<NamespaceRef>,
    pub named: FxHashMap<String, NamespaceRef>,
    pub package: Option<NamespaceRef>,
}

impl PackageModules {
    /// The namespace surfaced to importers: the package module if present,
    /// else a named module matching the import name, else an empty
    /// namespace (globals are already applied).
    pub fn surfaced(&self, import_name: &str) -> NamespaceRef {
        if let Some(ns) = &self.package {
            return ns.clone();
        }
        if let Some(ns) = self.named.get(import_name) {
            return ns.clone();
        }
        Namespace::new()
    }
}

/// In-memory registry of loaded packages, keyed by resolved definition
/// file path.
#[derive(Default)]
pub struct PackageRegistry {
    packages: FxHashMap<PathBuf, PackageModules>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        PackageRegistry::default()
    }

    pub fn get(&self, path: &Path) -> Option<&PackageModules> {
        self.packages.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, modules: PackageModules) {
        self.packages.insert(path, modules);
    }
}

/// Process one import statement into the file scope.
pub(crate) fn process_import(
    ck: &mut Checker,
    file_scope: &Rc<Scope>,
    module_scope: &Rc<Scope>,
    import: &ImportDecl,
    dir: &Path,
) {
    let pkg = match load_package(ck, module_scope, dir, &import.package) {
        Ok(pkg) => pkg,
        Err(message) => {
            ck.errors.push(TypeError::Generic { message, span: import.span });
            return;
        }
    };
    let surfaced = pkg.surfaced(&import.package);

    match &import.specifiers {
        ImportSpecifiers::Namespace { alias } => {
            file_scope
                .namespace
                .borrow_mut()
                .insert_namespace(alias.clone(), surfaced);
        }
        ImportSpecifiers::Named(specifiers) => {
            for spec in specifiers {
                let local = spec.alias.as_ref().unwrap_or(&spec.name).clone();
                let source = surfaced.borrow();
                if let Some(binding) = source.values.get(&spec.name).cloned() {
                    drop(source);
                    file_scope.namespace.borrow_mut().insert_value(local, binding);
                } else if let Some(alias_ref) = source.types.get(&spec.name).cloned() {
                    drop(source);
                    file_scope.namespace.borrow_mut().insert_type(local, alias_ref);
                } else if let Some(child) = source.namespaces.get(&spec.name).cloned() {
                    drop(source);
                    file_scope
                        .namespace
                        .borrow_mut()
                        .insert_namespace(local, child);
                } else {
                    drop(source);
                    ck.errors.push(TypeError::Generic {
                        message: format!(
                            "Package has no export named {}",
                            spec.name
                        ),
                        span: spec.span,
                    });
                }
            }
        }
    }
}

/// Load a package's type definitions purely for their global
/// augmentations (the JSX auto-load path).
pub(crate) fn load_globals(
    ck: &mut Checker,
    module_scope: &Rc<Scope>,
    dir: &Path,
    package: &str,
) -> Result<(), String> {
    load_package(ck, module_scope, dir, package).map(|_| ())
}

/// Resolve and load a package, registering it by its definition file
/// path. Already-loaded packages come straight from the registry. The
/// host is restored before sub-module inference so definition files that
/// import further packages resolve recursively.
fn load_package(
    ck: &mut Checker,
    module_scope: &Rc<Scope>,
    dir: &Path,
    package: &str,
) -> Result<PackageModules, String> {
    let host = ck
        .host
        .take()
        .ok_or_else(|| format!("cannot resolve `{package}`: no package host configured"))?;

    let located = locate_definitions(host.as_ref(), dir, package);
    let entry_path = match located {
        Ok(path) => path,
        Err(message) => {
            ck.host = Some(host);
            return Err(message);
        }
    };

    if let Some(found) = ck.registry.get(&entry_path) {
        let found = found.clone();
        ck.host = Some(host);
        return Ok(found);
    }

    debug!("loading type definitions from {}", entry_path.display());
    let classified = match host.load_classified(&entry_path) {
        Ok(classified) => classified,
        Err(message) => {
            ck.host = Some(host);
            return Err(message);
        }
    };
    ck.host = Some(host);

    infer_classified(ck, module_scope, entry_path, &classified)
}

/// The host-only half of resolution: nearest manifest, `node_modules/<P>`
/// then `node_modules/@types/<P>` with one level of symlink, and the
/// manifest's `types` entry.
fn locate_definitions(
    host: &dyn PackageHost,
    dir: &Path,
    package: &str,
) -> Result<PathBuf, String> {
    let root = host
        .find_package_manifest(dir)
        .ok_or_else(|| format!("no package manifest found above `{}`", dir.display()))?;

    let mut resolved_dir = None;
    for candidate in [
        root.join("node_modules").join(package),
        root.join("node_modules").join("@types").join(package),
    ] {
        if let Ok(dir) = host.resolve_dir(&candidate) {
            resolved_dir = Some(dir);
            break;
        }
    }
    let package_dir =
        resolved_dir.ok_or_else(|| format!("package `{package}` not found in node_modules"))?;

    let manifest = host.read_manifest(&package_dir)?;
    let entry = manifest
        .types
        .ok_or_else(|| format!("package `{package}` has no `types` entry"))?;
    Ok(package_dir.join(entry))
}

/// Infer the classified sub-modules into fresh namespaces and register the
/// package.
fn infer_classified(
    ck: &mut Checker,
    module_scope: &Rc<Scope>,
    entry_path: PathBuf,
    classified: &ClassifiedModules,
) -> Result<PackageModules, String> {
    let mut modules = PackageModules::default();

    // Global augmentations land in the module/global scope directly.
    if let Some(global) = &classified.global {
        let global_ns = infer_submodule(ck, module_scope, global);
        apply_globals(module_scope, &global_ns);
        modules.global = Some(global_ns);
    }
    for (name, module) in &classified.named {
        let ns = infer_submodule(ck, module_scope, module);
        let key = format!("{}#{name}", entry_path.display());
        debug!("registered named module {key}");
        modules.named.insert(name.clone(), ns);
    }
    if let Some(package_module) = &classified.package {
        modules.package = Some(infer_submodule(ck, module_scope, package_module));
    }

    ck.registry.insert(entry_path, modules.clone());
    Ok(modules)
}

/// Infer one sub-module against a fresh namespace whose parent chain sees
/// the global scope and the prelude.
fn infer_submodule(ck: &mut Checker, module_scope: &Rc<Scope>, module: &Module) -> NamespaceRef {
    let namespace = Namespace::new();
    let scope = Scope::child_with(module_scope, namespace.clone());
    crate::infer::infer_files_into(ck, &scope, &module.files);
    namespace
}

/// Merge a global-augmentation namespace into the module scope. Existing
/// names win; a package cannot silently shadow user declarations.
fn apply_globals(module_scope: &Rc<Scope>, globals: &NamespaceRef) {
    let source = globals.borrow();
    let mut target = module_scope.namespace.borrow_mut();
    let mut values: Vec<(String, Binding)> = source
        .values
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    values.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, binding) in values {
        target.values.entry(name).or_insert(binding);
    }
    let mut types: Vec<_> = source
        .types
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    types.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, alias) in types {
        target.types.entry(name).or_insert(alias);
    }
    let mut namespaces: Vec<_> = source
        .namespaces
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    namespaces.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, ns) in namespaces {
        target.namespaces.entry(name).or_insert(ns);
    }
}

// ── Filesystem host ──────────────────────────────────────────────────────

/// A [`PackageHost`] backed by the real filesystem. Parsing of type
/// definition files is delegated to the loader the embedder supplies
/// (the parser is not part of this crate).
pub struct FsPackageHost {
    loader: Box<dyn Fn(&Path) -> Result<ClassifiedModules, String>>,
}

impl FsPackageHost {
    pub fn new(loader: Box<dyn Fn(&Path) -> Result<ClassifiedModules, String>>) -> Self {
        FsPackageHost { loader }
    }
}

impl PackageHost for FsPackageHost {
    fn find_package_manifest(&self, dir: &Path) -> Option<PathBuf> {
        let mut current = Some(dir.to_path_buf());
        while let Some(dir) = current {
            if dir.join("package.json").is_file() {
                return Some(dir);
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }
        None
    }

    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf> {
        let metadata = std::fs::symlink_metadata(path)?;
        if metadata.file_type().is_symlink() {
            let target = std::fs::read_link(path)?;
            let resolved = if target.is_absolute() {
                target
            } else {
                path.parent().unwrap_or(Path::new(".")).join(target)
            };
            return Ok(resolved);
        }
        if metadata.is_dir() {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "not a directory"))
        }
    }

    fn read_manifest(&self, dir: &Path) -> Result<ManifestInfo, String> {
        let path = dir.join("package.json");
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        ManifestInfo::from_json(&text)
    }

    fn load_classified(&self, path: &Path) -> Result<ClassifiedModules, String> {
        (self.loader)(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_types_entry() {
        let manifest =
            ManifestInfo::from_json(r#"{"name": "react", "types": "index.d.ts"}"#).unwrap();
        assert_eq!(manifest.types.as_deref(), Some("index.d.ts"));

        let manifest = ManifestInfo::from_json(r#"{"name": "plain"}"#).unwrap();
        assert!(manifest.types.is_none());

        assert!(ManifestInfo::from_json("not json").is_err());
    }

    #[test]
    fn surfaced_prefers_package_module_then_named() {
        let mut pkg = PackageModules::default();
        let named = Namespace::new();
        pkg.named.insert("lodash".into(), named.clone());
        assert!(Rc::ptr_eq(&pkg.surfaced("lodash"), &named));

        let package_ns = Namespace::new();
        pkg.package = Some(package_ns.clone());
        assert!(Rc::ptr_eq(&pkg.surfaced("lodash"), &package_ns));

        let empty = PackageModules::default();
        let ns = empty.surfaced("anything");
        assert!(ns.borrow().values.is_empty());
    }
}

//! Semantic analysis core for the Coral language.
//!
//! Takes a parsed, module-structured AST ([`coral_ast::Module`]) and
//! produces inferred types for every expression and pattern plus a
//! diagnostic list. The pipeline:
//!
//! 1. File scopes and imports ([`imports`]), with an in-memory package
//!    registry keyed by resolved definition-file path.
//! 2. A declaration dependency graph condensed into strongly connected
//!    components ([`graph`]), so mutually recursive declarations are
//!    inferred together.
//! 3. Per-component two-phase inference ([`infer`]): placeholders first,
//!    then definitions, with var initializers last.
//! 4. Structural unification with variance rules ([`unify`]) over the
//!    type representation in [`ty`], expanding computed types on demand
//!    ([`expand`]).
//!
//! Inferred types and identifier binding sources are recorded in side
//! tables on the [`Checker`], keyed by AST node id, for the downstream
//! code generator. External collaborators (filesystem/package access,
//! the GraphQL schema validator) are traits the embedder supplies;
//! everything here is synchronous and single-threaded, one `Checker` per
//! run.

pub mod annotation;
pub mod builtins;
pub mod error;
pub mod expand;
pub mod expr;
pub mod graph;
pub mod imports;
pub mod infer;
pub mod pattern;
pub mod scope;
pub mod ty;
pub mod unify;

pub use builtins::prelude;
pub use error::{render, TypeError};
pub use imports::{ClassifiedModules, FsPackageHost, ManifestInfo, PackageHost, PackageRegistry};
pub use infer::{infer_module, infer_script};
pub use scope::{Namespace, NamespaceRef, Scope};
pub use ty::{Binding, Type, TypeAlias, TypeKind, TypeVar};
pub use unify::{Checker, WellKnownSymbols};

/// The result and variables types the external GraphQL validator derives
/// from one query against the ambient schema.
pub struct GqlDocumentTypes {
    pub result: Type,
    pub variables: Type,
}

/// External collaborator that validates `gql` tagged templates. Failures
/// surface as diagnostics on the checker, never as panics.
pub trait GraphqlValidator {
    fn validate(&self, schema: &str, query: &str) -> Result<GqlDocumentTypes, String>;
}

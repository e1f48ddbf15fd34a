//! Pattern nodes, used by `val`/`var` declarations, function parameters,
//! and match arms.

use coral_common::Span;

use crate::expr::{Expr, Lit};
use crate::ty_ann::TypeAnn;
use crate::{NodeId, QualName};

#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: NodeId,
    pub span: Span,
    pub kind: PatKind,
}

#[derive(Debug, Clone)]
pub enum PatKind {
    /// `x`, `x: T`, `x = default`, `mut x`.
    Ident {
        name: String,
        ann: Option<TypeAnn>,
        default: Option<Box<Expr>>,
        mutable: bool,
    },
    Lit(Lit),
    Tuple(Vec<Pattern>),
    Object(Vec<ObjPatProp>),
    /// `Class(p1, p2)` -- destructures through `Symbol.customMatcher`.
    Extractor {
        name: QualName,
        args: Vec<Pattern>,
    },
    /// `Class { inner }` -- requires the scrutinee to be an instance of the
    /// named class (nominal check), then matches the inner pattern.
    Instance {
        class: QualName,
        inner: Box<Pattern>,
    },
    Rest(Box<Pattern>),
    Wildcard,
}

#[derive(Debug, Clone)]
pub enum ObjPatProp {
    KeyValue {
        key: String,
        pat: Pattern,
    },
    /// `{a}`, `{a = 42}`, `{a: T}` shorthand. Carries its own id and span
    /// because it both introduces a binding and matches a property.
    Shorthand {
        id: NodeId,
        span: Span,
        name: String,
        ann: Option<TypeAnn>,
        default: Option<Box<Expr>>,
    },
    Rest(Pattern),
}

impl Pattern {
    /// Collect the names this pattern binds, in binder order.
    pub fn binder_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders(&self, out: &mut Vec<String>) {
        match &self.kind {
            PatKind::Ident { name, .. } => out.push(name.clone()),
            PatKind::Lit(_) | PatKind::Wildcard => {}
            PatKind::Tuple(elems) => {
                for p in elems {
                    p.collect_binders(out);
                }
            }
            PatKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjPatProp::KeyValue { pat, .. } => pat.collect_binders(out),
                        ObjPatProp::Shorthand { name, .. } => out.push(name.clone()),
                        ObjPatProp::Rest(pat) => pat.collect_binders(out),
                    }
                }
            }
            PatKind::Extractor { args, .. } => {
                for p in args {
                    p.collect_binders(out);
                }
            }
            PatKind::Instance { inner, .. } => inner.collect_binders(out),
            PatKind::Rest(inner) => inner.collect_binders(out),
        }
    }
}

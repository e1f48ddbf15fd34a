//! Type errors with source provenance.
//!
//! Every error carries a [`Span`]; `Display` renders the message and
//! [`render`] produces a labeled report for terminal output. Unification
//! and inference accumulate errors into lists rather than aborting, so one
//! run reports everything it can find, in a deterministic order.

use std::fmt;

use ariadne::{Config, Label, Report, ReportKind, Source};

use coral_common::Span;

use crate::ty::Type;

/// A type error encountered during semantic analysis.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    // ── Lookup ───────────────────────────────────────────────────────────
    UnknownIdentifier {
        name: String,
        span: Span,
    },
    UnknownType {
        name: String,
        span: Span,
    },
    UnknownProperty {
        ty: Type,
        name: String,
        span: Span,
    },
    UnknownComponent {
        name: String,
        span: Span,
    },
    UnknownOperator {
        op: String,
        span: Span,
    },
    /// An object key required by the target is missing from the source.
    KeyNotFound {
        key: String,
        ty: Type,
        span: Span,
    },

    // ── Arity and shape ──────────────────────────────────────────────────
    InvalidNumberOfArguments {
        required: usize,
        maximum: usize,
        found: usize,
        span: Span,
    },
    /// No overload of an intersection callee accepted the arguments.
    /// Carries each overload's failure list so the rendered diagnostic can
    /// show why every candidate was rejected.
    NoMatchingOverload {
        attempts: Vec<Vec<TypeError>>,
        span: Span,
    },
    NotEnoughElementsToUnpack {
        expected: usize,
        found: usize,
        span: Span,
    },
    ExpectedObject {
        found: Type,
        span: Span,
    },
    ExpectedArray {
        found: Type,
        span: Span,
    },
    OutOfBounds {
        index: usize,
        length: usize,
        span: Span,
    },
    InvalidObjectKey {
        key: Type,
        span: Span,
    },

    // ── Assignability ────────────────────────────────────────────────────
    CannotUnifyTypes {
        source: Type,
        target: Type,
        span: Span,
    },
    /// The occurs check failed: binding the variable would create an
    /// infinite type.
    RecursiveUnification {
        ty: Type,
        span: Span,
    },
    MissingRequiredProp {
        name: String,
        span: Span,
    },
    InvalidKeyProp {
        span: Span,
    },
    UnexpectedChildren {
        span: Span,
    },

    // ── Mutation ─────────────────────────────────────────────────────────
    CannotMutateImmutable {
        span: Span,
    },
    CannotMutateReadonlyProperty {
        name: String,
        span: Span,
    },

    // ── Matchers and extractors ──────────────────────────────────────────
    IncorrectParamCountForCustomMatcher {
        expected: usize,
        found: usize,
        span: Span,
    },
    ExtractorReturnTypeMismatch {
        span: Span,
    },
    ExtractorMustReturnTuple {
        found: Type,
        span: Span,
    },
    MissingCustomMatcher {
        ty: Type,
        span: Span,
    },
    InvalidExtractorType {
        ty: Type,
        span: Span,
    },

    // ── Meta ─────────────────────────────────────────────────────────────
    /// Merged interface declarations disagree about a member's type.
    InterfaceMerge {
        name: String,
        span: Span,
    },
    TypeParamMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },
    CyclicDependency {
        names: Vec<String>,
        span: Span,
    },
    UnresolvedExportAssignment {
        span: Span,
    },
    Unimplemented {
        feature: String,
        span: Span,
    },
    Generic {
        message: String,
        span: Span,
    },
    CalleeIsNotCallable {
        ty: Type,
        span: Span,
    },
}

impl TypeError {
    /// The primary source location of this error.
    pub fn span(&self) -> Span {
        match self {
            TypeError::UnknownIdentifier { span, .. }
            | TypeError::UnknownType { span, .. }
            | TypeError::UnknownProperty { span, .. }
            | TypeError::UnknownComponent { span, .. }
            | TypeError::UnknownOperator { span, .. }
            | TypeError::KeyNotFound { span, .. }
            | TypeError::InvalidNumberOfArguments { span, .. }
            | TypeError::NoMatchingOverload { span, .. }
            | TypeError::NotEnoughElementsToUnpack { span, .. }
            | TypeError::ExpectedObject { span, .. }
            | TypeError::ExpectedArray { span, .. }
            | TypeError::OutOfBounds { span, .. }
            | TypeError::InvalidObjectKey { span, .. }
            | TypeError::CannotUnifyTypes { span, .. }
            | TypeError::RecursiveUnification { span, .. }
            | TypeError::MissingRequiredProp { span, .. }
            | TypeError::InvalidKeyProp { span }
            | TypeError::UnexpectedChildren { span }
            | TypeError::CannotMutateImmutable { span }
            | TypeError::CannotMutateReadonlyProperty { span, .. }
            | TypeError::IncorrectParamCountForCustomMatcher { span, .. }
            | TypeError::ExtractorReturnTypeMismatch { span }
            | TypeError::ExtractorMustReturnTuple { span, .. }
            | TypeError::MissingCustomMatcher { span, .. }
            | TypeError::InvalidExtractorType { span, .. }
            | TypeError::InterfaceMerge { span, .. }
            | TypeError::TypeParamMismatch { span, .. }
            | TypeError::CyclicDependency { span, .. }
            | TypeError::UnresolvedExportAssignment { span }
            | TypeError::Unimplemented { span, .. }
            | TypeError::Generic { span, .. }
            | TypeError::CalleeIsNotCallable { span, .. } => *span,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnknownIdentifier { name, .. } => {
                write!(f, "unknown identifier `{name}`")
            }
            TypeError::UnknownType { name, .. } => write!(f, "unknown type `{name}`"),
            TypeError::UnknownProperty { ty, name, .. } => {
                write!(f, "type `{ty}` has no property `{name}`")
            }
            TypeError::UnknownComponent { name, .. } => {
                write!(f, "unknown component `{name}`")
            }
            TypeError::UnknownOperator { op, .. } => write!(f, "unknown operator `{op}`"),
            TypeError::KeyNotFound { key, ty, .. } => {
                write!(f, "key `{key}` not found in `{ty}`")
            }
            TypeError::InvalidNumberOfArguments { required, maximum, found, .. } => {
                if required == maximum {
                    write!(f, "expected {required} arguments, found {found}")
                } else {
                    write!(f, "expected {required} to {maximum} arguments, found {found}")
                }
            }
            TypeError::NoMatchingOverload { attempts, .. } => {
                write!(f, "no overload matches this call ({} tried)", attempts.len())
            }
            TypeError::NotEnoughElementsToUnpack { expected, found, .. } => {
                write!(f, "not enough elements to unpack: expected {expected}, found {found}")
            }
            TypeError::ExpectedObject { found, .. } => {
                write!(f, "expected an object, found `{found}`")
            }
            TypeError::ExpectedArray { found, .. } => {
                write!(f, "expected an array, found `{found}`")
            }
            TypeError::OutOfBounds { index, length, .. } => {
                write!(f, "index {index} is out of bounds for length {length}")
            }
            TypeError::InvalidObjectKey { key, .. } => {
                write!(f, "`{key}` cannot be used as an object key")
            }
            TypeError::CannotUnifyTypes { source, target, .. } => {
                write!(f, "`{source}` is not assignable to `{target}`")
            }
            TypeError::RecursiveUnification { ty, .. } => {
                write!(f, "recursive unification: type variable occurs in `{ty}`")
            }
            TypeError::MissingRequiredProp { name, .. } => {
                write!(f, "missing required prop `{name}`")
            }
            TypeError::InvalidKeyProp { .. } => {
                write!(f, "`key` prop must be a string or number")
            }
            TypeError::UnexpectedChildren { .. } => {
                write!(f, "component does not accept children")
            }
            TypeError::CannotMutateImmutable { .. } => {
                write!(f, "cannot mutate immutable value")
            }
            TypeError::CannotMutateReadonlyProperty { name, .. } => {
                write!(f, "cannot mutate readonly property `{name}`")
            }
            TypeError::IncorrectParamCountForCustomMatcher { expected, found, .. } => {
                write!(
                    f,
                    "custom matcher must take {expected} parameter, takes {found}"
                )
            }
            TypeError::ExtractorReturnTypeMismatch { .. } => {
                write!(f, "extractor return type does not match the pattern arguments")
            }
            TypeError::ExtractorMustReturnTuple { found, .. } => {
                write!(f, "custom matcher must return a tuple, returns `{found}`")
            }
            TypeError::MissingCustomMatcher { ty, .. } => {
                write!(f, "`{ty}` has no `Symbol.customMatcher` method")
            }
            TypeError::InvalidExtractorType { ty, .. } => {
                write!(f, "`{ty}` cannot be used as an extractor")
            }
            TypeError::InterfaceMerge { name, .. } => {
                write!(f, "merged interface declarations disagree about `{name}`")
            }
            TypeError::TypeParamMismatch { expected, found, .. } => {
                write!(f, "expected {expected} type parameters, found {found}")
            }
            TypeError::CyclicDependency { names, .. } => {
                write!(f, "cyclic dependency: {}", names.join(" -> "))
            }
            TypeError::UnresolvedExportAssignment { .. } => {
                write!(f, "export assignment could not be resolved")
            }
            TypeError::Unimplemented { feature, .. } => {
                write!(f, "not implemented: {feature}")
            }
            TypeError::Generic { message, .. } => write!(f, "{message}"),
            TypeError::CalleeIsNotCallable { ty, .. } => {
                write!(f, "`{ty}` is not callable")
            }
        }
    }
}

/// Render one error as a labeled terminal report.
///
/// `file_name` and `source` must correspond to the file the error's span
/// points into. Colors are disabled so output is stable across terminals.
pub fn render(error: &TypeError, file_name: &str, source: &str) -> String {
    let span = error.span();
    let range = span.start as usize..span.end as usize;
    let mut buf = Vec::new();
    let report = Report::build(ReportKind::Error, (file_name, range.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(error.to_string())
        .with_label(Label::new((file_name, range)).with_message(error.to_string()))
        .finish();
    // A write failure here means a broken sink, not a user error.
    let _ = report.write((file_name, Source::from(source)), &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_common::SourceId;

    fn span() -> Span {
        Span::new(SourceId(0), 4, 9)
    }

    #[test]
    fn display_messages() {
        let err = TypeError::CannotUnifyTypes {
            source: Type::lit_str("hello"),
            target: Type::number(),
            span: span(),
        };
        insta::assert_snapshot!(err.to_string(), @r#"`"hello"` is not assignable to `number`"#);

        let err = TypeError::NotEnoughElementsToUnpack { expected: 3, found: 2, span: span() };
        insta::assert_snapshot!(
            err.to_string(),
            @"not enough elements to unpack: expected 3, found 2"
        );

        let err = TypeError::UnknownIdentifier { name: "foo".into(), span: span() };
        insta::assert_snapshot!(err.to_string(), @"unknown identifier `foo`");
    }

    #[test]
    fn render_includes_location() {
        let err = TypeError::UnknownIdentifier { name: "foo".into(), span: span() };
        let out = render(&err, "main.co", "val x = foo");
        assert!(out.contains("unknown identifier `foo`"), "got: {out}");
        assert!(out.contains("main.co"), "got: {out}");
    }
}

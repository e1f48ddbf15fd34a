//! Shared plumbing for the Coral compiler front-end: source identifiers,
//! byte-offset spans, and on-demand line/column lookup.

pub mod span;

pub use span::{LineIndex, SourceId, Span};

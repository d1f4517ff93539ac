//! Identifiers and source-text utilities shared by live code documents.
//!
//! Everything in this crate is a pure function or a plain value type. The
//! stateful document model lives in `livecode-document`.

/// Document and addressing identifiers.
pub mod ids;
/// Language tag normalization.
pub mod language;
/// Body sanitizing before interpreter hand-off.
pub mod sanitize;
/// Preamble/body/postamble splitting.
pub mod source;

pub use ids::{CodeId, DocumentId, Origin};
pub use language::normalize_language;
pub use sanitize::sanitize;
pub use source::{POST_MARKER, PRE_MARKER, SourceParts, SplitError, split_source};

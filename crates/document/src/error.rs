use livecode_primitives::{CodeId, DocumentId, SplitError};
use thiserror::Error;

/// Failure to build a document from its initial state.
///
/// Fatal to that document only; nothing is registered.
#[derive(Debug, Error)]
pub enum ConstructionError {
	#[error("document {id}: malformed source: {source}")]
	MalformedSource {
		id: DocumentId,
		#[source]
		source: SplitError,
	},
}

/// Failure to start an execution session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
	/// The interpreter runtime is not loaded. Retry once it is.
	#[error("{code_id}: interpreter runtime is not available")]
	InterpreterUnavailable { code_id: CodeId },
}

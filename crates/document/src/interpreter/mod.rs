//! Contract between documents and the external interpreter.
//!
//! A document never calls the interpreter directly. `exec_script` queues an
//! [`Invocation`] and the registry pump hands it to [`Interpreter::run`] on a
//! later turn, together with a [`LogSink`] bound to the session.

pub(crate) mod thread;

use std::sync::Weak;

use livecode_primitives::{CodeId, SourceParts, sanitize};
use livecode_worker::SessionToken;

use crate::document::{Document, DocumentInner};
use crate::log::LogKind;

pub use thread::{InterpreterThread, ScriptEngine};

/// Runner module imported by every payload.
pub const RUNNER_MODULE: &str = "brython_runner";

/// An embedded interpreter runtime.
pub trait Interpreter: Send + Sync {
	/// Whether the runtime is loaded and can accept invocations.
	fn is_available(&self) -> bool;

	/// Starts one session. Must not block on script execution.
	///
	/// Output is reported through `sink`, ending with exactly one
	/// [`LogKind::Done`] entry.
	fn run(&self, invocation: Invocation, sink: LogSink);
}

/// Everything the interpreter needs for one session.
#[derive(Debug, Clone)]
pub struct Invocation {
	pub code_id: CodeId,
	/// Executed script: preamble, current code and postamble.
	pub source: String,
	/// Runner call embedding the sanitized script.
	pub payload: String,
	pub lib_dirs: Vec<String>,
	/// Lines the preamble adds in front of the user's code.
	pub line_offset: usize,
	pub session: SessionToken,
}

impl Invocation {
	pub(crate) fn build(code_id: &CodeId, parts: &SourceParts, code: &str, lib_dirs: &[String], session: SessionToken) -> Self {
		let source = parts.script_with(code);
		let line_offset = parts.line_offset();
		let payload = format!(
			"from {RUNNER_MODULE} import run\nrun(\"\"\"{}\"\"\", '{code_id}', {line_offset})\n",
			sanitize(&source)
		);
		Self {
			code_id: code_id.clone(),
			source,
			payload,
			lib_dirs: lib_dirs.to_vec(),
			line_offset,
			session,
		}
	}

	/// Maps a 1-based line of the executed script to the user's 1-based line.
	///
	/// Returns `None` for lines inside the preamble.
	pub fn user_line(&self, script_line: usize) -> Option<usize> {
		script_line.checked_sub(self.line_offset).filter(|line| *line > 0)
	}
}

/// What happened to one event sent through a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
	/// Appended to the document's logs.
	Applied,
	/// The session was stopped, superseded or already done.
	Stale,
	/// The document no longer exists.
	Closed,
}

/// Session-bound output channel handed to the interpreter.
#[derive(Clone)]
pub struct LogSink {
	document: Weak<DocumentInner>,
	session: SessionToken,
}

impl LogSink {
	pub(crate) fn new(document: Weak<DocumentInner>, session: SessionToken) -> Self {
		Self { document, session }
	}

	/// Delivers one event, in order, to the owning document.
	pub fn send(&self, kind: LogKind, output: impl Into<String>) -> Delivery {
		match self.document.upgrade() {
			Some(inner) => Document::from_inner(inner).deliver(&self.session, kind, output.into()),
			None => Delivery::Closed,
		}
	}

	pub fn session(&self) -> &SessionToken {
		&self.session
	}

	/// True while the bound session is still the document's current one.
	pub fn is_current(&self) -> bool {
		self.document
			.upgrade()
			.is_some_and(|inner| Document::from_inner(inner).session().is_some_and(|current| current.same_session(&self.session)))
	}
}

impl std::fmt::Debug for LogSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LogSink")
			.field("session", &self.session.generation())
			.field("attached", &(self.document.strong_count() > 0))
			.finish()
	}
}

//! Execution sessions: `Idle -> Executing -> (Success | Error)`.
//!
//! Each `exec_script` mints a [`SessionToken`] from the registry clock. Log
//! events routed through a [`LogSink`](crate::LogSink) are applied only while
//! their session is the document's current one; anything else is stale and
//! counted, never applied.

use std::sync::Arc;

use chrono::Utc;
use livecode_worker::{SessionToken, WorkScope};

use super::{Document, DocumentMut};
use crate::error::ExecError;
use crate::interpreter::{Delivery, Invocation, LogSink};
use crate::log::{GraphicsOutput, LogKind, LogMessage};
use crate::model::Status;
use crate::notifications::Notification;
use crate::registry::PendingRun;

/// Shown to the user when execution is requested without a runtime.
pub const INTERPRETER_UNAVAILABLE_MESSAGE: &str = "The Python runtime is still loading. Try again in a moment.";

impl DocumentMut<'_> {
	/// Starts a new session and queues its invocation for the next pump.
	///
	/// A session still in flight is superseded: its token is cancelled and its
	/// queued invocation withdrawn.
	pub fn exec_script(&mut self) -> Result<SessionToken, ExecError> {
		let shared = &self.inner.shared;
		if !shared.interpreter.is_available() {
			tracing::warn!(doc = %self.inner.id, code_id = %self.inner.code_id, "doc.exec.unavailable");
			shared
				.notifications
				.lock()
				.push(Notification::warning(self.inner.code_id.clone(), INTERPRETER_UNAVAILABLE_MESSAGE));
			return Err(ExecError::InterpreterUnavailable {
				code_id: self.inner.code_id.clone(),
			});
		}

		if let Some(previous) = self.state.session.take() {
			self.withdraw(&previous);
			tracing::debug!(doc = %self.inner.id, session = previous.generation(), "doc.exec.supersede");
		}

		if !self.state.graphics.is_empty() {
			self.state.graphics_panel_open = true;
		}
		self.clear_log_messages();
		self.state.session_had_stderr = false;

		let session = shared.clock.mint();
		self.state.session = Some(session.clone());
		self.state.session_started_at = Some(Utc::now());

		let invocation = Invocation::build(
			&self.inner.code_id,
			&self.inner.parts,
			&self.state.code,
			&shared.config.lib_dirs,
			session.clone(),
		);
		let sink = LogSink::new(Arc::downgrade(self.inner), session.clone());
		let seq = shared
			.queue
			.lock()
			.enqueue(PendingRun { invocation, sink }, WorkScope::Session(session.generation()));

		tracing::debug!(
			doc = %self.inner.id,
			code_id = %self.inner.code_id,
			session = session.generation(),
			seq,
			"doc.exec"
		);
		Ok(session)
	}

	/// Releases ownership of the current session.
	///
	/// The interpreter cannot be interrupted; late events from the stopped
	/// session are discarded on arrival. Returns false when nothing was running.
	pub fn stop_script(&mut self) -> bool {
		self.state.session_started_at = None;
		let Some(session) = self.state.session.take() else {
			return false;
		};
		self.withdraw(&session);
		tracing::debug!(doc = %self.inner.id, session = session.generation(), "doc.stop");
		true
	}

	fn withdraw(&self, session: &SessionToken) {
		session.cancel();
		let dropped = self.inner.shared.queue.lock().remove_scope(WorkScope::Session(session.generation()));
		if dropped > 0 {
			tracing::trace!(doc = %self.inner.id, session = session.generation(), dropped, "doc.session.withdrawn");
		}
	}

	/// Appends one log entry stamped with the current time.
	///
	/// `done` ends the session with `Error` if the session wrote to `stderr`,
	/// else `Success`.
	pub fn add_log_message(&mut self, kind: LogKind, output: impl Into<String>) {
		let output = output.into();
		self.state.graphics |= GraphicsOutput::detect(kind, &output);
		if kind == LogKind::Stderr {
			self.state.session_had_stderr = true;
		}
		self.state.logs.push(LogMessage {
			kind,
			output,
			timestamp: Utc::now(),
		});

		if kind == LogKind::Done {
			let status = if self.state.session_had_stderr { Status::Error } else { Status::Success };
			let session = self.state.session.take();
			self.state.session_started_at = None;
			self.state.status = status;
			tracing::debug!(
				doc = %self.inner.id,
				session = ?session.as_ref().map(SessionToken::generation),
				?status,
				logs = self.state.logs.len(),
				"doc.done"
			);
		}
	}

	pub fn clear_log_messages(&mut self) {
		self.state.logs.clear();
		self.state.logs_epoch = self.state.logs_epoch.wrapping_add(1);
	}
}

impl Document {
	/// See [`DocumentMut::exec_script`].
	pub fn exec_script(&self) -> Result<SessionToken, ExecError> {
		self.batch(|doc| doc.exec_script())
	}

	/// See [`DocumentMut::stop_script`].
	pub fn stop_script(&self) -> bool {
		self.batch(|doc| doc.stop_script())
	}

	/// See [`DocumentMut::add_log_message`].
	pub fn add_log_message(&self, kind: LogKind, output: impl Into<String>) {
		let output = output.into();
		self.batch(|doc| doc.add_log_message(kind, output));
	}

	pub fn clear_log_messages(&self) {
		self.batch(|doc| doc.clear_log_messages());
	}

	/// Applies one sink event if `session` is still current.
	pub(crate) fn deliver(&self, session: &SessionToken, kind: LogKind, output: String) -> Delivery {
		self.batch(|doc| {
			let current = doc.state.session.as_ref().is_some_and(|owned| owned.same_session(session));
			if !current {
				doc.state.stale_events += 1;
				tracing::debug!(
					doc = %doc.inner.id,
					session = session.generation(),
					kind = kind.as_str(),
					"doc.log.stale"
				);
				return Delivery::Stale;
			}
			doc.add_log_message(kind, output);
			Delivery::Applied
		})
	}
}

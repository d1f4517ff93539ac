//! Dedicated interpreter thread.
//!
//! [`InterpreterThread`] owns a [`ScriptEngine`] on a named OS thread and runs
//! invocations one at a time, in submission order. Output is forwarded through
//! the invocation's [`LogSink`]; the thread itself brackets every session with
//! `start` and `done` entries.
//!
//! A cancelled session that is still waiting in the channel is skipped without
//! output. An engine panic is reported as a `stderr` entry followed by `done`,
//! after which the thread exits and the interpreter reports itself unavailable.
//!
//! Shutdown is deterministic: dropping the owning handle sends a shutdown job
//! and waits briefly for the ack. Clients made with [`InterpreterThread::client`]
//! never shut the thread down.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use livecode_worker::spawn_named_thread;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::{Interpreter, Invocation, LogSink};
use crate::log::LogKind;

const SHUTDOWN_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Message reported when the engine panics mid-session.
pub const ENGINE_PANIC_MESSAGE: &str = "interpreter crashed while running this script";
/// Message reported when the thread is gone before a session could start.
pub const THREAD_GONE_MESSAGE: &str = "interpreter thread is not running";

/// Synchronous script runtime hosted by an [`InterpreterThread`].
pub trait ScriptEngine: Send + 'static {
	/// Runs one invocation to completion.
	///
	/// `out` accepts `stdout` and `stderr` entries; other kinds are ignored.
	/// An `Err` is reported as a final `stderr` entry.
	fn execute(&mut self, invocation: &Invocation, out: &mut dyn FnMut(LogKind, String)) -> Result<(), String>;
}

enum Job {
	Run {
		invocation: Invocation,
		sink: LogSink,
		span: tracing::Span,
	},
	Shutdown {
		ack: oneshot::Sender<()>,
	},
}

/// Handle to a dedicated interpreter thread.
pub struct InterpreterThread {
	tx: mpsc::Sender<Job>,
	alive: Arc<AtomicBool>,
	/// Only the owner sends `Shutdown` on drop.
	is_owner: bool,
	#[cfg(test)]
	shutdown_acks: Arc<AtomicUsize>,
}

impl InterpreterThread {
	/// Spawns the thread, moving `engine` onto it.
	pub fn new<E: ScriptEngine>(engine: E) -> std::io::Result<Self> {
		let (tx, rx) = mpsc::channel::<Job>();
		let alive = Arc::new(AtomicBool::new(true));
		let worker_alive = Arc::clone(&alive);
		spawn_named_thread("livecode-interpreter", move || serve(engine, rx, worker_alive))?;
		tracing::debug!("interp.thread.spawn");

		Ok(Self {
			tx,
			alive,
			is_owner: true,
			#[cfg(test)]
			shutdown_acks: Arc::new(AtomicUsize::new(0)),
		})
	}

	/// Non-owning handle sharing the same thread.
	pub fn client(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			alive: Arc::clone(&self.alive),
			is_owner: false,
			#[cfg(test)]
			shutdown_acks: Arc::clone(&self.shutdown_acks),
		}
	}

	#[cfg(test)]
	fn shutdown_acks_for_tests(&self) -> Arc<AtomicUsize> {
		Arc::clone(&self.shutdown_acks)
	}
}

impl Interpreter for InterpreterThread {
	fn is_available(&self) -> bool {
		self.alive.load(Ordering::Acquire)
	}

	fn run(&self, invocation: Invocation, sink: LogSink) {
		let job = Job::Run {
			invocation,
			sink,
			span: tracing::Span::current(),
		};
		if let Err(mpsc::SendError(job)) = self.tx.send(job) {
			self.alive.store(false, Ordering::Release);
			if let Job::Run { invocation, sink, .. } = job {
				tracing::warn!(code_id = %invocation.code_id, "interp.thread.gone");
				sink.send(LogKind::Stderr, THREAD_GONE_MESSAGE);
				sink.send(LogKind::Done, "");
			}
		}
	}
}

fn serve<E: ScriptEngine>(mut engine: E, rx: mpsc::Receiver<Job>, alive: Arc<AtomicBool>) {
	while let Ok(job) = rx.recv() {
		match job {
			Job::Run { invocation, sink, span } => {
				let _guard = span.enter();
				let session = invocation.session.generation();
				if invocation.session.is_cancelled() {
					tracing::debug!(code_id = %invocation.code_id, session, "interp.thread.skip");
					continue;
				}

				tracing::debug!(code_id = %invocation.code_id, session, "interp.thread.run");
				sink.send(LogKind::Start, "");
				let mut forward = |kind: LogKind, output: String| match kind {
					LogKind::Stdout | LogKind::Stderr => {
						sink.send(kind, output);
					}
					LogKind::Start | LogKind::Done => {
						tracing::trace!(kind = kind.as_str(), "interp.thread.ignored");
					}
				};
				let result = std::panic::catch_unwind(AssertUnwindSafe(|| engine.execute(&invocation, &mut forward)));
				match result {
					Ok(Ok(())) => {}
					Ok(Err(message)) => {
						sink.send(LogKind::Stderr, message);
					}
					Err(_) => {
						alive.store(false, Ordering::Release);
						tracing::error!(code_id = %invocation.code_id, session, "interp.thread.panic");
						sink.send(LogKind::Stderr, ENGINE_PANIC_MESSAGE);
						sink.send(LogKind::Done, "");
						break;
					}
				}
				sink.send(LogKind::Done, "");
			}
			Job::Shutdown { ack } => {
				let _ = ack.send(());
				break;
			}
		}
	}
	alive.store(false, Ordering::Release);
	tracing::debug!("interp.thread.exit");
}

impl Drop for InterpreterThread {
	fn drop(&mut self) {
		if !self.is_owner {
			return;
		}

		let (ack_tx, mut ack_rx) = oneshot::channel();
		if self.tx.send(Job::Shutdown { ack: ack_tx }).is_err() {
			return;
		}

		let deadline = Instant::now() + SHUTDOWN_ACK_TIMEOUT;
		loop {
			match ack_rx.try_recv() {
				Ok(()) => {
					#[cfg(test)]
					self.shutdown_acks.fetch_add(1, Ordering::SeqCst);
					return;
				}
				Err(TryRecvError::Empty) => {
					if Instant::now() >= deadline {
						tracing::warn!("interp.thread.shutdown_timeout");
						return;
					}
					std::thread::yield_now();
				}
				Err(TryRecvError::Closed) => return,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use livecode_config::BootstrapConfig;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::{Document, DocumentRegistry, InitState, Status};

	/// Prints every line of the executed script; lines starting with `!` go to stderr.
	struct EchoEngine;

	impl ScriptEngine for EchoEngine {
		fn execute(&mut self, invocation: &Invocation, out: &mut dyn FnMut(LogKind, String)) -> Result<(), String> {
			for line in invocation.source.lines() {
				match line.strip_prefix('!') {
					Some(err) => out(LogKind::Stderr, err.to_string()),
					None => out(LogKind::Stdout, line.to_string()),
				}
			}
			Ok(())
		}
	}

	struct FailingEngine;

	impl ScriptEngine for FailingEngine {
		fn execute(&mut self, _: &Invocation, out: &mut dyn FnMut(LogKind, String)) -> Result<(), String> {
			out(LogKind::Done, "premature".into());
			Err("SyntaxError: invalid syntax (line 1)".into())
		}
	}

	struct PanickingEngine;

	impl ScriptEngine for PanickingEngine {
		fn execute(&mut self, _: &Invocation, _: &mut dyn FnMut(LogKind, String)) -> Result<(), String> {
			panic!("engine bug");
		}
	}

	fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
		let deadline = Instant::now() + Duration::from_secs(5);
		while !done() {
			assert!(Instant::now() < deadline, "timed out waiting for {what}");
			std::thread::sleep(Duration::from_millis(2));
		}
	}

	fn run_once(engine: impl ScriptEngine, raw: &str) -> (DocumentRegistry, Document) {
		let thread = InterpreterThread::new(engine).unwrap();
		let registry = DocumentRegistry::new(BootstrapConfig::default(), Arc::new(thread));
		let doc = registry.get_or_create(InitState::new("python", raw)).unwrap();
		doc.exec_script().unwrap();
		registry.pump();
		wait_until("done", || !doc.is_executing());
		(registry, doc)
	}

	fn kinds(doc: &Document) -> Vec<(LogKind, String)> {
		doc.logs().into_iter().map(|log| (log.kind, log.output)).collect()
	}

	#[test]
	fn brackets_engine_output_with_start_and_done() {
		let (_registry, doc) = run_once(EchoEngine, "a\nb\n");
		assert_eq!(
			kinds(&doc),
			vec![
				(LogKind::Start, String::new()),
				(LogKind::Stdout, "a".into()),
				(LogKind::Stdout, "b".into()),
				(LogKind::Done, String::new()),
			]
		);
		assert_eq!(doc.status(), Status::Success);
	}

	#[test]
	fn engine_error_becomes_stderr_and_error_status() {
		let (_registry, doc) = run_once(FailingEngine, "x\n");
		assert_eq!(
			kinds(&doc),
			vec![
				(LogKind::Start, String::new()),
				(LogKind::Stderr, "SyntaxError: invalid syntax (line 1)".into()),
				(LogKind::Done, String::new()),
			]
		);
		assert_eq!(doc.status(), Status::Error);
	}

	#[test]
	fn panic_reports_stderr_and_marks_unavailable() {
		let (registry, doc) = run_once(PanickingEngine, "x\n");
		let logs = kinds(&doc);
		assert_eq!(logs[1], (LogKind::Stderr, ENGINE_PANIC_MESSAGE.to_string()));
		assert_eq!(logs.last().map(|(kind, _)| *kind), Some(LogKind::Done));
		assert_eq!(doc.status(), Status::Error);

		assert!(!registry.interpreter_available());
		assert!(doc.exec_script().is_err());
		assert_eq!(registry.take_notifications().len(), 1);
	}

	#[test]
	fn cancelled_session_is_skipped() {
		let thread = InterpreterThread::new(EchoEngine).unwrap();
		let registry = DocumentRegistry::new(BootstrapConfig::default(), Arc::new(thread));
		let doc = registry.get_or_create(InitState::new("python", "a\n")).unwrap();
		let session = doc.exec_script().unwrap();
		let sink = LogSink::new(doc.downgrade(), session.clone());
		let invocation = Invocation::build(doc.code_id(), &livecode_primitives::split_source("a\n").unwrap(), "a\n", &[], session);
		doc.stop_script();

		let engine = InterpreterThread::new(EchoEngine).unwrap();
		engine.run(invocation, sink);
		drop(engine);
		assert!(doc.logs().is_empty());
		assert_eq!(doc.stale_event_count(), 0, "a skipped session sends nothing");
	}

	#[test]
	fn shutdown_on_owner_drop_only() {
		let thread = InterpreterThread::new(EchoEngine).unwrap();
		let acks = thread.shutdown_acks_for_tests();

		drop(thread.client());
		assert_eq!(acks.load(Ordering::SeqCst), 0, "client drop should not send shutdown");

		drop(thread);
		assert_eq!(acks.load(Ordering::SeqCst), 1, "owner drop should receive shutdown ack");
	}
}

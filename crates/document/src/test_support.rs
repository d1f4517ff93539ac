//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use livecode_config::BootstrapConfig;
use parking_lot::Mutex;

use crate::interpreter::{Interpreter, Invocation, LogSink};
use crate::registry::DocumentRegistry;

/// Records every dispatched invocation instead of running it.
pub(crate) struct RecordingInterpreter {
	available: AtomicBool,
	runs: Mutex<Vec<(Invocation, LogSink)>>,
}

impl RecordingInterpreter {
	pub(crate) fn available() -> Arc<Self> {
		Arc::new(Self {
			available: AtomicBool::new(true),
			runs: Mutex::new(Vec::new()),
		})
	}

	pub(crate) fn unavailable() -> Arc<Self> {
		let interpreter = Self::available();
		interpreter.set_available(false);
		interpreter
	}

	pub(crate) fn set_available(&self, available: bool) {
		self.available.store(available, Ordering::SeqCst);
	}

	pub(crate) fn run_count(&self) -> usize {
		self.runs.lock().len()
	}

	pub(crate) fn take_runs(&self) -> Vec<(Invocation, LogSink)> {
		std::mem::take(&mut *self.runs.lock())
	}
}

impl Interpreter for RecordingInterpreter {
	fn is_available(&self) -> bool {
		self.available.load(Ordering::SeqCst)
	}

	fn run(&self, invocation: Invocation, sink: LogSink) {
		self.runs.lock().push((invocation, sink));
	}
}

pub(crate) fn registry_with(interpreter: Arc<RecordingInterpreter>) -> (DocumentRegistry, Arc<RecordingInterpreter>) {
	let registry = DocumentRegistry::new(BootstrapConfig::default(), Arc::clone(&interpreter) as Arc<dyn Interpreter>);
	(registry, interpreter)
}

//! Adapter for pull-based consumers that re-render from snapshots.
//!
//! A consumer subscribes once and, on every notification, asks for a fresh
//! snapshot. For `logs` and `versions` the bridge hands back the *same* shared
//! slice for as long as the sequence is unchanged, so consumers can skip work by
//! comparing pointers.
//!
//! A sequence counts as unchanged while its length and clear epoch both are.
//! Notifications still follow length alone, so a length-neutral rewrite is not
//! notified, but the next snapshot after it shows the new contents.

use livecode_primitives::DocumentId;
use parking_lot::Mutex;

use crate::document::{Document, SequenceMark};
use crate::field::{Field, FieldValue};
use crate::subscription::Subscription;

pub struct FieldBridge {
	document: Document,
	field: Field,
	cache: Mutex<Option<(SequenceMark, FieldValue)>>,
}

impl FieldBridge {
	pub fn new(document: Document, field: Field) -> Self {
		Self {
			document,
			field,
			cache: Mutex::new(None),
		}
	}

	pub fn field(&self) -> Field {
		self.field
	}

	pub fn document_id(&self) -> &DocumentId {
		self.document.id()
	}

	/// Registers `on_change` for this bridge's field.
	pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
		self.document.subscribe(on_change, self.field)
	}

	/// Current value of the field.
	pub fn snapshot(&self) -> FieldValue {
		let Some(mark) = self.document.sequence_mark(self.field) else {
			return self.document.read(self.field);
		};

		let mut cache = self.cache.lock();
		if let Some((cached, value)) = cache.as_ref()
			&& *cached == mark
		{
			return value.clone();
		}
		let Some((mark, value)) = self.document.read_sequence(self.field) else {
			return self.document.read(self.field);
		};
		*cache = Some((mark, value.clone()));
		value
	}
}

impl std::fmt::Debug for FieldBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldBridge")
			.field("document", self.document.id())
			.field("field", &self.field)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::log::LogKind;
	use crate::model::InitState;
	use crate::test_support::{RecordingInterpreter, registry_with};

	fn document() -> Document {
		let (registry, _) = registry_with(RecordingInterpreter::available());
		registry.get_or_create(InitState::new("python", "print(1)\n").versioned(true)).unwrap()
	}

	fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
		let count = Arc::new(AtomicUsize::new(0));
		let hits = Arc::clone(&count);
		(count, move || {
			hits.fetch_add(1, Ordering::SeqCst);
		})
	}

	#[test]
	fn sequence_snapshot_is_stable_while_length_is() {
		let doc = document();
		doc.add_log_message(LogKind::Stdout, "a");
		let bridge = FieldBridge::new(doc.clone(), Field::Logs);

		let first = bridge.snapshot();
		let second = bridge.snapshot();
		assert!(first.ptr_eq(&second));

		doc.add_log_message(LogKind::Stdout, "b");
		let third = bridge.snapshot();
		assert!(!third.ptr_eq(&second));
		assert_eq!(third.len(), Some(2));
	}

	#[test]
	fn length_neutral_rewrite_is_not_notified_but_visible() {
		let doc = document();
		doc.add_log_message(LogKind::Stdout, "old");
		let bridge = FieldBridge::new(doc.clone(), Field::Logs);
		let before = bridge.snapshot();
		let (count, on_change) = counter();
		let _sub = bridge.subscribe(on_change);

		doc.batch(|doc| {
			doc.clear_log_messages();
			doc.add_log_message(LogKind::Stdout, "new");
		});

		assert_eq!(count.load(Ordering::SeqCst), 0);
		let after = bridge.snapshot();
		assert!(!after.ptr_eq(&before));
		assert_eq!(after.as_logs().map(|logs| logs[0].output.as_str()), Some("new"));
	}

	fn outputs(value: &FieldValue) -> Vec<String> {
		value.as_logs().unwrap_or_default().iter().map(|log| log.output.clone()).collect()
	}

	#[test]
	fn rerun_with_equal_log_count_refreshes_snapshot() {
		let (registry, interpreter) = registry_with(RecordingInterpreter::available());
		let doc = registry.get_or_create(InitState::new("python", "print(1)\n")).unwrap();
		let bridge = FieldBridge::new(doc.clone(), Field::Logs);

		for output in ["first run", "second run"] {
			doc.exec_script().unwrap();
			registry.pump();
			let (_, sink) = interpreter.take_runs().pop().unwrap();
			sink.send(LogKind::Start, "");
			sink.send(LogKind::Stdout, output);
			sink.send(LogKind::Done, "");

			let snapshot = bridge.snapshot();
			assert_eq!(outputs(&snapshot), vec![String::new(), output.to_string(), String::new()]);
			assert!(bridge.snapshot().ptr_eq(&snapshot));
		}
		assert_eq!(doc.log_epoch(), 2);
	}

	#[test]
	fn plain_reads_are_not_pointer_stable() {
		let doc = document();
		doc.add_log_message(LogKind::Stdout, "a");
		let first = doc.read(Field::Logs);
		let second = doc.read(Field::Logs);
		assert_eq!(first, second);
		assert!(!first.ptr_eq(&second));
	}

	#[test]
	fn version_appends_notify_and_refresh() {
		let doc = document();
		let bridge = FieldBridge::new(doc.clone(), Field::Versions);
		let (count, on_change) = counter();
		let _sub = bridge.subscribe(on_change);

		doc.set_code("print(2)\n");
		doc.save_now();

		assert_eq!(count.load(Ordering::SeqCst), 1);
		let versions = bridge.snapshot();
		assert_eq!(versions.as_versions().map(|v| v[0].code.as_str()), Some("print(2)\n"));
	}

	#[test]
	fn scalar_fields_read_through() {
		let doc = document();
		let bridge = FieldBridge::new(doc.clone(), Field::Code);
		doc.set_code("x = 2\n");
		assert_eq!(bridge.snapshot().as_text(), Some("x = 2\n"));
	}
}

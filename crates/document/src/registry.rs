//! Document registry: one live [`Document`] per identifier.
//!
//! Lookups are served from an immutable map published through [`ArcSwap`], so
//! readers never block and repeated lookups return the identical instance.
//! Writers serialize on a mutex, clone the current map, insert, and publish.
//!
//! The registry also owns what its documents share: the frozen bootstrap
//! configuration, the interpreter handle, the session clock, the deferred
//! invocation queue and the notification center.
//!
//! # Host turns
//!
//! `exec_script` never calls the interpreter. It queues the invocation, and the
//! host calls [`DocumentRegistry::pump`] once the current turn's state changes
//! have been rendered.

use std::sync::Arc;

use arc_swap::ArcSwap;
use livecode_config::BootstrapConfig;
use livecode_primitives::DocumentId;
use livecode_worker::{DeferredQueue, GenerationClock};
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::document::Document;
use crate::error::ConstructionError;
use crate::interpreter::{Interpreter, Invocation, LogSink};
use crate::model::InitState;
use crate::notifications::{Notification, NotificationCenter};

/// Invocation waiting for the next pump.
pub(crate) struct PendingRun {
	pub(crate) invocation: Invocation,
	pub(crate) sink: LogSink,
}

/// State shared by the registry and every document it built.
pub(crate) struct RegistryShared {
	pub(crate) config: BootstrapConfig,
	pub(crate) interpreter: Arc<dyn Interpreter>,
	pub(crate) clock: GenerationClock,
	pub(crate) queue: Mutex<DeferredQueue<PendingRun>>,
	pub(crate) notifications: Mutex<NotificationCenter>,
}

/// Outcome of one [`DocumentRegistry::pump`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpReport {
	/// Invocations handed to the interpreter.
	pub dispatched: usize,
	/// Invocations whose session was stopped or superseded first.
	pub skipped: usize,
	/// Work queued during this pump, left for the next one.
	pub pending: usize,
}

pub struct DocumentRegistry {
	shared: Arc<RegistryShared>,
	documents: ArcSwap<HashMap<DocumentId, Document>>,
	write: Mutex<()>,
}

impl DocumentRegistry {
	/// Creates an empty registry. `config` is frozen from here on.
	pub fn new(config: BootstrapConfig, interpreter: Arc<dyn Interpreter>) -> Self {
		tracing::debug!(
			lib_dirs = ?config.lib_dirs,
			sync_ms = config.sync_max_once_every.as_millis() as u64,
			routing = ?config.routing,
			"registry.new"
		);
		Self {
			shared: Arc::new(RegistryShared {
				config,
				interpreter,
				clock: GenerationClock::new(),
				queue: Mutex::new(DeferredQueue::new()),
				notifications: Mutex::new(NotificationCenter::default()),
			}),
			documents: ArcSwap::from_pointee(HashMap::default()),
			write: Mutex::new(()),
		}
	}

	pub(crate) fn shared(&self) -> Arc<RegistryShared> {
		Arc::clone(&self.shared)
	}

	/// Bootstrap configuration the registry was created with.
	pub fn config(&self) -> &BootstrapConfig {
		&self.shared.config
	}

	pub fn interpreter_available(&self) -> bool {
		self.shared.interpreter.is_available()
	}

	/// Looks up a registered document.
	pub fn find(&self, id: &DocumentId) -> Option<Document> {
		self.documents.load().get(id).cloned()
	}

	pub fn contains(&self, id: &DocumentId) -> bool {
		self.documents.load().contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.documents.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.load().is_empty()
	}

	/// Identifiers of every registered document, sorted.
	pub fn ids(&self) -> Vec<DocumentId> {
		let mut ids: Vec<_> = self.documents.load().keys().cloned().collect();
		ids.sort();
		ids
	}

	/// Registers `document`.
	///
	/// # Panics
	///
	/// Panics when a document with the same id is already registered, or when
	/// `document` was built for another registry.
	pub fn add(&self, document: Document) {
		assert!(
			document.belongs_to(&self.shared),
			"document {} was built for a different registry",
			document.id()
		);
		let _guard = self.write.lock();
		assert!(!self.contains(document.id()), "document {} is already registered", document.id());
		self.publish(document);
	}

	/// Returns the registered document for `init.id`, or builds and registers one.
	///
	/// A payload without an id always creates a new local document.
	pub fn get_or_create(&self, init: InitState) -> Result<Document, ConstructionError> {
		let id = init.id.as_deref().filter(|id| !id.is_empty()).map(DocumentId::from);
		if let Some(id) = &id
			&& let Some(existing) = self.find(id)
		{
			return Ok(existing);
		}

		let _guard = self.write.lock();
		if let Some(id) = &id
			&& let Some(existing) = self.find(id)
		{
			return Ok(existing);
		}
		let document = Document::with_shared(init, Arc::clone(&self.shared)).inspect_err(|error| {
			tracing::warn!(%error, "registry.create_failed");
		})?;
		self.publish(document.clone());
		Ok(document)
	}

	/// Caller holds `self.write`.
	fn publish(&self, document: Document) {
		let current = self.documents.load_full();
		let mut next = HashMap::clone(&current);
		let id = document.id().clone();
		next.insert(id.clone(), document);
		let total = next.len();
		self.documents.store(Arc::new(next));
		tracing::debug!(doc = %id, total, "registry.add");
	}

	/// Runs one host turn: dispatches every invocation queued before this call.
	///
	/// Invocations whose session is no longer current are dropped. Work queued
	/// while dispatching waits for the next pump.
	pub fn pump(&self) -> PumpReport {
		let batch = self.shared.queue.lock().take_all();
		let mut report = PumpReport::default();

		for item in batch {
			let PendingRun { invocation, sink } = item.work;
			if invocation.session.is_cancelled() || !sink.is_current() {
				tracing::trace!(seq = item.seq, code_id = %invocation.code_id, "registry.pump.skip");
				report.skipped += 1;
				continue;
			}
			tracing::trace!(seq = item.seq, code_id = %invocation.code_id, session = invocation.session.generation(), "registry.pump.dispatch");
			self.shared.interpreter.run(invocation, sink);
			report.dispatched += 1;
		}

		report.pending = self.shared.queue.lock().len();
		if report != PumpReport::default() {
			tracing::debug!(dispatched = report.dispatched, skipped = report.skipped, pending = report.pending, "registry.pump");
		}
		report
	}

	/// Number of invocations waiting for the next pump.
	pub fn pending_work(&self) -> usize {
		self.shared.queue.lock().len()
	}

	/// Drains user-facing notifications in push order.
	pub fn take_notifications(&self) -> Vec<Notification> {
		self.shared.notifications.lock().take_pending()
	}

	pub fn pending_notifications(&self) -> usize {
		self.shared.notifications.lock().len()
	}

	/// Discards pending notifications without presenting them.
	pub fn clear_notifications(&self) {
		self.shared.notifications.lock().clear();
	}

	/// Bumped by every [`Self::clear_notifications`].
	pub fn notification_epoch(&self) -> u64 {
		self.shared.notifications.lock().clear_epoch()
	}
}

impl std::fmt::Debug for DocumentRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocumentRegistry")
			.field("documents", &self.len())
			.field("pending_work", &self.pending_work())
			.field("config", &self.shared.config)
			.finish()
	}
}

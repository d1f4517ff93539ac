//! Document - the observable state container for one live code block.
//!
//! A [`Document`] is a cheap, clonable handle to shared state. All mutation
//! goes through action methods; each action applies under the document's
//! write lock as one atomic step and then notifies field subscribers.
//!
//! # Regions
//!
//! The raw source is split once at construction into a fixed preamble, the
//! editable body and a fixed postamble (see
//! [`split_source`](livecode_primitives::split_source)). Only the body is
//! ever edited; the body as loaded is kept as the pristine code.
//!
//! # Notification rules
//!
//! After every action the document compares the fields before and after:
//!
//! - scalar fields notify when their value changed;
//! - `logs` and `versions` notify when their length changed.
//!
//! Reads never notify. Use [`Document::batch`] to group several actions into
//! one notification pass.

pub(crate) mod execution;
mod history;

use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use livecode_primitives::{CodeId, DocumentId, Origin, SourceParts, normalize_language, split_source};
use livecode_worker::SessionToken;
use parking_lot::{Mutex, RwLock};

use crate::error::ConstructionError;
use crate::field::{Field, FieldSet, FieldValue};
use crate::log::{GraphicsOutput, LogMessage};
use crate::model::{DocumentProps, InitState, Status, Version};
use crate::registry::{DocumentRegistry, RegistryShared};
use crate::subscription::{Subscribers, Subscription};

/// Handle to one live document. Clones share the same instance.
#[derive(Clone)]
pub struct Document(Arc<DocumentInner>);

pub(crate) struct DocumentInner {
	id: DocumentId,
	code_id: CodeId,
	origin: Origin,
	language: String,
	parts: SourceParts,
	readonly: bool,
	versioned: bool,
	shared: Arc<RegistryShared>,
	state: RwLock<DocumentState>,
	pub(crate) subscribers: Mutex<Subscribers>,
}

pub(crate) struct DocumentState {
	code: String,
	/// Bumped whenever `code` changes value.
	code_rev: u64,
	versions: Vec<Version>,
	logs: Vec<LogMessage>,
	/// Bumped whenever `logs` is cleared.
	logs_epoch: u64,
	status: Status,
	/// Current session; `Some` exactly while executing.
	session: Option<SessionToken>,
	session_started_at: Option<DateTime<Utc>>,
	session_had_stderr: bool,
	show_raw: bool,
	is_pasted: bool,
	graphics_panel_open: bool,
	/// Latched across sessions.
	graphics: GraphicsOutput,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	last_saved_at: Option<Instant>,
	stale_events: u64,
}

impl DocumentState {
	fn new(code: String, now: DateTime<Utc>) -> Self {
		Self {
			code,
			code_rev: 0,
			versions: Vec::new(),
			logs: Vec::new(),
			logs_epoch: 0,
			status: Status::Idle,
			session: None,
			session_started_at: None,
			session_had_stderr: false,
			show_raw: false,
			is_pasted: false,
			graphics_panel_open: false,
			graphics: GraphicsOutput::empty(),
			created_at: now,
			updated_at: now,
			last_saved_at: None,
			stale_events: 0,
		}
	}
}

/// Identifies the contents of a sequence field.
///
/// `versions` only ever grows, so its epoch stays zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequenceMark {
	pub(crate) epoch: u64,
	pub(crate) len: usize,
}

impl SequenceMark {
	fn of(state: &DocumentState, field: Field) -> Option<Self> {
		match field {
			Field::Logs => Some(Self {
				epoch: state.logs_epoch,
				len: state.logs.len(),
			}),
			Field::Versions => Some(Self {
				epoch: 0,
				len: state.versions.len(),
			}),
			_ => None,
		}
	}
}

/// Cheap fingerprint of every observable field.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Observed {
	code_rev: u64,
	has_edits: bool,
	show_raw: bool,
	is_pasted: bool,
	status: Status,
	is_executing: bool,
	session_started_at: Option<DateTime<Utc>>,
	graphics_panel_open: bool,
	graphics: GraphicsOutput,
	logs_len: usize,
	versions_len: usize,
}

impl Observed {
	fn capture(state: &DocumentState, pristine: &str) -> Self {
		Self {
			code_rev: state.code_rev,
			has_edits: state.code != pristine,
			show_raw: state.show_raw,
			is_pasted: state.is_pasted,
			status: state.status,
			is_executing: state.session.is_some(),
			session_started_at: state.session_started_at,
			graphics_panel_open: state.graphics_panel_open,
			graphics: state.graphics,
			logs_len: state.logs.len(),
			versions_len: state.versions.len(),
		}
	}

	fn diff(&self, after: &Self) -> FieldSet {
		let mut changed = FieldSet::empty();
		changed.set(FieldSet::CODE, self.code_rev != after.code_rev);
		changed.set(FieldSet::HAS_EDITS, self.has_edits != after.has_edits);
		changed.set(FieldSet::SHOW_RAW, self.show_raw != after.show_raw);
		changed.set(FieldSet::IS_PASTED, self.is_pasted != after.is_pasted);
		changed.set(FieldSet::STATUS, self.status != after.status);
		changed.set(FieldSet::IS_EXECUTING, self.is_executing != after.is_executing);
		changed.set(FieldSet::SESSION_STARTED_AT, self.session_started_at != after.session_started_at);
		changed.set(FieldSet::GRAPHICS_PANEL_OPEN, self.graphics_panel_open != after.graphics_panel_open);
		changed.set(FieldSet::HAS_GRAPHICS_OUTPUT, self.graphics.is_empty() != after.graphics.is_empty());
		changed.set(
			FieldSet::HAS_TURTLE_OUTPUT,
			self.graphics.contains(GraphicsOutput::TURTLE) != after.graphics.contains(GraphicsOutput::TURTLE),
		);
		changed.set(
			FieldSet::HAS_CANVAS_OUTPUT,
			self.graphics.contains(GraphicsOutput::CANVAS) != after.graphics.contains(GraphicsOutput::CANVAS),
		);
		changed.set(FieldSet::LOGS, self.logs_len != after.logs_len);
		changed.set(FieldSet::VERSIONS, self.versions_len != after.versions_len);
		changed
	}
}

impl Document {
	/// Builds a document owned by `registry`. The document is not registered.
	///
	/// Fails when the raw source has a malformed marker structure.
	pub fn new(init: InitState, registry: &DocumentRegistry) -> Result<Self, ConstructionError> {
		Self::with_shared(init, registry.shared())
	}

	pub(crate) fn with_shared(init: InitState, shared: Arc<RegistryShared>) -> Result<Self, ConstructionError> {
		let (id, origin) = match init.id.filter(|id| !id.is_empty()) {
			Some(id) => (DocumentId::new(id), Origin::Remote),
			None => (DocumentId::generate(), Origin::Local),
		};
		let parts = split_source(&init.raw_source).map_err(|source| ConstructionError::MalformedSource { id: id.clone(), source })?;
		let label = if init.title.is_empty() { init.language.as_str() } else { init.title.as_str() };
		let code_id = CodeId::derive(label, &id);

		tracing::debug!(
			doc = %id,
			code_id = %code_id,
			?origin,
			preamble_lines = parts.line_offset(),
			body_len = parts.body.len(),
			"doc.new"
		);

		let state = DocumentState::new(parts.body.clone(), Utc::now());
		Ok(Self(Arc::new(DocumentInner {
			id,
			code_id,
			origin,
			language: init.language,
			parts,
			readonly: init.readonly,
			versioned: init.versioned,
			shared,
			state: RwLock::new(state),
			subscribers: Mutex::new(Subscribers::default()),
		})))
	}

	pub(crate) fn from_inner(inner: Arc<DocumentInner>) -> Self {
		Self(inner)
	}

	pub(crate) fn downgrade(&self) -> Weak<DocumentInner> {
		Arc::downgrade(&self.0)
	}

	pub(crate) fn belongs_to(&self, shared: &Arc<RegistryShared>) -> bool {
		Arc::ptr_eq(&self.0.shared, shared)
	}

	/// True when both handles refer to the same instance.
	pub fn ptr_eq(&self, other: &Document) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	pub fn id(&self) -> &DocumentId {
		&self.0.id
	}

	pub fn code_id(&self) -> &CodeId {
		&self.0.code_id
	}

	pub fn origin(&self) -> Origin {
		self.0.origin
	}

	/// Canonical language name.
	pub fn language(&self) -> &str {
		normalize_language(&self.0.language)
	}

	pub fn preamble(&self) -> &str {
		&self.0.parts.preamble
	}

	pub fn postamble(&self) -> &str {
		&self.0.parts.postamble
	}

	/// Body text as originally loaded.
	pub fn pristine_code(&self) -> &str {
		&self.0.parts.body
	}

	pub fn is_readonly(&self) -> bool {
		self.0.readonly
	}

	pub fn is_versioned(&self) -> bool {
		self.0.versioned
	}

	pub fn code(&self) -> String {
		self.0.state.read().code.clone()
	}

	pub fn has_edits(&self) -> bool {
		self.0.state.read().code != self.0.parts.body
	}

	pub fn show_raw(&self) -> bool {
		self.0.state.read().show_raw
	}

	pub fn is_pasted(&self) -> bool {
		self.0.state.read().is_pasted
	}

	pub fn status(&self) -> Status {
		self.0.state.read().status
	}

	pub fn is_executing(&self) -> bool {
		self.0.state.read().session.is_some()
	}

	/// Start time of the session this document currently owns.
	pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
		self.0.state.read().session_started_at
	}

	/// Token of the in-flight session, if any.
	pub fn session(&self) -> Option<SessionToken> {
		self.0.state.read().session.clone()
	}

	pub fn is_graphics_panel_open(&self) -> bool {
		self.0.state.read().graphics_panel_open
	}

	pub fn has_graphics_output(&self) -> bool {
		!self.0.state.read().graphics.is_empty()
	}

	pub fn has_turtle_output(&self) -> bool {
		self.0.state.read().graphics.contains(GraphicsOutput::TURTLE)
	}

	pub fn has_canvas_output(&self) -> bool {
		self.0.state.read().graphics.contains(GraphicsOutput::CANVAS)
	}

	pub fn logs(&self) -> Vec<LogMessage> {
		self.0.state.read().logs.clone()
	}

	pub fn log_count(&self) -> usize {
		self.0.state.read().logs.len()
	}

	/// Number of times `logs` has been cleared, by a new session or explicitly.
	///
	/// Together with [`Self::log_count`] it identifies the current log contents.
	pub fn log_epoch(&self) -> u64 {
		self.0.state.read().logs_epoch
	}

	pub fn versions(&self) -> Vec<Version> {
		self.0.state.read().versions.clone()
	}

	pub fn version_count(&self) -> usize {
		self.0.state.read().versions.len()
	}

	/// Number of session-routed log events discarded as stale.
	pub fn stale_event_count(&self) -> u64 {
		self.0.state.read().stale_events
	}

	/// Snapshot of one field.
	///
	/// Sequence fields are copied into a fresh slice on every call, so two reads
	/// are never [`ptr_eq`](FieldValue::ptr_eq). Use a
	/// [`FieldBridge`](crate::FieldBridge) for pointer-stable snapshots.
	pub fn read(&self, field: Field) -> FieldValue {
		let state = self.0.state.read();
		self.read_locked(&state, field)
	}

	/// Reads a sequence field together with its `(epoch, len)` mark, under one lock.
	///
	/// Returns `None` for scalar fields.
	pub(crate) fn read_sequence(&self, field: Field) -> Option<(SequenceMark, FieldValue)> {
		let state = self.0.state.read();
		let mark = SequenceMark::of(&state, field)?;
		Some((mark, self.read_locked(&state, field)))
	}

	pub(crate) fn sequence_mark(&self, field: Field) -> Option<SequenceMark> {
		SequenceMark::of(&self.0.state.read(), field)
	}

	fn read_locked(&self, state: &DocumentState, field: Field) -> FieldValue {
		match field {
			Field::Code => FieldValue::Text(state.code.clone()),
			Field::HasEdits => FieldValue::Bool(state.code != self.0.parts.body),
			Field::ShowRaw => FieldValue::Bool(state.show_raw),
			Field::IsPasted => FieldValue::Bool(state.is_pasted),
			Field::Status => FieldValue::Status(state.status),
			Field::IsExecuting => FieldValue::Bool(state.session.is_some()),
			Field::SessionStartedAt => FieldValue::Timestamp(state.session_started_at),
			Field::IsGraphicsPanelOpen => FieldValue::Bool(state.graphics_panel_open),
			Field::HasGraphicsOutput => FieldValue::Bool(!state.graphics.is_empty()),
			Field::HasTurtleOutput => FieldValue::Bool(state.graphics.contains(GraphicsOutput::TURTLE)),
			Field::HasCanvasOutput => FieldValue::Bool(state.graphics.contains(GraphicsOutput::CANVAS)),
			Field::Logs => FieldValue::Logs(Arc::from(state.logs.as_slice())),
			Field::Versions => FieldValue::Versions(Arc::from(state.versions.as_slice())),
		}
	}

	/// Every field, read under one lock.
	pub fn props(&self) -> DocumentProps {
		let inner = &self.0;
		let state = inner.state.read();
		DocumentProps {
			id: inner.id.clone(),
			code_id: inner.code_id.clone(),
			origin: inner.origin,
			language: normalize_language(&inner.language).to_string(),
			preamble: inner.parts.preamble.clone(),
			pristine_code: inner.parts.body.clone(),
			code: state.code.clone(),
			created_at: state.created_at,
			updated_at: state.updated_at,
			versions: state.versions.clone(),
			logs: state.logs.clone(),
			status: state.status,
			is_executing: state.session.is_some(),
			session_started_at: state.session_started_at,
			show_raw: state.show_raw,
			is_pasted: state.is_pasted,
			is_graphics_panel_open: state.graphics_panel_open,
			has_graphics_output: !state.graphics.is_empty(),
			has_turtle_output: state.graphics.contains(GraphicsOutput::TURTLE),
			has_canvas_output: state.graphics.contains(GraphicsOutput::CANVAS),
			has_edits: state.code != inner.parts.body,
			readonly: inner.readonly,
			versioned: inner.versioned,
		}
	}

	/// Registers `on_change` for changes of `field`.
	///
	/// The callback runs after the mutating action has released the document,
	/// on the thread that performed the action.
	pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static, field: Field) -> Subscription {
		let id = self.0.subscribers.lock().insert(field, Arc::new(on_change));
		tracing::trace!(doc = %self.0.id, field = field.as_str(), subscription = id, "doc.subscribe");
		Subscription::new(self.downgrade(), id, field)
	}

	pub fn subscriber_count(&self) -> usize {
		self.0.subscribers.lock().len()
	}

	/// Applies `f` as one atomic, observable step.
	///
	/// Subscribers are notified once, after `f` returns, for the net change.
	/// `f` must not call back into this document through another handle; use
	/// the reads on [`DocumentMut`] instead.
	pub fn batch<R>(&self, f: impl FnOnce(&mut DocumentMut<'_>) -> R) -> R {
		let (result, changed) = {
			let mut state = self.0.state.write();
			let pristine = self.0.parts.body.as_str();
			let before = Observed::capture(&state, pristine);
			let result = f(&mut DocumentMut {
				inner: &self.0,
				state: &mut state,
			});
			let changed = before.diff(&Observed::capture(&state, pristine));
			(result, changed)
		};
		self.notify(changed);
		result
	}

	fn notify(&self, changed: FieldSet) {
		if changed.is_empty() {
			return;
		}
		let callbacks = self.0.subscribers.lock().interested(changed);
		if !callbacks.is_empty() {
			tracing::trace!(doc = %self.0.id, changed = ?changed, callbacks = callbacks.len(), "doc.notify");
		}
		for callback in callbacks {
			callback();
		}
	}

	/// Replaces the editable body.
	pub fn set_code(&self, code: impl Into<String>) {
		let code = code.into();
		self.batch(|doc| doc.set_code(code));
	}

	pub fn set_show_raw(&self, show_raw: bool) {
		self.batch(|doc| doc.set_show_raw(show_raw));
	}

	pub fn set_is_pasted(&self, is_pasted: bool) {
		self.batch(|doc| doc.set_is_pasted(is_pasted));
	}

	pub fn set_status(&self, status: Status) {
		self.batch(|doc| doc.set_status(status));
	}

	pub fn set_graphics_panel_open(&self, open: bool) {
		self.batch(|doc| doc.set_graphics_panel_open(open));
	}

	pub fn close_graphics_panel(&self) {
		self.set_graphics_panel_open(false);
	}
}

impl std::fmt::Debug for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Document")
			.field("id", &self.0.id)
			.field("code_id", &self.0.code_id)
			.field("origin", &self.0.origin)
			.finish_non_exhaustive()
	}
}

/// Mutable access to a document inside [`Document::batch`].
pub struct DocumentMut<'a> {
	inner: &'a Arc<DocumentInner>,
	state: &'a mut DocumentState,
}

impl DocumentMut<'_> {
	pub fn id(&self) -> &DocumentId {
		&self.inner.id
	}

	pub fn code(&self) -> &str {
		&self.state.code
	}

	pub fn has_edits(&self) -> bool {
		self.state.code != self.inner.parts.body
	}

	pub fn status(&self) -> Status {
		self.state.status
	}

	pub fn is_executing(&self) -> bool {
		self.state.session.is_some()
	}

	pub fn has_graphics_output(&self) -> bool {
		!self.state.graphics.is_empty()
	}

	pub fn logs(&self) -> &[LogMessage] {
		&self.state.logs
	}

	pub fn versions(&self) -> &[Version] {
		&self.state.versions
	}

	/// Replaces the editable body. Versions and pristine code are untouched.
	pub fn set_code(&mut self, code: String) {
		if self.state.code == code {
			return;
		}
		self.state.code = code;
		self.state.code_rev = self.state.code_rev.wrapping_add(1);
		self.state.updated_at = Utc::now();
	}

	pub fn set_show_raw(&mut self, show_raw: bool) {
		self.state.show_raw = show_raw;
	}

	pub fn set_is_pasted(&mut self, is_pasted: bool) {
		self.state.is_pasted = is_pasted;
	}

	pub fn set_status(&mut self, status: Status) {
		self.state.status = status;
	}

	pub fn set_graphics_panel_open(&mut self, open: bool) {
		self.state.graphics_panel_open = open;
	}
}

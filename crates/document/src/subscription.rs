//! Field-level change subscriptions.
//!
//! Callbacks are collected under the subscriber lock and invoked after every
//! document lock has been released, in registration order. A callback may
//! therefore read the document, subscribe, or unsubscribe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::document::DocumentInner;
use crate::field::{Field, FieldSet};

pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

struct SubscriberEntry {
	id: u64,
	field: Field,
	callback: Callback,
}

#[derive(Default)]
pub(crate) struct Subscribers {
	next_id: u64,
	entries: Vec<SubscriberEntry>,
}

impl Subscribers {
	pub(crate) fn insert(&mut self, field: Field, callback: Callback) -> u64 {
		let id = self.next_id;
		self.next_id = self.next_id.wrapping_add(1);
		self.entries.push(SubscriberEntry { id, field, callback });
		id
	}

	pub(crate) fn remove(&mut self, id: u64) -> bool {
		let before = self.entries.len();
		self.entries.retain(|entry| entry.id != id);
		self.entries.len() != before
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	/// Callbacks interested in any field of `changed`.
	pub(crate) fn interested(&self, changed: FieldSet) -> Vec<Callback> {
		self.entries
			.iter()
			.filter(|entry| changed.contains_field(entry.field))
			.map(|entry| Arc::clone(&entry.callback))
			.collect()
	}
}

/// Handle returned by [`Document::subscribe`].
///
/// Dropping the handle unsubscribes. [`Self::unsubscribe`] may be called any
/// number of times, including after the document itself is gone.
///
/// [`Document::subscribe`]: crate::Document::subscribe
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
	document: Weak<DocumentInner>,
	id: u64,
	field: Field,
	active: AtomicBool,
}

impl Subscription {
	pub(crate) fn new(document: Weak<DocumentInner>, id: u64, field: Field) -> Self {
		Self {
			document,
			id,
			field,
			active: AtomicBool::new(true),
		}
	}

	/// Field this subscription observes.
	pub fn field(&self) -> Field {
		self.field
	}

	/// Returns true until the first unsubscribe.
	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	/// Stops notifications. Idempotent.
	pub fn unsubscribe(&self) {
		if !self.active.swap(false, Ordering::AcqRel) {
			return;
		}
		if let Some(document) = self.document.upgrade() {
			document.subscribers.lock().remove(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("field", &self.field)
			.field("active", &self.is_active())
			.finish()
	}
}

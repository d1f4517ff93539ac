//! FIFO queue for work deferred to the next host turn.
//!
//! Producers enqueue during the current unit of work; the host drains the
//! queue afterwards. Items keep arrival order and carry a scope tag so a
//! whole scope can be withdrawn before it is drained.

use std::collections::VecDeque;

/// Scope tag used for targeted queue clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkScope {
	/// Default scope for regular deferred work.
	Global,
	/// Work owned by one execution session generation.
	Session(u64),
}

/// Queue entry carrying sequence and scope metadata.
#[derive(Debug, Clone)]
pub struct DeferredItem<T> {
	pub work: T,
	pub scope: WorkScope,
	pub seq: u64,
}

/// FIFO queue for deferred work.
#[derive(Debug)]
pub struct DeferredQueue<T> {
	seq_next: u64,
	queue: VecDeque<DeferredItem<T>>,
}

impl<T> Default for DeferredQueue<T> {
	fn default() -> Self {
		Self {
			seq_next: 0,
			queue: VecDeque::new(),
		}
	}
}

impl<T> DeferredQueue<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Enqueues one item and returns its sequence number.
	pub fn enqueue(&mut self, work: T, scope: WorkScope) -> u64 {
		let seq = self.seq_next;
		self.seq_next = self.seq_next.wrapping_add(1);
		self.queue.push_back(DeferredItem { work, scope, seq });
		tracing::trace!(seq, ?scope, pending = self.queue.len(), "deferred.enqueue");
		seq
	}

	/// Pops the next item in FIFO order.
	pub fn pop_front(&mut self) -> Option<DeferredItem<T>> {
		self.queue.pop_front()
	}

	/// Takes every queued item, leaving the queue empty.
	///
	/// Work enqueued while the taken batch is processed lands in the next turn.
	pub fn take_all(&mut self) -> Vec<DeferredItem<T>> {
		self.queue.drain(..).collect()
	}

	/// Returns queued item count.
	pub fn len(&self) -> usize {
		self.queue.len()
	}

	/// Returns true when queue is empty.
	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}

	/// Returns true when an item with `scope` is queued.
	pub fn has_scope(&self, scope: WorkScope) -> bool {
		self.queue.iter().any(|item| item.scope == scope)
	}

	/// Removes queued items matching the scope tag.
	pub fn remove_scope(&mut self, scope: WorkScope) -> usize {
		let before = self.queue.len();
		self.queue.retain(|item| item.scope != scope);
		let removed = before.saturating_sub(self.queue.len());
		if removed > 0 {
			tracing::trace!(?scope, removed, "deferred.remove_scope");
		}
		removed
	}
}

//! User-facing notification queue.
//!
//! Documents push notifications for failures the user has to see (for
//! example a missing interpreter). The host drains them with
//! [`DocumentRegistry::take_notifications`] and renders them however it likes.
//!
//! [`DocumentRegistry::take_notifications`]: crate::DocumentRegistry::take_notifications

use std::collections::VecDeque;

use livecode_primitives::CodeId;

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub level: Level,
	/// Document the notification concerns.
	pub code_id: CodeId,
	pub message: String,
}

impl Notification {
	pub fn warning(code_id: CodeId, message: impl Into<String>) -> Self {
		Self {
			level: Level::Warning,
			code_id,
			message: message.into(),
		}
	}
}

#[derive(Debug, Default)]
pub(crate) struct NotificationCenter {
	pending: VecDeque<Notification>,
	clear_epoch: u64,
}

impl NotificationCenter {
	pub(crate) fn push(&mut self, notification: Notification) {
		tracing::debug!(
			code_id = %notification.code_id,
			level = ?notification.level,
			message = %notification.message,
			"notify.push"
		);
		self.pending.push_back(notification);
	}

	pub(crate) fn take_pending(&mut self) -> Vec<Notification> {
		self.pending.drain(..).collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.pending.len()
	}

	pub(crate) fn clear(&mut self) {
		self.pending.clear();
		self.clear_epoch = self.clear_epoch.wrapping_add(1);
	}

	pub(crate) fn clear_epoch(&self) -> u64 {
		self.clear_epoch
	}
}

#[cfg(test)]
mod tests {
	use livecode_primitives::DocumentId;

	use super::*;

	fn code_id() -> CodeId {
		CodeId::derive("python", &DocumentId::new("n1"))
	}

	#[test]
	fn take_pending_drains_in_push_order() {
		let mut center = NotificationCenter::default();
		center.push(Notification::warning(code_id(), "first"));
		center.push(Notification::warning(code_id(), "second"));

		let messages: Vec<_> = center.take_pending().into_iter().map(|n| n.message).collect();
		assert_eq!(messages, vec!["first", "second"]);
		assert_eq!(center.len(), 0);
	}

	#[test]
	fn clear_bumps_epoch() {
		let mut center = NotificationCenter::default();
		center.push(Notification::warning(code_id(), "stale"));
		center.clear();
		assert_eq!(center.len(), 0);
		assert_eq!(center.clear_epoch(), 1);
	}
}

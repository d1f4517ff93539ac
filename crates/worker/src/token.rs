use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for execution sessions.
///
/// Clones share the counter, so every token minted from one clock carries a
/// distinct generation.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Mints a fresh, uncancelled session token.
	pub fn mint(&self) -> SessionToken {
		SessionToken::new(self.next(), CancellationToken::new())
	}
}

/// Generation-scoped cancellation token for one execution session.
///
/// Cancellation is cooperative: holders poll [`Self::is_cancelled`] or await
/// [`Self::cancelled`]; nothing is interrupted.
#[derive(Debug, Clone)]
pub struct SessionToken {
	generation: u64,
	cancel: CancellationToken,
}

impl SessionToken {
	/// Creates a new session token.
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns true when `other` belongs to the same session.
	pub fn same_session(&self, other: &SessionToken) -> bool {
		self.generation == other.generation
	}
}

use std::time::Instant;

use chrono::Utc;

use super::{Document, DocumentMut};
use crate::model::{SaveOutcome, StoredScript, Version};

impl DocumentMut<'_> {
	/// Appends the current code as a new version if it differs from the latest one.
	pub fn save_now(&mut self) -> SaveOutcome {
		if !self.inner.versioned {
			return SaveOutcome::NotVersioned;
		}
		let latest = self.state.versions.last().map_or(self.inner.parts.body.as_str(), |v| v.code.as_str());
		if latest == self.state.code {
			return SaveOutcome::Unchanged;
		}

		let version = u32::try_from(self.state.versions.len()).map_or(u32::MAX, |len| len.saturating_add(1));
		self.state.versions.push(Version {
			code: self.state.code.clone(),
			created_at: Utc::now(),
			version,
			pasted: self.state.is_pasted,
		});
		tracing::debug!(doc = %self.inner.id, version, pasted = self.state.is_pasted, "doc.version.saved");
		SaveOutcome::Saved { version }
	}

	/// Saves at most once per sync interval of the bootstrap configuration.
	///
	/// `now` is the caller's clock reading; only appended versions start a new
	/// interval.
	pub fn request_save(&mut self, now: Instant) -> SaveOutcome {
		let interval = self.inner.shared.config.sync_max_once_every;
		if let Some(last) = self.state.last_saved_at
			&& now.saturating_duration_since(last) < interval
		{
			tracing::trace!(doc = %self.inner.id, "doc.version.throttled");
			return SaveOutcome::Throttled;
		}
		let outcome = self.save_now();
		if matches!(outcome, SaveOutcome::Saved { .. }) {
			self.state.last_saved_at = Some(now);
		}
		outcome
	}
}

impl Document {
	pub fn save_now(&self) -> SaveOutcome {
		self.batch(|doc| doc.save_now())
	}

	pub fn request_save(&self, now: Instant) -> SaveOutcome {
		self.batch(|doc| doc.request_save(now))
	}

	/// Payload for an external storage backend.
	pub fn stored_script(&self) -> StoredScript {
		let state = self.0.state.read();
		StoredScript {
			code: state.code.clone(),
			created_at: state.created_at,
			updated_at: state.updated_at,
			versions: state.versions.clone(),
		}
	}
}

//! Plain data carried in and out of documents.

use chrono::{DateTime, Utc};
use livecode_primitives::{CodeId, DocumentId, Origin};
use serde::{Deserialize, Serialize};

use crate::log::LogMessage;

/// Initial-state payload; the sole input to document construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitState {
	/// Persisted identifier. `None` for documents created in this process.
	pub id: Option<String>,
	/// Language tag as authored (`py`, `python`, …).
	#[serde(alias = "lang")]
	pub language: String,
	pub title: String,
	/// Raw source including optional `### PRE` / `### POST` markers.
	#[serde(alias = "raw")]
	pub raw_source: String,
	pub readonly: bool,
	pub versioned: bool,
}

impl InitState {
	/// Payload for a local document with the given language and raw source.
	pub fn new(language: impl Into<String>, raw_source: impl Into<String>) -> Self {
		Self {
			language: language.into(),
			raw_source: raw_source.into(),
			..Self::default()
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn readonly(mut self, readonly: bool) -> Self {
		self.readonly = readonly;
		self
	}

	pub fn versioned(mut self, versioned: bool) -> Self {
		self.versioned = versioned;
		self
	}
}

/// Persistence/sync state of a document, independent of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
	#[default]
	Idle,
	Syncing,
	Error,
	Success,
}

/// One entry of the append-only version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
	pub code: String,
	pub created_at: DateTime<Utc>,
	/// 1-based position in the history.
	pub version: u32,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub pasted: bool,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
	/// A version was appended.
	Saved { version: u32 },
	/// The code matches the latest version; nothing appended.
	Unchanged,
	/// The previous save is younger than the sync throttle interval.
	Throttled,
	/// The document does not keep a version history.
	NotVersioned,
}

/// Payload handed to an external storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScript {
	pub code: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub versions: Vec<Version>,
}

/// Consistent snapshot of every document field, taken under one lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProps {
	pub id: DocumentId,
	pub code_id: CodeId,
	pub origin: Origin,
	pub language: String,
	pub preamble: String,
	pub pristine_code: String,
	pub code: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub versions: Vec<Version>,
	pub logs: Vec<LogMessage>,
	pub status: Status,
	pub is_executing: bool,
	pub session_started_at: Option<DateTime<Utc>>,
	pub show_raw: bool,
	pub is_pasted: bool,
	pub is_graphics_panel_open: bool,
	pub has_graphics_output: bool,
	pub has_turtle_output: bool,
	pub has_canvas_output: bool,
	pub has_edits: bool,
	pub readonly: bool,
	pub versioned: bool,
}

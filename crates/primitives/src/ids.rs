use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a document.
///
/// Either supplied by a persisted payload or generated locally as a v4 UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
	/// Wraps an externally supplied identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Generates a fresh identifier for a document that was never persisted.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for DocumentId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Where a document's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
	/// Identifier generated in this process; never persisted before.
	Local,
	/// Identifier supplied by a persisted or remote payload.
	Remote,
}

/// Addressing token used to route interpreter output and rendering surfaces.
///
/// Only ASCII alphanumerics and `_` survive derivation, so the token is safe
/// as a DOM id, a file name and an interpreter-side identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeId(String);

impl CodeId {
	/// Derives the token `code.<label>.<id>` with unsafe characters replaced by `_`.
	///
	/// `label` is the document title, or its language when the title is empty.
	pub fn derive(label: &str, id: &DocumentId) -> Self {
		let raw = format!("code.{label}.{id}");
		Self(raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn generated_ids_are_unique_uuids() {
		let a = DocumentId::generate();
		let b = DocumentId::generate();
		assert_ne!(a, b);
		assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
	}

	#[test]
	fn code_id_replaces_dots_and_dashes() {
		let id = DocumentId::new("5f1c-77ab");
		let code_id = CodeId::derive("fib.py", &id);
		assert_eq!(code_id.as_str(), "code_fib_py_5f1c_77ab");
	}

	#[test]
	fn code_id_replaces_non_ascii() {
		let id = DocumentId::new("a");
		assert_eq!(CodeId::derive("größe x", &id).as_str(), "code_gr__e_x_a");
	}

	proptest! {
		#[test]
		fn code_id_is_always_token_safe(label in ".{0,24}", id in ".{0,24}") {
			let code_id = CodeId::derive(&label, &DocumentId::new(id));
			prop_assert!(code_id.as_str().starts_with("code_"));
			prop_assert!(code_id.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
		}
	}
}
